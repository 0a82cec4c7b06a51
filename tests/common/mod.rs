#![allow(dead_code)]

use std::sync::Arc;
use struct2db::{Connection, Controller, SqliteConnection, record};

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Group {
        #[identity]
        pub id: i64,
        pub name: String [required, len_max = 32],
        pub description: String,
    }
    relations {
        persons => group_id,
    }
}

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Person {
        #[identity]
        pub id: i64,
        pub name: String as "full_name" [required],
        pub email: String [email],
        pub age: i32 [min = 0, max = 150],
        pub active: bool,
        pub group_id: i64,
    }
}

// Projection of `Person` onto the persons table.
record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct PersonName {
        #[identity]
        pub id: i64,
        pub name: String,
    }
}

// Three types whose relations form a cycle: Alpha -> Beta -> Gamma -> Alpha.
record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Alpha table = "alphas" {
        #[identity]
        pub id: i64,
        pub gamma_id: i64,
    }
    relations {
        betas => alpha_id,
    }
}

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Beta table = "betas" {
        #[identity]
        pub id: i64,
        pub alpha_id: i64,
    }
    relations {
        gammas => beta_id,
    }
}

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Gamma table = "gammas" {
        #[identity]
        pub id: i64,
        pub beta_id: i64,
    }
    relations {
        alphas => gamma_id,
    }
}

pub const SCHEMA: &str = "
    CREATE TABLE groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL
    );
    CREATE TABLE persons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL,
        age INTEGER NOT NULL,
        active INTEGER NOT NULL,
        group_id INTEGER NOT NULL
    );
    CREATE TABLE alphas (id INTEGER PRIMARY KEY AUTOINCREMENT, gamma_id INTEGER NOT NULL);
    CREATE TABLE betas (id INTEGER PRIMARY KEY AUTOINCREMENT, alpha_id INTEGER NOT NULL);
    CREATE TABLE gammas (id INTEGER PRIMARY KEY AUTOINCREMENT, beta_id INTEGER NOT NULL);
";

/// Controller over a fresh in-memory database with the test tables.
pub async fn setup() -> Controller {
    let conn = SqliteConnection::open_in_memory().expect("open in-memory sqlite");
    conn.execute_batch(SCHEMA).await.expect("create test tables");
    Controller::new(Arc::new(conn), "")
}

pub fn person(name: &str, age: i32, group_id: i64) -> Person {
    Person {
        id: 0,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        age,
        active: true,
        group_id,
    }
}

/// Rows currently in `table`, counted without going through the controller.
pub async fn count_rows(controller: &Controller, table: &str) -> i64 {
    let rows = controller
        .connection()
        .query(&format!("SELECT COUNT(*) FROM {}", table), &[])
        .await
        .expect("count rows");
    rows[0][0].as_i64().expect("integer count")
}
