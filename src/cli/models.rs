use struct2db::{Dialect, record};

record! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Group {
        #[identity]
        pub id: i64,
        pub name: String [required, len_max = 64],
        pub description: String [len_max = 255],
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
        pub name: String [required, len_max = 100],
        pub email: String [email],
        pub age: i32 [min = 0, max = 150],
        pub active: bool,
        pub group_id: i64,
    }
}

/// Tables for the demo model.
pub fn ddl(dialect: Dialect, prefix: &str) -> String {
    let (serial, boolean) = match dialect {
        Dialect::Sqlite => ("INTEGER PRIMARY KEY AUTOINCREMENT", "INTEGER"),
        Dialect::Postgres => ("BIGSERIAL PRIMARY KEY", "BOOLEAN"),
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {p}groups (\
            id {serial}, \
            name TEXT NOT NULL, \
            description TEXT NOT NULL DEFAULT ''\
        );\n\
        CREATE TABLE IF NOT EXISTS {p}persons (\
            id {serial}, \
            name TEXT NOT NULL, \
            email TEXT NOT NULL DEFAULT '', \
            age INTEGER NOT NULL DEFAULT 0, \
            active {boolean} NOT NULL, \
            group_id BIGINT NOT NULL DEFAULT 0\
        );",
        p = prefix,
        serial = serial,
        boolean = boolean,
    )
}
