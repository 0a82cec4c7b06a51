pub mod commands;
pub mod models;

use clap::{Parser, Subcommand, ValueEnum};

/// Used when neither `--database-url` nor the environment names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://struct2db.db";

#[derive(Parser)]
#[command(name = "struct2db")]
#[command(about = "Persist a demo Group/Person model through the struct2db controller")]
pub struct Cli {
    /// Database URL (`sqlite::memory:`, `sqlite://<path>`, `postgres://...`)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Prefix for every table name
    #[arg(long, global = true)]
    pub table_prefix: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Entity {
    Groups,
    Persons,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the demo tables
    Init,
    AddGroup {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    AddPerson {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value_t = 0)]
        age: i32,
        #[arg(long)]
        inactive: bool,
        #[arg(long, default_value_t = 0)]
        group_id: i64,
    },
    List {
        entity: Entity,
        /// Equality filter, `field=value`; repeatable
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Raw predicate, e.g. `.age > ? OR .name = ?`
        #[arg(long = "where")]
        raw: Option<String>,
        /// Argument for a `?` in the raw predicate; repeatable
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Join the raw predicate with OR instead of AND
        #[arg(long)]
        or: bool,
        /// Sort term, `field` or `field:desc`; repeatable
        #[arg(long = "order")]
        order: Vec<String>,
        #[arg(long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    Count {
        entity: Entity,
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    /// Set fields on every matching person
    UpdatePersons {
        /// Assignment, `field=value`; repeatable
        #[arg(long = "set", required = true)]
        values: Vec<String>,
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    /// Delete a group and, by cascade, its persons
    DeleteGroup {
        #[arg(long)]
        id: String,
    },
    DeletePersons {
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
}
