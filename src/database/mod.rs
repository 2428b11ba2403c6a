mod detect;
mod driver;
mod mysql;
mod postgres;
mod redis;

pub use detect::detect_databases;
pub use driver::{DumpAdapter, DumpOutcome};

use mysql::MysqlAdapter;
use postgres::PostgresAdapter;
use redis::RedisAdapter;

use crate::config::{DatabaseKind, DatabaseSource, SubDatabaseFailure};
use crate::process::CommandRunner;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct DumpOptions {
    pub timeout: Duration,
    pub sub_database_failure: SubDatabaseFailure,
}

pub fn create_adapter(
    source: &DatabaseSource,
    runner: Arc<dyn CommandRunner>,
    options: DumpOptions,
) -> Box<dyn DumpAdapter> {
    match source.kind {
        DatabaseKind::PostgreSQL => Box::new(PostgresAdapter::new(
            runner,
            options.timeout,
            options.sub_database_failure,
        )),
        DatabaseKind::MySQL => Box::new(MysqlAdapter::new(runner, options.timeout)),
        DatabaseKind::Redis => Box::new(RedisAdapter::new(runner, options.timeout)),
    }
}
