// {{{ Imports
use anyhow::Context;
use include_dir::{include_dir, Dir};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite_migration::Migrations;
use std::path::Path;
use std::sync::LazyLock;
// }}}

pub type SqlitePool = r2d2::Pool<SqliteConnectionManager>;

static MIGRATIONS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/migrations");
static MIGRATIONS: LazyLock<Migrations> = LazyLock::new(|| {
	Migrations::from_directory(&MIGRATIONS_DIR).expect("Could not load migrations")
});

/// Brings a connection's schema up to date. Idempotent: the migration
/// framework tracks the applied version, so concurrent process instances
/// racing on startup are safe.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> anyhow::Result<()> {
	MIGRATIONS
		.to_latest(conn)
		.with_context(|| "Could not run migrations")?;
	Ok(())
}

pub fn connect_db(db_path: &Path) -> anyhow::Result<SqlitePool> {
	let mut conn = rusqlite::Connection::open(db_path)
		.with_context(|| "Could not connect to sqlite database")?;
	conn.pragma_update(None, "journal_mode", "WAL")?;
	conn.pragma_update(None, "foreign_keys", "ON")?;

	run_migrations(&mut conn)?;
	println!("✅ Ensured db schema is up to date");

	// Concurrent writers wait for the write lock instead of erroring out
	let manager = SqliteConnectionManager::file(db_path)
		.with_init(|conn| conn.busy_timeout(std::time::Duration::from_secs(5)));

	Pool::new(manager).with_context(|| "Could not open sqlite database.")
}
