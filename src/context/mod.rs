// {{{ Imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use db::{connect_db, SqlitePool};

use crate::afk::AfkStore;
use crate::context::paths::TallykeeperPaths;
use crate::invites::{InviteStore, InviteUseCache};
use crate::leaderboard::RankEngine;
// }}}

pub mod db;
pub mod paths;

// {{{ Common types
pub type Error = anyhow::Error;
pub type PoiseContext<'a> = poise::Context<'a, BotContext, Error>;
// }}}
// {{{ Error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	User,
	Internal,
}

#[derive(Debug)]
pub struct TaggedError {
	pub kind: ErrorKind,
	pub error: Error,
}

impl TaggedError {
	#[inline]
	pub fn new(kind: ErrorKind, error: Error) -> Self {
		Self { kind, error }
	}
}

impl<E: Into<Error>> From<E> for TaggedError {
	fn from(value: E) -> Self {
		Self::new(ErrorKind::Internal, value.into())
	}
}

pub trait TagError {
	fn tag(self, tag: ErrorKind) -> TaggedError;
}

impl TagError for Error {
	fn tag(self, tag: ErrorKind) -> TaggedError {
		TaggedError::new(tag, self)
	}
}
// }}}
// {{{ Persistence unavailability
static UNAVAILABILITY_LOGGED: AtomicBool = AtomicBool::new(false);

/// The backing store could not be reached or is misconfigured.
///
/// Store wrappers convert every rusqlite/r2d2 error into this before it
/// reaches a caller, so presentation code only ever has to handle "the
/// feature is temporarily unavailable". Never retried automatically.
#[derive(Debug, thiserror::Error)]
#[error("This feature is not available right now. Check the bot's database configuration and try again later.")]
pub struct PersistenceUnavailable;

impl PersistenceUnavailable {
	/// Records a store failure. The underlying error is logged with the
	/// failing operation and guild for diagnosis, but only once per
	/// process: a missing database configuration would otherwise spam
	/// the log on every message.
	pub fn report(operation: &str, guild_id: u64, error: impl std::fmt::Display) -> Self {
		if !UNAVAILABILITY_LOGGED.swap(true, Ordering::Relaxed) {
			eprintln!("💥 Database operation `{operation}` failed for guild {guild_id}: {error}");
		}

		Self
	}

	/// Tags the failure as a user-visible error, surfacing the
	/// "temporarily unavailable" message as the reply.
	pub fn into_user_error(self) -> TaggedError {
		anyhow::Error::new(self).tag(ErrorKind::User)
	}
}
// }}}
// {{{ BotContext
/// Custom user data passed to all command functions
#[derive(Clone)]
pub struct BotContext {
	pub db: SqlitePool,
	pub ranks: RankEngine,
	pub invites: InviteStore,
	pub invite_uses: Arc<InviteUseCache>,
	pub afk: Arc<AfkStore>,
}

impl BotContext {
	pub fn new() -> Result<Self, Error> {
		let paths = TallykeeperPaths::new()?;
		let db = connect_db(&paths.db_path())?;
		Ok(Self::with_pool(db))
	}

	/// Builds a context over an already-connected pool. Used by tests,
	/// which point the pool at a temporary database.
	pub fn with_pool(db: SqlitePool) -> Self {
		Self {
			ranks: RankEngine::new(db.clone()),
			invites: InviteStore::new(db.clone()),
			invite_uses: Arc::new(InviteUseCache::new()),
			afk: Arc::new(AfkStore::new()),
			db,
		}
	}
}
// }}}
// {{{ Testing helpers
#[cfg(test)]
pub mod testing {
	use tempfile::TempDir;

	use super::*;
	use crate::commands::discord::mock::MockContext;

	pub fn get_test_pool() -> Result<(SqlitePool, TempDir), Error> {
		let dir = tempfile::tempdir()?;
		let pool = connect_db(&dir.path().join("db.sqlite"))?;
		Ok((pool, dir))
	}

	pub fn get_mock_context() -> Result<(MockContext, TempDir), Error> {
		let (pool, dir) = get_test_pool()?;
		let ctx = MockContext::new(BotContext::with_pool(pool));
		Ok((ctx, dir))
	}
}
// }}}
