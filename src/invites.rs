//! Invite attribution and statistics.
//!
//! Discord doesn't say which invite a joining member used, so we keep a
//! per-guild snapshot of invite use counts and attribute each join to the
//! invite whose count went up since the last snapshot.

// {{{ Imports
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::context::db::SqlitePool;
use crate::context::PersistenceUnavailable;
// }}}

// {{{ Invite use snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteUse {
	pub uses: u64,
	pub inviter_id: Option<u64>,
}

/// Invite code → current use count, for one guild.
pub type InviteSnapshot = HashMap<String, InviteUse>;

/// Finds the inviter responsible for a join by comparing use counts.
/// A code unseen in the old snapshot counts if it already has uses
/// (created and used between snapshots).
pub fn find_inviter(cached: &InviteSnapshot, current: &InviteSnapshot) -> Option<u64> {
	for (code, invite) in current {
		let inviter = match invite.inviter_id {
			Some(id) => id,
			None => continue,
		};

		match cached.get(code) {
			None if invite.uses > 0 => return Some(inviter),
			Some(old) if invite.uses > old.uses => return Some(inviter),
			_ => {}
		}
	}

	None
}

/// Explicitly-owned replacement for what would otherwise be a
/// process-global map: created with the bot context, primed on startup
/// and guild joins, replaced wholesale on every lookup.
#[derive(Debug, Default)]
pub struct InviteUseCache {
	snapshots: Mutex<HashMap<u64, InviteSnapshot>>,
}

impl InviteUseCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a fresh snapshot without attributing anything.
	pub fn prime(&self, guild_id: u64, snapshot: InviteSnapshot) {
		self.snapshots.lock().unwrap().insert(guild_id, snapshot);
	}

	/// Attributes a member join against the cached snapshot, then makes
	/// `current` the new snapshot. Returns `None` (and only primes the
	/// cache) when the guild hasn't been snapshotted before.
	pub fn attribute_join(&self, guild_id: u64, current: InviteSnapshot) -> Option<u64> {
		let mut snapshots = self.snapshots.lock().unwrap();
		let inviter = snapshots
			.get(&guild_id)
			.and_then(|cached| find_inviter(cached, &current));

		let first_sighting = snapshots.insert(guild_id, current).is_none();
		if first_sighting {
			return None;
		}

		inviter
	}
}
// }}}
// {{{ Invite store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviterTotal {
	pub inviter_id: u64,
	pub total_invites: u64,
}

/// Persisted invite attributions, keyed by the joining member so a
/// re-join simply re-attributes instead of double counting.
#[derive(Clone)]
pub struct InviteStore {
	pool: SqlitePool,
}

impl InviteStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn conn(
		&self,
		operation: &str,
		guild_id: u64,
	) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>, PersistenceUnavailable>
	{
		self.pool
			.get()
			.map_err(|e| PersistenceUnavailable::report(operation, guild_id, e))
	}

	pub fn record_join(
		&self,
		guild_id: u64,
		inviter_id: u64,
		joined_user_id: u64,
	) -> Result<(), PersistenceUnavailable> {
		let conn = self.conn("record_join", guild_id)?;
		conn.prepare_cached(
			"
          INSERT INTO invite_tracking (guild_id, inviter_id, joined_user_id, joined_at)
          VALUES (?, ?, ?, ?)
          ON CONFLICT (guild_id, joined_user_id) DO UPDATE SET
            inviter_id = excluded.inviter_id,
            joined_at = excluded.joined_at
        ",
		)
		.and_then(|mut statement| {
			statement.execute(params![
				guild_id.to_string(),
				inviter_id.to_string(),
				joined_user_id.to_string(),
				Utc::now().naive_utc()
			])
		})
		.map_err(|e| PersistenceUnavailable::report("record_join", guild_id, e))?;

		Ok(())
	}

	pub fn invite_count(
		&self,
		guild_id: u64,
		inviter_id: u64,
	) -> Result<u64, PersistenceUnavailable> {
		let conn = self.conn("invite_count", guild_id)?;
		conn.prepare_cached(
			"
          SELECT count() as count
          FROM invite_tracking
          WHERE guild_id = ? AND inviter_id = ?
        ",
		)
		.and_then(|mut statement| {
			statement
				.query_row(params![guild_id.to_string(), inviter_id.to_string()], |row| {
					row.get(0)
				})
				.optional()
		})
		.map(|count| count.unwrap_or(0))
		.map_err(|e| PersistenceUnavailable::report("invite_count", guild_id, e))
	}

	pub fn top_inviters(
		&self,
		guild_id: u64,
		limit: i64,
	) -> Result<Vec<InviterTotal>, PersistenceUnavailable> {
		if limit <= 0 {
			return Ok(Vec::new());
		}

		let conn = self.conn("top_inviters", guild_id)?;
		conn.prepare_cached(
			"
          SELECT inviter_id, count() as total_invites
          FROM invite_tracking
          WHERE guild_id = ?
          GROUP BY inviter_id
          ORDER BY total_invites DESC
          LIMIT ?
        ",
		)
		.and_then(|mut statement| {
			statement
				.query_map(params![guild_id.to_string(), limit], |row| {
					let inviter_id: String = row.get("inviter_id")?;
					Ok(InviterTotal {
						inviter_id: inviter_id.parse().unwrap_or(0),
						total_invites: row.get("total_invites")?,
					})
				})?
				.collect()
		})
		.map_err(|e| PersistenceUnavailable::report("top_inviters", guild_id, e))
	}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::testing::get_test_pool;

	const GUILD: u64 = 1;

	fn snapshot(entries: &[(&str, u64, Option<u64>)]) -> InviteSnapshot {
		entries
			.iter()
			.map(|(code, uses, inviter_id)| {
				(
					(*code).to_owned(),
					InviteUse {
						uses: *uses,
						inviter_id: *inviter_id,
					},
				)
			})
			.collect()
	}

	// {{{ Attribution
	#[test]
	fn attributes_the_bumped_invite() {
		let cached = snapshot(&[("aaa", 3, Some(10)), ("bbb", 1, Some(20))]);
		let current = snapshot(&[("aaa", 3, Some(10)), ("bbb", 2, Some(20))]);
		assert_eq!(find_inviter(&cached, &current), Some(20));
	}

	#[test]
	fn attributes_new_codes_with_uses() {
		let cached = snapshot(&[("aaa", 3, Some(10))]);
		let current = snapshot(&[("aaa", 3, Some(10)), ("new", 1, Some(30))]);
		assert_eq!(find_inviter(&cached, &current), Some(30));
	}

	#[test]
	fn unchanged_counts_attribute_nothing() {
		let cached = snapshot(&[("aaa", 3, Some(10))]);
		assert_eq!(find_inviter(&cached, &cached.clone()), None);

		// Codes without a known inviter can't be attributed
		let current = snapshot(&[("aaa", 4, None)]);
		assert_eq!(find_inviter(&cached, &current), None);
	}

	#[test]
	fn first_snapshot_only_primes_the_cache() {
		let cache = InviteUseCache::new();
		let current = snapshot(&[("aaa", 1, Some(10))]);
		assert_eq!(cache.attribute_join(GUILD, current.clone()), None);

		// Second sighting diffs against the stored snapshot
		let bumped = snapshot(&[("aaa", 2, Some(10))]);
		assert_eq!(cache.attribute_join(GUILD, bumped), Some(10));
	}
	// }}}
	// {{{ Persistence
	#[test]
	fn rejoins_do_not_double_count() {
		let (pool, _guard) = get_test_pool().unwrap();
		let store = InviteStore::new(pool);

		store.record_join(GUILD, 10, 100).unwrap();
		store.record_join(GUILD, 10, 101).unwrap();
		store.record_join(GUILD, 10, 100).unwrap();
		assert_eq!(store.invite_count(GUILD, 10).unwrap(), 2);

		// A re-join through someone else's invite re-attributes
		store.record_join(GUILD, 20, 100).unwrap();
		assert_eq!(store.invite_count(GUILD, 10).unwrap(), 1);
		assert_eq!(store.invite_count(GUILD, 20).unwrap(), 1);
	}

	#[test]
	fn top_inviters_order_by_total() {
		let (pool, _guard) = get_test_pool().unwrap();
		let store = InviteStore::new(pool);

		store.record_join(GUILD, 10, 100).unwrap();
		store.record_join(GUILD, 10, 101).unwrap();
		store.record_join(GUILD, 20, 102).unwrap();

		let top = store.top_inviters(GUILD, 10).unwrap();
		assert_eq!(
			top,
			vec![
				InviterTotal {
					inviter_id: 10,
					total_invites: 2
				},
				InviterTotal {
					inviter_id: 20,
					total_invites: 1
				},
			]
		);

		assert_eq!(store.top_inviters(GUILD, 0).unwrap(), Vec::new());
		assert_eq!(store.invite_count(GUILD, 99).unwrap(), 0);
	}
	// }}}
}
// }}}
