//! Ranking queries over the score store.
//!
//! This is the only layer that talks to the persistence port on behalf of
//! presentation code: raw database errors stop here and come out as
//! [PersistenceUnavailable].

use chrono::Utc;
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;

use crate::context::db::SqlitePool;
use crate::context::PersistenceUnavailable;

pub mod store;

pub use store::PageEntry;

// {{{ Query results
/// A member's current position within their guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
	pub user_id: u64,
	pub score: u64,

	/// 1-based, under `(score desc, last_message_at desc)` ordering.
	pub rank: u64,
}

/// The score transition caused by one recorded activity event. The event
/// layer compares the levels of both scores to detect level-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityRecorded {
	pub previous_score: u64,
	pub current_score: u64,
	pub increment: u64,
}
// }}}

#[derive(Clone)]
pub struct RankEngine {
	pool: SqlitePool,
}

impl RankEngine {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	fn conn(
		&self,
		operation: &str,
		guild_id: u64,
	) -> Result<PooledConnection<SqliteConnectionManager>, PersistenceUnavailable> {
		self.pool
			.get()
			.map_err(|e| PersistenceUnavailable::report(operation, guild_id, e))
	}

	// {{{ Record activity
	/// Atomically adds `amount` to a member's score, creating the entry
	/// if absent.
	///
	/// Non-positive amounts are normalized up to 1: every qualifying
	/// activity event is worth at least one point.
	///
	/// The increment and the read of the resulting score happen in a
	/// single statement, so even when many events for the same member are
	/// in flight at once, each caller gets its own exact
	/// previous/current pair and every level crossing is observed by
	/// exactly one of them.
	///
	/// On failure the activity is simply not recorded this time; callers
	/// must not retry.
	pub fn record_activity(
		&self,
		guild_id: u64,
		user_id: u64,
		amount: i64,
	) -> Result<ActivityRecorded, PersistenceUnavailable> {
		let increment = amount.max(1) as u64;
		let conn = self.conn("record_activity", guild_id)?;

		let current_score =
			store::upsert_increment(&conn, guild_id, user_id, increment, Utc::now().naive_utc())
				.map_err(|e| PersistenceUnavailable::report("record_activity", guild_id, e))?;

		Ok(ActivityRecorded {
			previous_score: current_score - increment,
			current_score,
			increment,
		})
	}
	// }}}
	// {{{ Standing
	/// Returns the member's score and rank, or `None` if they have no
	/// entry yet. Two round trips: fetch the row, then count the rows
	/// ranked above it.
	pub fn standing(
		&self,
		guild_id: u64,
		user_id: u64,
	) -> Result<Option<Standing>, PersistenceUnavailable> {
		let conn = self.conn("standing", guild_id)?;
		let report = |e| PersistenceUnavailable::report("standing", guild_id, e);

		let Some(row) = store::select_by_key(&conn, guild_id, user_id).map_err(report)? else {
			return Ok(None);
		};

		let better =
			store::select_rank_count(&conn, guild_id, row.score, row.last_message_at)
				.map_err(report)?;

		Ok(Some(Standing {
			user_id,
			score: row.score,
			rank: 1 + better,
		}))
	}
	// }}}
	// {{{ Pages
	/// Returns the `[offset, offset + page_size)` slice of the ranked
	/// entries. A non-positive page size yields an empty page rather
	/// than an error.
	pub fn page(
		&self,
		guild_id: u64,
		page_size: i64,
		offset: i64,
	) -> Result<Vec<PageEntry>, PersistenceUnavailable> {
		if page_size <= 0 {
			return Ok(Vec::new());
		}

		let conn = self.conn("page", guild_id)?;
		store::select_page(&conn, guild_id, page_size, offset.max(0))
			.map_err(|e| PersistenceUnavailable::report("page", guild_id, e))
	}

	pub fn count_entries(&self, guild_id: u64) -> Result<u64, PersistenceUnavailable> {
		let conn = self.conn("count_entries", guild_id)?;
		store::select_count(&conn, guild_id)
			.map_err(|e| PersistenceUnavailable::report("count_entries", guild_id, e))
	}
	// }}}
}

// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::testing::get_test_pool;

	const GUILD: u64 = 1;

	#[test]
	fn first_activity_creates_a_rank_one_standing() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		assert_eq!(engine.standing(GUILD, 7).unwrap(), None);

		let recorded = engine.record_activity(GUILD, 7, 1).unwrap();
		assert_eq!(recorded.previous_score, 0);
		assert_eq!(recorded.current_score, 1);

		let standing = engine.standing(GUILD, 7).unwrap().unwrap();
		assert_eq!(standing.score, 1);
		assert_eq!(standing.rank, 1);
	}

	#[test]
	fn activity_reports_both_sides_of_the_transition() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		engine.record_activity(GUILD, 7, 120).unwrap();
		let recorded = engine.record_activity(GUILD, 7, 5).unwrap();
		assert_eq!(recorded.previous_score, 120);
		assert_eq!(recorded.current_score, 125);
		assert_eq!(recorded.increment, 5);
	}

	#[test]
	fn nonpositive_amounts_normalize_to_one() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		for amount in [0, -3] {
			let recorded = engine.record_activity(GUILD, 7, amount).unwrap();
			assert_eq!(recorded.increment, 1);
		}

		assert_eq!(engine.standing(GUILD, 7).unwrap().unwrap().score, 2);
	}

	#[test]
	fn ranks_and_pages_are_consistent() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		// Insertion order doubles as activity recency: the last writer
		// wins ties.
		engine.record_activity(GUILD, 10, 50).unwrap();
		engine.record_activity(GUILD, 20, 50).unwrap();
		engine.record_activity(GUILD, 30, 30).unwrap();

		let ranks: Vec<_> = [10, 20, 30]
			.iter()
			.map(|id| engine.standing(GUILD, *id).unwrap().unwrap().rank)
			.collect();
		assert_eq!(ranks, vec![2, 1, 3]);

		// The page containing rank r is page ceil(r / page_size)
		let page_size = 2;
		for id in [10u64, 20, 30] {
			let standing = engine.standing(GUILD, id).unwrap().unwrap();
			let page_index = (standing.rank as i64 - 1) / page_size;
			let page = engine
				.page(GUILD, page_size, page_index * page_size)
				.unwrap();
			let offset_in_page = (standing.rank as i64 - 1) % page_size;
			assert_eq!(page[offset_in_page as usize].user_id, id);
		}
	}

	#[test]
	fn concurrent_increments_report_distinct_transitions() {
		use std::sync::{Arc, Barrier};

		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		for trial in 0..50u64 {
			// Fresh member at 99 XP, one point short of leveling up
			let user_id = 1000 + trial;
			engine.record_activity(GUILD, user_id, 99).unwrap();

			let barrier = Arc::new(Barrier::new(2));
			let racers: Vec<_> = (0..2)
				.map(|_| {
					let engine = engine.clone();
					let barrier = barrier.clone();
					std::thread::spawn(move || {
						barrier.wait();
						engine.record_activity(GUILD, user_id, 1).unwrap()
					})
				})
				.collect();

			let mut recorded: Vec<_> = racers.into_iter().map(|t| t.join().unwrap()).collect();
			recorded.sort_unstable_by_key(|r| r.previous_score);

			// Exactly one of the racers must see the 99 -> 100 crossing;
			// the other continues from where it left off.
			assert_eq!(recorded[0].previous_score, 99, "trial {trial}");
			assert_eq!(recorded[0].current_score, 100, "trial {trial}");
			assert_eq!(recorded[1].previous_score, 100, "trial {trial}");
			assert_eq!(recorded[1].current_score, 101, "trial {trial}");
		}
	}

	#[test]
	fn nonpositive_page_sizes_yield_empty_pages() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);
		engine.record_activity(GUILD, 10, 1).unwrap();

		assert_eq!(engine.page(GUILD, 0, 0).unwrap(), Vec::new());
		assert_eq!(engine.page(GUILD, -5, 0).unwrap(), Vec::new());
	}

	#[test]
	fn count_tracks_distinct_members() {
		let (pool, _guard) = get_test_pool().unwrap();
		let engine = RankEngine::new(pool);

		assert_eq!(engine.count_entries(GUILD).unwrap(), 0);
		engine.record_activity(GUILD, 10, 1).unwrap();
		engine.record_activity(GUILD, 10, 1).unwrap();
		engine.record_activity(GUILD, 20, 1).unwrap();
		assert_eq!(engine.count_entries(GUILD).unwrap(), 2);
	}
}
// }}}
