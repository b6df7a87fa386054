//! SQL layer for the ranked-score table.
//!
//! Entries are ordered by `(score desc, last_message_at desc)`, which is
//! total in practice (two writes for the same member never race past the
//! upsert), so page slices and rank counts always agree with each other.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
	pub score: u64,
	pub last_message_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
	pub user_id: u64,
	pub score: u64,
}

/// Insert-or-add: creates the entry with `amount` if absent, otherwise
/// adds `amount` to the existing score. Returns the score after the
/// increment. Read and write happen in one statement, so concurrent
/// increments for the same member cannot lose updates, and
/// `returned - amount` is exactly the score this increment applied to.
pub fn upsert_increment(
	conn: &Connection,
	guild_id: u64,
	user_id: u64,
	amount: u64,
	now: NaiveDateTime,
) -> rusqlite::Result<u64> {
	conn.prepare_cached(
		"
      INSERT INTO leaderboard_entries (guild_id, user_id, score, last_message_at)
      VALUES (?, ?, ?, ?)
      ON CONFLICT (guild_id, user_id) DO UPDATE SET
        score = score + excluded.score,
        last_message_at = excluded.last_message_at
      RETURNING score
    ",
	)?
	.query_row(
		params![guild_id.to_string(), user_id.to_string(), amount, now],
		|row| row.get(0),
	)
}

pub fn select_by_key(
	conn: &Connection,
	guild_id: u64,
	user_id: u64,
) -> rusqlite::Result<Option<ScoreRow>> {
	conn.prepare_cached(
		"
      SELECT score, last_message_at
      FROM leaderboard_entries
      WHERE guild_id = ? AND user_id = ?
    ",
	)?
	.query_row(params![guild_id.to_string(), user_id.to_string()], |row| {
		Ok(ScoreRow {
			score: row.get("score")?,
			last_message_at: row.get("last_message_at")?,
		})
	})
	.optional()
}

/// Counts the rows strictly ranked above the given (score, timestamp)
/// pair. A member's 1-based rank is this plus one.
pub fn select_rank_count(
	conn: &Connection,
	guild_id: u64,
	score: u64,
	last_message_at: NaiveDateTime,
) -> rusqlite::Result<u64> {
	conn.prepare_cached(
		"
      SELECT count() as count
      FROM leaderboard_entries
      WHERE guild_id = ?
        AND (score > ? OR (score = ? AND last_message_at > ?))
    ",
	)?
	.query_row(
		params![guild_id.to_string(), score, score, last_message_at],
		|row| row.get(0),
	)
}

pub fn select_page(
	conn: &Connection,
	guild_id: u64,
	limit: i64,
	offset: i64,
) -> rusqlite::Result<Vec<PageEntry>> {
	conn.prepare_cached(
		"
      SELECT user_id, score
      FROM leaderboard_entries
      WHERE guild_id = ?
      ORDER BY score DESC, last_message_at DESC
      LIMIT ? OFFSET ?
    ",
	)?
	.query_map(params![guild_id.to_string(), limit, offset], |row| {
		let user_id: String = row.get("user_id")?;
		Ok(PageEntry {
			// Written by us from a u64, so this can't fail in practice
			user_id: user_id.parse().unwrap_or(0),
			score: row.get("score")?,
		})
	})?
	.collect()
}

pub fn select_count(conn: &Connection, guild_id: u64) -> rusqlite::Result<u64> {
	conn.prepare_cached(
		"
      SELECT count() as count
      FROM leaderboard_entries
      WHERE guild_id = ?
    ",
	)?
	.query_row([guild_id.to_string()], |row| row.get(0))
}

// }}}
