//! In-memory AFK statuses, keyed by (guild, member).
//!
//! Held by the bot context rather than living in a module-global, so the
//! lifecycle is explicit: created at process start, entries removed when
//! their owner speaks again.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct AfkStatus {
	/// Optional note, trimmed; `None` when the member gave no reason.
	pub message: Option<String>,
	pub since: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AfkStore {
	statuses: Mutex<HashMap<(u64, u64), AfkStatus>>,
}

impl AfkStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks a member as AFK, replacing any previous status.
	pub fn set(&self, guild_id: u64, user_id: u64, message: Option<&str>) -> AfkStatus {
		let message = message
			.map(|m| m.trim())
			.filter(|m| !m.is_empty())
			.map(|m| m.to_owned());

		let status = AfkStatus {
			message,
			since: Utc::now(),
		};

		self.statuses
			.lock()
			.unwrap()
			.insert((guild_id, user_id), status.clone());

		status
	}

	/// Removes and returns a member's AFK status, if any.
	pub fn clear(&self, guild_id: u64, user_id: u64) -> Option<AfkStatus> {
		self.statuses.lock().unwrap().remove(&(guild_id, user_id))
	}

	pub fn get(&self, guild_id: u64, user_id: u64) -> Option<AfkStatus> {
		self.statuses
			.lock()
			.unwrap()
			.get(&(guild_id, user_id))
			.cloned()
	}
}

// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_get_clear_roundtrip() {
		let store = AfkStore::new();
		assert!(store.get(1, 2).is_none());

		store.set(1, 2, Some("lunch"));
		assert_eq!(store.get(1, 2).unwrap().message.as_deref(), Some("lunch"));

		let cleared = store.clear(1, 2).unwrap();
		assert_eq!(cleared.message.as_deref(), Some("lunch"));
		assert!(store.get(1, 2).is_none());
		assert!(store.clear(1, 2).is_none());
	}

	#[test]
	fn statuses_are_scoped_per_guild() {
		let store = AfkStore::new();
		store.set(1, 2, None);
		assert!(store.get(3, 2).is_none());
	}

	#[test]
	fn blank_notes_are_dropped() {
		let store = AfkStore::new();
		assert!(store.set(1, 2, Some("   ")).message.is_none());
		assert_eq!(
			store.set(1, 2, Some("  brb  ")).message.as_deref(),
			Some("brb")
		);
	}
}
// }}}
