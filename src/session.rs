//! Owner-scoped, time-bounded pagination state for interactive
//! leaderboard views. This knows nothing about Discord: the command
//! layer drives it from a button collector and performs the fetches.

use chrono::{DateTime, Duration, Utc};

/// How long a session accepts page turns after being created.
pub const SESSION_LIFETIME_SECS: i64 = 2 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
	Previous,
	Next,
}

/// Outcome of a requested page turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTurn {
	/// The page changed; the caller must fetch and render the new page.
	Turned(u32),

	/// Already at the first/last page. Not an error.
	Unchanged(u32),

	/// The requester is not the session owner. No state change.
	Unauthorized,

	/// The session's time window has elapsed. Terminal.
	Expired,
}

#[derive(Debug, Clone)]
pub struct PaginationSession {
	owner_id: u64,
	current_page: u32,
	total_pages: u32,
	page_size: u32,
	expires_at: DateTime<Utc>,
	expired: bool,
}

impl PaginationSession {
	/// Creates a session opened on the page containing the viewer's own
	/// rank (or page 1 when unranked), clamped to the valid page range.
	pub fn new(
		owner_id: u64,
		viewer_rank: Option<u64>,
		total_entries: u64,
		page_size: u32,
		now: DateTime<Utc>,
	) -> Self {
		let page_size = page_size.max(1);
		let total_pages = total_entries.div_ceil(page_size as u64).max(1) as u32;
		let current_page = viewer_rank
			.map(|rank| rank.div_ceil(page_size as u64) as u32)
			.unwrap_or(1)
			.clamp(1, total_pages);

		Self {
			owner_id,
			current_page,
			total_pages,
			page_size,
			expires_at: now + Duration::seconds(SESSION_LIFETIME_SECS),
			expired: false,
		}
	}

	#[inline]
	pub fn current_page(&self) -> u32 {
		self.current_page
	}

	#[inline]
	pub fn total_pages(&self) -> u32 {
		self.total_pages
	}

	#[inline]
	pub fn page_size(&self) -> u32 {
		self.page_size
	}

	/// Offset of the current page's first entry.
	#[inline]
	pub fn offset(&self) -> i64 {
		(self.current_page as i64 - 1) * self.page_size as i64
	}

	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expired || now >= self.expires_at
	}

	/// Force the session into its terminal state, e.g. after a page
	/// fetch failed and the view can no longer be trusted.
	pub fn expire(&mut self) {
		self.expired = true;
	}

	/// Attempts to move one page in the given direction.
	///
	/// Expiry takes precedence over ownership: once the window has
	/// elapsed, even the owner gets [PageTurn::Expired] back.
	pub fn turn_page(
		&mut self,
		requester_id: u64,
		direction: PageDirection,
		now: DateTime<Utc>,
	) -> PageTurn {
		if self.is_expired(now) {
			self.expired = true;
			return PageTurn::Expired;
		}

		if requester_id != self.owner_id {
			return PageTurn::Unauthorized;
		}

		let target = match direction {
			PageDirection::Previous => self.current_page.saturating_sub(1).max(1),
			PageDirection::Next => (self.current_page + 1).min(self.total_pages),
		};

		if target == self.current_page {
			PageTurn::Unchanged(target)
		} else {
			self.current_page = target;
			PageTurn::Turned(target)
		}
	}
}

// }}}
