//! The XP curve: an arithmetic progression of per-level costs,
//! together with the inverse mapping from an XP total to a level.

/// XP required to go from level 1 to level 2.
pub const BASE_LEVEL_XP: u64 = 100;

/// Each level costs this much more XP than the previous one.
pub const LEVEL_XP_GROWTH: u64 = 25;

/// Returns the XP required to advance from the provided level to the next.
#[inline]
pub fn xp_to_level_up(level: u32) -> u64 {
	if level < 1 {
		return BASE_LEVEL_XP;
	}

	BASE_LEVEL_XP + LEVEL_XP_GROWTH * (level as u64 - 1)
}

// {{{ Level progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelProgress {
	pub level: u32,

	/// XP accumulated since the last level-up.
	pub points_into_level: u64,

	/// Cost of the next level-up, in full.
	pub xp_for_next_level: u64,

	/// `points_into_level / xp_for_next_level`, clamped to `[0, 1]`.
	pub progress: f64,

	pub total_xp: u64,
}

/// Computes level and progress details for a given experience total.
///
/// Total over the reals: negative and non-finite inputs behave like `0`.
/// Terminates because the per-level cost strictly increases.
pub fn level_progress(score: f64) -> LevelProgress {
	let total_xp = if score.is_finite() && score > 0.0 {
		score.floor() as u64
	} else {
		0
	};

	let mut remaining_xp = total_xp;
	let mut level: u32 = 1;
	let mut next_threshold = xp_to_level_up(level);

	while remaining_xp >= next_threshold {
		remaining_xp -= next_threshold;
		level += 1;
		next_threshold = xp_to_level_up(level);
	}

	LevelProgress {
		level,
		points_into_level: remaining_xp,
		xp_for_next_level: next_threshold,
		progress: (remaining_xp as f64 / next_threshold as f64).min(1.0),
		total_xp,
	}
}

/// Convenience wrapper that returns only the level.
#[inline]
pub fn level_of(score: f64) -> u32 {
	level_progress(score).level
}
// }}}
// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_score_is_level_one() {
		let progress = level_progress(0.0);
		assert_eq!(progress.level, 1);
		assert_eq!(progress.points_into_level, 0);
		assert_eq!(progress.xp_for_next_level, 100);
		assert_eq!(progress.progress, 0.0);
		assert_eq!(progress.total_xp, 0);
	}

	#[test]
	fn exact_threshold_rolls_over() {
		let progress = level_progress(100.0);
		assert_eq!(progress.level, 2);
		assert_eq!(progress.points_into_level, 0);
		assert_eq!(progress.xp_for_next_level, 125);
		assert_eq!(progress.progress, 0.0);
		assert_eq!(progress.total_xp, 100);
	}

	#[test]
	fn just_below_threshold_stays_put() {
		let progress = level_progress(99.0);
		assert_eq!(progress.level, 1);
		assert_eq!(progress.points_into_level, 99);
		assert_eq!(progress.xp_for_next_level, 100);
		assert_eq!(progress.progress, 0.99);
		assert_eq!(progress.total_xp, 99);
	}

	#[test]
	fn degenerate_inputs_behave_like_zero() {
		let zero = level_progress(0.0);
		for score in [-1.0, -1000.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
			assert_eq!(level_progress(score), zero, "score {score}");
		}
	}

	#[test]
	fn fractional_scores_floor() {
		assert_eq!(level_progress(99.9), level_progress(99.0));
	}

	#[test]
	fn levels_are_monotonic() {
		let mut previous = 0;
		for score in 0..100_000u64 {
			let level = level_of(score as f64);
			assert!(level >= 1);
			assert!(
				level >= previous,
				"level dropped from {previous} to {level} at score {score}"
			);
			previous = level;
		}
	}

	#[test]
	fn curve_is_arithmetic() {
		assert_eq!(xp_to_level_up(1), 100);
		assert_eq!(xp_to_level_up(2), 125);
		assert_eq!(xp_to_level_up(3), 150);
		assert_eq!(xp_to_level_up(0), BASE_LEVEL_XP);
	}
}
// }}}
