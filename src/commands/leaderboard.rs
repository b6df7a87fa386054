// {{{ Imports
use chrono::Utc;
use poise::serenity_prelude as serenity;
use poise::CreateReply;

use crate::context::{Error, PoiseContext};
use crate::leaderboard::{PageEntry, Standing};
use crate::leveling::{level_of, level_progress};
use crate::session::{PageDirection, PageTurn, PaginationSession, SESSION_LIFETIME_SECS};
// }}}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 25;

const UNAVAILABLE_MESSAGE: &str =
	"The leaderboard is not available right now. Check the bot's database configuration and try again later.";

// {{{ Rendering
/// Renders one leaderboard page as message text.
pub fn render_leaderboard(
	entries: &[PageEntry],
	session: &PaginationSession,
	standing: Option<&Standing>,
	total_members: u64,
	viewer_id: u64,
) -> String {
	let start_rank = session.offset() as u64;

	let mut lines = vec!["## Server Leaderboard".to_owned(), String::new()];

	match standing {
		Some(standing) => {
			let progress = level_progress(standing.score as f64);
			lines.push(format!(
				"Your rank: #{} • Level {} ({}/{} XP this level) • {} XP total",
				standing.rank,
				progress.level,
				progress.points_into_level,
				progress.xp_for_next_level,
				standing.score,
			));
		}
		None => lines.push(
			"You have not placed on the leaderboard yet. Keep chatting to earn points!".to_owned(),
		),
	}

	lines.push(String::new());

	for (index, entry) in entries.iter().enumerate() {
		let rank = start_rank + index as u64 + 1;
		let level = level_of(entry.score as f64);
		let line = format!(
			"{rank}. <@{}> • Level {level} • {} XP",
			entry.user_id, entry.score
		);

		if entry.user_id == viewer_id {
			lines.push(format!("**{line}**"));
		} else {
			lines.push(line);
		}
	}

	lines.push(String::new());
	lines.push(format!(
		"Page {}/{} • Tracking {} member{}",
		session.current_page(),
		session.total_pages(),
		total_members,
		if total_members == 1 { "" } else { "s" },
	));

	lines.join("\n")
}

/// The ephemeral notice shown to the presser for a rejected page turn.
fn rejection_notice(turn: PageTurn) -> Option<&'static str> {
	match turn {
		PageTurn::Unauthorized => Some("Only the person who ran this command can change pages."),
		PageTurn::Expired => {
			Some("These controls have expired. Run the command again for a fresh view.")
		}
		PageTurn::Turned(_) | PageTurn::Unchanged(_) => None,
	}
}

fn nav_row(
	prev_id: &str,
	next_id: &str,
	session: &PaginationSession,
	disable_all: bool,
) -> serenity::CreateActionRow {
	serenity::CreateActionRow::Buttons(vec![
		serenity::CreateButton::new(prev_id)
			.label("◀")
			.style(serenity::ButtonStyle::Secondary)
			.disabled(disable_all || session.current_page() <= 1),
		serenity::CreateButton::new(next_id)
			.label("▶")
			.style(serenity::ButtonStyle::Secondary)
			.disabled(disable_all || session.current_page() >= session.total_pages()),
	])
}
// }}}
// {{{ Discord command
/// Show the message leaderboard for this server.
#[poise::command(slash_command, guild_only, user_cooldown = 3)]
pub async fn leaderboard(
	ctx: PoiseContext<'_>,
	#[description = "How many members to show per page (default 10, max 25)"]
	#[min = 1]
	#[max = 25]
	limit: Option<u32>,
) -> Result<(), Error> {
	ctx.defer().await?;

	let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
		return Ok(());
	};

	let viewer_id = ctx.author().id.get();
	let page_size = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
	let ranks = &ctx.data().ranks;

	// {{{ Initial render
	let Ok(total_members) = ranks.count_entries(guild_id) else {
		ctx.say(UNAVAILABLE_MESSAGE).await?;
		return Ok(());
	};

	if total_members == 0 {
		ctx.say("No leaderboard data yet. Start chatting to climb the ranks!")
			.await?;
		return Ok(());
	}

	// A standing fetch failure only degrades the view (no personal
	// line), it doesn't make the whole leaderboard unavailable.
	let standing = ranks.standing(guild_id, viewer_id).ok().flatten();

	let mut session = PaginationSession::new(
		viewer_id,
		standing.as_ref().map(|s| s.rank),
		total_members,
		page_size,
		Utc::now(),
	);

	let Ok(mut entries) = ranks.page(guild_id, session.page_size() as i64, session.offset())
	else {
		ctx.say(UNAVAILABLE_MESSAGE).await?;
		return Ok(());
	};

	let ctx_id = ctx.id();
	let prev_id = format!("{ctx_id}_prev");
	let next_id = format!("{ctx_id}_next");

	let single_page = session.total_pages() <= 1;
	let mut reply = CreateReply::default().content(render_leaderboard(
		&entries,
		&session,
		standing.as_ref(),
		total_members,
		viewer_id,
	));

	if !single_page {
		reply = reply.components(vec![nav_row(&prev_id, &next_id, &session, false)]);
	}

	let handle = ctx.send(reply).await?;

	if single_page {
		return Ok(());
	}
	// }}}
	// {{{ Page turning
	// Polling the collector serializes page turns: a second press isn't
	// looked at before the previous one's fetch and update finished.
	while let Some(press) = serenity::collector::ComponentInteractionCollector::new(ctx)
		.filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
		.timeout(std::time::Duration::from_secs(SESSION_LIFETIME_SECS as u64))
		.await
	{
		let direction = if press.data.custom_id == prev_id {
			PageDirection::Previous
		} else if press.data.custom_id == next_id {
			PageDirection::Next
		} else {
			continue;
		};

		match session.turn_page(press.user.id.get(), direction, Utc::now()) {
			PageTurn::Turned(_) => {
				let Ok(page) = ranks.page(guild_id, session.page_size() as i64, session.offset())
				else {
					session.expire();
					press
						.create_response(
							ctx.serenity_context(),
							serenity::CreateInteractionResponse::UpdateMessage(
								serenity::CreateInteractionResponseMessage::new()
									.content(UNAVAILABLE_MESSAGE)
									.components(vec![nav_row(&prev_id, &next_id, &session, true)]),
							),
						)
						.await?;
					return Ok(());
				};

				entries = page;
				press
					.create_response(
						ctx.serenity_context(),
						serenity::CreateInteractionResponse::UpdateMessage(
							serenity::CreateInteractionResponseMessage::new()
								.content(render_leaderboard(
									&entries,
									&session,
									standing.as_ref(),
									total_members,
									viewer_id,
								))
								.components(vec![nav_row(&prev_id, &next_id, &session, false)]),
						),
					)
					.await?;
			}
			PageTurn::Unchanged(_) => {
				press
					.create_response(
						ctx.serenity_context(),
						serenity::CreateInteractionResponse::Acknowledge,
					)
					.await?;
			}
			turn @ (PageTurn::Unauthorized | PageTurn::Expired) => {
				if let Some(notice) = rejection_notice(turn) {
					press
						.create_response(
							ctx.serenity_context(),
							serenity::CreateInteractionResponse::Message(
								serenity::CreateInteractionResponseMessage::new()
									.content(notice)
									.ephemeral(true),
							),
						)
						.await?;
				}

				if turn == PageTurn::Expired {
					break;
				}
			}
		}
	}
	// }}}
	// {{{ Disable controls
	handle
		.edit(
			ctx,
			CreateReply::default()
				.content(render_leaderboard(
					&entries,
					&session,
					standing.as_ref(),
					total_members,
					viewer_id,
				))
				.components(vec![nav_row(&prev_id, &next_id, &session, true)]),
		)
		.await?;
	// }}}

	Ok(())
}
// }}}
// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;
	use chrono::DateTime;

	fn now() -> chrono::DateTime<Utc> {
		DateTime::from_timestamp(1_000_000, 0).unwrap()
	}

	#[test]
	fn renders_ranks_relative_to_the_page() {
		let entries = vec![
			PageEntry {
				user_id: 30,
				score: 30,
			},
			PageEntry {
				user_id: 40,
				score: 20,
			},
		];

		let mut session = PaginationSession::new(40, None, 4, 2, now());
		session.turn_page(40, PageDirection::Next, now());

		let standing = Standing {
			user_id: 40,
			score: 20,
			rank: 4,
		};
		let rendered = render_leaderboard(&entries, &session, Some(&standing), 4, 40);

		assert!(rendered.contains("3. <@30> • Level 1 • 30 XP"));
		assert!(rendered.contains("**4. <@40> • Level 1 • 20 XP**"));
		assert!(rendered.contains("Your rank: #4 • Level 1 (20/100 XP this level) • 20 XP total"));
		assert!(rendered.contains("Page 2/2 • Tracking 4 members"));
	}

	#[test]
	fn renders_the_unranked_viewer_line() {
		let session = PaginationSession::new(1, None, 1, 10, now());
		let rendered = render_leaderboard(
			&[PageEntry {
				user_id: 2,
				score: 5,
			}],
			&session,
			None,
			1,
			1,
		);

		assert!(rendered.contains("You have not placed on the leaderboard yet."));
		assert!(rendered.contains("Tracking 1 member\n") || rendered.ends_with("Tracking 1 member"));
	}

	#[test]
	fn rejected_turns_notify_the_presser() {
		assert!(rejection_notice(PageTurn::Unauthorized)
			.unwrap()
			.contains("person who ran this command"));
		assert!(rejection_notice(PageTurn::Expired)
			.unwrap()
			.contains("expired"));
		assert_eq!(rejection_notice(PageTurn::Turned(2)), None);
		assert_eq!(rejection_notice(PageTurn::Unchanged(1)), None);
	}
}
// }}}
