// {{{ Imports
use chrono::{Duration, Utc};
use poise::serenity_prelude as serenity;
use poise::CreateReply;

use crate::context::{Error, PoiseContext};
use crate::invites::InviterTotal;
use crate::session::SESSION_LIFETIME_SECS;
// }}}

const TOP_INVITERS_SHOWN: i64 = 10;

// {{{ Rendering
/// Renders the invite statistics view as message text.
pub fn render_invites(
	target_id: u64,
	target_name: &str,
	viewer_id: u64,
	total_invites: u64,
	top_inviters: &[InviterTotal],
) -> String {
	let possessive = if target_id == viewer_id {
		"Your".to_owned()
	} else {
		format!("{target_name}'s")
	};

	let mut lines = vec![
		"## Invite Statistics".to_owned(),
		String::new(),
		format!("**{possessive} invites:** {total_invites}"),
	];

	if let Some(rank) = top_inviters
		.iter()
		.position(|entry| entry.inviter_id == target_id)
	{
		lines.push(format!("**Rank:** #{}", rank + 1));
	}

	lines.push(String::new());

	if top_inviters.is_empty() {
		lines.push("No invites tracked yet.".to_owned());
	} else {
		lines.push("**Top inviters**".to_owned());
		for (index, entry) in top_inviters.iter().enumerate() {
			let plural = if entry.total_invites == 1 { "" } else { "s" };
			let line = format!(
				"{}. <@{}> • {} invite{plural}",
				index + 1,
				entry.inviter_id,
				entry.total_invites,
			);

			if entry.inviter_id == target_id {
				lines.push(format!("**{line}**"));
			} else {
				lines.push(line);
			}
		}
	}

	lines.join("\n")
}
// }}}
// {{{ Discord command
/// View invite statistics for yourself or another member.
#[poise::command(slash_command, guild_only, user_cooldown = 3)]
pub async fn invites(
	ctx: PoiseContext<'_>,
	#[description = "The member to check invites for (defaults to you)"] user: Option<
		serenity::User,
	>,
) -> Result<(), Error> {
	ctx.defer().await?;

	let Some(guild_id) = ctx.guild_id().map(|id| id.get()) else {
		return Ok(());
	};

	let viewer_id = ctx.author().id.get();
	let (target_id, target_name) = match &user {
		Some(user) => (user.id.get(), user.display_name().to_owned()),
		None => (viewer_id, ctx.author().display_name().to_owned()),
	};

	let store = &ctx.data().invites;
	let fetch = || -> Result<(u64, Vec<InviterTotal>), crate::context::PersistenceUnavailable> {
		Ok((
			store.invite_count(guild_id, target_id)?,
			store.top_inviters(guild_id, TOP_INVITERS_SHOWN)?,
		))
	};

	let Ok((total, top)) = fetch() else {
		ctx.say("Invite statistics are not available right now. Check the bot's database configuration and try again later.")
			.await?;
		return Ok(());
	};

	let ctx_id = ctx.id();
	let refresh_id = format!("{ctx_id}_refresh");
	let refresh_row = |disabled: bool| {
		serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new(&refresh_id)
			.label("Refresh")
			.style(serenity::ButtonStyle::Primary)
			.disabled(disabled)])
	};

	let handle = ctx
		.send(
			CreateReply::default()
				.content(render_invites(target_id, &target_name, viewer_id, total, &top))
				.components(vec![refresh_row(false)]),
		)
		.await?;

	// {{{ Refresh loop, bounded by the same window as pagination
	let expires_at = Utc::now() + Duration::seconds(SESSION_LIFETIME_SECS);

	while let Some(press) = serenity::collector::ComponentInteractionCollector::new(ctx)
		.filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
		.timeout(std::time::Duration::from_secs(SESSION_LIFETIME_SECS as u64))
		.await
	{
		if Utc::now() >= expires_at {
			press
				.create_response(
					ctx.serenity_context(),
					serenity::CreateInteractionResponse::Acknowledge,
				)
				.await?;
			break;
		}

		if press.user.id.get() != viewer_id {
			press
				.create_response(
					ctx.serenity_context(),
					serenity::CreateInteractionResponse::Message(
						serenity::CreateInteractionResponseMessage::new()
							.content("Only the person who ran this command can refresh it.")
							.ephemeral(true),
					),
				)
				.await?;
			continue;
		}

		let Ok((total, top)) = fetch() else {
			press
				.create_response(
					ctx.serenity_context(),
					serenity::CreateInteractionResponse::UpdateMessage(
						serenity::CreateInteractionResponseMessage::new()
							.content("Invite statistics are not available right now.")
							.components(vec![refresh_row(true)]),
					),
				)
				.await?;
			return Ok(());
		};

		press
			.create_response(
				ctx.serenity_context(),
				serenity::CreateInteractionResponse::UpdateMessage(
					serenity::CreateInteractionResponseMessage::new()
						.content(render_invites(target_id, &target_name, viewer_id, total, &top))
						.components(vec![refresh_row(false)]),
				),
			)
			.await?;
	}
	// }}}

	handle
		.edit(ctx, CreateReply::default().components(vec![refresh_row(true)]))
		.await?;

	Ok(())
}
// }}}
// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;

	fn top() -> Vec<InviterTotal> {
		vec![
			InviterTotal {
				inviter_id: 10,
				total_invites: 5,
			},
			InviterTotal {
				inviter_id: 20,
				total_invites: 1,
			},
		]
	}

	#[test]
	fn renders_own_stats_with_rank() {
		let rendered = render_invites(10, "mew", 10, 5, &top());
		assert!(rendered.contains("**Your invites:** 5"));
		assert!(rendered.contains("**Rank:** #1"));
		assert!(rendered.contains("**1. <@10> • 5 invites**"));
		assert!(rendered.contains("2. <@20> • 1 invite\n") || rendered.ends_with("1 invite"));
	}

	#[test]
	fn renders_another_members_stats() {
		let rendered = render_invites(20, "purr", 10, 1, &top());
		assert!(rendered.contains("**purr's invites:** 1"));
		assert!(rendered.contains("**Rank:** #2"));
	}

	#[test]
	fn renders_the_empty_state() {
		let rendered = render_invites(10, "mew", 10, 0, &[]);
		assert!(rendered.contains("**Your invites:** 0"));
		assert!(rendered.contains("No invites tracked yet."));
		assert!(!rendered.contains("**Rank:**"));
	}
}
// }}}
