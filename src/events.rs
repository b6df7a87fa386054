//! Gateway event listeners: AFK bookkeeping, XP accrual with level-up
//! announcements, and invite attribution.
//!
//! Nothing in here is allowed to take the bot down: failures are logged
//! and the event is dropped.

// {{{ Imports
use std::collections::HashSet;

use poise::serenity_prelude as serenity;

use crate::context::{BotContext, Error};
use crate::invites::{InviteSnapshot, InviteUse};
use crate::leveling::level_of;
// }}}

// {{{ Event handler
pub async fn event_handler(
	ctx: &serenity::Context,
	event: &serenity::FullEvent,
	_framework: poise::FrameworkContext<'_, BotContext, Error>,
	data: &BotContext,
) -> Result<(), Error> {
	match event {
		serenity::FullEvent::Ready { data_about_bot } => {
			println!("✅ Logged in as {}", data_about_bot.user.name);

			for guild in &data_about_bot.guilds {
				prime_invite_cache(ctx, data, guild.id).await;
			}
		}
		serenity::FullEvent::GuildCreate { guild, .. } => {
			prime_invite_cache(ctx, data, guild.id).await;
		}
		serenity::FullEvent::InviteCreate { data: invite } => {
			if let Some(guild_id) = invite.guild_id {
				prime_invite_cache(ctx, data, guild_id).await;
			}
		}
		serenity::FullEvent::InviteDelete { data: invite } => {
			if let Some(guild_id) = invite.guild_id {
				prime_invite_cache(ctx, data, guild_id).await;
			}
		}
		serenity::FullEvent::GuildMemberAddition { new_member } => {
			handle_member_join(ctx, data, new_member).await;
		}
		serenity::FullEvent::Message { new_message } => {
			handle_message(ctx, data, new_message).await;
		}
		_ => {}
	}

	Ok(())
}
// }}}
// {{{ Invite attribution
async fn fetch_invite_snapshot(
	ctx: &serenity::Context,
	guild_id: serenity::GuildId,
) -> Option<InviteSnapshot> {
	// Requires the Manage Guild permission; guilds where we lack it
	// simply don't get invite tracking.
	let invites = guild_id.invites(&ctx.http).await.ok()?;

	Some(
		invites
			.into_iter()
			.map(|invite| {
				(
					invite.code,
					InviteUse {
						uses: invite.uses,
						inviter_id: invite.inviter.map(|user| user.id.get()),
					},
				)
			})
			.collect(),
	)
}

async fn prime_invite_cache(
	ctx: &serenity::Context,
	data: &BotContext,
	guild_id: serenity::GuildId,
) {
	if let Some(snapshot) = fetch_invite_snapshot(ctx, guild_id).await {
		data.invite_uses.prime(guild_id.get(), snapshot);
	}
}

async fn handle_member_join(ctx: &serenity::Context, data: &BotContext, member: &serenity::Member) {
	if member.user.bot {
		return;
	}

	let guild_id = member.guild_id;
	let Some(current) = fetch_invite_snapshot(ctx, guild_id).await else {
		return;
	};

	let Some(inviter_id) = data.invite_uses.attribute_join(guild_id.get(), current) else {
		return;
	};

	// Already logged (debounced) by the store
	let _ = data
		.invites
		.record_join(guild_id.get(), inviter_id, member.user.id.get());
}
// }}}
// {{{ Messages
async fn handle_message(ctx: &serenity::Context, data: &BotContext, message: &serenity::Message) {
	let Some(guild_id) = message.guild_id.map(|id| id.get()) else {
		return;
	};

	if message.author.bot {
		return;
	}

	let author_id = message.author.id.get();

	// {{{ AFK returns and mentions
	if data.afk.clear(guild_id, author_id).is_some() {
		if let Err(error) = message
			.reply(&ctx.http, "Welcome back! I removed your AFK status.")
			.await
		{
			eprintln!("Failed to notify {author_id} about clearing their AFK status: {error}");
		}
	}

	let mut afk_lines = Vec::new();
	let mut notified = HashSet::new();

	for user in &message.mentions {
		if user.bot || !notified.insert(user.id) {
			continue;
		}

		if let Some(status) = data.afk.get(guild_id, user.id.get()) {
			let reason = match &status.message {
				Some(note) => format!(": {note}"),
				None => String::new(),
			};

			afk_lines.push(format!(
				"🔕 <@{}> is AFK{reason} (set <t:{}:R>).",
				user.id,
				status.since.timestamp(),
			));
		}
	}

	if !afk_lines.is_empty() {
		let notice = serenity::CreateMessage::new()
			.content(afk_lines.join("\n"))
			.reference_message(message)
			// Informational only: don't ping the AFK members
			.allowed_mentions(serenity::CreateAllowedMentions::new());

		if let Err(error) = message.channel_id.send_message(&ctx.http, notice).await {
			eprintln!("Failed to notify about AFK mentions: {error}");
		}
	}
	// }}}
	// {{{ XP accrual
	// A store failure means this message simply earns nothing; the
	// failure itself is logged (once) by the engine.
	let Ok(recorded) = data.ranks.record_activity(guild_id, author_id, 1) else {
		return;
	};

	let previous_level = level_of(recorded.previous_score as f64);
	let current_level = level_of(recorded.current_score as f64);

	if current_level > previous_level {
		let levels_gained = current_level - previous_level;
		let level_line = if levels_gained > 1 {
			format!("reached level {current_level} (+{levels_gained} levels!)")
		} else {
			format!("reached level {current_level}!")
		};

		let announcement = serenity::CreateMessage::new()
			.content(format!("🎉 <@{author_id}> {level_line}"))
			.allowed_mentions(serenity::CreateAllowedMentions::new().users([message.author.id]));

		if let Err(error) = message
			.channel_id
			.send_message(&ctx.http, announcement)
			.await
		{
			eprintln!("Failed to announce level up for {author_id}: {error}");
		}
	}
	// }}}
}
// }}}
