// {{{ Imports
use poise::serenity_prelude::CreateEmbed;
use poise::CreateReply;

use crate::commands::require_guild;
use crate::context::{Error, PoiseContext, TaggedError};
use crate::leaderboard::Standing;
use crate::leveling::{level_progress, LevelProgress, BASE_LEVEL_XP, LEVEL_XP_GROWTH};

use super::discord::MessageContext;
// }}}

// {{{ Field rendering
/// The (name, value, inline) embed fields for a member's XP view.
pub fn xp_fields(standing: Option<&Standing>, progress: &LevelProgress) -> Vec<(String, String, bool)> {
	let percent = (progress.progress * 100.0).round() as u64;
	let xp_remaining = progress.xp_for_next_level - progress.points_into_level;

	vec![
		("Level".to_owned(), format!("{}", progress.level), true),
		("Total XP".to_owned(), format!("{}", progress.total_xp), true),
		(
			"Rank".to_owned(),
			match standing {
				Some(standing) => format!("#{}", standing.rank),
				None => "Unranked".to_owned(),
			},
			true,
		),
		(
			"Progress".to_owned(),
			format!(
				"{}/{} XP ({percent}%)",
				progress.points_into_level, progress.xp_for_next_level
			),
			false,
		),
		(
			"XP to level up".to_owned(),
			format!("{xp_remaining} XP remaining"),
			false,
		),
	]
}
// }}}
// {{{ Implementation
async fn xp_impl<C: MessageContext>(
	ctx: &mut C,
	target_id: u64,
	target_name: &str,
) -> Result<(), TaggedError> {
	let guild_id = require_guild(ctx)?;

	let standing = ctx
		.data()
		.ranks
		.standing(guild_id, target_id)
		.map_err(|e| e.into_user_error())?;

	let total_xp = standing.as_ref().map(|s| s.score as f64).unwrap_or(0.0);
	let progress = level_progress(total_xp);

	let mut embed = CreateEmbed::default()
		.title(format!("{target_name}'s XP"))
		.footer(poise::serenity_prelude::CreateEmbedFooter::new(format!(
			"XP required grows by {LEVEL_XP_GROWTH} each level (base {BASE_LEVEL_XP})."
		)));

	for (name, value, inline) in xp_fields(standing.as_ref(), &progress) {
		embed = embed.field(name, value, inline);
	}

	if standing.is_none() {
		embed = embed.description(format!(
			"<@{target_id}> has not earned any XP on this server yet. Start chatting to gain levels!"
		));
	}

	ctx.send(CreateReply::default().reply(true).embed(embed))
		.await?;

	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Check the XP and level progress for yourself or another member.
#[poise::command(slash_command, guild_only, user_cooldown = 1)]
pub async fn xp(
	mut ctx: PoiseContext<'_>,
	#[description = "Member to inspect (defaults to yourself)"] user: Option<
		poise::serenity_prelude::User,
	>,
) -> Result<(), Error> {
	ctx.defer().await?;

	let (target_id, target_name) = match &user {
		Some(user) => (user.id.get(), user.display_name().to_owned()),
		None => (ctx.author().id.get(), ctx.author().display_name().to_owned()),
	};

	let res = xp_impl(&mut ctx, target_id, &target_name).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
