use anyhow::anyhow;

use crate::context::{Error, ErrorKind, PoiseContext, TagError, TaggedError};

use discord::MessageContext;

pub mod afk;
pub mod discord;
pub mod invites;
pub mod leaderboard;
pub mod xp;

/// Commands below are all marked `guild_only`, but implementations are
/// also exercised through the mock context, which has no such guard.
pub(crate) fn require_guild<C: MessageContext>(ctx: &C) -> Result<u64, TaggedError> {
	ctx.guild_id()
		.ok_or_else(|| anyhow!("This command can only be used inside a server.").tag(ErrorKind::User))
}

// {{{ Help
/// Show this help menu
#[poise::command(prefix_command, track_edits, slash_command)]
pub async fn help(
	ctx: PoiseContext<'_>,
	#[description = "Specific command to show help about"]
	#[autocomplete = "poise::builtins::autocomplete_command"]
	command: Option<String>,
) -> Result<(), Error> {
	poise::builtins::help(
		ctx,
		command.as_deref(),
		poise::builtins::HelpConfiguration {
			extra_text_at_bottom: "Chat to earn XP. One message, one point.",
			show_subcommands: true,
			..Default::default()
		},
	)
	.await?;
	Ok(())
}
// }}}
