use crate::commands::require_guild;
use crate::context::{Error, PoiseContext, TaggedError};

use super::discord::MessageContext;

// {{{ Implementation
async fn afk_impl<C: MessageContext>(ctx: &mut C, message: Option<String>) -> Result<(), TaggedError> {
	let guild_id = require_guild(ctx)?;

	let status = ctx
		.data()
		.afk
		.set(guild_id, ctx.author_id(), message.as_deref());

	let reply = match &status.message {
		Some(note) => format!("😴 I've marked you as AFK: {note}"),
		None => "😴 I've marked you as AFK.".to_owned(),
	};

	ctx.reply(&reply).await?;
	Ok(())
}
// }}}
// {{{ Discord wrapper
/// Mark yourself as AFK; I'll let people know when they mention you.
#[poise::command(slash_command, guild_only, user_cooldown = 1)]
pub async fn afk(
	mut ctx: PoiseContext<'_>,
	#[description = "Why you're away (optional)"] message: Option<String>,
) -> Result<(), Error> {
	let res = afk_impl(&mut ctx, message).await;
	ctx.handle_error(res).await?;
	Ok(())
}
// }}}
// {{{ Tests
#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::testing::get_mock_context;

	#[tokio::test]
	async fn stores_the_status_and_confirms() -> Result<(), Error> {
		let (mut ctx, _guard) = get_mock_context()?;

		let res = afk_impl(&mut ctx, Some("lunch break".to_owned())).await;
		ctx.handle_error(res).await?;

		assert_eq!(
			ctx.reply_contents(),
			vec!["😴 I've marked you as AFK: lunch break"]
		);
		assert_eq!(
			ctx.data.afk.get(1, 666).unwrap().message.as_deref(),
			Some("lunch break")
		);
		Ok(())
	}

	#[tokio::test]
	async fn works_without_a_note() -> Result<(), Error> {
		let (mut ctx, _guard) = get_mock_context()?;

		let res = afk_impl(&mut ctx, None).await;
		ctx.handle_error(res).await?;

		assert_eq!(ctx.reply_contents(), vec!["😴 I've marked you as AFK."]);
		assert!(ctx.data.afk.get(1, 666).unwrap().message.is_none());
		Ok(())
	}
}
// }}}
