use poise::CreateReply;

use crate::context::{BotContext, Error, ErrorKind, TaggedError};

// {{{ Trait
/// The slice of Discord a command implementation needs, abstracted so
/// tests can run commands against [mock::MockContext].
pub trait MessageContext {
	/// Get the user data held by the message
	fn data(&self) -> &BotContext;
	fn author_id(&self) -> u64;
	fn guild_id(&self) -> Option<u64>;

	/// Reply to the current message
	async fn reply(&mut self, text: &str) -> Result<(), Error>;

	/// Deliver a full reply (embeds, components, ...)
	async fn send(&mut self, reply: CreateReply) -> Result<(), Error>;

	/// Reports user-facing errors as replies and lets internal ones
	/// bubble up to the framework's error handler.
	async fn handle_error(&mut self, res: Result<(), TaggedError>) -> Result<(), Error> {
		match res {
			Ok(()) => Ok(()),
			Err(error) => match error.kind {
				ErrorKind::User => {
					self.reply(&format!("{}", error.error)).await?;
					Ok(())
				}
				ErrorKind::Internal => Err(error.error),
			},
		}
	}
}
// }}}
// {{{ Poise implementation
impl MessageContext for poise::Context<'_, BotContext, Error> {
	fn data(&self) -> &BotContext {
		Self::data(*self)
	}

	fn author_id(&self) -> u64 {
		self.author().id.get()
	}

	fn guild_id(&self) -> Option<u64> {
		Self::guild_id(*self).map(|id| id.get())
	}

	async fn reply(&mut self, text: &str) -> Result<(), Error> {
		Self::reply(*self, text).await?;
		Ok(())
	}

	async fn send(&mut self, reply: CreateReply) -> Result<(), Error> {
		Self::send(*self, reply).await?;
		Ok(())
	}
}
// }}}
// {{{ Testing context
pub mod mock {
	use super::*;

	pub struct MockContext {
		pub user_id: u64,
		pub guild_id: Option<u64>,
		pub data: BotContext,
		pub messages: Vec<CreateReply>,
	}

	impl MockContext {
		pub fn new(data: BotContext) -> Self {
			Self {
				data,
				user_id: 666,
				guild_id: Some(1),
				messages: vec![],
			}
		}

		/// The plain-text contents of every reply sent so far.
		pub fn reply_contents(&self) -> Vec<&str> {
			self.messages
				.iter()
				.filter_map(|reply| reply.content.as_deref())
				.collect()
		}
	}

	impl MessageContext for MockContext {
		fn data(&self) -> &BotContext {
			&self.data
		}

		fn author_id(&self) -> u64 {
			self.user_id
		}

		fn guild_id(&self) -> Option<u64> {
			self.guild_id
		}

		async fn reply(&mut self, text: &str) -> Result<(), Error> {
			self.messages.push(CreateReply::default().content(text));
			Ok(())
		}

		async fn send(&mut self, reply: CreateReply) -> Result<(), Error> {
			self.messages.push(reply);
			Ok(())
		}
	}
}
// }}}
