use poise::serenity_prelude::{self as serenity};
use std::env::var;
use tallykeeper::commands;
use tallykeeper::context::{BotContext, Error};
use tallykeeper::events::event_handler;

// {{{ Error handler
async fn on_error(error: poise::FrameworkError<'_, BotContext, Error>) {
	if let Err(e) = poise::builtins::on_error(error).await {
		println!("Error while handling error: {}", e)
	}
}
// }}}

#[tokio::main]
async fn main() {
	// {{{ Poise options
	let options = poise::FrameworkOptions {
		commands: vec![
			commands::help(),
			commands::afk::afk(),
			commands::invites::invites(),
			commands::leaderboard::leaderboard(),
			commands::xp::xp(),
		],
		event_handler: |ctx, event, framework, data| {
			Box::pin(event_handler(ctx, event, framework, data))
		},
		on_error: |error| Box::pin(on_error(error)),
		..Default::default()
	};
	// }}}
	// {{{ Start poise
	let framework = poise::Framework::builder()
		.setup(move |ctx, _ready, framework| {
			Box::pin(async move {
				poise::builtins::register_globally(ctx, &framework.options().commands).await?;
				BotContext::new()
			})
		})
		.options(options)
		.build();

	let token =
		var("TALLYKEEPER_DISCORD_TOKEN").expect("Missing `TALLYKEEPER_DISCORD_TOKEN` env var");
	let intents = serenity::GatewayIntents::non_privileged()
		| serenity::GatewayIntents::MESSAGE_CONTENT
		| serenity::GatewayIntents::GUILD_MEMBERS;

	let client = serenity::ClientBuilder::new(token, intents)
		.framework(framework)
		.await;

	client.unwrap().start().await.unwrap()
	// }}}
}
