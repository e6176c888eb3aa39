use poise::serenity_prelude as serenity;
use ryouku::config::Config;
use ryouku::history::store::start_eviction_task;
use ryouku::llm::LlmClient;
use ryouku::speech::ElevenLabsClient;
use ryouku::voice::cleanup::start_cleanup_task;
use ryouku::{commands, mention, Data, Error};
use songbird::serenity::SerenityInit;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Missing configuration is fatal
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);
    let discord_token = config.discord_token.clone();

    let completion = Arc::new(LlmClient::new(&config));
    let speech = Arc::new(ElevenLabsClient::new(&config)?);

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot is ready as {}!", ready.user.name);

                if config.register_commands {
                    let commands = &framework.options().commands;
                    let registered = match config.guild_id {
                        Some(guild_id) => {
                            poise::builtins::register_in_guild(
                                ctx,
                                commands,
                                serenity::GuildId::new(guild_id),
                            )
                            .await
                        }
                        None => poise::builtins::register_globally(ctx, commands).await,
                    };
                    match registered {
                        Ok(()) => info!("Successfully registered {} commands", commands.len()),
                        Err(e) => error!("Error registering commands: {}", e),
                    }
                }

                ctx.set_activity(Some(serenity::ActivityData::custom(
                    config.status_message.clone(),
                )));

                let data = Data::new(config, completion, speech, ready.user.id.get());

                let sweep_every = data
                    .config
                    .history_idle_ttl
                    .clamp(Duration::from_secs(1), Duration::from_secs(600));
                tokio::spawn(start_eviction_task(data.chat.store().clone(), sweep_every));
                tokio::spawn(start_cleanup_task(
                    data.config.audio_dir.clone(),
                    data.config.audio_max_age_secs,
                ));

                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}

async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::Message { new_message } = event {
        if mention::is_chat_mention(new_message, data.bot_id) {
            if let Err(e) = mention::handle_mention(ctx, new_message, data).await {
                error!(
                    "Error handling mention in channel {}: {}",
                    new_message.channel_id, e
                );
            }
        }
    }
    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Error in command `{}`: {}", ctx.command().name, error);
            if let Err(e) = ctx
                .say("Something went wrong while handling that command.")
                .await
            {
                error!("Failed to report command error: {}", e);
            }
        }
        other => {
            if let Err(e) = poise::builtins::on_error(other).await {
                error!("Error while handling error: {}", e);
            }
        }
    }
}
