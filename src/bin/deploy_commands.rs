//! Registers the slash commands over REST without connecting to the gateway.

use poise::serenity_prelude as serenity;
use ryouku::commands;
use ryouku::config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let http = serenity::Http::new(&config.discord_token);
    http.set_application_id(serenity::ApplicationId::new(config.client_id));

    let commands = commands::all();
    info!("Started refreshing {} application (/) commands.", commands.len());

    match config.guild_id {
        Some(guild_id) => {
            poise::builtins::register_in_guild(&http, &commands, serenity::GuildId::new(guild_id))
                .await?;
            info!("Successfully reloaded guild {} commands.", guild_id);
        }
        None => {
            poise::builtins::register_globally(&http, &commands).await?;
            info!("Successfully reloaded global commands.");
        }
    }

    Ok(())
}
