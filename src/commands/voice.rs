use crate::reply::{CommandReply, ReplyTarget};
use crate::voice::{self, session, VoiceError};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

pub const NOT_IN_VOICE: &str = "You need to be in a voice channel to use this command.";
pub const SPEAK_FAILED: &str = "An error occurred while generating or playing the audio.";
pub const GUILD_ONLY: &str = "This command can only be used in a server";

/// Convert text to speech and play it in voice channel
#[poise::command(slash_command, guild_only, required_bot_permissions = "CONNECT | SPEAK")]
pub async fn say(
    ctx: Context<'_>,
    #[description = "The text to convert to speech"] text: String,
) -> Result<(), Error> {
    let reply = CommandReply::new(ctx);
    let Some(guild_id) = ctx.guild_id() else {
        reply.reply_once(NOT_IN_VOICE).await?;
        return Ok(());
    };
    let Some(channel_id) = session::voice_channel_of(ctx.cache(), guild_id, ctx.author().id)
    else {
        reply.reply_once(NOT_IN_VOICE).await?;
        return Ok(());
    };

    ctx.defer().await?;

    let manager = session::voice_manager(ctx.serenity_context()).await?;
    let data = ctx.data();
    match voice::speak(
        &manager,
        guild_id,
        channel_id,
        data.speech.as_ref(),
        &data.artifacts,
        &text,
    )
    .await
    {
        Ok(()) => {
            info!("{} asked to say {} characters", ctx.author().name, text.len());
            reply.reply_once("Speaking...").await?;
        }
        Err(e) => {
            error!("Failed to speak in guild {}: {:?}", guild_id, e);
            reply.reply_once(SPEAK_FAILED).await?;
        }
    }

    Ok(())
}

/// Connect to a voice channel
#[poise::command(slash_command, guild_only, required_bot_permissions = "CONNECT | SPEAK")]
pub async fn connect(ctx: Context<'_>) -> Result<(), Error> {
    let reply = CommandReply::new(ctx);
    let Some(guild_id) = ctx.guild_id() else {
        reply.reply_once(NOT_IN_VOICE).await?;
        return Ok(());
    };
    let Some(channel_id) = session::voice_channel_of(ctx.cache(), guild_id, ctx.author().id)
    else {
        reply.reply_once(NOT_IN_VOICE).await?;
        return Ok(());
    };

    ctx.defer().await?;

    let manager = session::voice_manager(ctx.serenity_context()).await?;
    let joined = session::connect(&manager, guild_id, channel_id)
        .await
        .map(|_| ());
    report_connect(&reply, guild_id, channel_id, joined).await
}

/// Disconnect from a voice channel
#[poise::command(slash_command)]
pub async fn dc(ctx: Context<'_>) -> Result<(), Error> {
    let reply = CommandReply::new(ctx);
    let Some(guild_id) = ctx.guild_id() else {
        reply.reply_once(GUILD_ONLY).await?;
        return Ok(());
    };

    let manager = session::voice_manager(ctx.serenity_context()).await?;
    let left = session::disconnect(&manager, guild_id).await;
    report_disconnect(&reply, guild_id, left).await
}

async fn report_connect(
    reply: &dyn ReplyTarget,
    guild_id: serenity::GuildId,
    channel_id: serenity::ChannelId,
    joined: Result<(), VoiceError>,
) -> Result<(), Error> {
    match joined {
        Ok(()) => reply.reply_once(&format!("Connected to <#{}>", channel_id)).await,
        Err(e) => {
            error!("Failed to join voice channel in guild {}: {}", guild_id, e);
            reply.reply_once("Failed to connect to the voice channel.").await
        }
    }
}

async fn report_disconnect(
    reply: &dyn ReplyTarget,
    guild_id: serenity::GuildId,
    left: Result<bool, VoiceError>,
) -> Result<(), Error> {
    match left {
        Ok(true) => reply.reply_once("Disconnected from the voice channel").await,
        Ok(false) => reply.reply_once("Not connected to a voice channel").await,
        Err(e) => {
            error!("Failed to leave voice channel in guild {}: {}", guild_id, e);
            reply.reply_once("Failed to disconnect from the voice channel.").await
        }
    }
}
