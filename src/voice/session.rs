use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId, UserId};
use songbird::input::File as AudioFile;
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::artifact::AudioArtifact;
use super::events::{ConnectionLogger, PlaybackCleanup};
use super::VoiceError;

pub async fn voice_manager(ctx: &serenity::Context) -> Result<Arc<Songbird>, VoiceError> {
    songbird::get(ctx).await.ok_or(VoiceError::ClientMissing)
}

/// The voice channel `user_id` currently sits in, per the gateway cache.
pub fn voice_channel_of(
    cache: &serenity::Cache,
    guild_id: GuildId,
    user_id: UserId,
) -> Option<ChannelId> {
    let guild = cache.guild(guild_id)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

/// Opens the guild's voice connection, moving it if one already exists.
/// Resolves once the driver is connected.
pub async fn connect(
    manager: &Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Result<Arc<Mutex<Call>>, VoiceError> {
    let call = manager.join(guild_id, channel_id).await?;

    {
        let mut handler = call.lock().await;
        handler.remove_all_global_events();
        for event in [
            CoreEvent::DriverConnect,
            CoreEvent::DriverReconnect,
            CoreEvent::DriverDisconnect,
        ] {
            handler.add_global_event(Event::Core(event), ConnectionLogger { guild_id });
        }
    }

    info!("Joined voice channel {} in guild {}", channel_id, guild_id);
    Ok(call)
}

/// Plays one artifact as a new track on the guild's call. The artifact is
/// deleted when the track ends or fails.
pub async fn play(
    manager: &Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
    artifact: AudioArtifact,
) -> Result<(), VoiceError> {
    let call = connect(manager, guild_id, channel_id).await?;
    let mut handler = call.lock().await;

    let input = AudioFile::new(artifact.path().to_path_buf());
    let track = handler.play_input(input.into());

    for event in [TrackEvent::End, TrackEvent::Error] {
        let cleanup = PlaybackCleanup {
            guild_id,
            artifact: artifact.clone(),
        };
        if let Err(e) = track.add_event(Event::Track(event), cleanup) {
            warn!("Failed to attach playback handler in guild {}: {}", guild_id, e);
        }
    }

    info!("Playing {:?} in guild {}", artifact.path(), guild_id);
    Ok(())
}

/// Tears down the guild's voice connection. Returns false when there was
/// none.
pub async fn disconnect(manager: &Songbird, guild_id: GuildId) -> Result<bool, VoiceError> {
    if manager.get(guild_id).is_none() {
        return Ok(false);
    }
    manager.remove(guild_id).await?;
    info!("Left voice channel in guild {}", guild_id);
    Ok(true)
}
