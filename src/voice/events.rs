use serenity::async_trait;
use serenity::model::id::GuildId;
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler};
use tracing::{error, info, warn};

use super::artifact::AudioArtifact;

/// Logs the voice connection's ready and disconnect transitions.
pub struct ConnectionLogger {
    pub guild_id: GuildId,
}

#[async_trait]
impl VoiceEventHandler for ConnectionLogger {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(data) => {
                info!(
                    "The bot has connected to channel {:?} in guild {}",
                    data.channel_id, self.guild_id
                );
            }
            EventContext::DriverReconnect(data) => {
                info!(
                    "The bot has reconnected to channel {:?} in guild {}",
                    data.channel_id, self.guild_id
                );
            }
            EventContext::DriverDisconnect(data) => {
                info!(
                    "The bot has disconnected from the channel in guild {} ({:?}, {:?})",
                    self.guild_id, data.kind, data.reason
                );
            }
            _ => {}
        }
        None
    }
}

/// Deletes a track's audio artifact once it ends or errors. Errors are
/// logged here and never reach the command that started playback.
pub struct PlaybackCleanup {
    pub guild_id: GuildId,
    pub artifact: AudioArtifact,
}

#[async_trait]
impl VoiceEventHandler for PlaybackCleanup {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _handle) in tracks.iter() {
                if let songbird::tracks::PlayMode::Errored(e) = &state.playing {
                    error!(
                        "Playback error in guild {} for {:?}: {:?}",
                        self.guild_id,
                        self.artifact.path(),
                        e
                    );
                }
            }
            self.artifact.remove().await;
        } else {
            warn!("Unexpected voice event for guild {}", self.guild_id);
        }
        None
    }
}
