pub mod artifact;
pub mod cleanup;
pub mod events;
pub mod session;

pub use artifact::{ArtifactStore, AudioArtifact};

use poise::serenity_prelude as serenity;
use serenity::model::id::{ChannelId, GuildId};
use songbird::Songbird;
use thiserror::Error;

use crate::speech::SpeechClient;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice client not initialized")]
    ClientMissing,
    #[error("failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),
}

/// Synthesizes `text` into a fresh artifact.
pub async fn prepare_audio(
    speech: &dyn SpeechClient,
    artifacts: &ArtifactStore,
    text: &str,
) -> anyhow::Result<AudioArtifact> {
    let audio = speech.synthesize(text).await?;
    artifacts.write(&audio).await
}

/// Synthesizes `text` and plays it in `channel_id`.
pub async fn speak(
    manager: &Songbird,
    guild_id: GuildId,
    channel_id: ChannelId,
    speech: &dyn SpeechClient,
    artifacts: &ArtifactStore,
    text: &str,
) -> anyhow::Result<()> {
    let artifact = prepare_audio(speech, artifacts, text).await?;
    if let Err(e) = session::play(manager, guild_id, channel_id, artifact.clone()).await {
        artifact.remove().await;
        return Err(e.into());
    }
    Ok(())
}
