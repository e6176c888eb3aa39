//! Synthesizes a phrase into an audio artifact to check speech credentials.

use ryouku::config::Config;
use ryouku::speech::ElevenLabsClient;
use ryouku::voice::{self, ArtifactStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_TEXT: &str = "Hello world, this is a text-to-speech test";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_TEXT.to_string());

    let speech = ElevenLabsClient::new(&config)?;
    let artifacts = ArtifactStore::new(config.audio_dir.clone());

    match voice::prepare_audio(&speech, &artifacts, &text).await {
        Ok(artifact) => {
            info!("Audio generated successfully for text: {}", text);
            println!("{}", artifact.path().display());
            Ok(())
        }
        Err(e) => {
            error!("Error generating audio for text: {}", text);
            Err(e)
        }
    }
}
