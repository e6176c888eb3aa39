use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory holding synthesized audio waiting to be played.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `audio` under a fresh name so concurrent requests never share
    /// a file.
    pub async fn write(&self, audio: &[u8]) -> anyhow::Result<AudioArtifact> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!("{}.mp3", Uuid::new_v4()));
        tokio::fs::write(&path, audio).await?;
        debug!("Wrote {} bytes of audio to {:?}", audio.len(), path);
        Ok(AudioArtifact { path })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    path: PathBuf,
}

impl AudioArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file. Already-removed artifacts are not an error.
    pub async fn remove(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed audio artifact {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove audio artifact {:?}: {}", self.path, e),
        }
    }
}
