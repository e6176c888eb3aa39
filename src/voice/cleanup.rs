use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Sweeps audio artifacts that outlived their playback, e.g. after a crash
/// or a dropped voice connection.
pub async fn start_cleanup_task(audio_dir: PathBuf, max_age_secs: u64) {
    info!("Starting audio artifact cleanup task for directory: {:?}", audio_dir);
    let mut ticker = interval(Duration::from_secs(300));

    loop {
        ticker.tick().await;
        let dir = audio_dir.clone();
        let swept = tokio::task::spawn_blocking(move || {
            cleanup_stale_artifacts(&dir, max_age_secs, SystemTime::now())
        })
        .await;

        match swept {
            Ok(Ok(removed)) if removed > 0 => info!("Removed {} stale audio artifacts", removed),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!("Audio cleanup error: {}", e),
            Err(e) => warn!("Audio cleanup task failed: {}", e),
        }
    }
}

fn cleanup_stale_artifacts(dir: &Path, max_age_secs: u64, now: SystemTime) -> anyhow::Result<usize> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        return Ok(0);
    }

    let Some(threshold) = now.checked_sub(Duration::from_secs(max_age_secs)) else {
        return Ok(0);
    };
    let mut removed = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("mp3") {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        if let Ok(modified) = metadata.modified() {
            if modified < threshold {
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to delete old artifact {:?}: {}", path, e);
                } else {
                    debug!("Cleaned up stale audio artifact: {:?}", path);
                    removed += 1;
                }
            }
        }
    }
    Ok(removed)
}
