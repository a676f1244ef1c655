//! Polling-based pusher settings watcher.
//!
//! Checks the settings file's mtime every poll interval. When a change is
//! detected, debounces for 500ms (the settings form rewrites the whole file),
//! then re-reads it and sends the result via an mpsc channel.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;

use super::PusherSettings;

/// Events emitted by the settings watcher.
#[derive(Debug)]
pub enum SettingsEvent {
    /// Settings file was re-read successfully.
    Reloaded(PusherSettings),
    /// Re-read failed; the previous geometry stays active.
    Error(String),
}

/// Debounce delay after detecting a change.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Run the settings watcher loop.
///
/// Polls `path` for mtime changes and emits a [`SettingsEvent`] per change.
/// Returns when the channel is closed or the task is cancelled.
pub async fn run_settings_watcher(
    path: PathBuf,
    poll_interval: Duration,
    tx: mpsc::Sender<SettingsEvent>,
) {
    tracing::info!(path = %path.display(), "Settings watcher started");

    let mut last_mtime = get_mtime(&path);

    loop {
        tokio::time::sleep(poll_interval).await;

        let Some(current) = get_mtime(&path) else {
            // Only warn once per disappearance
            if last_mtime.is_some() {
                tracing::warn!(
                    path = %path.display(),
                    "Settings file not accessible, keeping current geometry"
                );
                last_mtime = None;
            }
            continue;
        };

        let changed = last_mtime.map_or(true, |prev| current != prev);
        if !changed {
            continue;
        }

        // Debounce: wait, then re-check mtime to ensure write is complete
        tokio::time::sleep(DEBOUNCE_DELAY).await;
        if get_mtime(&path) != Some(current) {
            continue;
        }

        last_mtime = Some(current);

        let event = match PusherSettings::load_from_file(&path) {
            Ok(settings) => SettingsEvent::Reloaded(settings),
            Err(e) => {
                tracing::error!(error = %e, "Settings reload failed, keeping previous geometry");
                SettingsEvent::Error(e.to_string())
            }
        };

        if tx.send(event).await.is_err() {
            tracing::debug!("Settings watcher channel closed, stopping");
            return;
        }
    }
}

/// Read the modification time of a file, returning None on any error.
fn get_mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_rewritten_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{}").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_settings_watcher(
            path.clone(),
            Duration::from_millis(20),
            tx,
        ));

        // Make sure the new mtime differs on coarse-grained filesystems.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        std::fs::write(&path, r#"{"Pusher 2": {"label": "MF", "distance": 300}}"#).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher should report within timeout")
            .expect("channel open");
        match event {
            SettingsEvent::Reloaded(s) => assert_eq!(s.distances_cm[1], Some(300.0)),
            SettingsEvent::Error(e) => panic!("unexpected error: {e}"),
        }
        handle.abort();
    }
}
