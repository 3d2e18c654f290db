//! Progress display for attachment downloads.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use anexos::services::DownloadEvent;

/// Drive a summary bar from download events until the sender is dropped.
pub fn spawn_download_progress(
    expected: u64,
    mut events: mpsc::Receiver<DownloadEvent>,
) -> JoinHandle<()> {
    let bar = ProgressBar::new(expected);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    bar.set_message("Waiting for discovery");

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DownloadEvent::Started { identity, .. } => {
                    bar.set_message(format!("Downloading {}", identity));
                    bar.enable_steady_tick(std::time::Duration::from_millis(100));
                }
                DownloadEvent::Completed {
                    identity, bytes, ..
                } => {
                    bar.inc(1);
                    bar.println(format!("  {} saved ({} bytes)", identity, bytes));
                }
                DownloadEvent::Failed {
                    identity, error, ..
                } => {
                    bar.inc(1);
                    bar.println(format!("  {} failed: {}", identity, error));
                }
            }
        }
        bar.finish_and_clear();
    })
}
