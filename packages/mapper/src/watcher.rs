//! Background polling for store updates.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::MTIME_GRACE_SECS;
use crate::error::Result;
use crate::service::Service;

/// Spawns the polling thread.
pub struct UpdateWatcher;

/// Handle to a running watcher.
#[derive(Debug)]
pub struct WatcherHandle {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl UpdateWatcher {
    /// Poll the service's store every `interval` and refresh on change.
    ///
    /// Refresh errors are logged; polling continues.
    pub fn spawn(service: Arc<Service>, interval: Duration) -> Result<WatcherHandle> {
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("update-watcher".to_string())
            .spawn(move || {
                tracing::info!(interval = ?interval, "update watcher started");
                let mut last_checked = service.snapshot().loaded_at().unwrap_or_else(Utc::now);

                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let checked_at = Utc::now();
                    match service.refresh_modified(last_checked) {
                        Ok(true) => tracing::info!("collection updated"),
                        Ok(false) => tracing::debug!("no updates"),
                        Err(err) => {
                            tracing::warn!(error = %err, "Failed to check for updates");
                            continue;
                        }
                    }
                    last_checked = next_check_time(checked_at);
                }

                tracing::info!("update watcher stopped");
            })?;

        Ok(WatcherHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Lower mtime bound for the poll after one started at `checked_at`.
fn next_check_time(checked_at: DateTime<Utc>) -> DateTime<Utc> {
    checked_at - TimeDelta::seconds(MTIME_GRACE_SECS)
}

impl WatcherHandle {
    /// Signal the watcher and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("update watcher panicked");
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
