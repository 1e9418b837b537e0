use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use spdlog::{debug, error, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::Result;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// Unsaved changes, a save is scheduled.
    Pending,
    Saving,
    Saved,
    Failed,
}

impl SaveStatus {
    /// Text of the save indicator, empty when there is nothing to show.
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Idle => "",
            SaveStatus::Pending => "Unsaved changes",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved automatically",
            SaveStatus::Failed => "Error saving",
        }
    }
}

enum Command {
    Dirty,
    Cancel,
}

/// Saves the work after `interval` without changes.
///
/// Every [`mark_dirty`](AutoSaver::mark_dirty) restarts the wait. Saves never
/// overlap, a change made during a save schedules the next one.
pub struct AutoSaver {
    _task: JoinHandle<()>,
    sender: mpsc::Sender<Command>,
    dirty: Arc<AtomicBool>,
    status: watch::Receiver<SaveStatus>,
}

impl AutoSaver {
    pub fn start<F, Fut>(interval: Duration, save: F) -> AutoSaver
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Command>(16);
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let dirty = Arc::new(AtomicBool::new(false));
        let task_dirty = dirty.clone();

        let task = tokio::spawn(async move {
            debug!("Auto-save every {}s of inactivity", interval.as_secs());
            let mut armed = false;
            loop {
                let command = if armed {
                    match tokio::time::timeout(interval, rx.recv()).await {
                        Ok(command) => command,
                        Err(_elapsed) => {
                            armed = false;
                            if task_dirty.swap(false, Ordering::SeqCst) {
                                let _ = status_tx.send(SaveStatus::Saving);
                                match save().await {
                                    Ok(_) => {
                                        info!("Saved automatically");
                                        let _ = status_tx.send(SaveStatus::Saved);
                                    }
                                    Err(e) => {
                                        error!("Auto-save error: {}", e);
                                        task_dirty.store(true, Ordering::SeqCst);
                                        let _ = status_tx.send(SaveStatus::Failed);
                                    }
                                }
                            }
                            continue;
                        }
                    }
                } else {
                    rx.recv().await
                };

                match command {
                    Some(Command::Dirty) => {
                        armed = true;
                        let _ = status_tx.send(SaveStatus::Pending);
                    }
                    Some(Command::Cancel) => {
                        armed = false;
                        let _ = status_tx.send(SaveStatus::Idle);
                    }
                    None => break,
                }
            }
        });

        AutoSaver {
            _task: task,
            sender: tx,
            dirty,
            status: status_rx,
        }
    }

    /// Records a change and restarts the wait.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
        // A full queue already holds a restart
        let _ = self.sender.try_send(Command::Dirty);
    }

    /// Drops the scheduled save, the changes are considered handled.
    pub fn cancel(&self) {
        self.dirty.store(false, Ordering::SeqCst);
        let _ = self.sender.try_send(Command::Cancel);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Receives every status change, for a save indicator.
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }
}
