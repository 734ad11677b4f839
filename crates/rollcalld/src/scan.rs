//! Legacy scan launcher.
//!
//! Each launch runs the configured subprocess in a background task and
//! records its outcome in a keyed registry. Callers poll `/scan-status`
//! and clear entries when done; entries in a terminal state are also
//! pruned by age so an inattentive caller cannot grow the map forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    Running,
    Completed,
    Failed(String),
}

impl ScanStatus {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

struct ScanEntry {
    status: ScanStatus,
    started_at: Instant,
}

pub struct ScanRegistry {
    command: Option<String>,
    ttl: Duration,
    entries: Mutex<HashMap<Uuid, ScanEntry>>,
}

impl ScanRegistry {
    pub fn new(command: Option<String>, ttl: Duration) -> Self {
        Self {
            command,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<Uuid, ScanEntry>> {
        // A poisoned map is still a valid map.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Launch a background scan and return its id. Expired terminal
    /// entries are pruned first.
    pub fn launch(self: &Arc<Self>) -> Uuid {
        self.prune();

        let id = Uuid::new_v4();
        self.entries().insert(
            id,
            ScanEntry {
                status: ScanStatus::Running,
                started_at: Instant::now(),
            },
        );

        let Some(command) = self.command.clone() else {
            self.set_status(id, ScanStatus::Failed("scan command not configured".into()));
            return id;
        };

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(scan_id = %id, command, "scan started");
            let status = match tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&command)
                .status()
                .await
            {
                Ok(exit) if exit.success() => ScanStatus::Completed,
                Ok(exit) => ScanStatus::Failed(format!("scan exited with {exit}")),
                Err(e) => ScanStatus::Failed(e.to_string()),
            };
            tracing::info!(scan_id = %id, status = ?status, "scan finished");
            registry.set_status(id, status);
        });

        id
    }

    /// Status of a scan. Unknown ids report `Running` — the polling
    /// contract predates the registry and callers rely on it.
    pub fn status(&self, id: Uuid) -> ScanStatus {
        self.entries()
            .get(&id)
            .map(|e| e.status.clone())
            .unwrap_or(ScanStatus::Running)
    }

    /// Caller-driven removal after a successful poll.
    pub fn clear(&self, id: Uuid) {
        self.entries().remove(&id);
    }

    fn set_status(&self, id: Uuid, status: ScanStatus) {
        if let Some(entry) = self.entries().get_mut(&id) {
            entry.status = status;
        }
    }

    fn prune(&self) {
        let ttl = self.ttl;
        self.entries()
            .retain(|_, e| !e.status.is_terminal() || e.started_at.elapsed() < ttl);
    }
}
