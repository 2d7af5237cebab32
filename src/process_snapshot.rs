use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use sysinfo::System;
use tokio::task;

/// A point-in-time view of running processes, used by the `SecurityAuditor`
/// to approximate "does a live process hold this path open". There is no
/// portable open-file-handle table in the standard library or in `sysinfo`,
/// so this inspects process names and command-line arguments instead, the
/// same approximation desktop cleanup tools on macOS commonly fall back to.
#[derive(Clone, Default)]
pub struct ProcessSnapshot {
    process_names: Arc<HashSet<String>>,
    command_paths: Arc<HashSet<String>>,
}

impl ProcessSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_process_named(&self, name: &str) -> bool {
        self.process_names.contains(&name.to_lowercase())
    }

    pub fn command_contains_path(&self, path: &str) -> bool {
        if self.command_paths.is_empty() {
            return false;
        }
        let needle = path.to_lowercase();
        self.command_paths.iter().any(|cmd| cmd.contains(&needle))
    }

    pub async fn capture() -> Self {
        match task::spawn_blocking(capture_snapshot).await {
            Ok(snapshot) => snapshot,
            Err(join_err) => {
                debug!("failed to capture process snapshot: {join_err}");
                Self::empty()
            }
        }
    }
}

fn capture_snapshot() -> ProcessSnapshot {
    let mut system = System::new();
    system.refresh_processes();

    let mut names = HashSet::new();
    let mut command_paths = HashSet::new();

    for process in system.processes().values() {
        names.insert(process.name().to_lowercase());
        for arg in process.cmd() {
            if arg.contains('/') {
                command_paths.insert(arg.to_lowercase());
            }
        }
    }

    ProcessSnapshot {
        process_names: Arc::new(names),
        command_paths: Arc::new(command_paths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_never_matches() {
        let snapshot = ProcessSnapshot::empty();
        assert!(!snapshot.has_process_named("anything"));
        assert!(!snapshot.command_contains_path("/tmp/anything"));
    }
}
