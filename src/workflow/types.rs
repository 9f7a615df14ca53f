use dashmap::DashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

// ────────────────────────────────────────────────────────────────
// StagingGuard - Prevents two items from sharing one staging path
// ────────────────────────────────────────────────────────────────

static IN_PROGRESS: LazyLock<DashSet<PathBuf>> = LazyLock::new(DashSet::new);

#[derive(Debug)]
pub struct StagingGuard(PathBuf);

impl Drop for StagingGuard {
    fn drop(&mut self) {
        IN_PROGRESS.remove(&self.0);
    }
}

pub fn try_acquire(path: impl Into<PathBuf>) -> Option<StagingGuard> {
    let path = path.into();
    if IN_PROGRESS.insert(path.clone()) {
        Some(StagingGuard(path))
    } else {
        None
    }
}
