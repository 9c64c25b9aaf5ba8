use std::sync::Arc;

use parking_lot::Mutex;

/// Counters of platform calls and currently open handles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub store_handles_opened: usize,
    pub store_handles_open: usize,
    pub credential_handles_acquired: usize,
    pub credential_handles_open: usize,
    pub password_logons: usize,
    pub ticket_acceptances: usize,
    pub certificate_logons: usize,
    pub chain_builds: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StatsRecorder(Arc<Mutex<PlatformStats>>);

impl StatsRecorder {
    pub(crate) fn update(&self, apply: impl FnOnce(&mut PlatformStats)) {
        apply(&mut self.0.lock());
    }

    pub(crate) fn snapshot(&self) -> PlatformStats {
        *self.0.lock()
    }
}
