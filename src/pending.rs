use crate::command::PendingCommand;
use crate::error::{CdpError, CdpResult};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct TableState {
    entries: HashMap<u64, PendingCommand>,
    closed: bool,
}

/// In-flight commands keyed by id. The `closed` flag lives under the same lock
/// as the entries, so nothing can be inserted after the table was drained.
#[derive(Debug, Default)]
pub(crate) struct PendingCommands {
    state: Mutex<TableState>,
}

impl PendingCommands {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CdpResult<MutexGuard<'_, TableState>> {
        self.state.lock().map_err(|_| {
            CdpError::InternalError(
                "Mutex poisoned: another thread panicked while holding the lock".into(),
            )
        })
    }

    pub(crate) fn insert(&self, id: u64, command: PendingCommand) -> CdpResult<()> {
        let mut state = self.lock()?;
        if state.closed {
            return Err(CdpError::disconnected("socket is closed"));
        }
        if state.entries.contains_key(&id) {
            return Err(CdpError::InternalError(format!(
                "command id {} is already in flight",
                id
            )));
        }
        state.entries.insert(id, command);
        Ok(())
    }

    pub(crate) fn take(&self, id: u64) -> CdpResult<Option<PendingCommand>> {
        Ok(self.lock()?.entries.remove(&id))
    }

    /// Marks the table closed and hands back everything still waiting.
    /// Recovers from poisoning: callers must never be left hanging.
    pub(crate) fn drain(&self) -> Vec<PendingCommand> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        let drained: Vec<PendingCommand> = state.entries.drain().map(|(_, cmd)| cmd).collect();
        debug!("Drained {} pending commands", drained.len());
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.entries.len())
            .unwrap_or_default()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.closed)
            .unwrap_or(true)
    }
}
