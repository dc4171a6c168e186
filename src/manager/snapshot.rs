use core::sync::atomic::{AtomicU32, Ordering};

use crate::types::ConnectionState;

/// Copy of the mutable sweep state. `failed_at_ms == 0` means no failed round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManagerSnapshot {
    pub state: ConnectionState,
    pub connecting: bool,
    pub try_index: u8,
    pub failed_at_ms: u64,
}

impl Default for ManagerSnapshot {
    fn default() -> Self {
        Self::default_const()
    }
}

impl ManagerSnapshot {
    pub const fn default_const() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connecting: false,
            try_index: 0,
            failed_at_ms: 0,
        }
    }

    const STATE_SHIFT: u32 = 0;
    const CONNECTING_SHIFT: u32 = 2;
    const TRY_INDEX_SHIFT: u32 = 8;

    /// Packs everything except `failed_at_ms`, which readers never need.
    pub(crate) const fn packed(self) -> u32 {
        ((self.state.as_u8() as u32) << Self::STATE_SHIFT)
            | ((self.connecting as u32) << Self::CONNECTING_SHIFT)
            | ((self.try_index as u32) << Self::TRY_INDEX_SHIFT)
    }

    pub(crate) fn from_packed(raw: u32) -> Self {
        let state = ConnectionState::from_u8(((raw >> Self::STATE_SHIFT) & 0b11) as u8)
            .unwrap_or(ConnectionState::Disconnected);
        Self {
            state,
            connecting: (raw >> Self::CONNECTING_SHIFT) & 0b1 == 1,
            try_index: ((raw >> Self::TRY_INDEX_SHIFT) & 0xFF) as u8,
            failed_at_ms: 0,
        }
    }
}

static MANAGER_SNAPSHOT: AtomicU32 = AtomicU32::new(ManagerSnapshot::default_const().packed());

pub(crate) fn publish_manager_snapshot(snapshot: ManagerSnapshot) {
    MANAGER_SNAPSHOT.store(snapshot.packed(), Ordering::Relaxed);
}

pub fn read_manager_snapshot() -> ManagerSnapshot {
    ManagerSnapshot::from_packed(MANAGER_SNAPSHOT.load(Ordering::Relaxed))
}

/// Lock-free read for callers outside the manager task.
pub fn read_connection_state() -> ConnectionState {
    read_manager_snapshot().state
}
