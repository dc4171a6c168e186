use core::fmt;

/// Failure taxonomy shared by the store, the driver contract and the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManagerError {
    /// Empty or missing SSID, oversized field.
    ArgumentInvalid,
    /// Operation issued before the driver is running or in an unsupported mode.
    StateInvalid,
    NotFound,
    /// Persisted blob length is not a whole number of records.
    StorageCorrupt,
    StorageUnavailable,
    DriverUnavailable,
    NoMemory,
}

impl ManagerError {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ArgumentInvalid => "argument_invalid",
            Self::StateInvalid => "state_invalid",
            Self::NotFound => "not_found",
            Self::StorageCorrupt => "storage_corrupt",
            Self::StorageUnavailable => "storage_unavailable",
            Self::DriverUnavailable => "driver_unavailable",
            Self::NoMemory => "no_memory",
        }
    }

    /// Collaborator faults that a sweep step retries on the next tick.
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable | Self::DriverUnavailable | Self::NoMemory
        )
    }
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<alloc::collections::TryReserveError> for ManagerError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::NoMemory
    }
}
