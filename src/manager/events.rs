use crate::driver::DriverEvent;
use crate::types::{WifiCredentials, WIFI_SSID_MAX};

/// Who started the in-flight attempt. Only sweep failures advance the sweep index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOrigin {
    Sweep,
    Direct,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ManagerEvent {
    Tick {
        now_ms: u64,
    },
    /// Result of the candidate lookup requested by a tick.
    SweepStep {
        now_ms: u64,
        count: usize,
        candidate: Option<WifiCredentials>,
    },
    ConnectAccepted {
        credentials: WifiCredentials,
        origin: AttemptOrigin,
        now_ms: u64,
    },
    ConnectRejected {
        origin: AttemptOrigin,
    },
    Driver(DriverEvent),
    /// `GotIp` with the zero padded SSID field of the network the driver reports
    /// as joined, when it reports one.
    AddressAcquired {
        joined: Option<[u8; WIFI_SSID_MAX]>,
    },
    ResetRetry,
}

impl ManagerEvent {
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::SweepStep { .. } => "sweep_step",
            Self::ConnectAccepted { .. } => "connect_accepted",
            Self::ConnectRejected { .. } => "connect_rejected",
            Self::Driver(event) => event.as_str(),
            Self::AddressAcquired { .. } => "got_ip",
            Self::ResetRetry => "reset_retry",
        }
    }
}
