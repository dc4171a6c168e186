use crate::types::WifiCredentials;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApplyStatus {
    Applied,
    Unchanged,
    InvalidTransition,
}

/// Side effect the service must run after an event; the machine itself does no I/O.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ManagerAction {
    None,
    LoadCandidate { index: u8 },
    Connect(WifiCredentials),
    Promote(WifiCredentials),
}
