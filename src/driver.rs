use alloc::vec::Vec;
use core::future::Future;

use crate::error::ManagerError;
use crate::types::{LinkInfo, ScanRecord, WifiCredentials};

/// Outcome notifications from the radio. Adapters must deliver these through the
/// manager mailbox, never by calling into the manager from the radio context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverEvent {
    /// Link layer associated; no address yet.
    AssociateOk,
    /// The in-flight attempt failed.
    AssociateFailed,
    /// Link dropped while no attempt was in flight.
    LinkDown,
    GotIp,
}

impl DriverEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssociateOk => "associate_ok",
            Self::AssociateFailed => "associate_failed",
            Self::LinkDown => "link_down",
            Self::GotIp => "got_ip",
        }
    }
}

/// Station-side radio contract consumed by the manager.
pub trait NetworkDriver {
    /// Submits an association request and returns without waiting for the handshake.
    ///
    /// `Ok(())` means the request was accepted and an event will follow.
    /// `Err(ManagerError::DriverUnavailable)` means the radio could not take any
    /// request right now. Any other error rejects this credential.
    fn connect(&mut self, credentials: &WifiCredentials) -> Result<(), ManagerError>;

    fn scan(&mut self) -> impl Future<Output = Result<Vec<ScanRecord>, ManagerError>>;

    /// Only meaningful while associated.
    fn link_info(&self) -> Option<LinkInfo>;
}
