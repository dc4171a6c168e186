use alloc::vec::Vec;

use super::{ManagerMailbox, ManagerReply, ManagerRequest};
use crate::driver::DriverEvent;
use crate::error::ManagerError;
use crate::manager::read_connection_state;
use crate::types::{
    ssid_from_bytes, ConnectionState, ConnectionStatus, ScanRecord, Ssid, WifiCredentials,
};

/// Cloneable client side of a [`ManagerMailbox`]. Requests are serialized by the
/// mailbox lock, so at most one reply is ever outstanding.
#[derive(Clone, Copy)]
pub struct ManagerHandle<'a> {
    mailbox: &'a ManagerMailbox,
}

impl<'a> ManagerHandle<'a> {
    pub(super) fn new(mailbox: &'a ManagerMailbox) -> Self {
        Self { mailbox }
    }

    pub fn tick(&self, now_ms: u64) {
        self.mailbox.post_tick(now_ms);
    }

    pub async fn driver_event(&self, event: DriverEvent) {
        self.mailbox.send_driver_event(event).await;
    }

    pub fn try_driver_event(&self, event: DriverEvent) -> bool {
        self.mailbox.try_send_driver_event(event)
    }

    /// Last published state; does not wait for the manager task.
    pub fn connection_state(&self) -> ConnectionState {
        read_connection_state()
    }

    pub async fn get_status(&self) -> ConnectionStatus {
        match self.request(ManagerRequest::GetStatus).await {
            ManagerReply::Status(status) => status,
            _ => ConnectionStatus::Disconnected,
        }
    }

    pub async fn get_saved(&self) -> Result<Vec<Ssid>, ManagerError> {
        match self.request(ManagerRequest::GetSaved).await {
            ManagerReply::Saved(saved) => saved,
            other => Err(unexpected(&other)),
        }
    }

    pub async fn connect_saved(&self, ssid: &str) -> Result<(), ManagerError> {
        let ssid = bounded_ssid(ssid)?;
        self.done(ManagerRequest::ConnectSaved(ssid)).await
    }

    pub async fn delete_saved(&self, ssid: &str) -> Result<(), ManagerError> {
        let ssid = bounded_ssid(ssid)?;
        self.done(ManagerRequest::DeleteSaved(ssid)).await
    }

    pub async fn reset_retry(&self) {
        let _ = self.done(ManagerRequest::ResetRetry).await;
    }

    pub async fn configure(&self, ssid: &str, password: &str) -> Result<(), ManagerError> {
        let credentials = WifiCredentials::new(ssid, password)?;
        self.configure_credentials(credentials).await
    }

    pub async fn configure_credentials(
        &self,
        credentials: WifiCredentials,
    ) -> Result<(), ManagerError> {
        self.done(ManagerRequest::Configure(credentials)).await
    }

    pub async fn scan(&self) -> Result<Vec<ScanRecord>, ManagerError> {
        match self.request(ManagerRequest::Scan).await {
            ManagerReply::Scan(networks) => networks,
            other => Err(unexpected(&other)),
        }
    }

    async fn done(&self, request: ManagerRequest) -> Result<(), ManagerError> {
        match self.request(request).await {
            ManagerReply::Done(result) => result,
            other => Err(unexpected(&other)),
        }
    }

    async fn request(&self, request: ManagerRequest) -> ManagerReply {
        let _lock = self.mailbox.request_lock.lock().await;
        // A cancelled caller may have left its reply behind.
        self.mailbox.drain_replies();
        self.mailbox.requests.send(request).await;
        self.mailbox.replies.receive().await
    }
}

fn bounded_ssid(ssid: &str) -> Result<Ssid, ManagerError> {
    if ssid.is_empty() || ssid.len() > crate::types::WIFI_SSID_MAX {
        return Err(ManagerError::ArgumentInvalid);
    }
    Ok(ssid_from_bytes(ssid.as_bytes()))
}

fn unexpected(reply: &ManagerReply) -> ManagerError {
    log::error!("wifi_manager: mismatched reply {:?}", reply);
    ManagerError::StateInvalid
}
