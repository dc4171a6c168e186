use alloc::vec::Vec;

use super::actions::{ApplyStatus, ManagerAction};
use super::engine::{ApplyResult, ManagerEngine};
use super::events::{AttemptOrigin, ManagerEvent};
use super::machine::SweepPolicy;
use super::snapshot::{publish_manager_snapshot, ManagerSnapshot};
use crate::config::ManagerConfig;
use crate::driver::{DriverEvent, NetworkDriver};
use crate::error::ManagerError;
use crate::store::{BlobStore, CredentialStore};
use crate::types::{
    ssid_field, ConnectionState, ConnectionStatus, ScanRecord, Ssid, WifiCredentials,
};

pub type StateListener = fn(ConnectionState);

/// Owns the sweep state, the credential store and the driver. Every mutation goes
/// through `&mut self`, so callers serialize ticks, driver events and requests by
/// owning the manager in a single task.
pub struct ConnectionManager<S, D> {
    engine: ManagerEngine,
    store: CredentialStore<S>,
    driver: D,
    config: ManagerConfig,
    listener: Option<StateListener>,
    now_ms: u64,
}

impl<S, D> ConnectionManager<S, D>
where
    S: BlobStore,
    D: NetworkDriver,
{
    pub fn new(config: ManagerConfig, blobs: S, driver: D) -> Self {
        let config = config.sanitized();
        let engine = ManagerEngine::new(SweepPolicy {
            reconnect_interval_ms: config.reconnect_interval_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        });
        publish_manager_snapshot(engine.snapshot());
        Self {
            engine,
            store: CredentialStore::new(blobs, config.save_count as usize),
            driver,
            config,
            listener: None,
            now_ms: 0,
        }
    }

    /// Called after every state change with the new state.
    pub fn with_listener(mut self, listener: StateListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        self.engine.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.engine.snapshot().state
    }

    pub fn store_mut(&mut self) -> &mut CredentialStore<S> {
        &mut self.store
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// One scheduler step. `now_ms` is a monotonic timestamp.
    pub fn tick(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
        let result = self.dispatch(ManagerEvent::Tick { now_ms });
        self.follow(result.action);
    }

    pub fn handle_driver_event(&mut self, event: DriverEvent) {
        log::debug!("wifi_manager: driver event={}", event.as_str());
        let event = match event {
            DriverEvent::GotIp => ManagerEvent::AddressAcquired {
                joined: self
                    .driver
                    .link_info()
                    .and_then(|link| ssid_field(link.ssid.as_bytes()).ok()),
            },
            other => ManagerEvent::Driver(other),
        };
        let result = self.dispatch(event);
        self.follow(result.action);
    }

    pub fn reset_retry(&mut self) {
        let _ = self.dispatch(ManagerEvent::ResetRetry);
    }

    pub fn get_status(&self) -> ConnectionStatus {
        if self.state() != ConnectionState::Connected {
            return ConnectionStatus::Disconnected;
        }
        match self.driver.link_info() {
            Some(link) => ConnectionStatus::Connected(link),
            None => ConnectionStatus::Disconnected,
        }
    }

    /// SSIDs only; passwords never leave the store.
    pub fn get_saved(&mut self) -> Result<Vec<Ssid>, ManagerError> {
        let list = self.store.load_all()?;
        let mut saved = Vec::new();
        saved.try_reserve_exact(list.len())?;
        saved.extend(list.iter().map(WifiCredentials::ssid));
        Ok(saved)
    }

    /// Connects to a saved network without touching the sweep index.
    pub fn connect_saved(&mut self, ssid: &str) -> Result<(), ManagerError> {
        let credentials = self
            .store
            .find(ssid.as_bytes())?
            .ok_or(ManagerError::NotFound)?;
        self.connect_direct(credentials)
    }

    /// One-off connect to new credentials. They are saved only once an address
    /// is obtained.
    pub fn configure(&mut self, ssid: &str, password: &str) -> Result<(), ManagerError> {
        let credentials = WifiCredentials::new(ssid, password)?;
        self.connect_direct(credentials)
    }

    pub fn configure_credentials(&mut self, credentials: WifiCredentials) -> Result<(), ManagerError> {
        if credentials.has_empty_ssid() {
            return Err(ManagerError::ArgumentInvalid);
        }
        self.connect_direct(credentials)
    }

    pub fn delete_saved(&mut self, ssid: &str) -> Result<(), ManagerError> {
        self.store.delete_by_ssid(ssid.as_bytes())
    }

    pub async fn scan(&mut self) -> Result<Vec<ScanRecord>, ManagerError> {
        self.driver.scan().await
    }

    fn connect_direct(&mut self, credentials: WifiCredentials) -> Result<(), ManagerError> {
        self.driver.connect(&credentials).inspect_err(|err| {
            log::warn!(
                "wifi_manager: direct connect refused ssid={} err={}",
                credentials.ssid().as_str(),
                err
            )
        })?;
        log::info!(
            "wifi_manager: direct connect ssid={}",
            credentials.ssid().as_str()
        );
        let _ = self.dispatch(ManagerEvent::ConnectAccepted {
            credentials,
            origin: AttemptOrigin::Direct,
            now_ms: self.now_ms,
        });
        Ok(())
    }

    fn dispatch(&mut self, event: ManagerEvent) -> ApplyResult {
        let result = self.engine.apply(event);
        if result.status == ApplyStatus::InvalidTransition {
            log::debug!(
                "wifi_manager: ignored event={} state={}",
                event.label(),
                result.before.state.as_str()
            );
        }
        if result.changed() {
            publish_manager_snapshot(result.after);
        }
        if result.state_changed() {
            if let Some(listener) = self.listener {
                listener(result.after.state);
            }
        }
        result
    }

    /// Runs the side effects requested by the machine until it has none left.
    fn follow(&mut self, mut action: ManagerAction) {
        loop {
            action = match action {
                ManagerAction::None => return,
                ManagerAction::LoadCandidate { index } => {
                    let list = match self.store.load_all() {
                        Ok(list) => list,
                        Err(err) => {
                            log::warn!("wifi_manager: sweep load failed err={}", err);
                            return;
                        }
                    };
                    self.dispatch(ManagerEvent::SweepStep {
                        now_ms: self.now_ms,
                        count: list.len(),
                        candidate: list.get(index as usize).copied(),
                    })
                    .action
                }
                ManagerAction::Connect(credentials) => match self.driver.connect(&credentials) {
                    Ok(()) => {
                        log::info!(
                            "wifi_manager: sweep connect ssid={} try_index={}",
                            credentials.ssid().as_str(),
                            self.engine.snapshot().try_index
                        );
                        self.dispatch(ManagerEvent::ConnectAccepted {
                            credentials,
                            origin: AttemptOrigin::Sweep,
                            now_ms: self.now_ms,
                        })
                        .action
                    }
                    Err(err) if err.is_transient() => {
                        log::warn!("wifi_manager: driver busy err={}", err);
                        return;
                    }
                    Err(err) => {
                        log::info!(
                            "wifi_manager: sweep connect rejected ssid={} err={}",
                            credentials.ssid().as_str(),
                            err
                        );
                        self.dispatch(ManagerEvent::ConnectRejected {
                            origin: AttemptOrigin::Sweep,
                        })
                        .action
                    }
                },
                ManagerAction::Promote(credentials) => {
                    if let Err(err) = self.store.on_connected(&credentials) {
                        log::warn!("wifi_manager: promote failed err={}", err);
                    }
                    return;
                }
            };
        }
    }
}
