//! Single-consumer funnel around [`ConnectionManager`]. Ticks, driver events and
//! presentation requests are applied one at a time by [`ManagerRuntime::run`], so
//! nothing else ever mutates the sweep state.
//!
//! Driver events have their own queue and are always taken first. Ticks coalesce
//! into a single pending timestamp, so a busy runtime never lets them crowd out
//! radio events.

mod handle;

use alloc::vec::Vec;

use embassy_futures::select::{select3, Either3};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, mutex::Mutex, signal::Signal,
};

pub use handle::ManagerHandle;

use crate::driver::{DriverEvent, NetworkDriver};
use crate::error::ManagerError;
use crate::manager::ConnectionManager;
use crate::store::BlobStore;
use crate::types::{ConnectionStatus, ScanRecord, Ssid, WifiCredentials};

pub const DRIVER_EVENT_DEPTH: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerRequest {
    GetStatus,
    GetSaved,
    ConnectSaved(Ssid),
    DeleteSaved(Ssid),
    ResetRetry,
    Scan,
    Configure(WifiCredentials),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerReply {
    Status(ConnectionStatus),
    Saved(Result<Vec<Ssid>, ManagerError>),
    Scan(Result<Vec<ScanRecord>, ManagerError>),
    Done(Result<(), ManagerError>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerInput {
    Tick { now_ms: u64 },
    Driver(DriverEvent),
    Request(ManagerRequest),
}

pub struct ManagerMailbox {
    events: Channel<CriticalSectionRawMutex, DriverEvent, DRIVER_EVENT_DEPTH>,
    tick: Signal<CriticalSectionRawMutex, u64>,
    requests: Channel<CriticalSectionRawMutex, ManagerRequest, 1>,
    replies: Channel<CriticalSectionRawMutex, ManagerReply, 1>,
    request_lock: Mutex<CriticalSectionRawMutex, ()>,
}

impl Default for ManagerMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagerMailbox {
    pub const fn new() -> Self {
        Self {
            events: Channel::new(),
            tick: Signal::new(),
            requests: Channel::new(),
            replies: Channel::new(),
            request_lock: Mutex::new(()),
        }
    }

    pub fn handle(&self) -> ManagerHandle<'_> {
        ManagerHandle::new(self)
    }

    /// Replaces any tick not yet taken by the runtime. Never waits.
    pub fn post_tick(&self, now_ms: u64) {
        self.tick.signal(now_ms);
    }

    pub async fn send_driver_event(&self, event: DriverEvent) {
        self.events.send(event).await;
    }

    /// Non-blocking variant for radio callbacks. Returns `false` when the queue is full.
    pub fn try_send_driver_event(&self, event: DriverEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                log::warn!("wifi_manager: event queue full dropped={}", event.as_str());
                false
            }
        }
    }

    /// Next input in priority order: driver event, then tick, then request.
    pub async fn receive(&self) -> ManagerInput {
        match select3(
            self.events.receive(),
            self.tick.wait(),
            self.requests.receive(),
        )
        .await
        {
            Either3::First(event) => ManagerInput::Driver(event),
            Either3::Second(now_ms) => ManagerInput::Tick { now_ms },
            Either3::Third(request) => ManagerInput::Request(request),
        }
    }

    fn drain_replies(&self) {
        while self.replies.try_receive().is_ok() {}
    }
}

pub struct ManagerRuntime<'a, S, D> {
    manager: ConnectionManager<S, D>,
    mailbox: &'a ManagerMailbox,
}

impl<'a, S, D> ManagerRuntime<'a, S, D>
where
    S: BlobStore,
    D: NetworkDriver,
{
    pub fn new(manager: ConnectionManager<S, D>, mailbox: &'a ManagerMailbox) -> Self {
        Self { manager, mailbox }
    }

    pub fn manager(&self) -> &ConnectionManager<S, D> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut ConnectionManager<S, D> {
        &mut self.manager
    }

    pub async fn run(&mut self) {
        loop {
            let input = self.mailbox.receive().await;
            self.process(input).await;
        }
    }

    pub async fn process(&mut self, input: ManagerInput) {
        match input {
            ManagerInput::Tick { now_ms } => self.manager.tick(now_ms),
            ManagerInput::Driver(event) => self.manager.handle_driver_event(event),
            ManagerInput::Request(request) => {
                let reply = self.answer(request).await;
                self.mailbox.replies.send(reply).await;
            }
        }
    }

    async fn answer(&mut self, request: ManagerRequest) -> ManagerReply {
        match request {
            ManagerRequest::GetStatus => ManagerReply::Status(self.manager.get_status()),
            ManagerRequest::GetSaved => ManagerReply::Saved(self.manager.get_saved()),
            ManagerRequest::ConnectSaved(ssid) => {
                ManagerReply::Done(self.manager.connect_saved(ssid.as_str()))
            }
            ManagerRequest::DeleteSaved(ssid) => {
                ManagerReply::Done(self.manager.delete_saved(ssid.as_str()))
            }
            ManagerRequest::ResetRetry => {
                self.manager.reset_retry();
                ManagerReply::Done(Ok(()))
            }
            ManagerRequest::Scan => ManagerReply::Scan(self.manager.scan().await),
            ManagerRequest::Configure(credentials) => {
                ManagerReply::Done(self.manager.configure_credentials(credentials))
            }
        }
    }
}
