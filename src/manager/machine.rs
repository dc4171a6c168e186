use statig::prelude::*;

use super::actions::{ApplyStatus, ManagerAction};
use super::events::{AttemptOrigin, ManagerEvent};
use super::snapshot::ManagerSnapshot;
use crate::driver::DriverEvent;
use crate::types::{ConnectionState, WifiCredentials, WIFI_SSID_MAX};

/// Accepted requests remembered until an address arrives. The radio may still be
/// working through an older request when a newer one is accepted.
const RECENT_ATTEMPTS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct SweepPolicy {
    pub(crate) reconnect_interval_ms: i32,
    pub(crate) connect_timeout_ms: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Attempt {
    pub(crate) credentials: WifiCredentials,
    pub(crate) origin: AttemptOrigin,
    pub(crate) started_ms: u64,
}

#[derive(Clone, Debug)]
pub(super) struct ConnectionMachine {
    pub(super) snapshot: ManagerSnapshot,
    pub(super) attempt: Option<Attempt>,
    recent: heapless::Vec<WifiCredentials, RECENT_ATTEMPTS>,
    /// Set when the watchdog gave up on an attempt the radio never answered.
    late_failure_pending: bool,
    policy: SweepPolicy,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct DispatchContext {
    pub(super) status: ApplyStatus,
    pub(super) action: ManagerAction,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            status: ApplyStatus::Unchanged,
            action: ManagerAction::None,
        }
    }
}

impl ConnectionMachine {
    pub(super) fn new(policy: SweepPolicy) -> Self {
        Self {
            snapshot: ManagerSnapshot::default(),
            attempt: None,
            recent: heapless::Vec::new(),
            late_failure_pending: false,
            policy,
        }
    }

    fn advance_index(&mut self) {
        self.snapshot.try_index = self.snapshot.try_index.saturating_add(1);
    }

    /// Ends the in-flight attempt as failed.
    fn fail_attempt(&mut self) {
        self.snapshot.connecting = false;
        let origin = self.attempt.take().map(|attempt| attempt.origin);
        if matches!(origin, Some(AttemptOrigin::Sweep)) {
            self.advance_index();
        }
    }

    fn remember(&mut self, credentials: WifiCredentials) {
        self.recent.retain(|entry| !entry.same_network(&credentials));
        if self.recent.is_full() {
            self.recent.remove(0);
        }
        let _ = self.recent.push(credentials);
    }

    fn forget_attempts(&mut self) {
        self.attempt = None;
        self.recent.clear();
        self.late_failure_pending = false;
    }

    /// Credentials of the network that produced the address. Without a report
    /// from the driver the newest accepted request is assumed.
    fn joined_credentials(
        &self,
        joined: Option<[u8; WIFI_SSID_MAX]>,
    ) -> Option<WifiCredentials> {
        match joined {
            Some(field) => self
                .recent
                .iter()
                .rev()
                .find(|entry| entry.matches_field(&field))
                .copied(),
            None => self
                .attempt
                .map(|attempt| attempt.credentials)
                .or_else(|| self.recent.last().copied()),
        }
    }

    fn address_acquired(
        &mut self,
        context: &mut DispatchContext,
        joined: Option<[u8; WIFI_SSID_MAX]>,
    ) -> Outcome<State> {
        self.snapshot.connecting = false;
        self.snapshot.try_index = 0;
        self.snapshot.failed_at_ms = 0;
        self.snapshot.state = ConnectionState::Connected;
        match self.joined_credentials(joined) {
            Some(credentials) => context.action = ManagerAction::Promote(credentials),
            None if joined.is_some() && !self.recent.is_empty() => {
                log::warn!("wifi_manager: joined network matches no request, not saved");
            }
            None => {}
        }
        self.forget_attempts();
        Transition(State::connected())
    }

    fn attempt_timed_out(&self, now_ms: u64) -> bool {
        if self.policy.connect_timeout_ms == 0 {
            return false;
        }
        match self.attempt {
            Some(attempt) => {
                now_ms.saturating_sub(attempt.started_ms) >= self.policy.connect_timeout_ms as u64
            }
            None => false,
        }
    }
}

#[state_machine(initial = "State::disconnected()")]
impl ConnectionMachine {
    #[state(superstate = "supervised")]
    fn disconnected(
        &mut self,
        context: &mut DispatchContext,
        event: &ManagerEvent,
    ) -> Outcome<State> {
        match *event {
            ManagerEvent::Tick { now_ms } => {
                if self.snapshot.connecting {
                    if self.attempt_timed_out(now_ms) {
                        log::warn!(
                            "wifi_manager: attempt timed out try_index={} timeout_ms={}",
                            self.snapshot.try_index,
                            self.policy.connect_timeout_ms
                        );
                        self.fail_attempt();
                        self.late_failure_pending = true;
                    }
                    return Handled;
                }
                context.action = ManagerAction::LoadCandidate {
                    index: self.snapshot.try_index,
                };
                Handled
            }
            ManagerEvent::SweepStep {
                now_ms,
                count,
                candidate,
            } => {
                if self.snapshot.connecting || count == 0 {
                    return Handled;
                }
                if self.snapshot.try_index as usize >= count {
                    self.snapshot.failed_at_ms = now_ms;
                    self.snapshot.try_index = 0;
                    self.snapshot.connecting = false;
                    self.snapshot.state = ConnectionState::ConnectFailed;
                    return Transition(State::connect_failed());
                }
                match candidate {
                    Some(credentials) if credentials.has_empty_ssid() => self.advance_index(),
                    Some(credentials) => context.action = ManagerAction::Connect(credentials),
                    None => {}
                }
                Handled
            }
            _ => Super,
        }
    }

    #[state(superstate = "supervised")]
    fn connected(
        &mut self,
        context: &mut DispatchContext,
        event: &ManagerEvent,
    ) -> Outcome<State> {
        match *event {
            // A direct switch away from the current network failed; the old link is gone.
            ManagerEvent::Driver(DriverEvent::AssociateFailed)
                if self.snapshot.connecting && !self.late_failure_pending =>
            {
                self.fail_attempt();
                self.snapshot.state = ConnectionState::Disconnected;
                context.status = ApplyStatus::Applied;
                Transition(State::disconnected())
            }
            _ => Super,
        }
    }

    #[state(superstate = "supervised")]
    fn connect_failed(
        &mut self,
        context: &mut DispatchContext,
        event: &ManagerEvent,
    ) -> Outcome<State> {
        match *event {
            ManagerEvent::Tick { now_ms } => {
                if self.policy.reconnect_interval_ms < 0 {
                    return Handled;
                }
                let elapsed = now_ms.saturating_sub(self.snapshot.failed_at_ms);
                if elapsed < self.policy.reconnect_interval_ms as u64 {
                    return Handled;
                }
                self.snapshot.try_index = 0;
                self.snapshot.connecting = false;
                self.snapshot.state = ConnectionState::Disconnected;
                context.status = ApplyStatus::Applied;
                Transition(State::disconnected())
            }
            _ => Super,
        }
    }

    /// Events accepted the same way in every state.
    #[superstate]
    fn supervised(
        &mut self,
        context: &mut DispatchContext,
        event: &ManagerEvent,
    ) -> Outcome<State> {
        match *event {
            ManagerEvent::ResetRetry => {
                self.snapshot.try_index = 0;
                self.snapshot.connecting = false;
                self.snapshot.failed_at_ms = 0;
                self.snapshot.state = ConnectionState::Disconnected;
                self.forget_attempts();
                Transition(State::disconnected())
            }
            ManagerEvent::Driver(DriverEvent::GotIp) => self.address_acquired(context, None),
            ManagerEvent::AddressAcquired { joined } => self.address_acquired(context, joined),
            ManagerEvent::Driver(DriverEvent::LinkDown) => {
                self.snapshot.connecting = false;
                self.snapshot.try_index = 0;
                self.snapshot.state = ConnectionState::Disconnected;
                self.forget_attempts();
                Transition(State::disconnected())
            }
            ManagerEvent::Driver(DriverEvent::AssociateFailed) => {
                if self.late_failure_pending {
                    // Answer to the attempt the watchdog already failed.
                    self.late_failure_pending = false;
                    log::debug!("wifi_manager: late associate failure ignored");
                    return Handled;
                }
                if !self.snapshot.connecting {
                    context.status = ApplyStatus::InvalidTransition;
                    return Handled;
                }
                self.fail_attempt();
                context.status = ApplyStatus::Applied;
                Handled
            }
            ManagerEvent::Driver(DriverEvent::AssociateOk) => Handled,
            ManagerEvent::ConnectAccepted {
                credentials,
                origin,
                now_ms,
            } => {
                self.snapshot.connecting = true;
                self.remember(credentials);
                self.attempt = Some(Attempt {
                    credentials,
                    origin,
                    started_ms: now_ms,
                });
                context.status = ApplyStatus::Applied;
                Handled
            }
            ManagerEvent::ConnectRejected { origin } => {
                if matches!(origin, AttemptOrigin::Sweep) {
                    self.advance_index();
                }
                Handled
            }
            ManagerEvent::Tick { .. } => Handled,
            ManagerEvent::SweepStep { .. } => {
                context.status = ApplyStatus::InvalidTransition;
                Handled
            }
        }
    }
}
