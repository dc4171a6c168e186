use statig::blocking::IntoStateMachineExt as _;

use super::actions::{ApplyStatus, ManagerAction};
use super::events::ManagerEvent;
#[cfg(test)]
use super::machine::Attempt;
use super::machine::{ConnectionMachine, DispatchContext, SweepPolicy};
use super::snapshot::ManagerSnapshot;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ApplyResult {
    pub(crate) before: ManagerSnapshot,
    pub(crate) after: ManagerSnapshot,
    pub(crate) status: ApplyStatus,
    pub(crate) action: ManagerAction,
}

impl ApplyResult {
    pub(crate) fn changed(self) -> bool {
        matches!(self.status, ApplyStatus::Applied)
    }

    pub(crate) fn state_changed(self) -> bool {
        self.before.state != self.after.state
    }
}

pub(crate) struct ManagerEngine {
    machine: statig::blocking::StateMachine<ConnectionMachine>,
}

impl ManagerEngine {
    pub(crate) fn new(policy: SweepPolicy) -> Self {
        Self {
            machine: ConnectionMachine::new(policy).state_machine(),
        }
    }

    pub(crate) fn snapshot(&self) -> ManagerSnapshot {
        self.machine.inner().snapshot
    }

    #[cfg(test)]
    pub(crate) fn attempt(&self) -> Option<Attempt> {
        self.machine.inner().attempt
    }

    pub(crate) fn apply(&mut self, event: ManagerEvent) -> ApplyResult {
        let before = self.snapshot();
        let mut context = DispatchContext::default();
        self.machine.handle_with_context(&event, &mut context);
        let after = self.snapshot();
        let status = match context.status {
            ApplyStatus::Unchanged if before != after => ApplyStatus::Applied,
            status => status,
        };
        if before.state != after.state {
            log::info!(
                "wifi_manager: state from={} to={} trigger={}",
                before.state.as_str(),
                after.state.as_str(),
                event.label()
            );
        }
        ApplyResult {
            before,
            after,
            status,
            action: context.action,
        }
    }
}
