//! Single-consumer runtime for one flow instance.
//!
//! Events go in through an unbounded channel and are consumed one at a
//! time. Each intent is processed to quiescence before the next is
//! picked up: the command it produces runs, the resulting fact is
//! applied, and any cascaded commands (verify, then reconcile) run in
//! the same batch. State snapshots are published on a watch channel
//! after every transition.

use std::collections::VecDeque;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::flow::effects::FlowEffects;
use crate::flow::events::FlowEvent;
use crate::flow::machine::FlowMachine;
use crate::providers::FlowDeps;
use crate::state::StepState;

/// Owning handle for a running flow. Dropping it (or calling
/// [`FlowHandle::shutdown`]) cancels in-flight work, including pending
/// MFA-confirmation delays.
pub struct FlowHandle {
    events: mpsc::UnboundedSender<FlowEvent>,
    state: watch::Receiver<StepState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl FlowHandle {
    /// Start a fresh flow at the email-entry step.
    pub fn spawn(deps: FlowDeps) -> Self {
        Self::spawn_with(deps, StepState::initial())
    }

    /// Start a flow from a rehydrated state snapshot.
    pub fn spawn_with(deps: FlowDeps, initial: StepState) -> Self {
        let (events, intake) = mpsc::unbounded_channel();
        let (publish, state) = watch::channel(initial.clone());
        let cancel = CancellationToken::new();

        let worker = FlowWorker {
            machine: FlowMachine::with_state(initial),
            effects: FlowEffects::new(deps),
            publish,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(intake));

        Self {
            events,
            state,
            cancel,
            task,
        }
    }

    /// Enqueue an event. Returns `false` if the flow is already shut
    /// down.
    pub fn dispatch(&self, event: FlowEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> StepState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every published transition.
    pub fn watch(&self) -> watch::Receiver<StepState> {
        self.state.clone()
    }

    /// Cancel in-flight work and wait for the consumer to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                error!(error = %e, "flow task aborted");
            }
        }
    }
}

impl Drop for FlowHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct FlowWorker {
    machine: FlowMachine,
    effects: FlowEffects,
    publish: watch::Sender<StepState>,
    cancel: CancellationToken,
}

impl FlowWorker {
    async fn run(mut self, mut intake: mpsc::UnboundedReceiver<FlowEvent>) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                maybe = intake.recv() => match maybe {
                    Some(event) => event,
                    None => break,
                },
            };
            if !self.process(event).await {
                break;
            }
        }
        debug!("flow consumer stopped");
    }

    /// Run one event and every fact it cascades into. Returns `false`
    /// when the flow was torn down mid-batch.
    async fn process(&mut self, event: FlowEvent) -> bool {
        let mut batch = VecDeque::from([event]);
        while let Some(event) = batch.pop_front() {
            let command = self.machine.handle(&event);
            if self.publish.send(self.machine.state().clone()).is_err() {
                // All observers are gone; keep consuming regardless,
                // the handle still owns the channel.
                debug!("no state observers");
            }

            let Some(command) = command else { continue };
            debug!(?command, "executing");
            match self.effects.execute(command, &self.cancel).await {
                Ok(Some(fact)) => batch.push_back(fact),
                // Cancelled mid-command; no fact may be applied.
                Ok(None) => return false,
                Err(error) => {
                    warn!(error = %error, "command failed");
                    batch.push_back(FlowEvent::Failed { error });
                }
            }

            if self.cancel.is_cancelled() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::AuthError;
    use crate::model::UserRecord;
    use crate::step::Step;
    use crate::testing::{FakeDirectory, FakeIdentityProvider, FakeSms};

    fn deps(identity: FakeIdentityProvider, directory: FakeDirectory, sms: FakeSms) -> FlowDeps {
        FlowDeps::new(Arc::new(identity), Arc::new(directory), Arc::new(sms))
            .with_mfa_confirm_delays(vec![Duration::from_millis(1); 3])
    }

    async fn settled(
        handle: &FlowHandle,
        pred: impl FnMut(&StepState) -> bool,
    ) -> StepState {
        let mut rx = handle.watch();
        let state = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
            .await
            .expect("flow settled in time")
            .expect("flow still running")
            .clone();
        state
    }

    #[tokio::test]
    async fn test_unknown_email_routes_to_password_setup() {
        let handle = FlowHandle::spawn(deps(
            FakeIdentityProvider::new(),
            FakeDirectory::new(),
            FakeSms::new(),
        ));

        handle.dispatch(FlowEvent::EmailSubmitted { email: "new@x.com".into() });
        let state = settled(&handle, |s| s.current_step == Step::PasswordSetup).await;

        assert!(!state.user_exists);
        assert_eq!(state.current_email, "new@x.com");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_known_email_routes_to_password_entry() {
        let record = UserRecord::new("sub-1".into(), "a@x.com".into());
        let handle = FlowHandle::spawn(deps(
            FakeIdentityProvider::new(),
            FakeDirectory::new().with_record(record),
            FakeSms::new(),
        ));

        handle.dispatch(FlowEvent::EmailSubmitted { email: "a@x.com".into() });
        let state = settled(&handle, |s| s.current_step == Step::PasswordEntry).await;

        assert!(state.user_exists);
        assert!(state.current_user.is_some());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_failure_surfaces_on_state_and_step_holds() {
        let handle = FlowHandle::spawn(deps(
            FakeIdentityProvider::new(),
            FakeDirectory::new()
                .with_find_error(AuthError::Connectivity("dns failure".into())),
            FakeSms::new(),
        ));

        handle.dispatch(FlowEvent::EmailSubmitted { email: "a@x.com".into() });
        let state = settled(&handle, |s| s.error.is_some()).await;

        assert_eq!(state.current_step, Step::EmailEntry);
        assert!(!state.is_loading, "input unlocked for retry");
        assert!(state.error.as_ref().unwrap().is_retryable());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_accepted_code_cascades_into_reconciliation() {
        let mut user = UserRecord::new("sub-1".into(), "a@x.com".into());
        user.email_verified = false;
        let directory = FakeDirectory::new().with_record(user.clone());

        let mut initial = StepState::initial();
        initial.current_step = Step::EmailVerify;
        initial.current_email = "a@x.com".into();
        initial.current_user = Some(user);

        let handle = FlowHandle::spawn_with(
            deps(FakeIdentityProvider::new(), directory, FakeSms::new()),
            initial,
        );

        handle.dispatch(FlowEvent::CodeSubmitted { code: "123456".into() });
        let state = settled(&handle, |s| s.current_step == Step::PhoneSetup).await;

        assert!(state.current_user.as_ref().unwrap().email_verified);
        assert!(state.error.is_none());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_code_without_record_surfaces_error_instead_of_hanging() {
        // A rehydrated snapshot can land on a verify step with no
        // record attached; the acceptance path must not strand the
        // form in a loading state.
        let mut initial = StepState::initial();
        initial.current_step = Step::EmailVerify;
        initial.current_email = "a@x.com".into();

        let handle = FlowHandle::spawn_with(
            deps(
                FakeIdentityProvider::new(),
                FakeDirectory::new(),
                FakeSms::new(),
            ),
            initial,
        );

        handle.dispatch(FlowEvent::CodeSubmitted { code: "123456".into() });
        let state = settled(&handle, |s| s.error.is_some()).await;

        assert_eq!(state.current_step, Step::EmailVerify);
        assert!(!state.is_loading, "form stays usable");
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_confirmation_delays() {
        let identity = FakeIdentityProvider::new();
        let mut user = UserRecord::new("sub-1".into(), "a@x.com".into());
        user.email_verified = true;
        user.phone_number = "+15551234567".into();
        user.phone_verified = true;

        let mut initial = StepState::initial();
        initial.current_step = Step::MfaSetup;
        initial.current_user = Some(user);

        let handle = FlowHandle::spawn_with(
            FlowDeps::new(
                Arc::new(identity.clone()),
                Arc::new(FakeDirectory::new()),
                Arc::new(FakeSms::new()),
            )
            .with_mfa_confirm_delays(vec![Duration::from_secs(60); 3]),
            initial,
        );

        handle.dispatch(FlowEvent::MfaSetupAcknowledged);
        settled(&handle, |s| s.is_loading).await;

        // Must not wait out the 3-minute probe schedule.
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown returned promptly");
        assert_eq!(identity.session_refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_is_rejected() {
        let handle = FlowHandle::spawn(deps(
            FakeIdentityProvider::new(),
            FakeDirectory::new(),
            FakeSms::new(),
        ));
        let sender = handle.events.clone();
        handle.shutdown().await;

        // The consumer dropped its intake on exit.
        assert!(sender
            .send(FlowEvent::EmailSubmitted { email: "a@x.com".into() })
            .is_err());
    }
}
