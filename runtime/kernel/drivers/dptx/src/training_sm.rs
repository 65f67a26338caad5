// Licensed under the Apache-2.0 license

//! Retry policy of one configuration pass.
//!
//! Training starts at the requested parameters and escalates once to the
//! sink maximum. A bandwidth rejection after a successful training buys one
//! more retrain at maximum; a second rejection, or a failed maximum attempt,
//! is terminal.

use log::{info, warn};
use smlang::statemachine;

statemachine! {
    derive_states: [Debug, Clone, Copy],
    derive_events: [Clone, Copy, Debug],
    transitions: {
        *TrainAtRequested + AttemptSucceeded = Trained,
        TrainAtRequested + AttemptFailed / on_escalate = TrainAtMaximum,

        TrainAtMaximum + AttemptSucceeded = Trained,
        TrainAtMaximum + AttemptFailed / on_exhausted = Terminal,

        Trained + AdmissionAccepted = Admitted,
        Trained + AdmissionRejected [can_retrain_for_bandwidth] / on_bandwidth_retrain = TrainAtMaximum,
    }
}

#[derive(Debug, Default)]
pub struct RetryContext {
    bandwidth_retrains: u8,
}

impl RetryContext {
    const MAX_BANDWIDTH_RETRAINS: u8 = 1;

    pub fn bandwidth_retrains(&self) -> u8 {
        self.bandwidth_retrains
    }
}

impl StateMachineContext for RetryContext {
    fn on_escalate(&mut self) -> Result<(), ()> {
        info!("Training at requested parameters failed, retrying at maximum");
        Ok(())
    }

    fn on_exhausted(&mut self) -> Result<(), ()> {
        warn!("Training at maximum parameters failed");
        Ok(())
    }

    fn can_retrain_for_bandwidth(&self) -> Result<bool, ()> {
        Ok(self.bandwidth_retrains < Self::MAX_BANDWIDTH_RETRAINS)
    }

    fn on_bandwidth_retrain(&mut self) -> Result<(), ()> {
        self.bandwidth_retrains += 1;
        info!("Link oversubscribed, retraining at maximum parameters");
        Ok(())
    }
}

pub fn new_retry_policy() -> StateMachine<RetryContext> {
    StateMachine::new(RetryContext::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_succeeds() {
        let mut sm = new_retry_policy();
        assert_eq!(*sm.state(), States::TrainAtRequested);
        assert!(sm.process_event(Events::AttemptSucceeded).is_ok());
        assert_eq!(*sm.state(), States::Trained);
        assert!(sm.process_event(Events::AdmissionAccepted).is_ok());
        assert_eq!(*sm.state(), States::Admitted);
    }

    #[test]
    fn test_escalation_then_terminal() {
        let mut sm = new_retry_policy();
        assert!(sm.process_event(Events::AttemptFailed).is_ok());
        assert_eq!(*sm.state(), States::TrainAtMaximum);
        assert!(sm.process_event(Events::AttemptFailed).is_ok());
        assert_eq!(*sm.state(), States::Terminal);
        assert!(sm.process_event(Events::AttemptSucceeded).is_err());
    }

    #[test]
    fn test_single_bandwidth_retrain() {
        let mut sm = new_retry_policy();
        assert!(sm.process_event(Events::AttemptSucceeded).is_ok());
        assert!(sm.process_event(Events::AdmissionRejected).is_ok());
        assert_eq!(*sm.state(), States::TrainAtMaximum);
        assert_eq!(sm.context().bandwidth_retrains(), 1);

        assert!(sm.process_event(Events::AttemptSucceeded).is_ok());
        assert!(sm.process_event(Events::AdmissionRejected).is_err());
        assert_eq!(*sm.state(), States::Trained);
    }

    #[test]
    fn test_escalated_training_can_still_retrain_for_bandwidth() {
        let mut sm = new_retry_policy();
        assert!(sm.process_event(Events::AttemptFailed).is_ok());
        assert!(sm.process_event(Events::AttemptSucceeded).is_ok());
        assert!(sm.process_event(Events::AdmissionRejected).is_ok());
        assert_eq!(*sm.state(), States::TrainAtMaximum);
    }
}
