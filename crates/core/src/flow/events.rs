//! Flow event broadcasting.
//!
//! Fire-and-forget: the flow emits on a `tokio::sync::broadcast`
//! channel and never blocks on subscribers. With no subscribers, or a
//! lagging one, events are dropped rather than backing up the flow.

use rust_decimal::Decimal;
use tokio::sync::broadcast;

use payflow_shared::types::{TransactionId, TransactionType, UserId};

use super::record::FailureStep;
use super::state::FlowState;

/// Events emitted as a flow progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// The flow moved between states.
    StateChanged {
        /// Transaction the flow is processing, once one is assigned.
        transaction_id: Option<TransactionId>,
        /// State left.
        from: FlowState,
        /// State entered.
        to: FlowState,
    },
    /// A flow failed at some step.
    TransactionFailed {
        /// The failed transaction.
        transaction_id: TransactionId,
        /// The initiating user.
        user_id: UserId,
        /// The step that failed.
        step: FailureStep,
        /// Error message.
        error: String,
    },
    /// A flow settled successfully.
    TransactionCompleted {
        /// The completed transaction.
        transaction_id: TransactionId,
        /// The initiating user.
        user_id: UserId,
        /// Flat transaction type.
        transaction_type: TransactionType,
        /// Requested amount.
        amount: Decimal,
        /// Total fees charged.
        fee_total: Decimal,
    },
}

/// A broadcast channel for flow events.
#[derive(Debug)]
pub struct FlowEvents {
    sender: broadcast::Sender<FlowEvent>,
}

impl FlowEvents {
    /// Creates a channel buffering up to `capacity` events per
    /// subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.sender.subscribe()
    }

    /// Emits an event. A send error only means nobody is listening.
    pub fn emit(&self, event: FlowEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for FlowEvents {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_emitted_events() {
        let events = FlowEvents::new(8);
        let mut rx = events.subscribe();

        events.emit(FlowEvent::StateChanged {
            transaction_id: None,
            from: FlowState::Idle,
            to: FlowState::Validating,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            FlowEvent::StateChanged {
                transaction_id: None,
                from: FlowState::Idle,
                to: FlowState::Validating,
            }
        );
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_does_not_panic() {
        let events = FlowEvents::new(8);
        events.emit(FlowEvent::TransactionFailed {
            transaction_id: TransactionId::new(),
            user_id: UserId::new(),
            step: FailureStep::Validation,
            error: "bad input".into(),
        });
    }

    #[tokio::test]
    async fn test_late_subscribers_miss_earlier_events() {
        let events = FlowEvents::new(8);
        events.emit(FlowEvent::StateChanged {
            transaction_id: None,
            from: FlowState::Idle,
            to: FlowState::Validating,
        });

        let mut rx = events.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
