//! The transaction flow state machine.
//!
//! One [`TransactionFlow`] per transaction attempt, driven through
//! validate, fee calculation, balance check, confirmation, submission,
//! and settlement. Every failure persists exactly one failed record
//! tagged with the step it aborted at, emits a `TransactionFailed`
//! event, and parks the flow in the terminal error state.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{info, warn};

use payflow_shared::config::{AppConfig, FlowConfig};
use payflow_shared::types::TransactionId;

use super::error::FlowError;
use super::events::{FlowEvent, FlowEvents};
use super::record::{FailureStep, TransactionRecord};
use super::state::FlowState;
use crate::balance::{BalanceModel, SufficiencyCheck};
use crate::fees::{FeeBreakdown, FeeError, FeeRateTables, FeeService};
use crate::providers::{EnrichedDescriptor, ExecutionProvider, TransactionStore};
use crate::transaction::{RoutingPlan, TransactionDescriptor};
use crate::validation::{TransactionValidator, ValidationReport};

/// Everything the caller needs to confirm or abort a prepared
/// transaction. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationSnapshot {
    /// The descriptor the fees were computed for.
    pub descriptor: TransactionDescriptor,
    /// The computed fee breakdown.
    pub fees: FeeBreakdown,
    /// The advisory sufficiency check.
    pub balance_check: SufficiencyCheck,
    /// The validation report (always valid at this point).
    pub validation: ValidationReport,
}

/// Shared collaborators and tuning for transaction flows.
///
/// Constructed from injected collaborators; holds no global state, so
/// tests build as many isolated services as they like.
pub struct TransactionFlowService {
    fees: Arc<FeeService>,
    balances: Arc<BalanceModel>,
    validator: TransactionValidator,
    provider: Arc<dyn ExecutionProvider>,
    store: Arc<dyn TransactionStore>,
    events: FlowEvents,
    config: FlowConfig,
}

impl TransactionFlowService {
    /// Creates a service from its collaborators and flow tuning.
    #[must_use]
    pub fn new(
        fees: Arc<FeeService>,
        balances: Arc<BalanceModel>,
        validator: TransactionValidator,
        provider: Arc<dyn ExecutionProvider>,
        store: Arc<dyn TransactionStore>,
        config: FlowConfig,
    ) -> Self {
        let events = FlowEvents::new(config.event_capacity);
        Self {
            fees,
            balances,
            validator,
            provider,
            store,
            events,
            config,
        }
    }

    /// Convenience constructor wiring fee tables, validator, and tuning
    /// from one configuration.
    #[must_use]
    pub fn from_config(
        config: &AppConfig,
        balances: Arc<BalanceModel>,
        provider: Arc<dyn ExecutionProvider>,
        store: Arc<dyn TransactionStore>,
    ) -> Self {
        let fees = Arc::new(FeeService::with_config(
            FeeRateTables::from_config(&config.fees),
            &config.flow,
        ));
        let validator = TransactionValidator::new(&config.limits);
        Self::new(
            fees,
            balances,
            validator,
            provider,
            store,
            config.flow.clone(),
        )
    }

    /// Subscribes to flow events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    /// Computes fees without starting a flow.
    ///
    /// # Errors
    ///
    /// Returns [`FeeError::InvalidAmount`] for non-positive amounts.
    pub fn calculate_fees(
        &self,
        descriptor: &TransactionDescriptor,
        routing: Option<&RoutingPlan>,
    ) -> Result<FeeBreakdown, FeeError> {
        self.fees.calculate(descriptor, routing)
    }

    /// Validates a descriptor without starting a flow.
    #[must_use]
    pub fn validate(&self, descriptor: &TransactionDescriptor) -> ValidationReport {
        self.validator.validate(descriptor)
    }

    /// Runs the type-aware sufficiency check against the current
    /// balance.
    pub async fn check_sufficient_balance(
        &self,
        descriptor: &TransactionDescriptor,
        fee_total: Decimal,
    ) -> SufficiencyCheck {
        self.balances.check(descriptor, fee_total).await
    }

    /// Starts a flow for one transaction attempt.
    #[must_use]
    pub fn begin(
        self: &Arc<Self>,
        descriptor: TransactionDescriptor,
        routing: Option<RoutingPlan>,
    ) -> TransactionFlow {
        TransactionFlow {
            service: Arc::clone(self),
            descriptor,
            routing,
            transaction_id: TransactionId::new(),
            state: FlowState::Idle,
            snapshot: None,
            provider_tx_id: None,
        }
    }

    /// Runs a flow through submission with automatic confirmation.
    ///
    /// On success the returned flow is parked in
    /// `pending_external_confirmation`; [`TransactionFlow::settle`]
    /// completes it.
    ///
    /// # Errors
    ///
    /// Re-raises the first step failure after persisting its failed
    /// record.
    pub async fn execute(
        self: &Arc<Self>,
        descriptor: TransactionDescriptor,
        routing: Option<RoutingPlan>,
    ) -> Result<TransactionFlow, FlowError> {
        let mut flow = self.begin(descriptor, routing);
        flow.prepare().await?;
        flow.confirm().await?;
        Ok(flow)
    }
}

/// One transaction attempt moving through the flow states.
pub struct TransactionFlow {
    service: Arc<TransactionFlowService>,
    descriptor: TransactionDescriptor,
    routing: Option<RoutingPlan>,
    transaction_id: TransactionId,
    state: FlowState,
    snapshot: Option<ConfirmationSnapshot>,
    provider_tx_id: Option<String>,
}

impl std::fmt::Debug for TransactionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionFlow")
            .field("transaction_id", &self.transaction_id)
            .field("state", &self.state)
            .field("descriptor", &self.descriptor)
            .field("routing", &self.routing)
            .field("snapshot", &self.snapshot)
            .field("provider_tx_id", &self.provider_tx_id)
            .finish_non_exhaustive()
    }
}

impl TransactionFlow {
    /// The current state.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// The transaction id this attempt runs under.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The confirmation snapshot, once prepared.
    #[must_use]
    pub fn snapshot(&self) -> Option<&ConfirmationSnapshot> {
        self.snapshot.as_ref()
    }

    /// The provider correlation id, once submitted.
    #[must_use]
    pub fn provider_tx_id(&self) -> Option<&str> {
        self.provider_tx_id.as_deref()
    }

    /// Runs validation, fee calculation, and the sufficiency check,
    /// ending in `confirming` with a snapshot.
    ///
    /// # Errors
    ///
    /// [`FlowError::Validation`], [`FlowError::Fee`], or
    /// [`FlowError::Balance`]; each persists a failed record tagged with
    /// its step before returning.
    pub async fn prepare(&mut self) -> Result<&ConfirmationSnapshot, FlowError> {
        self.transition(FlowState::Validating)?;
        let validation = self.service.validator.validate(&self.descriptor);
        if !validation.is_valid() {
            let error = FlowError::Validation {
                field_errors: validation.errors.clone(),
            };
            return Err(self.fail(FailureStep::Validation, error).await);
        }

        self.transition(FlowState::Calculating)?;
        let fees = match self
            .service
            .fees
            .calculate(&self.descriptor, self.routing.as_ref())
        {
            Ok(fees) => fees,
            Err(err) => {
                return Err(self.fail(FailureStep::FeeCalculation, err.into()).await);
            }
        };

        let balance_check = self
            .service
            .balances
            .check(&self.descriptor, fees.total)
            .await;
        if !balance_check.sufficient {
            let error = FlowError::Balance(crate::balance::BalanceError::Insufficient {
                required: self.descriptor.amount,
                available: balance_check.available_balance,
                deficit: balance_check.deficit,
            });
            return Err(self.fail(FailureStep::BalanceCheck, error).await);
        }

        self.transition(FlowState::Confirming)?;
        self.snapshot = Some(ConfirmationSnapshot {
            descriptor: self.descriptor.clone(),
            fees,
            balance_check,
            validation,
        });
        Ok(self.snapshot.as_ref().expect("snapshot just stored"))
    }

    /// Confirms the prepared transaction and submits it for execution,
    /// ending in `pending_external_confirmation` with a pending record
    /// persisted.
    ///
    /// # Errors
    ///
    /// [`FlowError::InvalidTransition`] when not in `confirming`;
    /// [`FlowError::Submission`] or [`FlowError::SubmissionTimeout`]
    /// when the provider rejects or stalls (each persists a failed
    /// record tagged `submission`).
    pub async fn confirm(&mut self) -> Result<(), FlowError> {
        self.transition(FlowState::Processing)?;
        let snapshot = self.snapshot.as_ref().expect("confirming implies snapshot");

        let net_amount = self
            .descriptor
            .transaction_type()
            .is_inbound()
            .then(|| self.descriptor.amount - snapshot.fees.total);
        let enriched = EnrichedDescriptor {
            transaction_id: self.transaction_id,
            descriptor: snapshot.descriptor.clone(),
            fees: snapshot.fees.clone(),
            net_amount,
        };

        let timeout = Duration::from_secs(self.service.config.submission_timeout_secs);
        let outcome = tokio::time::timeout(timeout, self.service.provider.submit(&enriched)).await;

        match outcome {
            Ok(Ok(receipt)) => {
                info!(
                    transaction_id = %self.transaction_id,
                    provider_tx_id = %receipt.provider_tx_id,
                    "submission accepted"
                );
                self.provider_tx_id = Some(receipt.provider_tx_id);
                self.service
                    .store
                    .record(TransactionRecord::pending(
                        self.transaction_id,
                        &self.descriptor,
                    ))
                    .await;
                self.transition(FlowState::PendingExternalConfirmation)?;
                Ok(())
            }
            Ok(Err(err)) => {
                let error = FlowError::Submission {
                    provider_error: err.0,
                };
                Err(self.fail(FailureStep::Submission, error).await)
            }
            Err(_) => {
                warn!(
                    transaction_id = %self.transaction_id,
                    timeout_secs = timeout.as_secs(),
                    "submission timed out"
                );
                let error = FlowError::SubmissionTimeout {
                    timeout_secs: timeout.as_secs(),
                };
                Err(self.fail(FailureStep::Submission, error).await)
            }
        }
    }

    /// Applies the balance mutation and completes the record, ending in
    /// `completed`.
    ///
    /// # Errors
    ///
    /// [`FlowError::InvalidTransition`] when not awaiting external
    /// confirmation; [`FlowError::Balance`] when the re-checked mutation
    /// fails (persists a failed record tagged `settlement`).
    pub async fn settle(&mut self) -> Result<TransactionRecord, FlowError> {
        if self.state != FlowState::PendingExternalConfirmation {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to: FlowState::Completed,
            });
        }
        let fees = self
            .snapshot
            .as_ref()
            .expect("submitted implies snapshot")
            .fees
            .clone();

        if let Err(err) = self
            .service
            .balances
            .commit(self.transaction_id, &self.descriptor, &fees)
            .await
        {
            return Err(self.fail(FailureStep::Settlement, err.into()).await);
        }

        let mut record = TransactionRecord::pending(self.transaction_id, &self.descriptor);
        record.complete();
        self.service.store.record(record.clone()).await;
        self.transition(FlowState::Completed)?;
        self.service.events.emit(FlowEvent::TransactionCompleted {
            transaction_id: self.transaction_id,
            user_id: self.descriptor.user_id,
            transaction_type: self.descriptor.transaction_type(),
            amount: self.descriptor.amount,
            fee_total: fees.total,
        });
        info!(
            transaction_id = %self.transaction_id,
            transaction_type = %self.descriptor.transaction_type(),
            "transaction completed"
        );
        Ok(record)
    }

    /// Abandons an unsubmitted attempt and returns the flow to idle.
    ///
    /// Free at any point before `processing`; nothing has been
    /// persisted or submitted yet.
    ///
    /// # Errors
    ///
    /// [`FlowError::NotCancellable`] once submission has begun.
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Idle
            | FlowState::Validating
            | FlowState::Calculating
            | FlowState::Confirming => {
                self.return_to_idle();
                Ok(())
            }
            state => Err(FlowError::NotCancellable { state }),
        }
    }

    /// Returns the flow to idle under a fresh transaction id.
    ///
    /// The only re-entry into `idle`. A submitted flow is tracked to
    /// resolution: it must settle or fail, never be abandoned.
    ///
    /// # Errors
    ///
    /// [`FlowError::NotCancellable`] while a submission is in flight or
    /// awaiting external confirmation.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Processing | FlowState::PendingExternalConfirmation => {
                Err(FlowError::NotCancellable { state: self.state })
            }
            _ => {
                self.return_to_idle();
                Ok(())
            }
        }
    }

    fn return_to_idle(&mut self) {
        let from = self.state;
        self.snapshot = None;
        self.provider_tx_id = None;
        self.transaction_id = TransactionId::new();
        self.state = FlowState::Idle;
        if from != FlowState::Idle {
            self.service.events.emit(FlowEvent::StateChanged {
                transaction_id: Some(self.transaction_id),
                from,
                to: FlowState::Idle,
            });
        }
    }

    fn transition(&mut self, to: FlowState) -> Result<(), FlowError> {
        if !self.state.can_transition_to(to) {
            return Err(FlowError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        let from = std::mem::replace(&mut self.state, to);
        self.service.events.emit(FlowEvent::StateChanged {
            transaction_id: Some(self.transaction_id),
            from,
            to,
        });
        Ok(())
    }

    /// Persists the failed record, emits the failure event, and parks
    /// the flow in the error state. Exactly one failed record per
    /// failure.
    async fn fail(&mut self, step: FailureStep, error: FlowError) -> FlowError {
        let message = error.to_string();
        self.service
            .store
            .record(TransactionRecord::failed(
                self.transaction_id,
                &self.descriptor,
                step,
                message.clone(),
            ))
            .await;
        self.service.events.emit(FlowEvent::TransactionFailed {
            transaction_id: self.transaction_id,
            user_id: self.descriptor.user_id,
            step,
            error: message,
        });
        let from = std::mem::replace(&mut self.state, FlowState::Error);
        self.service.events.emit(FlowEvent::StateChanged {
            transaction_id: Some(self.transaction_id),
            from,
            to: FlowState::Error,
        });
        warn!(
            transaction_id = %self.transaction_id,
            %step,
            "flow failed"
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use async_trait::async_trait;

    use payflow_shared::types::{Chain, PaymentMethod, UserId};

    use crate::balance::Balance;
    use crate::flow::record::RecordStatus;
    use crate::providers::{
        InMemoryStore, ProviderError, ProviderReceipt, RejectingExecutionProvider,
        StaticBalanceSource, StubExecutionProvider,
    };
    use crate::transaction::{Asset, FundingSource, TransactionKind};

    struct Harness {
        service: Arc<TransactionFlowService>,
        store: Arc<InMemoryStore>,
        user: UserId,
    }

    fn harness_with(
        available: Decimal,
        provider: Arc<dyn ExecutionProvider>,
    ) -> Harness {
        let user = UserId::new();
        let source = StaticBalanceSource::new();
        source.set(user, Balance::with_available(available));
        let balances = Arc::new(BalanceModel::new(Arc::new(source)));
        let store = Arc::new(InMemoryStore::new());

        let service = Arc::new(TransactionFlowService::from_config(
            &AppConfig::default(),
            balances,
            provider,
            Arc::clone(&store) as Arc<dyn TransactionStore>,
        ));
        Harness {
            service,
            store,
            user,
        }
    }

    fn harness(available: Decimal) -> Harness {
        harness_with(available, Arc::new(StubExecutionProvider::new()))
    }

    fn deposit(user: UserId, amount: Decimal) -> TransactionDescriptor {
        TransactionDescriptor::new(
            user,
            amount,
            TransactionKind::Deposit {
                method: PaymentMethod::Card,
            },
        )
        .with_chain(Chain::Solana)
    }

    fn withdraw(user: UserId, amount: Decimal) -> TransactionDescriptor {
        TransactionDescriptor::new(
            user,
            amount,
            TransactionKind::Withdraw {
                method: PaymentMethod::BankTransfer,
                destination: None,
            },
        )
    }

    #[tokio::test]
    async fn test_deposit_happy_path_end_to_end() {
        let h = harness(dec!(0));
        let mut flow = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap();
        assert_eq!(flow.state(), FlowState::PendingExternalConfirmation);
        assert_eq!(flow.provider_tx_id(), Some("prov-1"));

        // Worked example: platform 0.09 + provider 1.00 + network 0.001.
        let snapshot = flow.snapshot().unwrap();
        assert_eq!(snapshot.fees.platform_fee, dec!(0.09));
        assert_eq!(snapshot.fees.provider_fee, dec!(1.00));
        assert_eq!(snapshot.fees.network_fee, dec!(0.001));
        assert_eq!(snapshot.fees.total, dec!(1.091));

        let record = flow.settle().await.unwrap();
        assert_eq!(flow.state(), FlowState::Completed);
        assert_eq!(record.status, RecordStatus::Completed);

        // Net credit per the worked example.
        let balance = h.service.balances.snapshot(h.user).await;
        assert_eq!(balance.available_for_spending, dec!(98.909));
    }

    #[tokio::test]
    async fn test_internally_funded_buy_debits_full_amount() {
        let h = harness(dec!(1200));
        let descriptor = TransactionDescriptor::new(
            h.user,
            dec!(1000),
            TransactionKind::Buy {
                asset: Asset::new("ETH", Chain::Ethereum),
                funding: FundingSource::Balance,
            },
        );

        let mut flow = h.service.execute(descriptor, None).await.unwrap();
        let fees = flow.snapshot().unwrap().fees.clone();
        assert_eq!(fees.exchange_fee, dec!(10));
        assert_eq!(fees.provider_fee, dec!(0));

        flow.settle().await.unwrap();
        let balance = h.service.balances.snapshot(h.user).await;
        assert_eq!(balance.available_for_spending, dec!(200));
        assert_eq!(balance.invested_amount, dec!(1000));
    }

    #[tokio::test]
    async fn test_validation_failure_records_step_and_errors() {
        let h = harness(dec!(100));
        // 4.99 is below the deposit minimum.
        let err = h
            .service
            .execute(deposit(h.user, dec!(4.99)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Validation { .. }));

        let records = h.store.transactions(h.user).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Failed);
        assert_eq!(records[0].failed_at_step, Some(FailureStep::Validation));
    }

    #[tokio::test]
    async fn test_insufficient_balance_records_balance_check_step() {
        let h = harness(dec!(50));
        let err = h
            .service
            .execute(withdraw(h.user, dec!(100)), None)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");

        let records = h.store.transactions(h.user).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].failed_at_step, Some(FailureStep::BalanceCheck));
        assert!(records[0].error.as_deref().unwrap().contains("available 50"));

        // No mutation happened.
        let balance = h.service.balances.snapshot(h.user).await;
        assert_eq!(balance.available_for_spending, dec!(50));
    }

    #[tokio::test]
    async fn test_provider_rejection_records_submission_step() {
        let h = harness_with(
            dec!(0),
            Arc::new(RejectingExecutionProvider::new("card declined")),
        );
        let err = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FlowError::Submission {
                provider_error: "card declined".into(),
            }
        );

        let records = h.store.transactions(h.user).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].failed_at_step, Some(FailureStep::Submission));
    }

    struct StalledProvider;

    #[async_trait]
    impl ExecutionProvider for StalledProvider {
        async fn submit(
            &self,
            _submission: &EnrichedDescriptor,
        ) -> Result<ProviderReceipt, ProviderError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_timeout_records_submission_step() {
        let h = harness_with(dec!(0), Arc::new(StalledProvider));
        let err = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap_err();
        assert_eq!(err, FlowError::SubmissionTimeout { timeout_secs: 30 });

        let records = h.store.transactions(h.user).await;
        assert_eq!(records[0].failed_at_step, Some(FailureStep::Submission));
    }

    #[tokio::test]
    async fn test_cancel_free_before_processing() {
        let h = harness(dec!(0));
        let mut flow = h.service.begin(deposit(h.user, dec!(100)), None);
        flow.prepare().await.unwrap();
        assert_eq!(flow.state(), FlowState::Confirming);

        flow.cancel().unwrap();
        assert_eq!(flow.state(), FlowState::Idle);
        // Nothing was persisted for the abandoned attempt.
        assert!(h.store.transactions(h.user).await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_refused_after_submission() {
        let h = harness(dec!(0));
        let mut flow = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap();
        let err = flow.cancel().unwrap_err();
        assert_eq!(
            err,
            FlowError::NotCancellable {
                state: FlowState::PendingExternalConfirmation,
            }
        );
    }

    #[tokio::test]
    async fn test_settle_twice_is_invalid_transition() {
        let h = harness(dec!(0));
        let mut flow = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap();
        flow.settle().await.unwrap();

        let err = flow.settle().await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { .. }));

        // Still exactly one completed record, mutated once.
        let records = h.store.transactions(h.user).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Completed);
    }

    #[tokio::test]
    async fn test_reset_after_error_reuses_flow_under_new_id() {
        let h = harness(dec!(50));
        let mut flow = h.service.begin(withdraw(h.user, dec!(100)), None);
        assert!(flow.prepare().await.is_err());
        assert_eq!(flow.state(), FlowState::Error);

        let failed_id = flow.transaction_id();
        flow.reset().unwrap();
        assert_eq!(flow.state(), FlowState::Idle);
        assert_ne!(flow.transaction_id(), failed_id);
    }

    #[tokio::test]
    async fn test_reset_refused_while_awaiting_confirmation() {
        let h = harness(dec!(0));
        let mut flow = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap();

        let err = flow.reset().unwrap_err();
        assert_eq!(
            err,
            FlowError::NotCancellable {
                state: FlowState::PendingExternalConfirmation,
            }
        );
        // The submitted transaction is still tracked, not abandoned.
        assert_eq!(flow.state(), FlowState::PendingExternalConfirmation);
        let records = h.store.transactions(h.user).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RecordStatus::Pending);

        // Settlement still works after the refused reset.
        flow.settle().await.unwrap();
        assert_eq!(flow.state(), FlowState::Completed);
    }

    #[tokio::test]
    async fn test_settlement_failure_records_settlement_step() {
        let h = harness(dec!(100));
        let mut rx = h.service.subscribe();

        // Both withdrawals pass the advisory check against the same 100.
        let mut first = h
            .service
            .execute(withdraw(h.user, dec!(80)), None)
            .await
            .unwrap();
        let mut second = h
            .service
            .execute(withdraw(h.user, dec!(80)), None)
            .await
            .unwrap();

        first.settle().await.unwrap();

        // The re-check under the user lock rejects the second mutation.
        let err = second.settle().await.unwrap_err();
        assert_eq!(err.error_code(), "INSUFFICIENT_BALANCE");
        assert_eq!(second.state(), FlowState::Error);

        // The pending record is overwritten with the failed one.
        let record = h.store.find(second.transaction_id()).await.unwrap();
        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.failed_at_step, Some(FailureStep::Settlement));

        let mut saw_settlement_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let FlowEvent::TransactionFailed { step, transaction_id, .. } = event {
                saw_settlement_failure = true;
                assert_eq!(step, FailureStep::Settlement);
                assert_eq!(transaction_id, second.transaction_id());
            }
        }
        assert!(saw_settlement_failure);

        // Only the first withdrawal mutated the balance.
        let balance = h.service.balances.snapshot(h.user).await;
        assert_eq!(balance.available_for_spending, dec!(20));
    }

    #[tokio::test]
    async fn test_events_cover_lifecycle() {
        let h = harness(dec!(0));
        let mut rx = h.service.subscribe();

        let mut flow = h
            .service
            .execute(deposit(h.user, dec!(100)), None)
            .await
            .unwrap();
        flow.settle().await.unwrap();

        let mut saw_completed = false;
        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                FlowEvent::StateChanged { from, to, .. } => transitions.push((from, to)),
                FlowEvent::TransactionCompleted {
                    amount, fee_total, ..
                } => {
                    saw_completed = true;
                    assert_eq!(amount, dec!(100));
                    assert_eq!(fee_total, dec!(1.091));
                }
                FlowEvent::TransactionFailed { .. } => panic!("no failure expected"),
            }
        }
        assert!(saw_completed);
        assert_eq!(transitions.first(), Some(&(FlowState::Idle, FlowState::Validating)));
        assert_eq!(
            transitions.last(),
            Some(&(FlowState::PendingExternalConfirmation, FlowState::Completed))
        );
    }

    #[tokio::test]
    async fn test_failure_event_carries_step() {
        let h = harness(dec!(50));
        let mut rx = h.service.subscribe();
        let _ = h.service.execute(withdraw(h.user, dec!(100)), None).await;

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let FlowEvent::TransactionFailed { step, user_id, .. } = event {
                saw_failure = true;
                assert_eq!(step, FailureStep::BalanceCheck);
                assert_eq!(user_id, h.user);
            }
        }
        assert!(saw_failure);
    }

    #[tokio::test]
    async fn test_exposed_helpers_match_flow_results() {
        let h = harness(dec!(50));
        let descriptor = withdraw(h.user, dec!(100));

        assert!(h.service.validate(&descriptor).is_valid());
        let fees = h.service.calculate_fees(&descriptor, None).unwrap();
        let check = h.service.check_sufficient_balance(&descriptor, fees.total).await;
        assert!(!check.sufficient);
        assert_eq!(check.deficit, dec!(50));
    }

    #[tokio::test]
    async fn test_confirm_before_prepare_is_invalid_transition() {
        let h = harness(dec!(0));
        let mut flow = h.service.begin(deposit(h.user, dec!(100)), None);
        let err = flow.confirm().await.unwrap_err();
        assert_eq!(
            err,
            FlowError::InvalidTransition {
                from: FlowState::Idle,
                to: FlowState::Processing,
            }
        );
    }
}
