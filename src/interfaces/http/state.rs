use crate::application::admission::AdmissionController;
use crate::application::allocator::AliasAllocator;
use crate::application::matcher::{InboundMatcher, MailboxHeartbeat};
use crate::application::outbound::OutboundService;
use crate::application::retry::RetryController;
use crate::application::risk::RiskAssessor;
use crate::application::webhook::WebhookNotifier;
use crate::config::AppConfig;
use crate::domain::ports::{
    AliasStoreRef, BlacklistStoreRef, InstructionStoreRef, JobQueueRef, WebhookTransportRef,
};
use std::sync::Arc;

/// Shared application state: the orchestration services plus the store
/// handles the ops endpoints read directly.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub retry: Arc<RetryController>,
    pub matcher: Arc<InboundMatcher>,
    pub outbound: Arc<OutboundService>,
    pub instructions: InstructionStoreRef,
    pub aliases: AliasStoreRef,
    pub queue: JobQueueRef,
    pub heartbeat: MailboxHeartbeat,
}

impl AppState {
    /// Wires the full service graph onto the given adapters. Used by the
    /// binary and by integration tests alike.
    pub fn assemble(
        config: &AppConfig,
        instructions: InstructionStoreRef,
        aliases: AliasStoreRef,
        blacklist: BlacklistStoreRef,
        queue: JobQueueRef,
        webhook_transport: WebhookTransportRef,
    ) -> Self {
        let heartbeat = MailboxHeartbeat::new();
        let assessor = RiskAssessor::new(
            Arc::clone(&instructions),
            blacklist,
            config.risk.clone(),
        );
        let allocator = AliasAllocator::new(Arc::clone(&aliases));
        let admission = Arc::new(AdmissionController::new(
            assessor,
            allocator,
            Arc::clone(&instructions),
            Arc::clone(&queue),
            config.default_currency.clone(),
        ));
        let retry = Arc::new(RetryController::new(
            Arc::clone(&instructions),
            Arc::clone(&queue),
            config.max_resends,
        ));
        let notifier = WebhookNotifier::new(webhook_transport, &config.webhook);
        let matcher = Arc::new(InboundMatcher::new(
            Arc::clone(&instructions),
            notifier,
            heartbeat.clone(),
        ));
        let outbound = Arc::new(OutboundService::new(
            Arc::clone(&instructions),
            Arc::clone(&queue),
        ));

        Self {
            admission,
            retry,
            matcher,
            outbound,
            instructions,
            aliases,
            queue,
            heartbeat,
        }
    }
}
