//! Shared application state
//!
//! One gateway feeds both the pipeline orchestrator and the email composer.
//! Review sessions live in a map keyed by session id; the audit and
//! communication logs are process-wide singletons, optionally persisted
//! under the configured data directory.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use orc_core::audit::{AuditLog, AUDIT_LOG_FILE};
use orc_core::comms::{CommsLog, COMMS_LOG_FILE};
use orc_core::workflow::ReviewSession;
use orc_pipeline::{
    EmailComposer, GeminiTransport, ModelGateway, ModelTransport, Orchestrator, PromptSet,
};

use crate::config::ServerConfig;

/// Shared state behind every handler
#[derive(Debug)]
pub struct AppState {
    orchestrator: Orchestrator,
    composer: EmailComposer,
    pub sessions: RwLock<HashMap<String, ReviewSession>>,
    pub audit: RwLock<AuditLog>,
    pub comms: RwLock<CommsLog>,
}

impl AppState {
    /// State wired to the real Gemini transport
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_transport(config, Arc::new(GeminiTransport::new()))
    }

    /// State with an injected transport (tests)
    pub fn with_transport(config: &ServerConfig, transport: Arc<dyn ModelTransport>) -> Self {
        if config.api_keys.is_empty() {
            warn!("GEMINI_API_KEYS is not set; model calls will be refused");
        }

        let gateway = Arc::new(ModelGateway::new(config.api_keys.clone(), transport));
        let orchestrator = Orchestrator::new(gateway.clone(), PromptSet::discover());
        let composer = EmailComposer::new(gateway);

        let (audit, comms) = match &config.data_dir {
            Some(dir) => (
                AuditLog::with_persistence(dir.join(AUDIT_LOG_FILE)),
                CommsLog::with_persistence(dir.join(COMMS_LOG_FILE)),
            ),
            None => (AuditLog::new(), CommsLog::new()),
        };

        Self {
            orchestrator,
            composer,
            sessions: RwLock::new(HashMap::new()),
            audit: RwLock::new(audit),
            comms: RwLock::new(comms),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn composer(&self) -> &EmailComposer {
        &self.composer
    }
}
