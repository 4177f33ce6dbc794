//! Three-stage document pipeline
//!
//! Gatekeeper classifies, Analyst extracts, Guardian audits. The stages run
//! strictly in sequence; Analyst and Guardian only run for document types
//! that carry financial data. A Gatekeeper failure kills the run, a failure
//! in the later stages degrades to a partial result.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{info, warn};

use orc_core::schema::{AnalystOutput, GatekeeperOutput, GuardianOutput, PipelineResult};

use crate::error::{PipelineError, Result, Stage};
use crate::gateway::ModelGateway;
use crate::prompts::PromptSet;
use crate::transport::{InlineDocument, ModelRequest};

/// Uploaded document handed to the pipeline
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl DocumentInput {
    fn inline(&self) -> InlineDocument {
        InlineDocument {
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }
}

/// Remove markdown code fences around a JSON reply.
///
/// Models frequently wrap JSON in ```json fences despite instructions;
/// plain replies pass through untouched.
pub fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let cleaned = strip_fences(reply);
    serde_json::from_str(&cleaned).map_err(|e| PipelineError::Parse(e.to_string()))
}

/// Sequential pipeline runner over a shared gateway
#[derive(Debug)]
pub struct Orchestrator {
    gateway: Arc<ModelGateway>,
    prompts: PromptSet,
}

impl Orchestrator {
    pub fn new(gateway: Arc<ModelGateway>, prompts: PromptSet) -> Self {
        Self { gateway, prompts }
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Run the full pipeline over one document.
    ///
    /// Classification failure is fatal and carries the Gatekeeper stage
    /// context. Extraction or compliance failure logs a warning and
    /// returns whatever completed before it.
    pub async fn run(&self, doc: &DocumentInput) -> Result<PipelineResult> {
        info!(filename = %doc.filename, "[Gatekeeper] scanning");
        let gatekeeper = self.run_gatekeeper(doc).await?;

        if !gatekeeper.doc_type.requires_extraction() {
            info!(doc_type = %gatekeeper.doc_type, "[Analyst] skipped, doc type not relevant");
            return Ok(PipelineResult::classification_only(gatekeeper));
        }

        info!("[Analyst] extracting");
        let analyst = match self.run_analyst(doc).await {
            Ok(analyst) => analyst,
            Err(e) => {
                warn!(error = %e, "[Analyst] failed, returning partial result");
                return Ok(PipelineResult {
                    gatekeeper,
                    analyst: None,
                    guardian: None,
                });
            }
        };

        info!("[Guardian] validating");
        let guardian = match self.run_guardian(&gatekeeper, &analyst).await {
            Ok(guardian) => Some(guardian),
            Err(e) => {
                warn!(error = %e, "[Guardian] failed, returning partial result");
                None
            }
        };

        Ok(PipelineResult {
            gatekeeper,
            analyst: Some(analyst),
            guardian,
        })
    }

    async fn run_gatekeeper(&self, doc: &DocumentInput) -> Result<GatekeeperOutput> {
        let request = ModelRequest::with_document(self.prompts.gatekeeper(), doc.inline());
        let reply = self
            .gateway
            .generate(&request)
            .await
            .map_err(|e| e.in_stage(Stage::Gatekeeper))?;
        let output: GatekeeperOutput =
            parse_reply(&reply).map_err(|e| e.in_stage(Stage::Gatekeeper))?;
        output
            .validate()
            .map_err(|e| PipelineError::from(e).in_stage(Stage::Gatekeeper))?;
        Ok(output)
    }

    async fn run_analyst(&self, doc: &DocumentInput) -> Result<AnalystOutput> {
        let request = ModelRequest::with_document(self.prompts.analyst(), doc.inline());
        let reply = self
            .gateway
            .generate(&request)
            .await
            .map_err(|e| e.in_stage(Stage::Analyst))?;
        let output: AnalystOutput = parse_reply(&reply).map_err(|e| e.in_stage(Stage::Analyst))?;
        output
            .validate()
            .map_err(|e| PipelineError::from(e).in_stage(Stage::Analyst))?;
        Ok(output)
    }

    async fn run_guardian(
        &self,
        gatekeeper: &GatekeeperOutput,
        analyst: &AnalystOutput,
    ) -> Result<GuardianOutput> {
        let gatekeeper_json = serde_json::to_string(gatekeeper)
            .map_err(|e| PipelineError::Parse(e.to_string()).in_stage(Stage::Guardian))?;
        let analyst_json = serde_json::to_string(analyst)
            .map_err(|e| PipelineError::Parse(e.to_string()).in_stage(Stage::Guardian))?;

        // Guardian reasons over the upstream outputs, not the raw document.
        let request = ModelRequest::text(self.prompts.guardian(&gatekeeper_json, &analyst_json));
        let reply = self
            .gateway
            .generate(&request)
            .await
            .map_err(|e| e.in_stage(Stage::Guardian))?;
        let output: GuardianOutput =
            parse_reply(&reply).map_err(|e| e.in_stage(Stage::Guardian))?;
        output
            .validate()
            .map_err(|e| PipelineError::from(e).in_stage(Stage::Guardian))?;
        Ok(output)
    }
}
