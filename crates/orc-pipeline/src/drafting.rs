//! Email draft generation over the model gateway

use std::sync::Arc;
use tracing::info;

use orc_core::comms::{EmailDraft, EmailMetadata, EmailType};

use crate::error::{PipelineError, Result, Stage};
use crate::gateway::ModelGateway;
use crate::transport::ModelRequest;

/// Appended to every generation prompt so the reply is a bare body
const BODY_DIRECTIVE: &str = "Generate ONLY the email body text. Do not include subject line, \
     sender, or recipient headers. Start directly with the greeting \
     (e.g., \"Dear [Vendor Name],\" or \"Hello,\").\n\n\
     Keep the email professional, concise (under 200 words), and actionable.";

/// One-shot body generation plus draft assembly
#[derive(Debug)]
pub struct EmailComposer {
    gateway: Arc<ModelGateway>,
}

impl EmailComposer {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self { gateway }
    }

    /// Generate a body for the given type and wrap it into a draft with
    /// status `draft`.
    pub async fn compose(
        &self,
        email_type: EmailType,
        metadata: EmailMetadata,
    ) -> Result<EmailDraft> {
        info!(
            email_type = %email_type,
            vendor = %metadata.vendor_name,
            "[EmailComposer] generating draft"
        );

        let prompt = format!(
            "{}\n\n{}",
            email_type.generation_prompt(&metadata),
            BODY_DIRECTIVE
        );
        let reply = self
            .gateway
            .generate(&ModelRequest::text(prompt))
            .await
            .map_err(|e| e.in_stage(Stage::EmailComposer))?;

        let body = reply.trim().to_string();
        if body.is_empty() {
            return Err(PipelineError::Upstream(
                "model returned an empty email body".to_string(),
            )
            .in_stage(Stage::EmailComposer));
        }

        let draft = EmailDraft::new(email_type, body, metadata);
        info!(draft_id = %draft.id, "[EmailComposer] draft generated");
        Ok(draft)
    }
}
