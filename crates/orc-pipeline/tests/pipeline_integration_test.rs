//! End-to-end pipeline tests over a scripted in-memory transport
//!
//! Each test enqueues the exact model replies the scenario needs and then
//! asserts on the pipeline result, the number of transport calls, and the
//! downstream review workflow.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use orc_core::comms::{EmailMetadata, EmailType};
use orc_core::schema::{DocType, GuardianStatus};
use orc_core::workflow::{ReviewSession, WorkflowPhase};
use orc_core::{AuditAction, AuditEntry, AuditLog};
use orc_pipeline::{
    DocumentInput, EmailComposer, ModelGateway, ModelRequest, ModelTransport, Orchestrator,
    PipelineError, PromptSet, Stage, TransportError,
};

const GATEKEEPER_INVOICE: &str = r#"{
    "doc_type": "Invoice",
    "vendor_name": "Acme Corp",
    "confidence_score": 0.95,
    "summary": "Invoice from Acme Corp for office supplies."
}"#;

const GATEKEEPER_CHAT_LOG: &str = r#"{
    "doc_type": "Chat_Log",
    "vendor_name": null,
    "confidence_score": 0.99,
    "summary": "Chat transcript between buyer and supplier."
}"#;

const ANALYST_REPLY: &str = r#"{
    "po_number": "PO-4411",
    "invoice_date": "2024-03-01",
    "vendor_details": { "name": "Acme Corp", "address": "1 Main St" },
    "line_items": [
        { "sku": "A-1", "desc": "Paper", "qty": 10.0, "unit_price": 5.0, "total": 50.0 },
        { "sku": null, "desc": "Toner", "qty": 2.0, "unit_price": 29.0, "total": 58.0 }
    ],
    "subtotal": 108.0,
    "tax_amount": 8.64,
    "total_amount": 116.64,
    "currency": "USD"
}"#;

const GUARDIAN_PASS: &str = r#"{
    "status": "PASS",
    "flags": [],
    "reasoning": "Totals add up, no PII found.",
    "confidence_score": 0.97,
    "requires_human_review": false,
    "pii_detected": false
}"#;

/// Scripted transport: pops one canned reply per call
struct MockTransport {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    calls: AtomicUsize,
    instructions: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new(replies: Vec<Result<String, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    fn ok(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for MockTransport {
    async fn generate(
        &self,
        _api_key: &str,
        request: &ModelRequest,
    ) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions
            .lock()
            .unwrap()
            .push(request.instruction.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError {
                    status: None,
                    message: "mock transport out of replies".to_string(),
                })
            })
    }
}

fn orchestrator(transport: Arc<MockTransport>) -> Orchestrator {
    let gateway = ModelGateway::new(vec!["test-key".to_string()], transport)
        .with_backoff(Duration::ZERO, Duration::ZERO);
    Orchestrator::new(Arc::new(gateway), PromptSet::new(None))
}

fn invoice_pdf() -> DocumentInput {
    DocumentInput {
        filename: "invoice.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        data: vec![0x25, 0x50, 0x44, 0x46],
    }
}

#[tokio::test]
async fn test_invoice_runs_all_three_stages() {
    let transport = Arc::new(MockTransport::ok(&[
        GATEKEEPER_INVOICE,
        ANALYST_REPLY,
        GUARDIAN_PASS,
    ]));
    let result = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(result.gatekeeper.doc_type, DocType::Invoice);

    let analyst = result.analyst.as_ref().unwrap();
    assert_eq!(analyst.po_number.as_deref(), Some("PO-4411"));
    assert_eq!(analyst.line_items.len(), 2);
    assert_eq!(analyst.total_amount, 116.64);

    let guardian = result.guardian.as_ref().unwrap();
    assert_eq!(guardian.status, GuardianStatus::Pass);

    let mut session = ReviewSession::new();
    session.begin("invoice.pdf", 1024);
    session.complete(result);
    assert_eq!(session.phase(), WorkflowPhase::Review);
    assert!(!session.requires_human_review());
}

#[tokio::test]
async fn test_chat_log_skips_extraction() {
    let transport = Arc::new(MockTransport::ok(&[GATEKEEPER_CHAT_LOG]));
    let result = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 1);
    assert_eq!(result.gatekeeper.doc_type, DocType::ChatLog);
    assert!(result.analyst.is_none());
    assert!(result.guardian.is_none());
}

#[tokio::test]
async fn test_classification_parse_error_is_fatal() {
    let transport = Arc::new(MockTransport::ok(&[
        "I could not read this document.",
        ANALYST_REPLY,
    ]));
    let err = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Gatekeeper));
    // No extraction attempt after a dead classification
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_analyst_failure_degrades_to_classification_only() {
    let transport = Arc::new(MockTransport::ok(&[
        GATEKEEPER_INVOICE,
        "Sorry, extraction failed.",
    ]));
    let result = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 2);
    assert_eq!(result.gatekeeper.doc_type, DocType::Invoice);
    assert!(result.analyst.is_none());
    assert!(result.guardian.is_none());
}

#[tokio::test]
async fn test_guardian_failure_keeps_analyst_output() {
    let transport = Arc::new(MockTransport::ok(&[
        GATEKEEPER_INVOICE,
        ANALYST_REPLY,
        "not a verdict",
    ]));
    let result = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 3);
    assert!(result.analyst.is_some());
    assert!(result.guardian.is_none());
}

#[tokio::test]
async fn test_schema_violation_fails_classification() {
    let out_of_bounds = r#"{
        "doc_type": "Invoice",
        "vendor_name": "Acme Corp",
        "confidence_score": 1.7,
        "summary": "Confidence out of range."
    }"#;
    let transport = Arc::new(MockTransport::ok(&[out_of_bounds]));
    let err = orchestrator(transport)
        .run(&invoice_pdf())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Gatekeeper));
}

#[tokio::test]
async fn test_rate_limit_rotates_then_succeeds() {
    let rate_limited = || {
        Err(TransportError {
            status: Some(429),
            message: "quota exhausted".to_string(),
        })
    };
    let transport = Arc::new(MockTransport::new(vec![
        rate_limited(),
        rate_limited(),
        Ok(GATEKEEPER_CHAT_LOG.to_string()),
    ]));
    let result = orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(result.gatekeeper.doc_type, DocType::ChatLog);
}

#[tokio::test]
async fn test_upstream_error_carries_stage() {
    let transport = Arc::new(MockTransport::new(vec![Err(TransportError {
        status: Some(500),
        message: "backend unavailable".to_string(),
    })]));
    let err = orchestrator(transport)
        .run(&invoice_pdf())
        .await
        .unwrap_err();

    match err {
        PipelineError::Stage { stage, source } => {
            assert_eq!(stage, Stage::Gatekeeper);
            assert!(matches!(*source, PipelineError::Upstream(_)));
        }
        other => panic!("expected Stage wrapper, got {:?}", other),
    }
}

#[tokio::test]
async fn test_guardian_prompt_embeds_upstream_outputs() {
    let transport = Arc::new(MockTransport::ok(&[
        GATEKEEPER_INVOICE,
        ANALYST_REPLY,
        GUARDIAN_PASS,
    ]));
    orchestrator(transport.clone())
        .run(&invoice_pdf())
        .await
        .unwrap();

    let instructions = transport.instructions();
    assert_eq!(instructions.len(), 3);
    assert!(instructions[2].contains("\"po_number\":\"PO-4411\""));
    assert!(instructions[2].contains("\"doc_type\":\"Invoice\""));
}

#[tokio::test]
async fn test_rejection_lands_in_audit_log() {
    let transport = Arc::new(MockTransport::ok(&[
        GATEKEEPER_INVOICE,
        ANALYST_REPLY,
        GUARDIAN_PASS,
    ]));
    let result = orchestrator(transport).run(&invoice_pdf()).await.unwrap();

    let mut session = ReviewSession::new();
    session.begin("invoice.pdf", 1024);
    session.complete(result.clone());
    session.reject("math error").unwrap();

    let mut audit = AuditLog::new();
    audit.record(AuditEntry::from_decision(
        AuditAction::Rejected,
        &result,
        "invoice.pdf",
        Some("math error".to_string()),
    ));

    let entry = &audit.entries()[0];
    assert_eq!(entry.action, AuditAction::Rejected);
    assert_eq!(entry.reason.as_deref(), Some("math error"));
    assert_eq!(entry.document.vendor_name, "Acme Corp");
    assert_eq!(entry.extraction.total_amount, 116.64);
}

#[tokio::test]
async fn test_email_composer_builds_draft() {
    let transport = Arc::new(MockTransport::ok(&[
        "Dear Acme Corp,\n\nPlease send the missing packing list.\n\nBest regards,\nProcurement",
    ]));
    let gateway = Arc::new(
        ModelGateway::new(vec!["test-key".to_string()], transport.clone())
            .with_backoff(Duration::ZERO, Duration::ZERO),
    );
    let composer = EmailComposer::new(gateway);

    let draft = composer
        .compose(
            EmailType::Inquiry,
            EmailMetadata {
                vendor_name: "Acme Corp".to_string(),
                document_ref: "INV-2024-001".to_string(),
                total_amount: 116.64,
                currency: "USD".to_string(),
                line_items_count: 2,
                vendor_email: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(draft.to, "acme.corp@supplier.com");
    assert_eq!(draft.subject, "Documentation Request - INV-2024-001");
    assert!(draft.body.starts_with("Dear Acme Corp,"));

    let instructions = transport.instructions();
    assert!(instructions[0].contains("Vendor: Acme Corp"));
    assert!(instructions[0].contains("Generate ONLY the email body text."));
}

#[tokio::test]
async fn test_email_composer_rejects_empty_body() {
    let transport = Arc::new(MockTransport::ok(&["   "]));
    let gateway = Arc::new(ModelGateway::new(
        vec!["test-key".to_string()],
        transport,
    ));
    let err = EmailComposer::new(gateway)
        .compose(
            EmailType::Confirmation,
            EmailMetadata {
                vendor_name: "Acme".to_string(),
                document_ref: "INV-1".to_string(),
                total_amount: 10.0,
                currency: "USD".to_string(),
                line_items_count: 1,
                vendor_email: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(Stage::EmailComposer));
}
