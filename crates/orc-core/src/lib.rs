//! ORC Core - domain model for the supply-chain document console
//!
//! This crate holds everything about a document run that is independent of
//! how the model is called: the stage-output schemas, the review workflow
//! state machine, and the two capped decision logs.
//!
//! # Architecture
//!
//! 1. **Schemas** (`schema`): typed stage outputs with explicit validation
//! 2. **Workflow** (`workflow`): run status, derived phase, human approval
//! 3. **Audit** (`audit`): immutable record of every approval decision
//! 4. **Comms** (`comms`): vendor email drafts and their lifecycle
//!
//! # Quick Start
//!
//! ```
//! use orc_core::schema::{DocType, GatekeeperOutput, PipelineResult};
//! use orc_core::workflow::{ReviewSession, WorkflowPhase};
//!
//! let mut session = ReviewSession::new();
//! session.begin("invoice.pdf", 52_340);
//!
//! let result = PipelineResult::classification_only(GatekeeperOutput {
//!     doc_type: DocType::ChatLog,
//!     vendor_name: None,
//!     confidence_score: 0.97,
//!     summary: "Chat transcript between buyer and supplier.".to_string(),
//! });
//! session.complete(result);
//!
//! assert_eq!(session.phase(), WorkflowPhase::Review);
//! session.approve().unwrap();
//! assert_eq!(session.phase(), WorkflowPhase::Action);
//! ```

#![deny(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod audit;
pub mod comms;
pub mod error;
pub mod schema;
pub mod workflow;

// Re-export commonly used types for convenience
pub use audit::{AuditAction, AuditEntry, AuditLog, AUDIT_LOG_CAP};
pub use comms::{CommsLog, DraftStatus, EmailDraft, EmailMetadata, EmailType, COMMS_LOG_CAP};
pub use error::{CoreError, Result};
pub use schema::{
    AnalystOutput, DocType, GatekeeperOutput, GuardianOutput, GuardianStatus, PipelineResult,
    CONFIDENCE_THRESHOLD,
};
pub use workflow::{
    requires_human_review, ApprovalDecision, LogAgent, LogEntry, LogLevel, ReviewSession,
    RunStatus, WorkflowPhase,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
