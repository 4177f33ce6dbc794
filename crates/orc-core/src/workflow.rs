//! Review workflow state machine
//!
//! Tracks one document's journey through
//! `idle → processing → complete | error`, the derived workflow phase
//! (`intake → processing → review → action`), the human approval decision,
//! and the observational activity log. Phase and the review predicate are
//! pure functions over current state, recomputed on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{GuardianStatus, PipelineResult, CONFIDENCE_THRESHOLD};
use crate::{CoreError, Result};

/// Processing status of the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Processing,
    Complete,
    Error,
}

/// Derived workflow phase shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Intake,
    Processing,
    Review,
    Action,
}

/// Human approval decision for a completed result
///
/// Created as `Pending` once a result exists; moves exactly once to a
/// terminal state via a human action; cleared only by `reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ApprovalDecision {
    Pending,
    Approved,
    Rejected { reason: String },
    FlaggedForReview,
}

impl ApprovalDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalDecision::Pending)
    }

    /// Short label used in audit records and logs
    pub fn label(&self) -> &'static str {
        match self {
            ApprovalDecision::Pending => "pending",
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::Rejected { .. } => "rejected",
            ApprovalDecision::FlaggedForReview => "flagged_for_review",
        }
    }
}

/// Actor attributed to an activity-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogAgent {
    System,
    Gatekeeper,
    Analyst,
    Guardian,
    Human,
}

/// Severity of an activity-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Processing,
}

/// One timestamped activity-log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub agent: LogAgent,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(agent: LogAgent, message: impl Into<String>, level: LogLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent,
            message: message.into(),
            timestamp: Utc::now(),
            level,
        }
    }
}

/// True when the result must pass through a human before approval.
///
/// PII detection is a hard override: it forces review regardless of
/// confidence or compliance status.
pub fn requires_human_review(result: &PipelineResult) -> bool {
    let confidence = result.gatekeeper.confidence_score;
    let guardian_status = result.guardian.as_ref().map(|g| g.status);
    let guardian_requires = result
        .guardian
        .as_ref()
        .and_then(|g| g.requires_human_review)
        .unwrap_or(false);
    let pii_detected = result
        .guardian
        .as_ref()
        .and_then(|g| g.pii_detected)
        .unwrap_or(false);

    confidence < CONFIDENCE_THRESHOLD
        || guardian_status == Some(GuardianStatus::Review)
        || guardian_status == Some(GuardianStatus::Reject)
        || guardian_requires
        || pii_detected
}

/// State machine for one document review cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    /// Processing status of the current run
    pub status: RunStatus,

    /// Filename of the document under review
    pub filename: Option<String>,

    /// Result of the latest completed run
    pub result: Option<PipelineResult>,

    /// Human decision, present once a result exists
    pub approval: Option<ApprovalDecision>,

    /// Activity log, newest first; cleared at the start of each run
    pub logs: Vec<LogEntry>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            status: RunStatus::Idle,
            filename: None,
            result: None,
            approval: None,
            logs: Vec::new(),
        }
    }

    /// Derived workflow phase; never stored, always recomputed.
    pub fn phase(&self) -> WorkflowPhase {
        match (self.status, &self.approval) {
            (_, Some(ApprovalDecision::Approved)) => WorkflowPhase::Action,
            (RunStatus::Processing, _) => WorkflowPhase::Processing,
            (RunStatus::Complete, _) => WorkflowPhase::Review,
            (RunStatus::Idle, _) if self.result.is_none() => WorkflowPhase::Intake,
            _ => WorkflowPhase::Review,
        }
    }

    /// Derived review predicate over the current result
    pub fn requires_human_review(&self) -> bool {
        self.result.as_ref().map(requires_human_review).unwrap_or(false)
    }

    fn log(&mut self, agent: LogAgent, message: impl Into<String>, level: LogLevel) {
        self.logs.insert(0, LogEntry::new(agent, message, level));
    }

    /// Start a new run: discards the previous result and decision, clears
    /// the activity log, and enters the processing phase.
    pub fn begin(&mut self, filename: &str, size_bytes: u64) {
        self.status = RunStatus::Processing;
        self.filename = Some(filename.to_string());
        self.result = None;
        self.approval = None;
        self.logs.clear();

        self.log(
            LogAgent::System,
            "Orchestration sequence initiated.",
            LogLevel::Info,
        );
        self.log(
            LogAgent::System,
            format!(
                "Ingesting artifact: {} ({:.2} KB)",
                filename,
                size_bytes as f64 / 1024.0
            ),
            LogLevel::Info,
        );
        self.log(
            LogAgent::Gatekeeper,
            "Analysis protocol started...",
            LogLevel::Processing,
        );
    }

    /// Record a completed pipeline run and open the review window.
    ///
    /// The decision always starts `Pending`; a no-review result is only
    /// surfaced differently in the log narration.
    pub fn complete(&mut self, result: PipelineResult) {
        self.log(
            LogAgent::Gatekeeper,
            format!(
                "Identified: {} (Confidence: {:.0}%)",
                result.gatekeeper.doc_type,
                result.gatekeeper.confidence_score * 100.0
            ),
            LogLevel::Success,
        );
        if !result.gatekeeper.summary.is_empty() {
            self.log(
                LogAgent::Gatekeeper,
                format!("Summary: {}", result.gatekeeper.summary),
                LogLevel::Info,
            );
        }

        match &result.analyst {
            Some(analyst) => {
                self.log(
                    LogAgent::Analyst,
                    format!("Extracted {} line items.", analyst.line_items.len()),
                    LogLevel::Success,
                );
                self.log(
                    LogAgent::Analyst,
                    format!("Total Value: {} {}", analyst.total_amount, analyst.currency),
                    LogLevel::Info,
                );
            }
            None => {
                self.log(
                    LogAgent::Analyst,
                    "Skipped extraction (document type not supported for deep analysis).",
                    LogLevel::Warning,
                );
            }
        }

        if let Some(guardian) = &result.guardian {
            if guardian.status == GuardianStatus::Pass {
                self.log(
                    LogAgent::Guardian,
                    "Compliance check: PASSED. No anomalies detected.",
                    LogLevel::Success,
                );
            } else {
                self.log(
                    LogAgent::Guardian,
                    format!("Compliance check: {}. Review flags raised.", guardian.status),
                    LogLevel::Warning,
                );
                for flag in &guardian.flags {
                    self.log(LogAgent::Guardian, format!("Flag: {}", flag), LogLevel::Warning);
                }
            }
        }

        let needs_review = requires_human_review(&result);
        let pii_detected = result
            .guardian
            .as_ref()
            .and_then(|g| g.pii_detected)
            .unwrap_or(false);

        self.result = Some(result);
        self.status = RunStatus::Complete;
        self.approval = Some(ApprovalDecision::Pending);

        if needs_review {
            self.log(
                LogAgent::System,
                "Human review required before approval.",
                LogLevel::Warning,
            );
            if pii_detected {
                self.log(
                    LogAgent::Guardian,
                    "PII detected in document. Manual review required.",
                    LogLevel::Warning,
                );
            }
        }
        self.log(
            LogAgent::System,
            "Orchestration complete. Awaiting human decision.",
            LogLevel::Success,
        );
    }

    /// Record a total pipeline failure.
    pub fn fail(&mut self, message: &str) {
        self.status = RunStatus::Error;
        self.log(
            LogAgent::System,
            format!("Critical failure: {}", message),
            LogLevel::Error,
        );
    }

    fn take_pending(&mut self) -> Result<()> {
        if self.result.is_none() {
            return Err(CoreError::NoResult);
        }
        match &self.approval {
            Some(decision) if decision.is_pending() => Ok(()),
            Some(decision) => Err(CoreError::AlreadyDecided(decision.label().to_string())),
            None => Err(CoreError::NoResult),
        }
    }

    /// Approve the pending result.
    pub fn approve(&mut self) -> Result<()> {
        self.take_pending()?;
        self.approval = Some(ApprovalDecision::Approved);
        self.log(
            LogAgent::Human,
            "Document APPROVED for processing.",
            LogLevel::Success,
        );
        Ok(())
    }

    /// Reject the pending result with a non-empty reason.
    pub fn reject(&mut self, reason: &str) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(CoreError::EmptyReason);
        }
        self.take_pending()?;
        self.approval = Some(ApprovalDecision::Rejected {
            reason: reason.to_string(),
        });
        self.log(
            LogAgent::Human,
            format!("Document REJECTED. Reason: {}", reason),
            LogLevel::Error,
        );
        Ok(())
    }

    /// Escalate the pending result to manual review.
    pub fn flag_for_review(&mut self) -> Result<()> {
        self.take_pending()?;
        self.approval = Some(ApprovalDecision::FlaggedForReview);
        self.log(
            LogAgent::Human,
            "Document flagged for manual review.",
            LogLevel::Warning,
        );
        Ok(())
    }

    /// Clear the decision ahead of a new document.
    pub fn reset(&mut self) {
        self.approval = None;
    }
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DocType, GatekeeperOutput, GuardianOutput};

    fn result_with(confidence: f64, guardian: Option<GuardianOutput>) -> PipelineResult {
        PipelineResult {
            gatekeeper: GatekeeperOutput {
                doc_type: DocType::Invoice,
                vendor_name: Some("Acme Corp".to_string()),
                confidence_score: confidence,
                summary: "Invoice for office supplies.".to_string(),
            },
            analyst: None,
            guardian,
        }
    }

    fn guardian(status: GuardianStatus, pii: Option<bool>, requires: Option<bool>) -> GuardianOutput {
        GuardianOutput {
            status,
            flags: vec![],
            reasoning: "Checked.".to_string(),
            confidence_score: Some(0.95),
            requires_human_review: requires,
            pii_detected: pii,
        }
    }

    #[test]
    fn test_low_confidence_forces_review() {
        let result = result_with(0.89, Some(guardian(GuardianStatus::Pass, None, None)));
        assert!(requires_human_review(&result));
        let result = result_with(0.90, Some(guardian(GuardianStatus::Pass, None, None)));
        assert!(!requires_human_review(&result));
    }

    #[test]
    fn test_pii_is_a_hard_override() {
        let result = result_with(0.99, Some(guardian(GuardianStatus::Pass, Some(true), None)));
        assert!(requires_human_review(&result));
    }

    #[test]
    fn test_guardian_verdict_forces_review() {
        for status in [GuardianStatus::Review, GuardianStatus::Reject] {
            let result = result_with(0.99, Some(guardian(status, None, None)));
            assert!(requires_human_review(&result));
        }
        let result = result_with(0.99, Some(guardian(GuardianStatus::Pass, None, Some(true))));
        assert!(requires_human_review(&result));
    }

    #[test]
    fn test_phase_progression() {
        let mut session = ReviewSession::new();
        assert_eq!(session.phase(), WorkflowPhase::Intake);

        session.begin("invoice.pdf", 2048);
        assert_eq!(session.phase(), WorkflowPhase::Processing);

        session.complete(result_with(0.95, None));
        assert_eq!(session.phase(), WorkflowPhase::Review);

        session.approve().unwrap();
        assert_eq!(session.phase(), WorkflowPhase::Action);
    }

    #[test]
    fn test_decision_is_single_shot() {
        let mut session = ReviewSession::new();
        session.begin("invoice.pdf", 1024);
        session.complete(result_with(0.95, None));

        session.approve().unwrap();
        assert!(matches!(
            session.reject("changed my mind"),
            Err(CoreError::AlreadyDecided(_))
        ));
        assert!(matches!(
            session.flag_for_review(),
            Err(CoreError::AlreadyDecided(_))
        ));

        session.reset();
        assert!(session.approval.is_none());
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut session = ReviewSession::new();
        session.begin("invoice.pdf", 1024);
        session.complete(result_with(0.95, None));

        assert!(matches!(session.reject("   "), Err(CoreError::EmptyReason)));
        session.reject("math error").unwrap();
        assert_eq!(
            session.approval,
            Some(ApprovalDecision::Rejected {
                reason: "math error".to_string()
            })
        );
    }

    #[test]
    fn test_decision_needs_a_result() {
        let mut session = ReviewSession::new();
        assert!(matches!(session.approve(), Err(CoreError::NoResult)));
    }

    #[test]
    fn test_begin_clears_previous_run() {
        let mut session = ReviewSession::new();
        session.begin("first.pdf", 1024);
        session.complete(result_with(0.95, None));
        session.approve().unwrap();

        session.begin("second.pdf", 4096);
        assert!(session.result.is_none());
        assert!(session.approval.is_none());
        assert_eq!(session.status, RunStatus::Processing);
        assert_eq!(session.filename.as_deref(), Some("second.pdf"));
    }

    #[test]
    fn test_logs_are_newest_first() {
        let mut session = ReviewSession::new();
        session.begin("invoice.pdf", 1024);
        assert_eq!(session.logs[0].agent, LogAgent::Gatekeeper);
        assert_eq!(
            session.logs.last().unwrap().message,
            "Orchestration sequence initiated."
        );
    }

    #[test]
    fn test_failure_surfaces_one_message() {
        let mut session = ReviewSession::new();
        session.begin("invoice.pdf", 1024);
        session.fail("Gatekeeper failed: reply was not valid JSON");
        assert_eq!(session.status, RunStatus::Error);
        assert_eq!(session.logs[0].level, LogLevel::Error);
    }
}
