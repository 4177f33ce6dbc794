//! Capacity-bounded audit trail of human decisions
//!
//! Every approval action emits an immutable snapshot of the pipeline result
//! and the decision inputs. The log keeps the newest 100 entries and can be
//! exported as JSON or CSV, or persisted to a JSON file between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use crate::schema::{GuardianStatus, PipelineResult};
use crate::workflow::requires_human_review;
use crate::Result;

/// Maximum retained audit entries; older entries are evicted
pub const AUDIT_LOG_CAP: usize = 100;

/// Default persistence file name
pub const AUDIT_LOG_FILE: &str = "orc_audit_log.json";

/// Decision recorded in an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Approved,
    Rejected,
    FlaggedForReview,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditAction::Approved => "APPROVED",
            AuditAction::Rejected => "REJECTED",
            AuditAction::FlaggedForReview => "FLAGGED_FOR_REVIEW",
        };
        write!(f, "{}", name)
    }
}

/// Identity of the document the decision was made about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIdentity {
    pub filename: String,
    pub doc_type: String,
    pub vendor_name: String,
}

/// Financial summary of the extraction, zeroed when extraction was skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSummary {
    pub total_amount: f64,
    pub currency: String,
    pub line_items_count: usize,
}

/// Signals the human decision was based on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionInputs {
    pub gatekeeper_confidence: f64,
    pub guardian_status: GuardianStatus,
    pub guardian_flags: Vec<String>,
    pub requires_human_review: bool,
    pub pii_detected: bool,
}

/// Immutable record of one human decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub document: DocumentIdentity,
    pub extraction: ExtractionSummary,
    pub decision: DecisionInputs,

    /// Present for rejections
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Snapshot a pipeline result at decision time.
    ///
    /// Missing analyst/guardian sections collapse to the same defaults the
    /// review UI shows: zeroed totals, USD, and a REVIEW verdict.
    pub fn from_decision(
        action: AuditAction,
        result: &PipelineResult,
        filename: &str,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: format!("audit:{}", Uuid::new_v4()),
            timestamp: Utc::now(),
            action,
            document: DocumentIdentity {
                filename: filename.to_string(),
                doc_type: result.gatekeeper.doc_type.to_string(),
                vendor_name: result
                    .gatekeeper
                    .vendor_name
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
            },
            extraction: ExtractionSummary {
                total_amount: result.analyst.as_ref().map(|a| a.total_amount).unwrap_or(0.0),
                currency: result
                    .analyst
                    .as_ref()
                    .map(|a| a.currency.clone())
                    .unwrap_or_else(|| "USD".to_string()),
                line_items_count: result
                    .analyst
                    .as_ref()
                    .map(|a| a.line_items.len())
                    .unwrap_or(0),
            },
            decision: DecisionInputs {
                gatekeeper_confidence: result.gatekeeper.confidence_score,
                guardian_status: result
                    .guardian
                    .as_ref()
                    .map(|g| g.status)
                    .unwrap_or(GuardianStatus::Review),
                guardian_flags: result
                    .guardian
                    .as_ref()
                    .map(|g| g.flags.clone())
                    .unwrap_or_default(),
                requires_human_review: requires_human_review(result),
                pii_detected: result
                    .guardian
                    .as_ref()
                    .and_then(|g| g.pii_detected)
                    .unwrap_or(false),
            },
            reason,
        }
    }
}

/// Newest-first audit log, capped at [`AUDIT_LOG_CAP`] entries
#[derive(Debug)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    cap: usize,
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cap: AUDIT_LOG_CAP,
            path: None,
        }
    }

    /// In-memory log with a non-default capacity (tests)
    pub fn with_cap(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            cap,
            path: None,
        }
    }

    /// Log persisted to a JSON file; existing entries are loaded eagerly.
    /// A missing or unreadable file is a warning, never fatal.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<AuditEntry>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "audit log file is corrupt; starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            entries,
            cap: AUDIT_LOG_CAP,
            path: Some(path),
        }
    }

    fn save(&self) {
        if let Some(path) = &self.path {
            let content = match serde_json::to_string_pretty(&self.entries) {
                Ok(content) => content,
                Err(e) => {
                    warn!(error = %e, "failed to serialize audit log");
                    return;
                }
            };
            if let Err(e) = std::fs::write(path, content) {
                warn!(path = %path.display(), error = %e, "failed to persist audit log");
            }
        }
    }

    /// Insert at the front; evict beyond capacity.
    pub fn record(&mut self, entry: AuditEntry) {
        self.entries.insert(0, entry);
        self.entries.truncate(self.cap);
        self.save();
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Full-log export as pretty JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Full-log export as CSV (header row + one row per entry)
    pub fn export_csv(&self) -> String {
        let mut out = String::from(
            "id,timestamp,action,filename,doc_type,vendor_name,total_amount,currency,\
             line_items_count,gatekeeper_confidence,guardian_status,guardian_flags,\
             requires_human_review,pii_detected,reason\n",
        );
        for entry in &self.entries {
            let row = [
                entry.id.clone(),
                entry.timestamp.to_rfc3339(),
                entry.action.to_string(),
                entry.document.filename.clone(),
                entry.document.doc_type.clone(),
                entry.document.vendor_name.clone(),
                entry.extraction.total_amount.to_string(),
                entry.extraction.currency.clone(),
                entry.extraction.line_items_count.to_string(),
                entry.decision.gatekeeper_confidence.to_string(),
                entry.decision.guardian_status.to_string(),
                entry.decision.guardian_flags.join("; "),
                entry.decision.requires_human_review.to_string(),
                entry.decision.pii_detected.to_string(),
                entry.reason.clone().unwrap_or_default(),
            ];
            let escaped: Vec<String> = row.iter().map(|field| csv_field(field)).collect();
            out.push_str(&escaped.join(","));
            out.push('\n');
        }
        out
    }

    /// Drop all entries and delete the persistence file if present.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove audit log file");
                }
            }
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DocType, GatekeeperOutput};

    fn sample_result() -> PipelineResult {
        PipelineResult::classification_only(GatekeeperOutput {
            doc_type: DocType::Invoice,
            vendor_name: Some("Acme, Inc.".to_string()),
            confidence_score: 0.95,
            summary: "Invoice.".to_string(),
        })
    }

    fn sample_entry(action: AuditAction, reason: Option<&str>) -> AuditEntry {
        AuditEntry::from_decision(
            action,
            &sample_result(),
            "invoice.pdf",
            reason.map(|r| r.to_string()),
        )
    }

    #[test]
    fn test_capacity_eviction() {
        let mut log = AuditLog::with_cap(100);
        for _ in 0..101 {
            log.record(sample_entry(AuditAction::Approved, None));
        }
        assert_eq!(log.len(), 100);
    }

    #[test]
    fn test_newest_first_ordering() {
        let mut log = AuditLog::new();
        log.record(sample_entry(AuditAction::Approved, None));
        log.record(sample_entry(AuditAction::Rejected, Some("math error")));
        assert_eq!(log.entries()[0].action, AuditAction::Rejected);
        assert_eq!(log.entries()[0].reason.as_deref(), Some("math error"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let entry = sample_entry(AuditAction::FlaggedForReview, None);
        assert_eq!(entry.extraction.total_amount, 0.0);
        assert_eq!(entry.extraction.currency, "USD");
        assert_eq!(entry.extraction.line_items_count, 0);
        assert_eq!(entry.decision.guardian_status, GuardianStatus::Review);
    }

    #[test]
    fn test_csv_escapes_commas_and_quotes() {
        let mut log = AuditLog::new();
        log.record(sample_entry(AuditAction::Rejected, Some("bad \"totals\", resubmit")));
        let csv = log.export_csv();
        assert!(csv.lines().count() == 2);
        assert!(csv.contains("\"bad \"\"totals\"\", resubmit\""));
        assert!(csv.contains("\"Acme, Inc.\""));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AUDIT_LOG_FILE);

        {
            let mut log = AuditLog::with_persistence(&path);
            log.record(sample_entry(AuditAction::Approved, None));
        }

        let reloaded = AuditLog::with_persistence(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.entries()[0].action, AuditAction::Approved);
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AUDIT_LOG_FILE);

        let mut log = AuditLog::with_persistence(&path);
        log.record(sample_entry(AuditAction::Approved, None));
        assert!(path.exists());

        log.clear();
        assert!(log.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(AUDIT_LOG_FILE);
        std::fs::write(&path, "not json").unwrap();

        let log = AuditLog::with_persistence(&path);
        assert!(log.is_empty());
    }
}
