//! Vendor communication drafts and the capped communication log
//!
//! Phase-three follow-up to an approved document: the operator picks an
//! email type, the pipeline crate generates a body, and the resulting
//! draft moves through draft -> approved -> sent (or rejected). The log
//! keeps the newest 50 drafts and persists to a JSON file between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

use crate::{CoreError, Result};

/// Maximum retained drafts; older drafts are evicted
pub const COMMS_LOG_CAP: usize = 50;

/// Default persistence file name
pub const COMMS_LOG_FILE: &str = "orc_communication_log.json";

/// Category of outbound vendor email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailType {
    Inquiry,
    FollowUp,
    Negotiation,
    Confirmation,
}

impl EmailType {
    pub const ALL: [EmailType; 4] = [
        EmailType::Inquiry,
        EmailType::FollowUp,
        EmailType::Negotiation,
        EmailType::Confirmation,
    ];

    /// Template metadata shown in pickers and used for subject lines
    pub fn template(&self) -> EmailTemplate {
        match self {
            EmailType::Inquiry => EmailTemplate {
                name: "Documentation Inquiry",
                description: "Request additional documentation or clarification from supplier",
                subject_template: "Documentation Request - {documentRef}",
            },
            EmailType::FollowUp => EmailTemplate {
                name: "Follow-Up Reminder",
                description: "Gentle reminder for pending responses or outstanding items",
                subject_template: "Follow-Up: Pending Response Required - {documentRef}",
            },
            EmailType::Negotiation => EmailTemplate {
                name: "Terms Discussion",
                description: "Initiate price or terms negotiation based on extracted data",
                subject_template: "Regarding Terms and Pricing - {documentRef}",
            },
            EmailType::Confirmation => EmailTemplate {
                name: "Receipt Confirmation",
                description: "Acknowledge receipt and approval of submitted documents",
                subject_template: "Confirmation: Document Received - {documentRef}",
            },
        }
    }

    /// Subject line with the document reference substituted in
    pub fn subject(&self, document_ref: &str) -> String {
        self.template()
            .subject_template
            .replace("{documentRef}", document_ref)
    }

    /// Full generation prompt: shared procurement context plus the
    /// type-specific checklist.
    pub fn generation_prompt(&self, metadata: &EmailMetadata) -> String {
        let base = format!(
            "You are a professional procurement assistant drafting an email to a supplier.\n\
             Write in a professional but friendly tone. Keep emails concise and actionable.\n\
             \n\
             Vendor: {}\n\
             Document Reference: {}\n\
             Total Amount: {} {}\n\
             Line Items: {}\n",
            metadata.vendor_name,
            metadata.document_ref,
            format_amount(metadata.total_amount),
            metadata.currency,
            metadata.line_items_count,
        );
        let checklist = match self {
            EmailType::Inquiry => {
                "Write an email requesting additional documentation or clarification.\n\
                 - Ask for specific missing information\n\
                 - Mention the document reference\n\
                 - Provide a reasonable response timeframe (5 business days)\n\
                 - Be professional and courteous"
            }
            EmailType::FollowUp => {
                "Write a gentle follow-up reminder email.\n\
                 - Reference the original document/request\n\
                 - Politely note the pending items\n\
                 - Offer assistance if they need clarification\n\
                 - Suggest a call if needed"
            }
            EmailType::Negotiation => {
                "Write an email to discuss pricing or terms.\n\
                 - Acknowledge receipt of their document\n\
                 - Express interest in discussing terms\n\
                 - Be diplomatic and open to discussion\n\
                 - Suggest a meeting or call to discuss further"
            }
            EmailType::Confirmation => {
                "Write a confirmation email acknowledging receipt and approval.\n\
                 - Confirm you received and reviewed their document\n\
                 - Mention the approval status\n\
                 - Outline any next steps\n\
                 - Thank them for their business"
            }
        };
        format!("{}\n{}", base, checklist)
    }
}

impl std::fmt::Display for EmailType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EmailType::Inquiry => "inquiry",
            EmailType::FollowUp => "follow_up",
            EmailType::Negotiation => "negotiation",
            EmailType::Confirmation => "confirmation",
        };
        write!(f, "{}", name)
    }
}

/// Display name, description and subject pattern for one email type
#[derive(Debug, Clone, Copy)]
pub struct EmailTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub subject_template: &'static str,
}

/// Lifecycle of a draft after generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Approved,
    Sent,
    Rejected,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Approved => "approved",
            DraftStatus::Sent => "sent",
            DraftStatus::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(DraftStatus::Draft),
            "approved" => Ok(DraftStatus::Approved),
            "sent" => Ok(DraftStatus::Sent),
            "rejected" => Ok(DraftStatus::Rejected),
            other => Err(CoreError::Schema(format!(
                "unknown draft status {:?}",
                other
            ))),
        }
    }
}

/// Extraction facts the email is about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMetadata {
    pub vendor_name: String,
    pub document_ref: String,
    pub total_amount: f64,
    pub currency: String,
    pub line_items_count: usize,

    /// Explicit recipient; when absent the address is derived from the
    /// vendor name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_email: Option<String>,
}

impl EmailMetadata {
    /// Recipient address: the explicit vendor email, else
    /// `<vendor name, lowercased, whitespace -> dots>@supplier.com`.
    pub fn recipient(&self) -> String {
        match &self.vendor_email {
            Some(email) => email.clone(),
            None => {
                let local: String = self
                    .vendor_name
                    .to_lowercase()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(".");
                format!("{}@supplier.com", local)
            }
        }
    }
}

/// One generated email awaiting human review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDraft {
    pub id: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "type")]
    pub email_type: EmailType,
    pub status: DraftStatus,
    pub created_at: DateTime<Utc>,
    pub metadata: EmailMetadata,
}

impl EmailDraft {
    /// Assemble a draft from a generated body. Status starts at `draft`.
    pub fn new(email_type: EmailType, body: String, metadata: EmailMetadata) -> Self {
        Self {
            id: format!("email:{}", Uuid::new_v4()),
            to: metadata.recipient(),
            subject: email_type.subject(&metadata.document_ref),
            body,
            email_type,
            status: DraftStatus::Draft,
            created_at: Utc::now(),
            metadata,
        }
    }
}

/// Newest-first draft log, capped at [`COMMS_LOG_CAP`] entries
#[derive(Debug)]
pub struct CommsLog {
    drafts: Vec<EmailDraft>,
    cap: usize,
    path: Option<PathBuf>,
}

impl CommsLog {
    pub fn new() -> Self {
        Self {
            drafts: Vec::new(),
            cap: COMMS_LOG_CAP,
            path: None,
        }
    }

    /// In-memory log with a non-default capacity (tests)
    pub fn with_cap(cap: usize) -> Self {
        Self {
            drafts: Vec::new(),
            cap,
            path: None,
        }
    }

    /// Log persisted to a JSON file; existing drafts are loaded eagerly.
    /// A missing or unreadable file is a warning, never fatal.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let drafts = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Vec<EmailDraft>>(&content) {
                Ok(drafts) => drafts,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "communication log file is corrupt; starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            drafts,
            cap: COMMS_LOG_CAP,
            path: Some(path),
        }
    }

    fn save(&self) {
        if let Some(path) = &self.path {
            let content = match serde_json::to_string_pretty(&self.drafts) {
                Ok(content) => content,
                Err(e) => {
                    warn!(error = %e, "failed to serialize communication log");
                    return;
                }
            };
            if let Err(e) = std::fs::write(path, content) {
                warn!(path = %path.display(), error = %e, "failed to persist communication log");
            }
        }
    }

    /// Insert at the front; evict beyond capacity.
    pub fn add(&mut self, draft: EmailDraft) {
        self.drafts.insert(0, draft);
        self.drafts.truncate(self.cap);
        self.save();
    }

    pub fn drafts(&self) -> &[EmailDraft] {
        &self.drafts
    }

    pub fn get(&self, id: &str) -> Option<&EmailDraft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    pub fn by_status(&self, status: DraftStatus) -> Vec<&EmailDraft> {
        self.drafts.iter().filter(|d| d.status == status).collect()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    fn update_status(&mut self, id: &str, status: DraftStatus) -> Result<EmailDraft> {
        let draft = self
            .drafts
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| CoreError::DraftNotFound(id.to_string()))?;
        draft.status = status;
        let updated = draft.clone();
        self.save();
        Ok(updated)
    }

    pub fn approve(&mut self, id: &str) -> Result<EmailDraft> {
        self.update_status(id, DraftStatus::Approved)
    }

    pub fn reject(&mut self, id: &str) -> Result<EmailDraft> {
        self.update_status(id, DraftStatus::Rejected)
    }

    pub fn mark_sent(&mut self, id: &str) -> Result<EmailDraft> {
        self.update_status(id, DraftStatus::Sent)
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.drafts.len();
        self.drafts.retain(|d| d.id != id);
        if self.drafts.len() == before {
            return Err(CoreError::DraftNotFound(id.to_string()));
        }
        self.save();
        Ok(())
    }

    /// Full-log export as pretty JSON
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.drafts)?)
    }

    /// Drop all drafts and delete the persistence file if present.
    pub fn clear(&mut self) {
        self.drafts.clear();
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove communication log file");
                }
            }
        }
    }
}

impl Default for CommsLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Thousands-separated amount with up to two decimal places
fn format_amount(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc() as i64;
    let cents = ((rounded - rounded.trunc()).abs() * 100.0).round() as i64;

    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if whole < 0 || (whole == 0 && rounded < 0.0) {
        "-"
    } else {
        ""
    };
    if cents == 0 {
        format!("{}{}", sign, grouped)
    } else if cents % 10 == 0 {
        format!("{}{}.{}", sign, grouped, cents / 10)
    } else {
        format!("{}{}.{:02}", sign, grouped, cents)
    }
}
