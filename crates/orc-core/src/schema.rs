//! Stage-output schemas for the three pipeline agents
//!
//! Each agent replies with a JSON object that must satisfy the constraints
//! below. Deserialization alone is not enough: callers run `validate()` on
//! every parsed output before it enters the pipeline result.

use serde::{Deserialize, Serialize};

use crate::{CoreError, Result};

/// Minimum classification confidence for skipping mandatory review
pub const CONFIDENCE_THRESHOLD: f64 = 0.90;

/// Document category assigned by the Gatekeeper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    Invoice,
    #[serde(rename = "Purchase_Order")]
    PurchaseOrder,
    #[serde(rename = "Chat_Log")]
    ChatLog,
    Email,
    Unknown,
}

impl DocType {
    /// Only invoices and purchase orders carry structured financial data
    /// worth extracting; everything else ends the pipeline at classification.
    pub fn requires_extraction(&self) -> bool {
        matches!(self, DocType::Invoice | DocType::PurchaseOrder)
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocType::Invoice => "Invoice",
            DocType::PurchaseOrder => "Purchase_Order",
            DocType::ChatLog => "Chat_Log",
            DocType::Email => "Email",
            DocType::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Gatekeeper (classification) output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatekeeperOutput {
    /// Classified document category
    pub doc_type: DocType,

    /// Best guess of the vendor name
    pub vendor_name: Option<String>,

    /// Classification confidence in [0, 1]
    pub confidence_score: f64,

    /// One-sentence summary of the content
    pub summary: String,
}

impl GatekeeperOutput {
    /// Check field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(CoreError::Schema(format!(
                "confidence_score {} is outside [0, 1]",
                self.confidence_score
            )));
        }
        Ok(())
    }
}

/// A single extracted line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Option<String>,
    pub desc: String,
    pub qty: f64,
    pub unit_price: f64,
    pub total: f64,
}

/// Vendor identity as printed on the document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorDetails {
    pub name: String,
    pub address: Option<String>,
}

/// Analyst (extraction) output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystOutput {
    /// Purchase-order number, when present on the document
    pub po_number: Option<String>,

    /// Invoice date, normalized to YYYY-MM-DD
    pub invoice_date: String,

    /// Vendor name and address
    pub vendor_details: VendorDetails,

    /// Line items in document order
    pub line_items: Vec<LineItem>,

    pub subtotal: f64,
    pub tax_amount: f64,
    pub total_amount: f64,

    /// Three-letter currency code (e.g. USD, EUR)
    pub currency: String,
}

impl AnalystOutput {
    /// Check field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.currency.chars().count() != 3 {
            return Err(CoreError::Schema(format!(
                "currency {:?} must be exactly 3 characters",
                self.currency
            )));
        }
        Ok(())
    }
}

/// Guardian compliance verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardianStatus {
    Pass,
    Review,
    Reject,
}

impl std::fmt::Display for GuardianStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GuardianStatus::Pass => "PASS",
            GuardianStatus::Review => "REVIEW",
            GuardianStatus::Reject => "REJECT",
        };
        write!(f, "{}", name)
    }
}

/// Guardian (compliance) output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianOutput {
    /// Overall compliance verdict
    pub status: GuardianStatus,

    /// Warning messages raised during the check
    pub flags: Vec<String>,

    /// Explanation for the verdict
    pub reasoning: String,

    /// Overall extraction confidence in [0, 1]
    pub confidence_score: Option<f64>,

    /// True when the Guardian itself demands human approval
    pub requires_human_review: Option<bool>,

    /// True when PII was found in the document
    pub pii_detected: Option<bool>,
}

impl GuardianOutput {
    /// Check field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if let Some(score) = self.confidence_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(CoreError::Schema(format!(
                    "confidence_score {} is outside [0, 1]",
                    score
                )));
            }
        }
        Ok(())
    }
}

/// Aggregated output of one pipeline run
///
/// `analyst` and `guardian` are absent when classification routed around
/// the extraction stages. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub gatekeeper: GatekeeperOutput,
    pub analyst: Option<AnalystOutput>,
    pub guardian: Option<GuardianOutput>,
}

impl PipelineResult {
    /// A result that ended at classification
    pub fn classification_only(gatekeeper: GatekeeperOutput) -> Self {
        Self {
            gatekeeper,
            analyst: None,
            guardian: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gatekeeper(confidence: f64) -> GatekeeperOutput {
        GatekeeperOutput {
            doc_type: DocType::Invoice,
            vendor_name: Some("Acme Corp".to_string()),
            confidence_score: confidence,
            summary: "An invoice from Acme Corp.".to_string(),
        }
    }

    #[test]
    fn test_doc_type_serde_spelling() {
        let json = serde_json::to_string(&DocType::PurchaseOrder).unwrap();
        assert_eq!(json, "\"Purchase_Order\"");
        let parsed: DocType = serde_json::from_str("\"Chat_Log\"").unwrap();
        assert_eq!(parsed, DocType::ChatLog);
    }

    #[test]
    fn test_doc_type_extraction_routing() {
        assert!(DocType::Invoice.requires_extraction());
        assert!(DocType::PurchaseOrder.requires_extraction());
        assert!(!DocType::ChatLog.requires_extraction());
        assert!(!DocType::Email.requires_extraction());
        assert!(!DocType::Unknown.requires_extraction());
    }

    #[test]
    fn test_gatekeeper_confidence_bounds() {
        assert!(gatekeeper(0.0).validate().is_ok());
        assert!(gatekeeper(1.0).validate().is_ok());
        assert!(gatekeeper(1.2).validate().is_err());
        assert!(gatekeeper(-0.1).validate().is_err());
    }

    #[test]
    fn test_gatekeeper_optional_vendor() {
        let parsed: GatekeeperOutput = serde_json::from_str(
            r#"{"doc_type":"Unknown","confidence_score":0.4,"summary":"Unclear scan."}"#,
        )
        .unwrap();
        assert!(parsed.vendor_name.is_none());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_analyst_currency_length() {
        let mut analyst = AnalystOutput {
            po_number: None,
            invoice_date: "2024-03-01".to_string(),
            vendor_details: VendorDetails {
                name: "Acme Corp".to_string(),
                address: None,
            },
            line_items: vec![],
            subtotal: 100.0,
            tax_amount: 8.0,
            total_amount: 108.0,
            currency: "USD".to_string(),
        };
        assert!(analyst.validate().is_ok());
        analyst.currency = "US".to_string();
        assert!(analyst.validate().is_err());
        analyst.currency = "DOLLARS".to_string();
        assert!(analyst.validate().is_err());
    }

    #[test]
    fn test_guardian_status_spelling() {
        let parsed: GuardianStatus = serde_json::from_str("\"REJECT\"").unwrap();
        assert_eq!(parsed, GuardianStatus::Reject);
        assert_eq!(
            serde_json::to_string(&GuardianStatus::Pass).unwrap(),
            "\"PASS\""
        );
    }

    #[test]
    fn test_guardian_optional_confidence_bounds() {
        let guardian = GuardianOutput {
            status: GuardianStatus::Pass,
            flags: vec![],
            reasoning: "All checks passed.".to_string(),
            confidence_score: Some(1.5),
            requires_human_review: None,
            pii_detected: None,
        };
        assert!(guardian.validate().is_err());
    }
}
