//! Prompt engine - configurable stage instructions with built-in defaults
//!
//! Stage prompts come from an optional `orc_prompt_engine.json` file so the
//! agent instructions can be tuned without a rebuild. A missing or corrupt
//! file falls back to the hardcoded defaults; the pipeline never refuses to
//! start over prompt configuration.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Candidate locations for the prompt engine file, tried in order
pub const PROMPT_ENGINE_PATHS: [&str; 3] = [
    "../orc_prompt_engine.json",
    "orc_prompt_engine.json",
    "data/orc_prompt_engine.json",
];

/// Agent keys inside the engine file
const GATEKEEPER: &str = "GATEKEEPER";
const ANALYST: &str = "ANALYST";
const GUARDIAN: &str = "GUARDIAN";

/// Model-level knobs carried by the engine file
#[derive(Debug, Clone, Deserialize)]
pub struct SystemMeta {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
}

/// Per-agent prompt configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub role: String,
    pub instruction: String,
    #[serde(default)]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub fields_to_extract: Option<Value>,
    #[serde(default)]
    pub checks: Option<Value>,
    #[serde(default)]
    pub logic: Option<String>,
}

/// Parsed prompt engine file
#[derive(Debug, Clone, Deserialize)]
pub struct PromptEngine {
    #[serde(default)]
    pub system_meta: Option<SystemMeta>,
    #[serde(default)]
    pub agents: HashMap<String, AgentConfig>,
}

impl PromptEngine {
    /// Parse the engine from a specific file. Unreadable or malformed
    /// content is a warning, never fatal.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<PromptEngine>(&content) {
            Ok(engine) => {
                info!(path = %path.display(), "loaded prompt engine");
                Some(engine)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "prompt engine file is malformed; using fallback defaults");
                None
            }
        }
    }

    /// Try the well-known locations in order.
    pub fn discover() -> Option<Self> {
        for candidate in PROMPT_ENGINE_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_path(path);
            }
        }
        warn!("prompt engine not found; using fallback defaults");
        None
    }

    fn agent(&self, name: &str) -> Option<&AgentConfig> {
        self.agents.get(name)
    }
}

/// Stage prompt builder over an optional engine
#[derive(Debug, Clone, Default)]
pub struct PromptSet {
    engine: Option<PromptEngine>,
}

impl PromptSet {
    pub fn new(engine: Option<PromptEngine>) -> Self {
        Self { engine }
    }

    /// Builder backed by the discovered engine file, if any
    pub fn discover() -> Self {
        Self::new(PromptEngine::discover())
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Classification instruction
    pub fn gatekeeper(&self) -> String {
        match self.engine.as_ref().and_then(|e| e.agent(GATEKEEPER)) {
            Some(config) => {
                let mut prompt = format!(
                    "ROLE: {}\nINSTRUCTION: {}",
                    config.role, config.instruction
                );
                if let Some(schema) = &config.output_schema {
                    prompt.push_str(&format!(
                        "\nOUTPUT SCHEMA (Strict JSON): {}",
                        compact(schema)
                    ));
                }
                prompt
            }
            None => "ROLE: Universal Document Classifier\n\
                     INSTRUCTION: Identify what this document IS. Extract raw text content summary.\n\
                     OUTPUT SCHEMA: JSON matching { doc_type, vendor_name, confidence_score, summary }"
                .to_string(),
        }
    }

    /// Extraction instruction
    pub fn analyst(&self) -> String {
        match self.engine.as_ref().and_then(|e| e.agent(ANALYST)) {
            Some(config) => {
                let mut prompt = format!(
                    "ROLE: {}\nINSTRUCTION: {}",
                    config.role, config.instruction
                );
                if let Some(fields) = &config.fields_to_extract {
                    prompt.push_str(&format!("\nFIELDS TO EXTRACT: {}", compact(fields)));
                }
                if let Some(logic) = &config.logic {
                    prompt.push_str(&format!("\nLOGIC: {}", logic));
                }
                prompt
            }
            None => "ROLE: Supply Chain Data Extractor\n\
                     INSTRUCTION: Extract entities (PO#, Date, Vendor, Totals). Normalize Dates to YYYY-MM-DD."
                .to_string(),
        }
    }

    /// Compliance instruction over the serialized upstream outputs
    pub fn guardian(&self, gatekeeper_json: &str, analyst_json: &str) -> String {
        let context = format!(
            "CONTEXT:\nGatekeeper: {}\nAnalyst: {}",
            gatekeeper_json, analyst_json
        );
        match self.engine.as_ref().and_then(|e| e.agent(GUARDIAN)) {
            Some(config) => {
                let mut prompt = format!(
                    "ROLE: {}\nINSTRUCTION: {}",
                    config.role, config.instruction
                );
                if let Some(checks) = &config.checks {
                    prompt.push_str(&format!("\nCHECKS: {}", compact(checks)));
                }
                if let Some(schema) = &config.output_schema {
                    prompt.push_str(&format!("\nOUTPUT SCHEMA: {}", compact(schema)));
                }
                prompt.push('\n');
                prompt.push_str(&context);
                prompt
            }
            None => format!(
                "ROLE: Compliance & Safety Officer\n\
                 INSTRUCTION: Check for PII, Math Errors, and Suspicious Values.\n\
                 {}",
                context
            ),
        }
    }
}

fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
