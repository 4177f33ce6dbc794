//! HTTP handlers for the ORC API

use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use orc_core::audit::{AuditAction, AuditEntry};
use orc_core::comms::{DraftStatus, EmailMetadata, EmailType};
use orc_core::schema::{AnalystOutput, GatekeeperOutput, GuardianOutput, PipelineResult};
use orc_core::workflow::{ApprovalDecision, LogEntry, ReviewSession, RunStatus, WorkflowPhase};
use orc_pipeline::DocumentInput;

use crate::error::ApiError;
use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// Wire view of one review session
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: RunStatus,
    pub phase: WorkflowPhase,
    pub filename: Option<String>,
    pub requires_human_review: bool,
    pub approval: Option<ApprovalDecision>,
    pub result: Option<PipelineResult>,
    pub logs: Vec<LogEntry>,
}

impl SessionSnapshot {
    fn capture(id: &str, session: &ReviewSession) -> Self {
        Self {
            session_id: id.to_string(),
            status: session.status,
            phase: session.phase(),
            filename: session.filename.clone(),
            requires_human_review: session.requires_human_review(),
            approval: session.approval.clone(),
            result: session.result.clone(),
            logs: session.logs.clone(),
        }
    }
}

/// Pipeline output returned by `POST /api/orchestrate`
#[derive(Debug, Serialize)]
pub struct OrchestrateResponse {
    pub session_id: String,
    pub gatekeeper: GatekeeperOutput,
    pub analyst: Option<AnalystOutput>,
    pub guardian: Option<GuardianOutput>,
}

/// Run the full pipeline over an uploaded document
pub async fn orchestrate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<OrchestrateResponse>, ApiError> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("failed to read file field: {}", e)))?
                .to_vec();
            document = Some(DocumentInput {
                filename,
                mime_type,
                data,
            });
            break;
        }
    }
    let document = document.ok_or(ApiError::MissingFile)?;

    let session_id = Uuid::new_v4().to_string();
    {
        let mut sessions = state.sessions.write();
        let mut session = ReviewSession::new();
        session.begin(&document.filename, document.data.len() as u64);
        sessions.insert(session_id.clone(), session);
    }

    match state.orchestrator().run(&document).await {
        Ok(result) => {
            let response = OrchestrateResponse {
                session_id: session_id.clone(),
                gatekeeper: result.gatekeeper.clone(),
                analyst: result.analyst.clone(),
                guardian: result.guardian.clone(),
            };
            let mut sessions = state.sessions.write();
            if let Some(session) = sessions.get_mut(&session_id) {
                session.complete(result);
            }
            Ok(Json(response))
        }
        Err(e) => {
            let message = e.to_string();
            let mut sessions = state.sessions.write();
            if let Some(session) = sessions.get_mut(&session_id) {
                session.fail(&message);
            }
            Err(ApiError::ClassificationFailed(message))
        }
    }
}

/// Get a session snapshot by ID
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let sessions = state.sessions.read();
    let session = sessions
        .get(&id)
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    Ok(Json(SessionSnapshot::capture(&id, session)))
}

fn audit_decision(
    state: &AppState,
    session: &ReviewSession,
    action: AuditAction,
    reason: Option<String>,
) {
    if let Some(result) = &session.result {
        let filename = session.filename.as_deref().unwrap_or("unknown");
        state
            .audit
            .write()
            .record(AuditEntry::from_decision(action, result, filename, reason));
    }
}

/// Approve the pending result of a session
pub async fn approve_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut sessions = state.sessions.write();
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    session.approve()?;
    audit_decision(&state, session, AuditAction::Approved, None);
    Ok(Json(SessionSnapshot::capture(&id, session)))
}

/// Reject the pending result of a session with a reason
pub async fn reject_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let reason = body
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let mut sessions = state.sessions.write();
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    session.reject(&reason)?;
    audit_decision(&state, session, AuditAction::Rejected, Some(reason));
    Ok(Json(SessionSnapshot::capture(&id, session)))
}

/// Escalate the pending result of a session to manual review
pub async fn flag_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mut sessions = state.sessions.write();
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| ApiError::SessionNotFound(id.clone()))?;
    session.flag_for_review()?;
    audit_decision(&state, session, AuditAction::FlaggedForReview, None);
    Ok(Json(SessionSnapshot::capture(&id, session)))
}

/// List all audit entries, newest first
pub async fn list_audit(State(state): State<Arc<AppState>>) -> Json<Value> {
    let audit = state.audit.read();
    Json(json!({ "entries": audit.entries() }))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Export the audit log as raw JSON or CSV
pub async fn export_audit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let audit = state.audit.read();
    match query.format.as_deref().unwrap_or("json") {
        "json" => {
            let body = audit
                .export_json()
                .map_err(|e| ApiError::Internal(e.to_string()))?;
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
        "csv" => Ok(([(header::CONTENT_TYPE, "text/csv")], audit.export_csv()).into_response()),
        other => Err(ApiError::InvalidRequest(format!(
            "unknown export format {:?}",
            other
        ))),
    }
}

/// Drop all audit entries
pub async fn clear_audit(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut audit = state.audit.write();
    let cleared = audit.len();
    audit.clear();
    Json(json!({ "cleared": cleared }))
}

/// Generate an email draft and store it in the communication log
pub async fn compose_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let (Some(raw_type), Some(raw_metadata)) = (body.get("type"), body.get("metadata")) else {
        return Err(ApiError::InvalidRequest(
            "Missing required fields: type and metadata".to_string(),
        ));
    };
    let email_type: EmailType = serde_json::from_value(raw_type.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid email type: {}", e)))?;
    let metadata: EmailMetadata = serde_json::from_value(raw_metadata.clone())
        .map_err(|e| ApiError::InvalidRequest(format!("invalid metadata: {}", e)))?;

    let draft = state
        .composer()
        .compose(email_type, metadata)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    state.comms.write().add(draft.clone());
    Ok(Json(json!({ "draft": draft })))
}

#[derive(Debug, Deserialize)]
pub struct DraftQuery {
    pub status: Option<String>,
}

/// List drafts, optionally filtered by status
pub async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DraftQuery>,
) -> Result<Json<Value>, ApiError> {
    let comms = state.comms.read();
    match query.status.as_deref() {
        Some(raw) => {
            let status: DraftStatus = raw
                .parse()
                .map_err(|_| ApiError::InvalidRequest(format!("unknown draft status {:?}", raw)))?;
            Ok(Json(json!({ "drafts": comms.by_status(status) })))
        }
        None => Ok(Json(json!({ "drafts": comms.drafts() }))),
    }
}

/// Mark a draft approved
pub async fn approve_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let draft = state.comms.write().approve(&id)?;
    Ok(Json(json!({ "draft": draft })))
}

/// Mark a draft rejected
pub async fn reject_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let draft = state.comms.write().reject(&id)?;
    Ok(Json(json!({ "draft": draft })))
}

/// Mark a draft sent
pub async fn mark_draft_sent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let draft = state.comms.write().mark_sent(&id)?;
    Ok(Json(json!({ "draft": draft })))
}

/// Delete a draft
pub async fn delete_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.comms.write().delete(&id)?;
    Ok(Json(json!({ "deleted": id })))
}
