use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use uuid::Uuid;

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::auth;
use crate::export;
use crate::generation::outline;
use crate::models::*;
use crate::pipeline::{ContentJob, SubmitError};
use crate::refine;
use crate::state::AppState;

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Accounts
// ============================================================

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = input.email.trim();
    if email.is_empty() || input.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let hash = auth::hash_password(&input.password).map_err(anyhow::Error::from)?;
    match state.db.create_user(email, &hash)? {
        Some(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            Ok(Json(serde_json::json!({ "message": "User created" })))
        }
        None => Err(ApiError::Conflict("Email already registered")),
    }
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_email(form.username.trim())?
        .filter(|user| auth::verify_password(&form.password, &user.password_hash))
        .ok_or(ApiError::BadCredentials)?;

    let access_token = state.auth.issue(&user.email).map_err(anyhow::Error::from)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// ============================================================
// Outlines
// ============================================================

pub async fn generate_template(
    State(state): State<AppState>,
    Query(query): Query<OutlineQuery>,
) -> Json<OutlineResponse> {
    let outline = outline::suggest_outline(
        state.generator.as_ref(),
        &query.topic,
        &query.doc_type,
        &query.context,
    )
    .await;
    Json(OutlineResponse { outline })
}

// ============================================================
// Projects
// ============================================================

pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CreateProjectInput>,
) -> Result<Json<ProjectCreated>, ApiError> {
    let created = state.db.create_project(user.id, input)?;
    let id = created.project.id;
    tracing::info!(project_id = %id, sections = created.sections.len(), "Project created");

    // rows are committed; the job may start right away
    match state.jobs.submit(ContentJob::for_project(&created)) {
        Ok(()) => {}
        Err(SubmitError::Full) => {
            // nothing will ever fill the placeholders
            state.db.delete_project(id, user.id)?;
            tracing::warn!(project_id = %id, "Job queue full, project discarded");
            return Err(ApiError::Busy);
        }
        Err(e @ SubmitError::Closed) => return Err(anyhow::Error::from(e).into()),
    }

    Ok(Json(ProjectCreated {
        id,
        message: "Project started".to_string(),
    }))
}

pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ProjectWithSections>>, ApiError> {
    Ok(Json(state.db.get_projects_for_user(user.id)?))
}

pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithSections>, ApiError> {
    state
        .db
        .get_project_for_user(id, user.id)?
        .map(Json)
        .ok_or(ApiError::NotFound("Project not found"))
}

pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_project(id, user.id)? {
        tracing::info!(project_id = %id, "Project deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Project not found"))
    }
}

pub async fn export_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let project = state
        .db
        .get_project_with_sections(id)?
        .filter(|p| state.access.permits(p.project.user_id, user.id))
        .ok_or(ApiError::NotFound("Project not found"))?;

    let file = export::render(&project)?;
    tracing::info!(project_id = %id, bytes = file.bytes.len(), "Project exported");

    let disposition = HeaderValue::from_str(&content_disposition(&file.filename))
        .map_err(anyhow::Error::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(file.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

// ============================================================
// Sections
// ============================================================

/// Look up a section the caller may act on under the access policy.
fn accessible_section(state: &AppState, user: &User, section_id: Uuid) -> Result<Section, ApiError> {
    let section = state
        .db
        .get_section(section_id)?
        .ok_or(ApiError::NotFound("Section not found"))?;
    let project = state
        .db
        .get_project(section.project_id)?
        .ok_or(ApiError::NotFound("Section not found"))?;

    if !state.access.permits(project.user_id, user.id) {
        tracing::warn!(section_id = %section_id, user_id = %user.id, "Section access denied");
        return Err(ApiError::NotFound("Section not found"));
    }
    Ok(section)
}

pub async fn refine_section(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<RefineInput>,
) -> Result<Json<RefineResponse>, ApiError> {
    let section = accessible_section(&state, &user, input.section_id)?;
    tracing::info!(section_id = %section.id, "Refining section");

    let content = refine::refine_section(
        &state.db,
        state.generator.as_ref(),
        state.sleeper.as_ref(),
        state.refine_retry,
        &section,
        &input.instruction,
    )
    .await?;
    Ok(Json(RefineResponse { content }))
}

pub async fn save_feedback(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let section = accessible_section(&state, &user, input.section_id)?;
    let comments = input.comment.unwrap_or_default();

    if !state
        .db
        .set_section_feedback(section.id, &input.feedback_type, &comments)?
    {
        return Err(ApiError::NotFound("Section not found"));
    }
    tracing::debug!(section_id = %section.id, feedback = input.feedback_type.as_str(), "Feedback saved");
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

// ============================================================
// Helpers
// ============================================================

/// `attachment` disposition with an ASCII fallback name and the exact
/// UTF-8 name in `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}
