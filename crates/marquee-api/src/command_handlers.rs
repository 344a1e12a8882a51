//! Chat slash-command endpoints.
//!
//! The chat service posts a form for every `/marquee ...` invocation and
//! probes `GET /command?ssl_check=1` when the integration is configured.
//! The shared token is checked before any command text is looked at.

use axum::Form;
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{ApiError, ApiState};

/// Form fields sent by the chat service. Only `token`, `text` and
/// `user_name` are used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChatCommandForm {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
}

/// POST /command
///
/// Always `200 text/plain` once authenticated: either the confirmation or a
/// message crafted for the chat user.
pub async fn post_command(
    State(state): State<ApiState>,
    form: Result<Form<ChatCommandForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::Internal(format!("chat form: {e}")))?;

    match state.chat_token.as_deref() {
        Some(expected) if expected == form.token => {}
        _ => {
            warn!(user = %form.user_name, "chat command with wrong token");
            return Err(ApiError::Unauthorized);
        }
    }

    let actor = if form.user_name.is_empty() {
        "unknown"
    } else {
        form.user_name.as_str()
    };
    info!(user = %actor, text = %form.text, "chat command");

    let message = match state.dispatcher.run(&form.text, actor) {
        Ok(message) => message,
        Err(e) => {
            warn!(user = %actor, error = %e, "chat command failed");
            e.user_message()
        }
    };
    Ok((StatusCode::OK, message))
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandProbe {
    pub ssl_check: Option<String>,
}

/// GET /command
pub async fn get_command(Query(probe): Query<CommandProbe>) -> Result<impl IntoResponse, ApiError> {
    match probe.ssl_check.as_deref() {
        Some("1") => Ok((StatusCode::OK, "")),
        _ => Err(ApiError::BadRequest("Use POST /command".to_string())),
    }
}
