use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub const SESSION_HEADER: &str = "x-session-id";
pub const FALLBACK_ANSWER: &str = "Sorry, I encountered an issue generating a response.";

const MAX_SESSION_ID_LEN: usize = 128;
const QUERY_LOG_CHARS: usize = 50;
const ANSWER_LOG_CHARS: usize = 100;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub session_id: String,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let Some(chain) = state.chain.chain() else {
        tracing::error!(
            "Chat request received but chain is not ready ({})",
            state.chain.state().label()
        );
        return Err(ApiError::ServiceUnavailable);
    };

    if !is_json(&headers) {
        return Err(ApiError::BadRequest("Request must be JSON".to_string()));
    }
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid JSON body: {}", err)))?;

    let query = payload
        .get("query")
        .and_then(Value::as_str)
        .filter(|query| !query.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing 'query' in request body".to_string()))?;
    let session_id = resolve_session_id(&payload, &headers)?;

    tracing::info!(
        "Received query for session {}: {}...",
        session_id,
        snippet(query, QUERY_LOG_CHARS)
    );

    let output = chain.ask(&session_id, query).await.map_err(|err| {
        tracing::error!("Error processing chat request: {:?}", err);
        ApiError::internal(err)
    })?;

    let answer = output
        .answer
        .unwrap_or_else(|| FALLBACK_ANSWER.to_string())
        .trim()
        .to_string();
    tracing::info!("Generated answer: {}...", snippet(&answer, ANSWER_LOG_CHARS));

    Ok(Json(ChatResponse { answer, session_id }))
}

pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chain = state.chain.chain().ok_or(ApiError::ServiceUnavailable)?;
    let cleared = chain.memory().clear(&session_id);
    if cleared {
        tracing::info!("Cleared chat session {}", session_id);
    }
    Ok(Json(json!({ "cleared": cleared })))
}

fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
    else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Body `session_id` wins over the header; a fresh id is issued when neither is set.
fn resolve_session_id(payload: &Value, headers: &HeaderMap) -> Result<String, ApiError> {
    let supplied = payload
        .get("session_id")
        .and_then(Value::as_str)
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
        })
        .map(str::trim)
        .filter(|id| !id.is_empty());

    match supplied {
        Some(id) if id.chars().count() > MAX_SESSION_ID_LEN => Err(ApiError::BadRequest(
            format!("'session_id' must be at most {} characters", MAX_SESSION_ID_LEN),
        )),
        Some(id) => Ok(id.to_string()),
        None => Ok(Uuid::new_v4().to_string()),
    }
}

fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).expect("header"),
        );
        headers
    }

    #[test]
    fn json_content_types_are_recognized() {
        assert!(is_json(&headers("application/json")));
        assert!(is_json(&headers("Application/JSON; charset=utf-8")));
        assert!(is_json(&headers("application/vnd.api+json")));
        assert!(!is_json(&headers("text/plain")));
        assert!(!is_json(&headers("application/x-www-form-urlencoded")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[test]
    fn body_session_id_takes_precedence_over_header() {
        let mut headers = headers("application/json");
        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));

        let from_body =
            resolve_session_id(&json!({ "session_id": "from-body" }), &headers).expect("id");
        let from_header = resolve_session_id(&json!({}), &headers).expect("id");

        assert_eq!(from_body, "from-body");
        assert_eq!(from_header, "from-header");
    }

    #[test]
    fn missing_session_id_generates_a_uuid() {
        let id = resolve_session_id(&json!({ "session_id": "  " }), &HeaderMap::new())
            .expect("id");

        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn overlong_session_id_is_rejected() {
        let long = "a".repeat(MAX_SESSION_ID_LEN + 1);

        let result = resolve_session_id(&json!({ "session_id": long }), &HeaderMap::new());

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("Žižek", 2), "Ži");
        assert_eq!(snippet("short", 50), "short");
        assert_eq!(snippet("", 5), "");
    }
}
