//! Webhook API Handler
//!
//! Receives GitHub push notifications. When a webhook secret is configured
//! every delivery must carry a valid `X-Hub-Signature-256`.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::api::error::{ApiError, ApiResult};
use crate::service::webhook_service::{self, PushEvent};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Checks `sha256=<hex>` against the HMAC of the raw body
fn verify_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> ApiResult<()> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("sha256="))
        .ok_or_else(|| ApiError::Unauthorized("Missing webhook signature".to_string()))?;

    let expected = hex::decode(signature)
        .map_err(|_| ApiError::Unauthorized("Malformed webhook signature".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::InternalError(format!("Invalid webhook secret: {}", e)))?;
    mac.update(body);

    // constant-time comparison
    mac.verify_slice(&expected)
        .map_err(|_| ApiError::Unauthorized("Webhook signature mismatch".to_string()))
}

/// POST /webhook/github
/// 202 with the queued run for a matching push, 204 for anything ignored
pub async fn github_push(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        verify_signature(secret, &headers, &body)?;
    }

    let event = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if event != "push" {
        tracing::debug!("Ignoring '{}' webhook event", event);
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let push: PushEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid push event: {}", e)))?;

    match webhook_service::handle_push(&state, push).await? {
        Some(accepted) => Ok((StatusCode::ACCEPTED, Json(accepted)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;
    use axum::http::HeaderValue;
    use serde_json::{Value as JsonValue, json};

    const SECRET: &str = "It's a Secret to Everybody";

    fn headers(event: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(EVENT_HEADER, HeaderValue::from_str(event).unwrap());
        headers
    }

    fn signed(event: &str, body: &Bytes) -> HeaderMap {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

        let mut headers = headers(event);
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&signature).unwrap());
        headers
    }

    fn body(value: JsonValue) -> Bytes {
        Bytes::from(serde_json::to_vec(&value).unwrap())
    }

    fn push(git_ref: &str) -> Bytes {
        body(json!({
            "ref": git_ref,
            "after": "abc123",
            "repository": { "name": "shop", "owner": { "login": "acme" } }
        }))
    }

    fn secured_state() -> AppState {
        let mut state = testing::state();
        state.webhook_secret = Some(SECRET.to_string());
        state
    }

    #[tokio::test]
    async fn test_matching_push_is_accepted() {
        let response = github_push(
            State(testing::state()),
            headers("push"),
            push("refs/heads/main"),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_other_events_are_ignored() {
        let state = testing::state();

        let ping = github_push(State(state.clone()), headers("ping"), body(json!({ "zen": "hi" })))
            .await
            .unwrap();
        assert_eq!(ping.status(), StatusCode::NO_CONTENT);

        let other_branch =
            github_push(State(state.clone()), headers("push"), push("refs/heads/dev"))
                .await
                .unwrap();
        assert_eq!(other_branch.status(), StatusCode::NO_CONTENT);

        assert!(state.runs.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_push_is_bad_request() {
        let result =
            github_push(State(testing::state()), headers("push"), body(json!({ "ref": 1 }))).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_signed_push_is_accepted() {
        let payload = push("refs/heads/main");
        let response = github_push(State(secured_state()), signed("push", &payload), payload)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_unsigned_or_forged_push_is_rejected() {
        let state = secured_state();

        let unsigned =
            github_push(State(state.clone()), headers("push"), push("refs/heads/main")).await;
        assert!(matches!(unsigned, Err(ApiError::Unauthorized(_))));

        // signature of a different body
        let forged_headers = signed("push", &push("refs/heads/dev"));
        let forged = github_push(State(state.clone()), forged_headers, push("refs/heads/main")).await;
        assert!(matches!(forged, Err(ApiError::Unauthorized(_))));

        let mut garbled = headers("push");
        garbled.insert(SIGNATURE_HEADER, HeaderValue::from_static("sha256=not-hex"));
        let garbled = github_push(State(state.clone()), garbled, push("refs/heads/main")).await;
        assert!(matches!(garbled, Err(ApiError::Unauthorized(_))));

        assert!(state.runs.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_known_signature() {
        // published GitHub example delivery
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            HeaderValue::from_static(
                "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17",
            ),
        );
        assert!(verify_signature(SECRET, &headers, b"Hello, World!").is_ok());
        assert!(verify_signature("other", &headers, b"Hello, World!").is_err());
    }
}
