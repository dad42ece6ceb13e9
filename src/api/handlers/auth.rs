//! Thin HTTP endpoints over the auth service. Parsing and status mapping
//! only; all state-machine behavior lives in `crate::auth`.

use axum::{
    extract::{Extension, Path},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::auth::{AuthError, AuthService, PrincipalKind, SessionTokens};

#[derive(Deserialize, Debug)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize, Debug)]
pub struct RegisterResponse {
    pub family_code: String,
    pub verify_token: String,
    pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Deserialize, Debug)]
pub struct CreateChildRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Serialize, Debug)]
pub struct CreateChildResponse {
    pub id: Uuid,
    pub name: String,
    pub pin: String,
    pub pairing_code: String,
    pub pairing_code_expires_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub struct PairingRequest {
    #[serde(default)]
    pub pairing_code: String,
    #[serde(default)]
    pub pin: String,
}

#[derive(Deserialize, Debug)]
pub struct ChildLoginRequest {
    #[serde(default)]
    pub family_code: String,
    #[serde(default)]
    pub pin: String,
}

#[derive(Serialize, Debug)]
struct MessageBody {
    message: String,
}

pub async fn parent_register(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    match service.parent_register(&request.email).await {
        Ok(registered) => (
            StatusCode::OK,
            Json(RegisterResponse {
                family_code: registered.family_code,
                verify_token: registered.verify_token,
                message: "Account created. Please set your password.".to_string(),
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub async fn parent_set_password(
    service: Extension<Arc<AuthService>>,
    Path(verify_token): Path<String>,
    Json(request): Json<SetPasswordRequest>,
) -> Response {
    match service
        .parent_set_password(
            &verify_token,
            &request.name,
            request.phone_number.as_deref(),
            &request.password,
        )
        .await
    {
        Ok(()) => message_response(StatusCode::OK, "Your account has been set. You can login now."),
        Err(err) => error_response(&err),
    }
}

pub async fn parent_login(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match service.parent_login(&request.email, &request.password).await {
        Ok(tokens) => session_response(StatusCode::OK, &tokens),
        Err(err) => login_error_response(&err),
    }
}

pub async fn refresh(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<RefreshRequest>,
) -> Response {
    match service.refresh(&request.refresh_token).await {
        Ok(tokens) => session_response(StatusCode::OK, &tokens),
        Err(err) => error_response(&err),
    }
}

pub async fn logout(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<RefreshRequest>,
) -> Response {
    // Always succeeds, even when the token is already invalid.
    service.logout(&request.refresh_token).await;
    StatusCode::NO_CONTENT.into_response()
}

pub async fn create_child(
    headers: HeaderMap,
    service: Extension<Arc<AuthService>>,
    Json(request): Json<CreateChildRequest>,
) -> Response {
    // Only a parent session may create children.
    let claims = match bearer_token(&headers)
        .ok_or(AuthError::Unauthorized)
        .and_then(|token| service.authorize(&token, &[PrincipalKind::Parent]))
    {
        Ok(claims) => claims,
        Err(err) => return error_response(&err),
    };

    match service.create_child(claims.id, &request.name).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(CreateChildResponse {
                id: created.id,
                name: created.name,
                pin: created.pin,
                pairing_code: created.pairing_code,
                pairing_code_expires_at: created.pairing_code_expires_at,
            }),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}

pub async fn child_pairing(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<PairingRequest>,
) -> Response {
    match service
        .child_pairing(&request.pairing_code, &request.pin)
        .await
    {
        Ok(tokens) => session_response(StatusCode::OK, &tokens),
        Err(err) => error_response(&err),
    }
}

pub async fn child_login(
    service: Extension<Arc<AuthService>>,
    Json(request): Json<ChildLoginRequest>,
) -> Response {
    match service.child_login(&request.family_code, &request.pin).await {
        Ok(tokens) => session_response(StatusCode::OK, &tokens),
        Err(err) => login_error_response(&err),
    }
}

fn session_response(status: StatusCode, tokens: &SessionTokens) -> Response {
    (status, Json(tokens.clone())).into_response()
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(MessageBody {
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) | AuthError::AccountNotConfigured => StatusCode::BAD_REQUEST,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Locked => StatusCode::TOO_MANY_REQUESTS,
        AuthError::Expired(_) | AuthError::InvalidCredential | AuthError::Unauthorized => {
            StatusCode::UNAUTHORIZED
        }
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &AuthError) -> Response {
    if let AuthError::Internal(inner) = err {
        error!(error = %inner, "auth operation failed");
        return message_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
    }
    message_response(status_for(err), &err.to_string())
}

/// Login paths render lookup failures and bad secrets identically so the
/// response cannot be used for account enumeration. The log line keeps the
/// real kind.
fn login_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::NotFound(_) | AuthError::InvalidCredential => {
            warn!(kind = err.kind(), "login rejected");
            message_response(StatusCode::UNAUTHORIZED, "Invalid credentials")
        }
        other => error_response(other),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::http::HeaderValue;

    #[test]
    fn status_mapping_follows_the_taxonomy() {
        assert_eq!(
            status_for(&AuthError::Validation("email is required".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AuthError::NotFound("account")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AuthError::AccountNotConfigured),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&AuthError::Locked), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_for(&AuthError::Expired("pairing code")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&AuthError::InvalidCredential),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&AuthError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&AuthError::Internal(anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn login_failures_collapse_to_one_message() {
        let not_found = login_error_response(&AuthError::NotFound("account"));
        let bad_secret = login_error_response(&AuthError::InvalidCredential);
        assert_eq!(not_found.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(bad_secret.status(), StatusCode::UNAUTHORIZED);

        // Locked is not collapsed: the caller must learn to back off.
        let locked = login_error_response(&AuthError::Locked);
        assert_eq!(locked.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer  xyz "));
        assert_eq!(bearer_token(&headers).as_deref(), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
