use axum::{
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

/// Resolved caller, available to handlers via request extensions. The uid
/// keys every store partition and credential lookup; it is never held in
/// process-wide state.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub uid: String,
}

#[derive(Serialize)]
struct AuthError {
    success: bool,
    error: String,
}

pub async fn auth_middleware<B>(
    Extension(config): Extension<std::sync::Arc<AuthConfig>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    if !config.enabled {
        req.extensions_mut().insert(CallerIdentity {
            uid: "anonymous".to_string(),
        });
        return next.run(req).await;
    }

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).trim());

    match token {
        Some(token) => {
            match config
                .tokens
                .iter()
                .find(|entry| entry.token.as_bytes().ct_eq(token.as_bytes()).into())
            {
                Some(entry) => {
                    tracing::debug!(uid = %entry.uid, "Authenticated request");
                    req.extensions_mut().insert(CallerIdentity {
                        uid: entry.uid.clone(),
                    });
                    next.run(req).await
                }
                None => {
                    tracing::warn!("Invalid bearer token presented");
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(AuthError {
                            success: false,
                            error: "Invalid bearer token".to_string(),
                        }),
                    )
                        .into_response()
                }
            }
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(AuthError {
                success: false,
                error: "Missing bearer token. Provide Authorization: Bearer <token>".to_string(),
            }),
        )
            .into_response(),
    }
}
