//! Shared-secret guard for scheduler-triggered endpoints.

use crate::error::AppError;
use crate::utils::secret::secrets_match;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

const REJECTION_MESSAGE: &str = "Unauthorized: Invalid or missing cron secret.";

/// The expected trigger secret.
#[derive(Clone)]
pub struct SharedSecret(Arc<SecretString>);

impl SharedSecret {
    pub fn new(secret: Arc<SecretString>) -> Self {
        Self(secret)
    }

    fn matches(&self, presented: &str) -> bool {
        secrets_match(self.0.expose_secret(), presented)
    }
}

/// Reject the request with 401 unless `x-cron-secret` matches.
///
/// Rejection happens before the handler runs, so nothing downstream is
/// touched.
pub async fn require_shared_secret(
    State(secret): State<SharedSecret>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = req
        .headers()
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(value) if secret.matches(value) => Ok(next.run(req).await),
        Some(_) => {
            tracing::warn!(path = %req.uri().path(), "Rejected trigger with wrong secret");
            Err(AppError::Unauthorized(REJECTION_MESSAGE.to_string()))
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Rejected trigger without secret");
            Err(AppError::Unauthorized(REJECTION_MESSAGE.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::post};
    use tower::ServiceExt;

    fn app() -> Router {
        let secret = SharedSecret::new(Arc::new(SecretString::new("cron-secret".to_string())));
        Router::new()
            .route("/jobs/run", post(|| async { "ran" }))
            .layer(middleware::from_fn_with_state(secret, require_shared_secret))
    }

    fn request(secret: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method("POST").uri("/jobs/run");
        if let Some(secret) = secret {
            builder = builder.header(CRON_SECRET_HEADER, secret);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn accepts_matching_secret() {
        let response = app().oneshot(request(Some("cron-secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_wrong_or_missing_secret() {
        let wrong = app().oneshot(request(Some("cron-secreT"))).await.unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let missing = app().oneshot(request(None)).await.unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    }
}
