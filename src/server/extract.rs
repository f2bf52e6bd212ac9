// Extractors whose rejections use the gateway's JSON error body.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::GatewayError;

/// `axum::extract::Path`, rejecting with `GatewayError::BadRequest`.
pub struct RoutePath<T>(pub T);

impl<T, S> FromRequestParts<S> for RoutePath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(GatewayError::BadRequest(rejection.body_text())),
        }
    }
}
