//! Request gate.
//!
//! Every patient, record and odontogram route passes through [`require_identity`] before its
//! handler runs, so an unauthenticated call is answered with 401 before any extractor reads the
//! body and before any store access.

use crate::error::ApiError;
use api_shared::IdentityVerifier;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Verifies the `Authorization` header and attaches the caller's
/// [`SubjectId`](odonto_types::SubjectId) as a request extension.
pub async fn require_identity(
    State(verifier): State<Arc<IdentityVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // A header that is not visible ASCII is treated like an absent one.
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());

    let subject = verifier
        .verify(header)
        .map_err(|_| ApiError::Unauthenticated)?;

    req.extensions_mut().insert(subject);
    Ok(next.run(req).await)
}
