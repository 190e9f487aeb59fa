//! Payment-proof submission: upload the image, then record it.

use axum::{
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::storage::insert_proof;
use crate::api::{
    error::ApiError,
    handlers::auth::session::{self, extract_bearer_token, AuthError},
    state::AppState,
};

struct ProofUpload {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
    cart_json: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<ProofUpload, ApiError> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut cart_json = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::Validation(format!("Malformed upload: {err}")))?
    {
        match field.name() {
            Some("proof") => {
                let filename = field
                    .file_name()
                    .map_or_else(|| "proof".to_string(), ToString::to_string);
                let content_type = field
                    .content_type()
                    .map_or_else(|| "application/octet-stream".to_string(), ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::Validation(format!("Malformed upload: {err}")))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            Some("cartJson") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::Validation(format!("Malformed upload: {err}")))?;
                cart_json = Some(text);
            }
            _ => {}
        }
    }

    let Some((filename, content_type, bytes)) = file else {
        return Err(ApiError::Validation("No file uploaded".to_string()));
    };

    Ok(ProofUpload {
        filename,
        content_type,
        bytes,
        cart_json,
    })
}

/// Accept a proof-of-payment image.
///
/// The object lands in the bucket before the row is written; if the row
/// write fails the object is deleted again so the store never references
/// nor orphans anything silently.
#[utoipa::path(
    post,
    path = "/api/confirm-payment",
    responses(
        (status = 200, description = "Proof stored"),
        (status = 400, description = "No file in the upload"),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Object storage unavailable")
    ),
    security(("bearer" = [])),
    tag = "payment"
)]
pub async fn confirm_payment(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    // Token validity is all that gates submission; no role is involved.
    let token = extract_bearer_token(&headers).ok_or(AuthError::Missing)?;
    let claims = session::verify(state.jwt_secret(), &token)?;

    let upload = read_upload(multipart).await?;

    let key = crate::bucket::object_key(&upload.filename);
    state
        .bucket()
        .put_object(&key, upload.bytes, &upload.content_type)
        .await
        .map_err(ApiError::Upstream)?;
    let url = state.bucket().public_url(&key);

    // The stored filename is the generated key; the client-supplied name
    // only contributes its extension.
    let record = insert_proof(
        &pool,
        claims.sub,
        &key,
        &url,
        upload.cart_json.as_deref().unwrap_or_default(),
    )
    .await;

    let record = match record {
        Ok(record) => record,
        Err(err) => {
            // Undo the upload so the object does not outlive a row that
            // was never written.
            if let Err(cleanup) = state.bucket().delete_object(&key).await {
                error!("failed to delete orphaned proof object {key}: {cleanup:#}");
            }
            return Err(ApiError::Internal(err));
        }
    };

    info!(proof_id = %record.id, user_id = %claims.sub, "payment proof stored");

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Payment proof uploaded", "url": url })),
    ))
}
