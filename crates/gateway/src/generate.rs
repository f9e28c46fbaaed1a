//! `POST /api/generate`

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use codeweaver_core::generation::{
    ANONYMOUS_USERNAME, GenerateInput, Generation, NewGeneration, finalize_code,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::SharedState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub data: Generation,
}

pub async fn generate_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    let principal = state.resolver.resolve(&headers);
    if principal.is_none() && !state.allow_anonymous {
        warn!("Rejected unauthenticated generate request");
        return Err(ApiError::Unauthorized);
    }

    let payload: serde_json::Value =
        serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}));
    let input = GenerateInput::from_json(&payload)?;

    info!(
        language = %input.language,
        prompt_chars = input.prompt.chars().count(),
        anonymous = principal.is_none(),
        "Generate request"
    );

    let raw = run_generator(&state, &input).await;
    if raw.is_empty() {
        warn!("Model returned nothing; storing fallback text");
    }
    let code = finalize_code(raw, &input.prompt);

    let user = match &principal {
        Some(external_id) => state.store.upsert_user_by_external_id(external_id).await?,
        None => {
            state
                .store
                .upsert_user_by_username(ANONYMOUS_USERNAME, &anonymous_external_id())
                .await?
        }
    };

    let generation = state
        .store
        .create_generation(NewGeneration {
            user_id: user.id,
            prompt: input.prompt,
            language: input.language,
            code,
        })
        .await?;

    info!(id = %generation.id, code_chars = generation.code.chars().count(), "Generation stored");
    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            success: true,
            data: generation,
        }),
    ))
}

/// Run the model client, bounded by the gateway timeout when one is set.
/// Expiry counts as an empty result.
async fn run_generator(state: &SharedState, input: &GenerateInput) -> String {
    let call = state.generator.generate(&input.prompt, input.language);
    match state.generation_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(code) => code,
            Err(_) => {
                warn!(timeout_secs = limit.as_secs(), "Generation timed out");
                String::new()
            }
        },
        None => call.await,
    }
}

/// External id given to the shared anonymous user when it is first created.
fn anonymous_external_id() -> String {
    format!("anon_{}", Utc::now().timestamp_millis())
}
