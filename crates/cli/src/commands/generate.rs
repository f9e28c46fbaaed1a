//! `codeweaver generate` — One-shot generation from the command line.

use codeweaver_config::AppConfig;
use codeweaver_core::Language;
use codeweaver_core::generation::{GenerateInput, finalize_code};
use codeweaver_core::provider::CodeGenerator;
use codeweaver_providers::CodeModelClient;

pub async fn run(prompt: &str, language: Language) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Same limits as the HTTP endpoint.
    let input = GenerateInput::from_json(&serde_json::json!({
        "prompt": prompt,
        "language": language.as_str(),
    }))?;

    let client = CodeModelClient::from_config(&config.model)?;
    let raw = client.generate(&input.prompt, input.language).await;
    if raw.is_empty() {
        tracing::warn!("No code returned by the model; printing fallback");
    }

    println!("{}", finalize_code(raw, &input.prompt));
    Ok(())
}
