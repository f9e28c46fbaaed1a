//! `codeweaver config` — Show the effective configuration.

use codeweaver_config::AppConfig;
use codeweaver_gateway::auth::trusted_header;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("❌ Config error: {e}");
            return Err(e.into());
        }
    };

    println!("Config: {}", AppConfig::config_dir().join("config.toml").display());
    println!("   Endpoint:  {}", config.model.endpoint_url);
    println!("   Model:     {}", config.model.model);
    println!(
        "   API key:   {}",
        if config.has_api_key() { "set" } else { "not set" }
    );
    println!(
        "   Retries:   {} (budget {} → {} tokens)",
        config.model.retries, config.model.initial_max_tokens, config.model.max_cap_tokens
    );
    println!("   Gateway:   {}:{}", config.gateway.host, config.gateway.port);
    println!("   Storage:   {}", config.storage.database_url);
    println!("   Anonymous: {}", config.auth.allow_anonymous);
    println!(
        "   Principal header: {}",
        trusted_header(&config.auth).unwrap_or("off")
    );
    println!("   Tokens:    {}", config.auth.tokens.len());

    let warnings = warnings(&config);
    if !warnings.is_empty() {
        println!();
        for w in &warnings {
            println!("   ⚠️  {w}");
        }
    }

    tracing::debug!(config = ?config, "Effective configuration");
    Ok(())
}

fn warnings(config: &AppConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set CODEWEAVER_API_KEY or HF_TOKEN)");
    }
    if config.auth.allow_anonymous {
        warnings.push("Anonymous access is on; unauthenticated generations share one user");
    }
    if trusted_header(&config.auth).is_some() {
        warnings.push("Principal header is trusted; clients must not reach the gateway directly");
    }
    if config.gateway.host == "0.0.0.0" {
        warnings.push("Gateway binds all interfaces; only expose it behind an auth proxy");
    }
    if config.storage.database_url == codeweaver_store::IN_MEMORY_URL {
        warnings.push("In-memory storage: generations are lost on restart");
    }
    warnings
}
