//! `codeweaver init` — First-time setup.

use std::path::Path;

use codeweaver_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("Codeweaver — First-Time Setup");
    println!("=============================\n");

    let created = write_default_config(&config_dir)?;
    let config_path = config_dir.join("config.toml");
    if created {
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\nNext steps:");
        println!("  1. Set your endpoint key: export HF_TOKEN=hf_...");
        println!("  2. Add bearer tokens under [auth.tokens], or set auth.principal_header behind an auth proxy");
        println!("  3. Start the server: codeweaver serve");
    } else {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete it and re-run init.");
    }

    Ok(())
}

/// Create `dir` and a default `config.toml` inside it. Returns `false` when
/// a config file is already present; it is never overwritten.
fn write_default_config(dir: &Path) -> std::io::Result<bool> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join("config.toml");
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(&path, AppConfig::default_toml())?;
    Ok(true)
}
