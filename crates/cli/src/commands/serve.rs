//! `codeweaver serve` — Start the HTTP API server.

use std::path::PathBuf;

use codeweaver_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    if let Some(dir) = sqlite_parent_dir(&config.storage.database_url) {
        std::fs::create_dir_all(&dir)?;
    }

    println!("Codeweaver Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.model.model);
    println!("   Storage:   {}", config.storage.database_url);
    println!("   Anonymous: {}", config.auth.allow_anonymous);

    codeweaver_gateway::start(config).await?;

    Ok(())
}

/// Directory that must exist before SQLite can create the database file.
fn sqlite_parent_dir(database_url: &str) -> Option<PathBuf> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    PathBuf::from(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls_have_parent() {
        assert_eq!(
            sqlite_parent_dir("sqlite:///home/me/.codeweaver/codeweaver.db"),
            Some(PathBuf::from("/home/me/.codeweaver"))
        );
        assert_eq!(
            sqlite_parent_dir("sqlite://data/cw.db?mode=rwc"),
            Some(PathBuf::from("data"))
        );
    }

    #[test]
    fn memory_and_bare_files_have_none() {
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("memory"), None);
        assert_eq!(sqlite_parent_dir("sqlite://cw.db"), None);
    }
}
