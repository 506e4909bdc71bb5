//! Optional config file loading. Search order: ./manga-dl.toml, then
//! $XDG_CONFIG_HOME/manga-dl/config.toml (or ~/.config/manga-dl/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

const LOCAL_FILE: &str = "manga-dl.toml";

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Default destination root when -d is not set. Paths are relative to CWD.
    pub destination: Option<PathBuf>,
    /// HTTP User-Agent header. A provider override still wins.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Attempts per image before it is dropped (default 5).
    pub retry_count: Option<u32>,
    /// Redirect hops followed per request (default 10).
    pub max_redirects: Option<u32>,
    /// Always advertise WebP support, as with --allow-webp.
    pub allow_webp: Option<bool>,
}

/// Candidate config files, most specific first.
fn candidate_paths() -> Result<Vec<PathBuf>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join(LOCAL_FILE)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("manga-dl").join("config.toml"));
    }
    Ok(paths)
}

/// First existing file among `paths`, parsed. Later candidates are never read.
fn load_first(paths: &[PathBuf]) -> Result<Option<Config>, String> {
    let Some(path) = paths.iter().find(|p| p.is_file()) else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&text)
        .map(Some)
        .map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

/// Load the run config. No file is Ok(None); an unreadable or invalid file is an error.
pub fn load_config() -> Result<Option<Config>, String> {
    load_first(&candidate_paths()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.destination.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.retry_count.is_none());
        assert!(c.max_redirects.is_none());
        assert!(c.allow_webp.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            destination = "comics"
            user_agent = "Custom/1.0"
            timeout_secs = 60
            retry_count = 3
            max_redirects = 4
            allow_webp = true
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.destination.as_deref(), Some(std::path::Path::new("comics")));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.retry_count, Some(3));
        assert_eq!(c.max_redirects, Some(4));
        assert_eq!(c.allow_webp, Some(true));
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("retry_count = 1").unwrap();
        assert_eq!(c.retry_count, Some(1));
        assert!(c.destination.is_none());
    }

    #[test]
    fn local_file_shadows_user_config() -> Result<(), Box<dyn std::error::Error>> {
        let local = tempfile::tempdir()?;
        let user = tempfile::tempdir()?;
        let local_path = local.path().join(LOCAL_FILE);
        let user_path = user.path().join("config.toml");
        std::fs::write(&user_path, "retry_count = 2\nallow_webp = true")?;

        let paths = vec![local_path.clone(), user_path.clone()];
        let c = load_first(&paths)?.ok_or("user config not found")?;
        assert_eq!(c.retry_count, Some(2));

        std::fs::write(&local_path, "retry_count = 7")?;
        let c = load_first(&paths)?.ok_or("local config not found")?;
        assert_eq!(c.retry_count, Some(7));
        assert!(c.allow_webp.is_none());
        Ok(())
    }

    #[test]
    fn no_candidate_is_not_an_error() -> Result<(), String> {
        let dir = tempfile::tempdir().map_err(|e| e.to_string())?;
        assert!(load_first(&[dir.path().join(LOCAL_FILE)])?.is_none());
        assert!(load_first(&[])?.is_none());
        Ok(())
    }

    #[test]
    fn broken_first_candidate_errors_with_path() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let bad = dir.path().join(LOCAL_FILE);
        let good = dir.path().join("config.toml");
        std::fs::write(&bad, "destination = [")?;
        std::fs::write(&good, "retry_count = 1")?;
        let err = load_first(&[bad, good]).err().ok_or("expected an error")?;
        assert!(err.contains(LOCAL_FILE));
        Ok(())
    }

    #[test]
    fn candidates_start_in_current_dir() -> Result<(), String> {
        let paths = candidate_paths()?;
        let cwd = std::env::current_dir().map_err(|e| e.to_string())?;
        assert_eq!(paths[0], cwd.join(LOCAL_FILE));
        Ok(())
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("destination = [").is_err());
        assert!(toml::from_str::<Config>("retry_count = \"five\"").is_err());
    }
}
