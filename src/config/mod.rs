//! Configuration: YAML file, environment, and CLI flag resolution.
//!
//! Precedence, highest first: CLI flags, environment variables
//! (`GHIST_DB`, `GITHUB_TOKEN`), the config file, built-in defaults.
//! The config file lives at `~/.config/ghist/config.yml`.

use crate::error::{GhistError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Shape of the on-disk config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    db: Option<PathBuf>,
    token_file: Option<PathBuf>,
    editor: Option<String>,
    project: Option<String>,
}

/// Flag-level overrides collected by the CLI.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub project: Option<String>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the raw-event database.
    pub db: PathBuf,
    /// Bearer token for the remote API, when available.
    pub token: Option<String>,
    /// Editor command for interactive edit sessions.
    pub editor: Option<String>,
    /// Default project for commands that take one.
    pub default_project: Option<String>,
}

impl Config {
    /// Resolve configuration from file, environment, and CLI overrides.
    pub fn load(overrides: &CliOverrides) -> Result<Self> {
        let file = match config_file_path() {
            Some(path) if path.exists() => read_file_config(&path)?,
            _ => FileConfig::default(),
        };
        Self::resolve(file, overrides)
    }

    fn resolve(file: FileConfig, overrides: &CliOverrides) -> Result<Self> {
        let db = overrides
            .db
            .clone()
            .or_else(|| std::env::var_os("GHIST_DB").map(PathBuf::from))
            .or(file.db)
            .or_else(|| dirs::home_dir().map(|h| h.join(".ghist.db")))
            .ok_or_else(|| GhistError::Config("cannot determine database path".to_string()))?;

        let token = match std::env::var("GITHUB_TOKEN") {
            Ok(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
            _ => {
                let token_file = overrides.token_file.clone().or(file.token_file);
                match token_file {
                    Some(path) => Some(read_token_file(&path)?),
                    None => None,
                }
            }
        };

        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .ok()
            .filter(|e| !e.trim().is_empty())
            .or(file.editor);

        let default_project = overrides.project.clone().or(file.project);

        Ok(Self {
            db,
            token,
            editor,
            default_project,
        })
    }

    /// The token, or an error telling the user how to supply one.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(GhistError::MissingToken)
    }

    /// The project from flags/config, or an error naming the gap.
    pub fn require_project(&self) -> Result<&str> {
        self.default_project
            .as_deref()
            .ok_or_else(|| GhistError::Config("no project given; use -p owner/repo".to_string()))
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ghist").join("config.yml"))
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&text)
        .map_err(|e| GhistError::Config(format!("{}: {e}", path.display())))
}

fn read_token_file(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GhistError::Config(format!("token file {}: {e}", path.display())))?;
    let token = text.trim().to_string();
    if token.is_empty() {
        return Err(GhistError::Config(format!(
            "token file {} is empty",
            path.display()
        )));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            if meta.permissions().mode() & 0o077 != 0 {
                tracing::warn!(path = %path.display(), "token file is readable by other users");
            }
        }
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_config_parses() {
        let cfg: FileConfig =
            serde_yaml::from_str("db: /tmp/x.db\nproject: golang/go\n").unwrap();
        assert_eq!(cfg.db.as_deref(), Some(Path::new("/tmp/x.db")));
        assert_eq!(cfg.project.as_deref(), Some("golang/go"));
        assert!(cfg.token_file.is_none());
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(serde_yaml::from_str::<FileConfig>("databse: /tmp/x.db\n").is_err());
    }

    #[test]
    fn test_token_file_trimmed() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "ghp_abc123  ").unwrap();
        assert_eq!(read_token_file(f.path()).unwrap(), "ghp_abc123");
    }

    #[test]
    fn test_empty_token_file_rejected() {
        let f = tempfile::NamedTempFile::new().unwrap();
        assert!(read_token_file(f.path()).is_err());
    }

    #[test]
    fn test_resolve_override_precedence() {
        let file = FileConfig {
            db: Some(PathBuf::from("/from/file.db")),
            project: Some("file/project".to_string()),
            ..FileConfig::default()
        };
        let overrides = CliOverrides {
            db: Some(PathBuf::from("/from/flag.db")),
            project: None,
            token_file: None,
        };
        let cfg = Config::resolve(file, &overrides).unwrap();
        assert_eq!(cfg.db, PathBuf::from("/from/flag.db"));
        assert_eq!(cfg.default_project.as_deref(), Some("file/project"));
    }
}
