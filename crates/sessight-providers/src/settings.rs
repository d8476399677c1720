use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default Claude Code settings file (`~/.claude/settings.json`).
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("settings.json"))
}

#[derive(Debug, Default, Deserialize)]
struct Settings {
    #[serde(default)]
    permissions: Permissions,
}

#[derive(Debug, Default, Deserialize)]
struct Permissions {
    #[serde(default)]
    allow: Vec<String>,
}

/// Shell commands pre-approved in a settings file.
///
/// Only `Bash(<cmd>:*)` rules contribute. A missing or unreadable file gives
/// an empty set.
pub fn load_allowed_commands(path: &Path) -> HashSet<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "no settings file");
            return HashSet::new();
        }
    };

    let settings: Settings = match serde_json::from_str(&content) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring malformed settings file");
            return HashSet::new();
        }
    };

    settings
        .permissions
        .allow
        .iter()
        .filter_map(|rule| allowed_command(rule))
        .collect()
}

fn allowed_command(rule: &str) -> Option<String> {
    let command = rule.strip_prefix("Bash(")?.strip_suffix(":*)")?.trim();
    (!command.is_empty()).then(|| command.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_only_bash_prefix_rules_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"permissions": {"allow": [
                "Bash(git:*)", "Bash(cargo:*)", "Bash(npm run build)",
                "Read(**)", "WebFetch(domain:example.com)", "Bash(:*)"
            ]}}"#,
        )
        .unwrap();

        let allowed = load_allowed_commands(&path);
        assert_eq!(allowed.len(), 2);
        assert!(allowed.contains("git"));
        assert!(allowed.contains("cargo"));
    }

    #[test]
    fn test_missing_or_malformed_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_allowed_commands(&dir.path().join("absent.json")).is_empty());

        let path = dir.path().join("broken.json");
        fs::write(&path, "{permissions").unwrap();
        assert!(load_allowed_commands(&path).is_empty());

        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();
        assert!(load_allowed_commands(&path).is_empty());
    }
}
