use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for cirun.
///
/// Allows users to save common runner settings and reuse them across runs.
/// Configuration files are loaded from the current directory, the user
/// config directory, or a specified path; CLI flags override these values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Runner behavior
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Source tree checked out into job workspaces
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Shell used for `run:` steps
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Directory scanned for workflow files when none are given explicitly
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: PathBuf,

    /// Retain job workspaces after the run
    #[serde(default)]
    pub keep_workspaces: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default report format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            shell: default_shell(),
            workflows_dir: default_workflows_dir(),
            keep_workspaces: false,
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from(".")
}

fn default_shell() -> String {
    "sh".to_string()
}

fn default_workflows_dir() -> PathBuf {
    PathBuf::from(".cirun/workflows")
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cirun.toml
    /// 3. ./cirun.json
    /// 4. ./cirun.yaml
    /// 5. ./cirun.yml
    /// 6. <config_dir>/cirun/config.toml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        // Try common configuration file names
        let candidates = ["cirun.toml", "cirun.json", "cirun.yaml", "cirun.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let path = config_dir.join("cirun").join("config.toml");
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runner.source, PathBuf::from("."));
        assert_eq!(config.runner.shell, "sh");
        assert_eq!(config.runner.workflows_dir, PathBuf::from(".cirun/workflows"));
        assert!(!config.runner.keep_workspaces);
        assert_eq!(config.output.format, OutputFormat::Summary);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[runner]
source = "/srv/ppscan"
shell = "bash"
keep-workspaces = true

[output]
format = "json"
pretty = true
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.runner.source, PathBuf::from("/srv/ppscan"));
        assert_eq!(config.runner.shell, "bash");
        assert!(config.runner.keep_workspaces);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "runner": {
    "workflows-dir": "ci/workflows"
  },
  "output": {
    "format": "json"
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.runner.workflows_dir, PathBuf::from("ci/workflows"));
        assert_eq!(config.runner.shell, "sh");
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yml").unwrap();
        let yaml_content = r#"
runner:
  shell: zsh
"#;
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load_from_path(temp_file.path()).unwrap();
        assert_eq!(config.runner.shell, "zsh");
    }

    #[test]
    fn test_load_nonexistent_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/cirun.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cirun.toml");

        let mut config = Config::default();
        config.runner.shell = "bash".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.runner.shell, "bash");
    }
}
