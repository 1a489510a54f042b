//! Configuration file support for eventgraph.
//!
//! Project settings live in a `.eventgraph/` directory:
//! - `.eventgraph/config.toml` - Configuration file
//!
//! Config discovery searches for `.eventgraph/config.toml` starting from the
//! current directory and walking up to parent directories.

use std::path::{Path, PathBuf};

/// The eventgraph settings directory name.
pub const EVENTGRAPH_DIR: &str = ".eventgraph";
/// The config file name within the settings directory.
pub const CONFIG_FILE: &str = "config.toml";

use anyhow::{Context, Result};
use eventgraph_core::{BusDefinition, ExportOptions, Role};
use eventgraph_csharp::LoadOptions;
use serde::{Deserialize, Serialize};

/// Written by `eventgraph init`.
pub const DEFAULT_CONFIG: &str = r#"# eventgraph configuration
# Relative paths are resolved against the directory containing .eventgraph/

[bus]
type_name = "Core.Events.EventBus"  # Fully qualified event-bus type

[bus.roles]
publication = ["Publish", "PublishExclusive"]
subscription = ["Subscribe", "SubscribeOnce", "SubscribeUntilTrue", "SetSubscribed"]

[index]
extensions = ["cs"]
exclude_dirs = ["Library", "Temp", "Logs", "obj", "bin"]  # Unity and MSBuild output
respect_gitignore = true
default_assembly = "Assembly-CSharp"  # For files outside any .asmdef/.csproj folder

[output]
path = "eventgraph.json"
pretty = true
"#;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Event-bus type and role table.
    pub bus: BusDefinition,
    /// Source discovery settings.
    pub index: IndexConfig,
    /// Report settings.
    pub output: OutputConfig,
}

/// Source discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndexConfig {
    /// File extensions to index.
    pub extensions: Vec<String>,
    /// Directory names to skip.
    pub exclude_dirs: Vec<String>,
    /// Honor `.gitignore` and `.eventgraphignore`.
    pub respect_gitignore: bool,
    /// Assembly for files outside any project folder.
    pub default_assembly: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let defaults = LoadOptions::default();
        Self {
            extensions: defaults.extensions,
            exclude_dirs: defaults.exclude_dirs,
            respect_gitignore: defaults.respect_gitignore,
            default_assembly: defaults.default_assembly,
        }
    }
}

impl IndexConfig {
    /// Load options for the C# index, narrowed to `project` if given.
    pub fn load_options(&self, project: Option<String>) -> LoadOptions {
        LoadOptions {
            extensions: self.extensions.clone(),
            exclude_dirs: self.exclude_dirs.clone(),
            respect_gitignore: self.respect_gitignore,
            default_assembly: self.default_assembly.clone(),
            project,
        }
    }
}

/// Report configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination of the report.
    pub path: PathBuf,
    /// Indent the JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("eventgraph.json"),
            pretty: true,
        }
    }
}

impl OutputConfig {
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            pretty: self.pretty,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Find and load configuration from current or parent directories.
    pub fn find_and_load() -> Result<Option<(Self, PathBuf)>> {
        let current = std::env::current_dir()?;
        Self::find_and_load_from(&current)
    }

    /// Find and load configuration starting from a specific directory.
    ///
    /// Looks for `.eventgraph/config.toml` in the directory and its parents.
    /// Returns the config and the `.eventgraph` directory it was found in.
    pub fn find_and_load_from(start: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start.to_path_buf();

        loop {
            let settings_dir = dir.join(EVENTGRAPH_DIR);
            let config_path = settings_dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::from_file(&config_path)?;
                return Ok(Some((config, settings_dir)));
            }

            if !dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Resolve the report path against the project containing `.eventgraph/`.
    pub fn resolve_output_path(&self, settings_dir: Option<&Path>) -> PathBuf {
        if self.output.path.is_absolute() {
            return self.output.path.clone();
        }
        match settings_dir.and_then(Path::parent) {
            Some(project) => project.join(&self.output.path),
            None => self.output.path.clone(),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigValidationError {}

impl Config {
    /// Validate the configuration.
    ///
    /// Returns a list of validation errors if any are found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.bus.type_name.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "bus.type_name".to_string(),
                message: "Bus type name cannot be empty.".to_string(),
            });
        }

        for role in Role::ALL {
            let members = self.bus.roles.members(role);
            if members.is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("bus.roles.{}", role.as_str()),
                    message: format!("At least one {} member is required.", role.as_str()),
                });
            }
            if members.iter().any(|m| m.trim().is_empty()) {
                errors.push(ConfigValidationError {
                    field: format!("bus.roles.{}", role.as_str()),
                    message: "Member names cannot be empty.".to_string(),
                });
            }
        }

        for member in self.bus.roles.overlapping() {
            errors.push(ConfigValidationError {
                field: "bus.roles".to_string(),
                message: format!(
                    "Member '{}' is listed as both publication and subscription.",
                    member
                ),
            });
        }

        if self.index.extensions.is_empty() {
            errors.push(ConfigValidationError {
                field: "index.extensions".to_string(),
                message: "At least one file extension is required.".to_string(),
            });
        }

        if self.index.default_assembly.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "index.default_assembly".to_string(),
                message: "Default assembly name cannot be empty.".to_string(),
            });
        }

        if self.output.path.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "output.path".to_string(),
                message: "Output path cannot be empty.".to_string(),
            });
        }

        errors
    }
}
