use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ChurnError;
use crate::window::Window;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = ".truechurn.toml";

/// Top-level configuration loaded from `.truechurn.toml` or a JSON file.
///
/// Supports layered resolution: CLI flags > config file > defaults.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnConfig;
///
/// let config = ChurnConfig::default();
/// assert!(config.aliases.is_empty());
/// assert!(config.repositories.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnConfig {
    /// Canonical author name mapped to the raw author strings found in logs.
    #[serde(default, alias = "aliasMap")]
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Clone URLs or local paths of the repositories to analyze.
    #[serde(default)]
    pub repositories: Vec<String>,
    /// Directory that remote repositories are cloned into (default: `.`).
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
    /// Default analysis window.
    #[serde(default)]
    pub window: WindowConfig,
    /// History walking options.
    #[serde(default)]
    pub history: HistoryConfig,
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            aliases: BTreeMap::new(),
            repositories: Vec::new(),
            workdir: default_workdir(),
            window: WindowConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl ChurnConfig {
    /// Load configuration from `path`.
    ///
    /// Files with a `.json` extension use the JSON layout (`aliasMap`,
    /// `repositories`); everything else is read as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::FileNotFound`] if the file does not exist,
    /// [`ChurnError::Io`] if it cannot be read, or a parse error for
    /// malformed content.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use truechurn_core::ChurnConfig;
    /// use std::path::Path;
    ///
    /// let config = ChurnConfig::from_file(Path::new(".truechurn.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ChurnError> {
        if !path.exists() {
            return Err(ChurnError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use truechurn_core::ChurnConfig;
    ///
    /// let toml = r#"
    /// repositories = ["git@github.com:acme/widgets.git"]
    ///
    /// [aliases]
    /// "Jane Doe" = ["jane", "Jane Doe"]
    /// "#;
    /// let config = ChurnConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.aliases["Jane Doe"].len(), 2);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, ChurnError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Serialization`] if parsing fails.
    pub fn from_json(content: &str) -> Result<Self, ChurnError> {
        let config: Self = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Every `(canonical, raw)` pair in the alias map, in canonical order.
    pub fn alias_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().flat_map(|(canonical, raws)| {
            raws.iter()
                .map(move |raw| (canonical.as_str(), raw.as_str()))
        })
    }
}

/// Default analysis window, as `YYYY-MM-DD` strings.
///
/// # Examples
///
/// ```
/// use truechurn_core::WindowConfig;
///
/// let config = WindowConfig {
///     after: Some("2020-05-20".into()),
///     before: None,
/// };
/// assert!(config.to_window().unwrap().after.is_some());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Inclusive start date.
    pub after: Option<String>,
    /// Exclusive end date.
    pub before: Option<String>,
}

impl WindowConfig {
    /// Parse into a [`Window`].
    ///
    /// # Errors
    ///
    /// Returns [`ChurnError::Config`] for bad dates or an empty window.
    pub fn to_window(&self) -> Result<Window, ChurnError> {
        Window::parse(self.after.as_deref(), self.before.as_deref())
    }
}

/// History walking options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Branch to walk instead of HEAD.
    pub branch: Option<String>,
}
