use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::components;
use crate::error::ConfigError;
use crate::theme::ThemeCategory;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default, alias = "darkMode", alias = "dark_mode_strategy")]
    pub dark_mode: DarkModeStrategy,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub plugins: Vec<PluginDescriptor>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub input_css: Option<PathBuf>,
    #[serde(default)]
    pub minify: bool,
    #[serde(default = "default_true")]
    pub preflight: bool,
    #[serde(default)]
    pub cascade_layers: bool,
    #[serde(default)]
    pub threads: usize,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DarkModeStrategy {
    #[default]
    #[serde(alias = "media-query")]
    Media,
    #[serde(alias = "class-flag", alias = "selector")]
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub extend: BTreeMap<String, BTreeMap<String, ThemeValue>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ThemeValue {
    Text(String),
    List(Vec<String>),
    Table(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PluginDescriptor {
    Components(ComponentOptions),
    Icons(IconOptions),
}

impl PluginDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Components(_) => "components",
            Self::Icons(_) => "icons",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComponentOptions {
    #[serde(default = "default_component_themes")]
    pub themes: Vec<String>,
    #[serde(default)]
    pub prefix: String,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            themes: default_component_themes(),
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconMode {
    Mask,
    #[serde(alias = "bg")]
    Background,
    #[default]
    Auto,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IconOptions {
    #[serde(default)]
    pub collections: Vec<String>,
    #[serde(default = "default_icon_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub mode: IconMode,
    #[serde(default = "default_icon_scale")]
    pub scale: f32,
    #[serde(default = "default_collections_dir")]
    pub collections_dir: PathBuf,
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
}

impl Default for IconOptions {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            prefix: default_icon_prefix(),
            mode: IconMode::default(),
            scale: default_icon_scale(),
            collections_dir: default_collections_dir(),
            load_timeout_ms: default_load_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            dark_mode: DarkModeStrategy::default(),
            theme: Theme::default(),
            plugins: Vec::new(),
            output: None,
            input_css: None,
            minify: false,
            preflight: true,
            cascade_layers: false,
            threads: 0,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(text).map_err(|err| ConfigError::Parse {
            path: base_dir.to_path_buf(),
            message: err.to_string(),
        })?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "content".to_string(),
                message: "at least one glob pattern is required".to_string(),
            });
        }
        for pattern in &self.content {
            globset::Glob::new(pattern).map_err(|err| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                message: err.to_string(),
            })?;
        }

        for category in self.theme.extend.keys() {
            if ThemeCategory::parse(category).is_none() {
                return Err(ConfigError::UnknownThemeCategory {
                    category: category.clone(),
                });
            }
        }

        let mut seen = Vec::new();
        for plugin in &self.plugins {
            if seen.contains(&plugin.kind()) {
                return Err(ConfigError::DuplicatePlugin {
                    kind: plugin.kind(),
                });
            }
            seen.push(plugin.kind());

            match plugin {
                PluginDescriptor::Components(options) => {
                    for name in &options.themes {
                        if !components::is_known_theme(name) {
                            return Err(ConfigError::UnknownComponentTheme { name: name.clone() });
                        }
                    }
                }
                PluginDescriptor::Icons(options) => validate_icon_options(options)?,
            }
        }

        Ok(())
    }

    pub fn component_options(&self) -> Option<&ComponentOptions> {
        self.plugins.iter().find_map(|plugin| match plugin {
            PluginDescriptor::Components(options) => Some(options),
            _ => None,
        })
    }

    pub fn icon_options(&self) -> Option<&IconOptions> {
        self.plugins.iter().find_map(|plugin| match plugin {
            PluginDescriptor::Icons(options) => Some(options),
            _ => None,
        })
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Config::from_toml_str(&text, base_dir).map_err(|err| match err {
        ConfigError::Parse { message, .. } => ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

fn validate_icon_options(options: &IconOptions) -> Result<(), ConfigError> {
    if options.prefix.is_empty() || !options.prefix.chars().all(is_name_char) {
        return Err(ConfigError::InvalidValue {
            field: "plugins.icons.prefix".to_string(),
            message: format!("'{}' is not a valid class prefix", options.prefix),
        });
    }
    if !(options.scale.is_finite() && options.scale > 0.0) {
        return Err(ConfigError::InvalidValue {
            field: "plugins.icons.scale".to_string(),
            message: "scale must be a positive number".to_string(),
        });
    }
    for name in &options.collections {
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(ConfigError::InvalidValue {
                field: "plugins.icons.collections".to_string(),
                message: format!("'{}' is not a valid collection name", name),
            });
        }
    }
    Ok(())
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-'
}

fn default_true() -> bool {
    true
}

fn default_component_themes() -> Vec<String> {
    vec!["light".to_string(), "dark".to_string()]
}

fn default_icon_prefix() -> String {
    "i".to_string()
}

fn default_icon_scale() -> f32 {
    1.0
}

fn default_collections_dir() -> PathBuf {
    PathBuf::from("icons")
}

fn default_load_timeout_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::{Config, DarkModeStrategy, IconMode, PluginDescriptor, ThemeValue, load};
    use crate::error::ConfigError;
    use std::fs;
    use std::path::Path;

    #[test]
    fn loads_toml_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ironweave.toml");
        fs::write(
            &path,
            r#"
content = ["**/*.templ"]
dark_mode = "class"

[theme.extend.fontFamily]
mono = ["Courier Prime", "monospace"]

[[plugins]]
kind = "components"

[[plugins]]
kind = "icons"
collections = ["ic", "mdi"]
"#,
        )
        .expect("write config");

        let config = load(&path).expect("config should parse");
        assert_eq!(config.content, vec!["**/*.templ".to_string()]);
        assert_eq!(config.dark_mode, DarkModeStrategy::Class);
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(
            config.theme.extend["fontFamily"]["mono"],
            ThemeValue::List(vec!["Courier Prime".to_string(), "monospace".to_string()])
        );
        let icons = config.icon_options().expect("icon plugin");
        assert_eq!(icons.collections, vec!["ic".to_string(), "mdi".to_string()]);
        assert_eq!(icons.prefix, "i");
        assert_eq!(icons.mode, IconMode::Auto);
        assert!(config.component_options().is_some());
    }

    #[test]
    fn defaults_when_options_missing() {
        let config = Config::from_toml_str("content = [\"*.html\"]", Path::new("."))
            .expect("config should parse");
        assert_eq!(config.dark_mode, DarkModeStrategy::Media);
        assert!(config.preflight);
        assert!(!config.minify);
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn accepts_spelled_out_dark_mode_names() {
        let config = Config::from_toml_str(
            "content = [\"*.html\"]\ndark_mode = \"class-flag\"",
            Path::new("."),
        )
        .expect("config should parse");
        assert_eq!(config.dark_mode, DarkModeStrategy::Class);
    }

    #[test]
    fn rejects_unknown_plugin() {
        let err = Config::from_toml_str(
            "content = [\"*.html\"]\n[[plugins]]\nkind = \"forms\"",
            Path::new("."),
        )
        .expect_err("unknown plugin must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_unknown_dark_mode() {
        let err = Config::from_toml_str(
            "content = [\"*.html\"]\ndark_mode = \"sometimes\"",
            Path::new("."),
        )
        .expect_err("unknown strategy must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rejects_empty_content() {
        let err = Config::from_toml_str("", Path::new(".")).expect_err("content is required");
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_duplicate_plugins() {
        let err = Config::from_toml_str(
            "content = [\"*.html\"]\n[[plugins]]\nkind = \"icons\"\n[[plugins]]\nkind = \"icons\"",
            Path::new("."),
        )
        .expect_err("duplicate plugin must fail");
        assert!(matches!(err, ConfigError::DuplicatePlugin { kind: "icons" }));
    }

    #[test]
    fn rejects_unknown_theme_category() {
        let err = Config::from_toml_str(
            "content = [\"*.html\"]\n[theme.extend.wobble]\nx = \"1\"",
            Path::new("."),
        )
        .expect_err("unknown category must fail");
        assert!(matches!(err, ConfigError::UnknownThemeCategory { .. }));
    }

    #[test]
    fn rejects_unknown_component_theme() {
        let err = Config::from_toml_str(
            "content = [\"*.html\"]\n[[plugins]]\nkind = \"components\"\nthemes = [\"retro\"]",
            Path::new("."),
        )
        .expect_err("unknown theme must fail");
        assert!(matches!(err, ConfigError::UnknownComponentTheme { .. }));
    }

    #[test]
    fn rejects_invalid_glob() {
        let err = Config::from_toml_str("content = [\"src/[*.html\"]", Path::new("."))
            .expect_err("bad glob must fail");
        assert!(matches!(err, ConfigError::InvalidGlob { .. }));
    }

    #[test]
    fn plugin_kinds_are_stable() {
        let config = Config::from_toml_str(
            "content = [\"*.html\"]\n[[plugins]]\nkind = \"icons\"\nmode = \"mask\"",
            Path::new("."),
        )
        .expect("config should parse");
        assert!(matches!(
            &config.plugins[0],
            PluginDescriptor::Icons(options) if options.mode == IconMode::Mask
        ));
        assert_eq!(config.plugins[0].kind(), "icons");
    }
}
