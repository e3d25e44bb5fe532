//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `FORMCOACH_WORK_DIR` and `FORMCOACH_LOG_LEVEL` env overrides.
//! The API key comes from `GENAI_API_KEY` env — never TOML.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Gemini backend configuration (`[genai.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// REST API base, without trailing slash.
    pub api_base_url: String,
    /// Model for text, vision, and grounded generation.
    pub text_model: String,
    /// Model for image editing.
    pub image_model: String,
    /// Model for video generation.
    pub video_model: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// GenAI provider configuration.
#[derive(Debug, Clone)]
pub struct GenAiConfig {
    /// Which backend is active (`"gemini"` or `"dummy"`).
    /// Maps to `default` in `[genai]` TOML — named `default` there to signal
    /// that other backend sections can coexist without being loaded.
    pub provider: String,
    pub gemini: GeminiConfig,
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            provider: default_genai_provider(),
            gemini: GeminiConfig {
                api_base_url: default_api_base_url(),
                text_model: default_text_model(),
                image_model: default_image_model(),
                video_model: default_video_model(),
                timeout_seconds: default_timeout_seconds(),
            },
        }
    }
}

/// Defaults used when the CLI builds a workout-plan profile (`[coach]`).
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub experience: String,
    pub days_per_week: u8,
    pub session_minutes: u32,
}

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Working directory for persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    pub coach: CoachConfig,
    pub genai: GenAiConfig,
    /// API key from `GENAI_API_KEY` env var — `None` for the dummy backend.
    pub genai_api_key: Option<String>,
}

// ── Raw TOML shape — serde target before resolution ──────────────────────────

#[derive(Deserialize)]
struct RawConfig {
    app: RawApp,
    #[serde(default)]
    coach: RawCoach,
    #[serde(default)]
    genai: RawGenAi,
}

#[derive(Deserialize)]
struct RawApp {
    app_name: String,
    work_dir: String,
    log_level: String,
}

#[derive(Deserialize)]
struct RawCoach {
    #[serde(default = "default_experience")]
    experience: String,
    #[serde(default = "default_days_per_week")]
    days_per_week: u8,
    #[serde(default = "default_session_minutes")]
    session_minutes: u32,
}

impl Default for RawCoach {
    fn default() -> Self {
        Self {
            experience: default_experience(),
            days_per_week: default_days_per_week(),
            session_minutes: default_session_minutes(),
        }
    }
}

#[derive(Deserialize)]
struct RawGenAi {
    /// Maps to `default = "..."` in `[genai]`.
    #[serde(rename = "default", default = "default_genai_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGemini,
}

impl Default for RawGenAi {
    fn default() -> Self {
        Self { provider: default_genai_provider(), gemini: RawGemini::default() }
    }
}

#[derive(Deserialize)]
struct RawGemini {
    #[serde(default = "default_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_text_model")]
    text_model: String,
    #[serde(default = "default_image_model")]
    image_model: String,
    #[serde(default = "default_video_model")]
    video_model: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGemini {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_experience() -> String { "beginner".to_string() }
fn default_days_per_week() -> u8 { 3 }
fn default_session_minutes() -> u32 { 60 }
fn default_genai_provider() -> String { "dummy".to_string() }
fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_text_model() -> String { "gemini-2.5-flash".to_string() }
fn default_image_model() -> String { "gemini-2.5-flash-image-preview".to_string() }
fn default_video_model() -> String { "veo-2.0-generate-001".to_string() }
fn default_timeout_seconds() -> u64 { 120 }

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&Path>) -> Result<Config, AppError> {
    let work_dir_override = env::var("FORMCOACH_WORK_DIR").ok();
    let log_level_override = env::var("FORMCOACH_LOG_LEVEL").ok();
    load_from(
        path.unwrap_or(Path::new("config/default.toml")),
        work_dir_override.as_deref(),
        log_level_override.as_deref(),
    )
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let a = parsed.app;
    let work_dir_str = work_dir_override.unwrap_or(&a.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&a.log_level).to_string();

    Ok(Config {
        app_name: a.app_name,
        work_dir,
        log_level,
        coach: CoachConfig {
            experience: parsed.coach.experience,
            days_per_week: parsed.coach.days_per_week,
            session_minutes: parsed.coach.session_minutes,
        },
        genai: GenAiConfig {
            provider: parsed.genai.provider,
            gemini: GeminiConfig {
                api_base_url: parsed.genai.gemini.api_base_url,
                text_model: parsed.genai.gemini.text_model,
                image_model: parsed.genai.gemini.image_model,
                video_model: parsed.genai.gemini.video_model,
                timeout_seconds: parsed.genai.gemini.timeout_seconds,
            },
        },
        genai_api_key: env::var("GENAI_API_KEY").ok(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[app]
app_name = "test-coach"
work_dir = "~/.formcoach"
log_level = "info"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_basic_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.app_name, "test-coach");
        assert_eq!(cfg.log_level, "info");
        // Section defaults apply when omitted.
        assert_eq!(cfg.genai.provider, "dummy");
        assert_eq!(cfg.coach.days_per_week, 3);
        assert_eq!(cfg.genai.gemini.timeout_seconds, 120);
    }

    #[test]
    fn genai_section_parses() {
        let f = write_toml(
            r#"
[app]
app_name = "t"
work_dir = "/tmp/t"
log_level = "debug"

[genai]
default = "gemini"

[genai.gemini]
text_model = "gemini-x"
timeout_seconds = 30
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.genai.provider, "gemini");
        assert_eq!(cfg.genai.gemini.text_model, "gemini-x");
        assert_eq!(cfg.genai.gemini.timeout_seconds, 30);
        // Unset gemini fields keep their defaults.
        assert_eq!(cfg.genai.gemini.video_model, "veo-2.0-generate-001");
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/.formcoach");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with(".formcoach"));
    }

    #[test]
    fn absolute_path_unchanged() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("config error"));
    }

    #[test]
    fn env_style_overrides_apply() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("/tmp/test-override"), Some("debug")).unwrap();
        assert_eq!(cfg.work_dir, PathBuf::from("/tmp/test-override"));
        assert_eq!(cfg.log_level, "debug");
    }
}
