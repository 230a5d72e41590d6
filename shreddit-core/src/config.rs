//! Run configuration.
//!
//! The configuration file is TOML with a single `[main]` table. It is read once
//! at startup and resolved into an immutable [`Settings`] value that is passed
//! by reference to everything that needs it.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, CoreError};
use crate::types::ItemCategory;

pub const DEFAULT_CONFIG_PATH: &str = "shreddit.toml";
pub const DEFAULT_WORD_LIST: &str = "/usr/share/dict/words";
pub const PASSWORD_ENV_VAR: &str = "SHREDDIT_PASSWORD";

/// Resolved parameters of the retention filter and deletion driver.
#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Items newer than this are kept.
    pub max_age: Duration,
    /// Lower-cased subreddit names that are never touched.
    pub whitelist_subreddits: BTreeSet<String>,
    /// Item ids that are never touched, compared exactly.
    pub whitelist_ids: BTreeSet<String>,
    pub item_category: ItemCategory,
    /// Passed through untouched to the listing request.
    pub sort_order: String,
    pub edit_only: bool,
    pub clear_vote_before_delete: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub continue_on_error: bool,
}

impl RetentionConfig {
    /// Items created after this instant are too recent to touch.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Oldest instant still inside the edit window: two retention windows back.
    pub fn edit_window_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.cutoff(now)
            .checked_sub_signed(self.max_age)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_whitelisted_subreddit(&self, subreddit: &str) -> bool {
        self.whitelist_subreddits
            .contains(&subreddit.to_lowercase())
    }

    pub fn is_whitelisted_id(&self, id: &str) -> bool {
        self.whitelist_ids.contains(id)
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::hours(default_hours()),
            whitelist_subreddits: BTreeSet::new(),
            whitelist_ids: BTreeSet::new(),
            item_category: ItemCategory::Overview,
            sort_order: default_sort(),
            edit_only: false,
            clear_vote_before_delete: false,
            dry_run: false,
            verbose: true,
            continue_on_error: false,
        }
    }
}

/// Account identity and the Reddit "script" application used to log in.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TextSourceOptions {
    pub word_list: PathBuf,
}

impl Default for TextSourceOptions {
    fn default() -> Self {
        Self {
            word_list: PathBuf::from(DEFAULT_WORD_LIST),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub retention: RetentionConfig,
    pub credentials: Credentials,
    pub text: TextSourceOptions,
}

impl Settings {
    /// Reads and resolves the configuration file at `path`.
    ///
    /// A password missing from the file is taken from `SHREDDIT_PASSWORD`.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;

        debug!("Loaded configuration from {}", path.display());
        let env_password = std::env::var(PASSWORD_ENV_VAR).ok();
        Ok(Self::from_toml_str(&contents, env_password)?)
    }

    pub fn from_toml_str(contents: &str, env_password: Option<String>) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        file.main.resolve(env_password)
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    main: MainSection,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    #[serde(default = "default_hours")]
    hours: i64,
    #[serde(default)]
    whitelist: ListValue,
    #[serde(default)]
    whitelist_ids: ListValue,
    #[serde(default = "default_sort")]
    sort: String,
    #[serde(default = "default_true")]
    verbose: bool,
    #[serde(default)]
    clear_vote: bool,
    #[serde(default)]
    trial_run: bool,
    #[serde(default)]
    edit_only: bool,
    #[serde(default = "default_item")]
    item: String,
    username: Option<String>,
    password: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
    word_list: Option<PathBuf>,
    #[serde(default)]
    continue_on_error: bool,
}

/// Either `"a, b, c"` or `["a", "b", "c"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListValue {
    Csv(String),
    List(Vec<String>),
}

impl Default for ListValue {
    fn default() -> Self {
        ListValue::Csv(String::new())
    }
}

impl ListValue {
    fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            ListValue::Csv(value) => value.split(',').collect(),
            ListValue::List(values) => values.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn default_hours() -> i64 {
    24
}

fn default_sort() -> String {
    "new".to_string()
}

fn default_true() -> bool {
    true
}

fn default_item() -> String {
    "overview".to_string()
}

fn normalize_subreddit(name: &str) -> String {
    let lower = name.to_lowercase();
    let stripped = lower
        .strip_prefix("/r/")
        .or_else(|| lower.strip_prefix("r/"))
        .unwrap_or(lower.as_str());
    stripped.trim_end_matches('/').to_string()
}

fn required(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

impl MainSection {
    fn resolve(self, env_password: Option<String>) -> Result<Settings, ConfigError> {
        if self.hours <= 0 {
            return Err(ConfigError::ValidationFailed {
                reason: format!("hours must be greater than zero, got {}", self.hours),
            });
        }
        let max_age = Duration::try_hours(self.hours).ok_or_else(|| ConfigError::InvalidValue {
            field: "hours".to_string(),
            value: self.hours.to_string(),
        })?;

        let item_category: ItemCategory = self.item.parse()?;

        let sort_order = self.sort.trim().to_string();
        if sort_order.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sort".to_string(),
                value: self.sort,
            });
        }

        let retention = RetentionConfig {
            max_age,
            whitelist_subreddits: self
                .whitelist
                .entries()
                .iter()
                .map(|name| normalize_subreddit(name))
                .filter(|name| !name.is_empty())
                .collect(),
            whitelist_ids: self.whitelist_ids.entries().into_iter().collect(),
            item_category,
            sort_order,
            edit_only: self.edit_only,
            clear_vote_before_delete: self.clear_vote,
            dry_run: self.trial_run,
            verbose: self.verbose,
            continue_on_error: self.continue_on_error,
        };

        let username = required(self.username, "username")?;
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .or(env_password.filter(|p| !p.is_empty()))
            .ok_or_else(|| ConfigError::MissingField {
                field: "password".to_string(),
            })?;
        let user_agent = self
            .user_agent
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or_else(|| {
                format!("shreddit/{} by {}", env!("CARGO_PKG_VERSION"), username)
            });

        let credentials = Credentials {
            client_id: required(self.client_id, "client_id")?,
            client_secret: required(self.client_secret, "client_secret")?,
            username,
            password,
            user_agent,
        };

        let text = TextSourceOptions {
            word_list: self
                .word_list
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORD_LIST)),
        };

        Ok(Settings {
            retention,
            credentials,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    const MINIMAL: &str = r#"
[main]
username = "someone"
password = "hunter2"
client_id = "id"
client_secret = "secret"
"#;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str(MINIMAL, None).unwrap();
        let retention = &settings.retention;

        assert_eq!(retention.max_age, Duration::hours(24));
        assert_eq!(retention.item_category, ItemCategory::Overview);
        assert_eq!(retention.sort_order, "new");
        assert!(retention.verbose);
        assert!(!retention.dry_run);
        assert!(!retention.edit_only);
        assert!(!retention.clear_vote_before_delete);
        assert!(retention.whitelist_subreddits.is_empty());
        assert!(retention.whitelist_ids.is_empty());
        assert_eq!(settings.text.word_list, PathBuf::from(DEFAULT_WORD_LIST));
        assert!(settings.credentials.user_agent.contains("someone"));
    }

    #[test]
    fn test_full_section() {
        let contents = r#"
[main]
hours = 72
whitelist = "AskReddit, r/Rust ,, /r/science/"
whitelist_ids = "abc12, Def34"
sort = "top"
verbose = false
clear_vote = true
trial_run = true
edit_only = true
item = "comments"
username = "someone"
password = "hunter2"
client_id = "id"
client_secret = "secret"
user_agent = "custom agent"
word_list = "/tmp/words"
continue_on_error = true
"#;
        let settings = Settings::from_toml_str(contents, None).unwrap();
        let retention = &settings.retention;

        assert_eq!(retention.max_age, Duration::hours(72));
        let subs: Vec<&str> = retention
            .whitelist_subreddits
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(subs, vec!["askreddit", "rust", "science"]);
        assert!(retention.is_whitelisted_id("Def34"));
        assert!(!retention.is_whitelisted_id("def34"));
        assert!(retention.is_whitelisted_subreddit("ASKREDDIT"));
        assert_eq!(retention.item_category, ItemCategory::Comments);
        assert_eq!(retention.sort_order, "top");
        assert!(retention.clear_vote_before_delete);
        assert!(retention.dry_run);
        assert!(retention.edit_only);
        assert!(retention.continue_on_error);
        assert!(!retention.verbose);
        assert_eq!(settings.credentials.user_agent, "custom agent");
        assert_eq!(settings.text.word_list, PathBuf::from("/tmp/words"));
    }

    #[test]
    fn test_whitelist_as_array() {
        let contents = format!("{}whitelist = [\"Pics\", \" news \"]\n", MINIMAL);
        let settings = Settings::from_toml_str(&contents, None).unwrap();
        assert!(settings.retention.is_whitelisted_subreddit("pics"));
        assert!(settings.retention.is_whitelisted_subreddit("News"));
    }

    #[test]
    fn test_invalid_item_is_rejected() {
        let contents = format!("{}item = \"everything\"\n", MINIMAL);
        let err = Settings::from_toml_str(&contents, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, ref value } if field == "item" && value == "everything"
        ));
    }

    #[test]
    fn test_non_positive_hours_rejected() {
        let contents = format!("{}hours = 0\n", MINIMAL);
        let err = Settings::from_toml_str(&contents, None).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed { .. }));
    }

    #[test]
    fn test_password_from_environment() {
        let contents = r#"
[main]
username = "someone"
client_id = "id"
client_secret = "secret"
"#;
        let err = Settings::from_toml_str(contents, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "password"));

        let settings = Settings::from_toml_str(contents, Some("from-env".to_string())).unwrap();
        assert_eq!(settings.credentials.password, "from-env");
    }

    #[test]
    fn test_missing_username() {
        let contents = r#"
[main]
password = "hunter2"
client_id = "id"
client_secret = "secret"
"#;
        let err = Settings::from_toml_str(contents, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { ref field } if field == "username"));
    }

    #[test]
    fn test_missing_main_section_is_parse_error() {
        let err = Settings::from_toml_str("hours = 3\n", None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let settings = Settings::from_toml_str(MINIMAL, None).unwrap();
        let debug = format!("{:?}", settings.credentials);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("\"secret\""));
        assert!(debug.contains("someone"));
    }

    #[test]
    fn test_cutoff_and_edit_window() {
        let config = RetentionConfig {
            max_age: Duration::hours(72),
            ..Default::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();

        assert_eq!(config.cutoff(now), now - Duration::hours(72));
        assert_eq!(config.edit_window_end(now), now - Duration::hours(144));
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_reads_file_from_disk() {
        let contents = format!("{}hours = 48\nwhitelist = \"Pics, r/Rust\"\n", MINIMAL);
        let file = write_config(&contents);

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.retention.max_age, Duration::hours(48));
        assert!(settings.retention.is_whitelisted_subreddit("rust"));
        assert!(settings.retention.is_whitelisted_subreddit("PICS"));
        assert_eq!(settings.credentials.password, "hunter2");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shreddit.toml");

        let err = Settings::load(&path).unwrap_err();
        match err {
            CoreError::Config(ConfigError::FileNotFound { path: reported }) => {
                assert_eq!(reported, path.display().to_string());
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_takes_password_from_environment() {
        let file = write_config(
            r#"
[main]
username = "someone"
client_id = "id"
client_secret = "secret"
"#,
        );

        std::env::set_var(PASSWORD_ENV_VAR, "from-env");
        let result = Settings::load(file.path());
        std::env::remove_var(PASSWORD_ENV_VAR);

        assert_eq!(result.unwrap().credentials.password, "from-env");
    }
}
