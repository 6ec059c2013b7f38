// Configuration loading: the `d2d.config` key=value file, the optional
// Dropbox token in `d2d.auth`, and the interactive credential prompt.
// Both files are read once at start-up from the working directory.

use anyhow::Result;
use dialoguer::{Input, Password};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "d2d.config";
pub const AUTH_FILE: &str = "d2d.auth";

const WEBDRIVER_URL_KEY: &str = "webdriver.url";
const DOWNLOAD_DIR_KEY: &str = "download.default_directory";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Browser preference overrides from `d2d.config`. Every pair is handed
/// to Chrome as an experimental pref; a couple of keys are also read by
/// the CLI itself (`download.default_directory`, `webdriver.url`).
#[derive(Debug, Default, Clone)]
pub struct D2dConfig {
    prefs: BTreeMap<String, String>,
}

impl D2dConfig {
    /// Read the config file, or fall back to an empty config when it is
    /// missing. A missing file only costs the browser its pref overrides.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => {
                println!(
                    "No {} found, starting with default preferences.",
                    path.as_ref().display()
                );
                Self::default()
            }
        }
    }

    /// Parse line-oriented `key=value` pairs. Blank lines are skipped; a
    /// line without `=` is reported and skipped, and the lines around it
    /// still apply.
    pub fn parse(contents: &str) -> Self {
        let mut prefs = BTreeMap::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    prefs.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => println!("Please define d2d configuration properly."),
            }
        }
        Self { prefs }
    }

    pub fn prefs(&self) -> &BTreeMap<String, String> {
        &self.prefs
    }

    /// Where Chrome drops finished downloads; the relay watches this
    /// directory.
    pub fn download_dir(&self) -> Option<PathBuf> {
        self.prefs.get(DOWNLOAD_DIR_KEY).map(PathBuf::from)
    }

    /// The chromedriver endpoint to connect to. `WEBDRIVER_URL` in the
    /// environment wins over the config file, which wins over the
    /// default local port.
    pub fn webdriver_url(&self) -> String {
        self.webdriver_url_or(std::env::var("WEBDRIVER_URL").ok())
    }

    fn webdriver_url_or(&self, env_override: Option<String>) -> String {
        env_override
            .or_else(|| self.prefs.get(WEBDRIVER_URL_KEY).cloned())
            .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string())
    }
}

/// Load the Dropbox access token from `d2d.auth`. Absence is tolerated:
/// the relay just reports itself unconfigured instead of uploading.
pub fn load_dropbox_token() -> Option<String> {
    let token = std::fs::read_to_string(AUTH_FILE).ok()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Ask for the portal credentials on the terminal. The password prompt
/// hides its input.
pub fn prompt_credentials() -> Result<(String, String)> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let password: String = Password::new().with_prompt("Password").interact()?;
    Ok((username, password))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_pairs_with_trimming() {
        let config = D2dConfig::parse(
            "download.default_directory = /home/user/Downloads\n  profile.default_content_settings.popups =0\n",
        );
        assert_eq!(
            config.download_dir(),
            Some(PathBuf::from("/home/user/Downloads"))
        );
        assert_eq!(
            config.prefs().get("profile.default_content_settings.popups"),
            Some(&"0".to_string())
        );
    }

    #[test]
    fn malformed_line_is_skipped_but_neighbors_apply() {
        let config = D2dConfig::parse(
            "a=1\nthis line has no separator\nb=2\n",
        );
        assert_eq!(config.prefs().get("a"), Some(&"1".to_string()));
        assert_eq!(config.prefs().get("b"), Some(&"2".to_string()));
        assert_eq!(config.prefs().len(), 2);
    }

    #[test]
    fn blank_lines_are_ignored() {
        let config = D2dConfig::parse("\n   \na=1\n\n");
        assert_eq!(config.prefs().len(), 1);
    }

    #[test]
    fn webdriver_url_falls_back_to_default() {
        let config = D2dConfig::parse("");
        assert_eq!(config.webdriver_url_or(None), DEFAULT_WEBDRIVER_URL);
    }

    #[test]
    fn webdriver_url_can_come_from_the_config() {
        let config = D2dConfig::parse("webdriver.url=http://localhost:4444\n");
        assert_eq!(config.webdriver_url_or(None), "http://localhost:4444");
    }

    #[test]
    fn environment_override_beats_the_config() {
        let config = D2dConfig::parse("webdriver.url=http://localhost:4444\n");
        assert_eq!(
            config.webdriver_url_or(Some("http://localhost:9999".into())),
            "http://localhost:9999"
        );
    }

    #[test]
    fn download_dir_is_absent_when_unset() {
        let config = D2dConfig::parse("a=1\n");
        assert_eq!(config.download_dir(), None);
    }
}
