use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;
pub const DEFAULT_DOUBLE_ENTER_MS: u64 = 500;
const DEFAULT_TERMINAL: &str = "iterm2";

/// Terminal identifiers accepted in ASKME_TERMINAL, mapped to the
/// application name handed to the OS opener.
const SUPPORTED_TERMINALS: &[(&str, &str)] = &[
    ("warp", "Warp"),
    ("iterm2", "iTerm"),
    ("terminal", "Terminal"),
    ("kitty", "kitty"),
    ("alacritty", "Alacritty"),
    ("hyper", "Hyper"),
    ("windowsterminal", "wt"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name passed to the opener, already resolved from the
    /// ASKME_TERMINAL identifier (or used verbatim when unrecognized).
    pub terminal_app: String,
    /// Whole-request deadline for the broker, in milliseconds.
    pub timeout_ms: u64,
    /// Window within which a second plain Enter submits, in milliseconds.
    pub double_enter_ms: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let terminal_app = resolve_terminal_app(
            &std::env::var("ASKME_TERMINAL").unwrap_or_else(|_| DEFAULT_TERMINAL.to_string()),
        );
        let timeout_ms = parse_millis_var("ASKME_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let double_enter_ms = parse_millis_var("ASKME_DOUBLE_ENTER_MS", DEFAULT_DOUBLE_ENTER_MS)?;

        Ok(Self {
            terminal_app,
            timeout_ms,
            double_enter_ms,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.terminal_app.trim().is_empty() {
            bail!("Terminal application name must not be empty");
        }
        if self.timeout_ms == 0 {
            bail!("ASKME_TIMEOUT_MS must be a positive number of milliseconds");
        }
        if self.double_enter_ms == 0 {
            bail!("ASKME_DOUBLE_ENTER_MS must be a positive number of milliseconds");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            terminal_app: resolve_terminal_app(DEFAULT_TERMINAL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            double_enter_ms: DEFAULT_DOUBLE_ENTER_MS,
        }
    }
}

/// Maps a terminal identifier to its application name. Unrecognized
/// identifiers are used verbatim so custom terminals keep working.
pub fn resolve_terminal_app(identifier: &str) -> String {
    let normalized = identifier.trim().to_ascii_lowercase();
    for (id, app) in SUPPORTED_TERMINALS {
        if *id == normalized {
            return (*app).to_string();
        }
    }
    identifier.trim().to_string()
}

fn parse_millis_var(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            match trimmed.parse::<u64>() {
                Ok(value) => Ok(value),
                Err(_) => bail!("Invalid {name} '{raw}': expected milliseconds as an integer"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_terminal_app_known_identifiers() {
        assert_eq!(resolve_terminal_app("iterm2"), "iTerm");
        assert_eq!(resolve_terminal_app("WARP"), "Warp");
        assert_eq!(resolve_terminal_app(" terminal "), "Terminal");
        assert_eq!(resolve_terminal_app("windowsterminal"), "wt");
    }

    #[test]
    fn test_resolve_terminal_app_unknown_used_verbatim() {
        assert_eq!(resolve_terminal_app("WezTerm"), "WezTerm");
        assert_eq!(resolve_terminal_app(" ghostty "), "ghostty");
    }

    #[test]
    fn test_load_defaults_without_env() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::remove_var("ASKME_TERMINAL");
        std::env::remove_var("ASKME_TIMEOUT_MS");
        std::env::remove_var("ASKME_DOUBLE_ENTER_MS");
        let config = Config::load().expect("load");
        assert_eq!(config.terminal_app, "iTerm");
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.double_enter_ms, DEFAULT_DOUBLE_ENTER_MS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_non_numeric_timeout() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var("ASKME_TIMEOUT_MS", "ten minutes");
        assert!(Config::load().is_err());
        std::env::remove_var("ASKME_TIMEOUT_MS");
    }

    #[test]
    fn test_validate_rejects_zero_windows() {
        let config = Config {
            timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            double_enter_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
