//! Run-time settings, read from the environment snapshot.

use crate::env::Environment;
use crate::eval::TEXT_WIDTH;
use std::path::PathBuf;

/// Directories searched for modules.
pub const MODULES_PATH_VAR: &str = "MODM_MODULES_PATH";
/// Version files currently loaded into the shell.
pub const LOADED_MODULES_VAR: &str = "MODM_LOADED_MODULES";
/// Who to contact about internal errors.
pub const ADMIN_EMAIL_VAR: &str = "MODM_ADMIN_EMAIL";
/// Set to an "off" value to disable colored output.
pub const USE_COLORS_VAR: &str = "MODM_USE_COLORS";
/// Log filter for diagnostics on stderr, in `env_logger` syntax.
pub const LOG_VAR: &str = "MODM_LOG";

pub const DEFAULT_ADMIN_EMAIL: &str = "root@localhost";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone)]
pub struct Config {
    pub modules_path: Vec<PathBuf>,
    pub loaded_modules: Vec<PathBuf>,
    pub admin_email: String,
    pub use_colors: bool,
    pub text_width: usize,
}

impl Config {
    pub fn from_env(env: &Environment) -> Self {
        let paths = |var: &str| -> Vec<PathBuf> {
            env.get_path_list(var).into_iter().map(PathBuf::from).collect()
        };
        Self {
            modules_path: paths(MODULES_PATH_VAR),
            loaded_modules: paths(LOADED_MODULES_VAR),
            admin_email: env
                .get_var(ADMIN_EMAIL_VAR)
                .filter(|email| !email.is_empty())
                .unwrap_or(DEFAULT_ADMIN_EMAIL)
                .to_string(),
            use_colors: env.get_var(USE_COLORS_VAR).is_none_or(|v| !is_off(v)),
            text_width: TEXT_WIDTH,
        }
    }

    /// Log filter for `env_logger`.
    pub fn log_filter(env: &Environment) -> String {
        env.get_var(LOG_VAR)
            .unwrap_or(DEFAULT_LOG_FILTER)
            .to_string()
    }
}

fn is_off(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "no" | "false" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::join_path_list;

    #[test]
    fn test_defaults() {
        let config = Config::from_env(&Environment::default());
        assert!(config.modules_path.is_empty());
        assert!(config.loaded_modules.is_empty());
        assert_eq!(config.admin_email, DEFAULT_ADMIN_EMAIL);
        assert!(config.use_colors);
        assert_eq!(config.text_width, 80);
        assert_eq!(Config::log_filter(&Environment::default()), "warn");
    }

    #[test]
    fn test_reads_snapshot() {
        let env = Environment::from_vars([
            (MODULES_PATH_VAR, join_path_list(&["/a", "/b"])),
            (ADMIN_EMAIL_VAR, "admin@example.org".to_string()),
            (USE_COLORS_VAR, "Off".to_string()),
            (LOG_VAR, "debug".to_string()),
        ]);
        let config = Config::from_env(&env);
        assert_eq!(config.modules_path, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(config.admin_email, "admin@example.org");
        assert!(!config.use_colors);
        assert_eq!(Config::log_filter(&env), "debug");
    }

    #[test]
    fn test_color_values() {
        for (value, expected) in [("1", true), ("yes", true), ("0", false), ("false", false), ("NO", false)] {
            let env = Environment::from_vars([(USE_COLORS_VAR, value)]);
            assert_eq!(Config::from_env(&env).use_colors, expected, "{value}");
        }
    }
}
