pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use parse::{load_analysis_config, load_system_config, ConfigError};
pub use types::{AnalysisConfig, LlmConfig, Ordering, SystemConfig};

/// Matches `$env{VAR_NAME}` where VAR_NAME starts with a letter or underscore
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Expands tilde (~) in paths to the user's home directory.
/// Returns the path unchanged if it doesn't start with tilde or home directory cannot be determined.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();

    if let Some(rest) = path_str.strip_prefix("~/") {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    } else if path_str == "~" {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir;
        }
    }

    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_env_vars_single() {
        std::env::set_var("LOGSIFT_TEST_VAR", "test_value");
        let result = expand_env_vars("model: $env{LOGSIFT_TEST_VAR}");
        assert_eq!(result, "model: test_value");
        std::env::remove_var("LOGSIFT_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_multiple() {
        std::env::set_var("LOGSIFT_VAR1", "value1");
        std::env::set_var("LOGSIFT_VAR2", "value2");
        let result = expand_env_vars("$env{LOGSIFT_VAR1}/middle/$env{LOGSIFT_VAR2}");
        assert_eq!(result, "value1/middle/value2");
        std::env::remove_var("LOGSIFT_VAR1");
        std::env::remove_var("LOGSIFT_VAR2");
    }

    #[test]
    fn test_expand_env_vars_unset() {
        let result = expand_env_vars("path/$env{LOGSIFT_NONEXISTENT_VAR}/file");
        // Unset variables are left unchanged
        assert_eq!(result, "path/$env{LOGSIFT_NONEXISTENT_VAR}/file");
    }

    #[test]
    fn test_expand_env_vars_ignores_shell_syntax() {
        let result = expand_env_vars("${HOME}:$PATH");
        assert_eq!(result, "${HOME}:$PATH");
    }

    #[test]
    fn test_expand_tilde_with_path() {
        let expanded = expand_tilde(Path::new("~/prompts/chunk.txt"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("prompts/chunk.txt"));
        }
    }

    #[test]
    fn test_expand_tilde_no_expansion() {
        assert_eq!(
            expand_tilde(Path::new("/absolute/path")),
            Path::new("/absolute/path")
        );
        assert_eq!(
            expand_tilde(Path::new("relative/path")),
            Path::new("relative/path")
        );
    }
}
