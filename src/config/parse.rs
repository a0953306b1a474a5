use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars, expand_tilde};
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML in '{file}': {source}")]
    YamlParse {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("required config key '{key}' is missing or null in {file}")]
    MissingKey { key: String, file: String },

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

const REQUIRED_SYSTEM_KEYS: &[&str] = &["llm.model"];

const REQUIRED_ANALYSIS_KEYS: &[&str] = &[
    "data.timestamp_field",
    "data.timestamp_format",
    "prompts.chunk_analysis_prompt_path",
    "prompts.final_summary_prompt_path",
];

pub fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = load_document(path, REQUIRED_SYSTEM_KEYS)?;
    validate_system_config(&config)?;
    Ok(config)
}

pub fn load_analysis_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let mut config: AnalysisConfig = load_document(path, REQUIRED_ANALYSIS_KEYS)?;
    expand_paths(&mut config);
    validate_analysis_config(&config)?;
    Ok(config)
}

/// Read a YAML file, expand `$env{VAR}` references, check that every
/// required dotted key is present and non-null, then deserialize.
fn load_document<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<T, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(&yaml_string);
    check_unexpanded_vars(&yaml_string)?;

    let file_name = path.display().to_string();
    let tree: Value =
        serde_yaml::from_str(&yaml_string).map_err(|source| ConfigError::YamlParse {
            file: file_name.clone(),
            source,
        })?;

    for key in required {
        if lookup(&tree, key).map_or(true, Value::is_null) {
            return Err(ConfigError::MissingKey {
                key: key.to_string(),
                file: file_name,
            });
        }
    }

    serde_yaml::from_value(tree).map_err(|source| ConfigError::YamlParse {
        file: file_name,
        source,
    })
}

/// Resolve a dotted key path such as `llm.model`
fn lookup<'a>(tree: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(tree, |node, key| node.as_mapping()?.get(key))
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

/// Expands tilde (~) in all PathBuf fields in the config.
fn expand_paths(config: &mut AnalysisConfig) {
    config.prompts.chunk_analysis_prompt_path =
        expand_tilde(&config.prompts.chunk_analysis_prompt_path);
    config.prompts.final_summary_prompt_path =
        expand_tilde(&config.prompts.final_summary_prompt_path);
    if let Some(dir) = &config.output.output_dir {
        config.output.output_dir = Some(expand_tilde(dir));
    }
}

pub fn validate_system_config(config: &SystemConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    let llm = &config.llm;

    if llm.model.trim().is_empty() {
        errors.push("llm.model must not be empty".to_string());
    }
    if llm.max_tokens_per_chunk == 0 {
        errors.push("llm.max_tokens_per_chunk must be greater than 0".to_string());
    }
    if llm.max_summary_tokens == 0 {
        errors.push("llm.max_summary_tokens must be greater than 0".to_string());
    }
    if llm.concurrency == 0 {
        errors.push("llm.concurrency must be at least 1".to_string());
    }
    if !(llm.base_url.starts_with("http://") || llm.base_url.starts_with("https://")) {
        errors.push(format!(
            "llm.base_url '{}' must start with http:// or https://",
            llm.base_url
        ));
    }
    if llm.api_key_env.trim().is_empty() {
        errors.push("llm.api_key_env must not be empty".to_string());
    }

    into_result(errors)
}

pub fn validate_analysis_config(config: &AnalysisConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();
    let data = &config.data;

    if data.timestamp_field.is_empty() {
        errors.push("data.timestamp_field must not be empty".to_string());
    }
    if data.timestamp_format.is_empty() {
        errors.push("data.timestamp_format must not be empty".to_string());
    }
    if data.dataframe_chunk_size == 0 {
        errors.push("data.dataframe_chunk_size must be greater than 0".to_string());
    }
    if let Some(name) = &config.output.report_filename {
        if name.is_empty() {
            errors.push("output.report_filename must not be empty".to_string());
        }
    }

    into_result(errors)
}

fn into_result(errors: Vec<String>) -> Result<(), ConfigError> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(ConfigError::Validation(errors.concat())),
        _ => Err(ConfigError::ValidationList(errors)),
    }
}
