use naksha_core::ImageTransform;
use serde::Deserialize;
use std::{path::PathBuf, str::FromStr};

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub model: ModelConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl ServerConfig {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What the last layer of the model emits.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ModelOutput {
    /// Already softmax-normalised, as YOLO classification exports are.
    #[default]
    Probabilities,
    Logits,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub model_dir: PathBuf,
    pub onnx_file: String,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
    #[serde(default)]
    pub output: ModelOutput,
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_input_size() -> u32 {
    224
}

fn default_mean() -> [f32; 3] {
    [0.0; 3]
}

fn default_std() -> [f32; 3] {
    [1.0; 3]
}

impl ModelConfig {
    pub fn get_path(&self) -> PathBuf {
        self.model_dir.join(&self.onnx_file)
    }

    pub fn transform(&self) -> ImageTransform {
        ImageTransform::yolo_classify(self.input_size).with_normalization(self.mean, self.std)
    }
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        if !self.get_path().exists() {
            return Err(format!("Model file not found: {:?}", self.get_path()));
        }
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".to_string());
        }
        if self.input_size == 0 {
            return Err("model.input_size must be at least 1".to_string());
        }
        if self.std.iter().any(|&s| s == 0.0) {
            return Err(format!("model.std must not contain zeros: {:?}", self.std));
        }
        Ok(())
    }
}

/// Where class labels come from. Without a labels file the `names`
/// metadata embedded in the model is used.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LabelsConfig {
    pub labels_dir: Option<PathBuf>,
    pub labels_file: Option<String>,
}

impl LabelsConfig {
    pub fn get_path(&self) -> Option<PathBuf> {
        let labels_file = self.labels_file.as_ref()?;
        let labels_dir = self.labels_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        Some(labels_dir.join(labels_file))
    }
}

impl Validatable for LabelsConfig {
    fn validate(&self) -> Result<(), String> {
        match self.get_path() {
            Some(path) if !path.exists() => Err(format!("Labels file not found: {:?}", path)),
            _ => Ok(()),
        }
    }
}

/// Selects `configuration/{name}.yaml` on top of `base.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    const ALL: [Environment; 2] = [Environment::Local, Environment::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown environment `{}`, expected `local` or `production`", s))
    }
}

/// Minimum level for the crate's own logs, case-insensitive in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown log level `{}`, expected one of trace, debug, info, warn, error",
                    s
                )
            })
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let configuration_directory = std::env::current_dir()
        .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?
        .join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .parse()
        .map_err(|e| config::ConfigError::Message(format!("APP_ENVIRONMENT: {}", e)))?;

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;
    config
        .model
        .validate()
        .and_then(|_| config.labels.validate())
        .map_err(|e| {
            tracing::error!("Configuration validation failed: {}", e);
            config::ConfigError::Message(e)
        })?;

    Ok(config)
}
