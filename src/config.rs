use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub stacks: Vec<StackConfig>,
    pub stepper: StepperConfig,
    pub trace: TraceConfig,
}

/// Levels of one mode, outermost first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub mode: String,
    pub levels: Vec<LevelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub name: String,
    /// Zero or less runs until an is-done check ends the level.
    pub max: i64,
    pub inc: i64,
    pub step_default: i64,
    pub events: Vec<EventConfig>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max: 1,
            inc: 1,
            step_default: 1,
            events: Vec::new(),
        }
    }
}

impl LevelConfig {
    fn new(name: &str, max: i64) -> Self {
        Self {
            name: name.to_string(),
            max,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub name: String,
    pub at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    pub watchdog_ms: u64,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self { watchdog_ms: 10000 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Deepest level index that prints control-flow trace lines.
    pub depth: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            stacks: vec![
                StackConfig {
                    mode: "train".to_string(),
                    levels: vec![
                        LevelConfig::new("run", 1),
                        LevelConfig::new("epoch", 3),
                        LevelConfig::new("trial", 4),
                    ],
                },
                StackConfig {
                    mode: "test".to_string(),
                    levels: vec![LevelConfig::new("epoch", 1), LevelConfig::new("trial", 4)],
                },
            ],
            stepper: StepperConfig::default(),
            trace: TraceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn stack(&self, mode: &str) -> Option<&StackConfig> {
        self.stacks.iter().find(|st| st.mode == mode)
    }
}
