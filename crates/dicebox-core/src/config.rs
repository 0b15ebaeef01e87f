use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{DiceboxError, Result};
use crate::labels::LabelCatalog;
use crate::types::{DieConfig, DieId};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SerialConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// Run the rfcomm bind/release commands through sudo.
    #[serde(default = "default_sudo")]
    pub sudo: bool,
    #[serde(default = "default_rfcomm")]
    pub rfcomm: String,
    #[serde(default = "default_picocom")]
    pub picocom: String,
}

fn default_baud() -> u32 {
    115_200
}

fn default_sudo() -> bool {
    true
}

fn default_rfcomm() -> String {
    "rfcomm".to_string()
}

fn default_picocom() -> String {
    "picocom".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: default_baud(),
            sudo: default_sudo(),
            rfcomm: default_rfcomm(),
            picocom: default_picocom(),
        }
    }
}

// ---------------------------------------------------------------------------
// SupervisorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Silence after spawn is treated as connected once this elapses.
    #[serde(default = "default_connect_grace")]
    pub connect_grace_secs: u64,
    /// Delay before re-binding a faulted die.
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

fn default_connect_grace() -> u64 {
    5
}

fn default_restart_delay() -> u64 {
    30
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            connect_grace_secs: default_connect_grace(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl SupervisorConfig {
    pub fn connect_grace(&self) -> Duration {
        Duration::from_secs(self.connect_grace_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// SupplyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyConfig {
    /// At most one pick per this window.
    #[serde(default = "default_throttle_cooldown")]
    pub throttle_cooldown_secs: u64,
    /// Replenishment target per parameter combination.
    #[serde(default = "default_min_pregenerated")]
    pub min_pregenerated: u64,
    /// Iteration cap for one replenishment run.
    #[serde(default = "default_max_replenish_attempts")]
    pub max_replenish_attempts: u32,
    /// Pause after a failed generation before the next attempt.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
}

fn default_throttle_cooldown() -> u64 {
    5
}

fn default_min_pregenerated() -> u64 {
    5
}

fn default_max_replenish_attempts() -> u32 {
    25
}

fn default_retry_backoff() -> u64 {
    1
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            throttle_cooldown_secs: default_throttle_cooldown(),
            min_pregenerated: default_min_pregenerated(),
            max_replenish_attempts: default_max_replenish_attempts(),
            retry_backoff_secs: default_retry_backoff(),
        }
    }
}

impl SupplyConfig {
    pub fn throttle_cooldown(&self) -> Duration {
        Duration::from_secs(self.throttle_cooldown_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig / StoreConfig / ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_url")]
    pub url: String,
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
}

fn default_generator_url() -> String {
    "http://localhost:9090/generate".to_string()
}

fn default_generator_timeout() -> u64 {
    120
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            url: default_generator_url(),
            timeout_secs: default_generator_timeout(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    "postgres://dicebox@localhost/dicebox".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

impl StoreConfig {
    /// The configured URL, overridden by `DATABASE_URL` when set.
    pub fn resolved_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database_url.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_dice")]
    pub dice: Vec<DieConfig>,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub supply: SupplyConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub labels: LabelCatalog,
}

fn default_version() -> u32 {
    1
}

fn default_dice() -> Vec<DieConfig> {
    DieId::ALL
        .iter()
        .enumerate()
        .map(|(i, id)| DieConfig {
            id: *id,
            address: String::new(),
            channel: (i + 1) as u8,
        })
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            dice: default_dice(),
            serial: SerialConfig::default(),
            supervisor: SupervisorConfig::default(),
            supply: SupplyConfig::default(),
            generator: GeneratorConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            labels: LabelCatalog::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DiceboxError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// A starter config with placeholder addresses and sample labels,
    /// written by `dicebox init`.
    pub fn sample() -> Self {
        let labels = LabelCatalog {
            focus_group: [
                "children",
                "teenagers",
                "families",
                "seniors",
                "commuters",
                "tourists",
            ]
            .map(String::from)
            .to_vec(),
            topic: ["water", "light", "sound", "plants", "movement", "memory"]
                .map(String::from)
                .to_vec(),
            medium: [
                "sculpture",
                "mural",
                "performance",
                "installation",
                "projection",
                "workshop",
            ]
            .map(String::from)
            .to_vec(),
        };
        let dice = DieId::ALL
            .iter()
            .enumerate()
            .map(|(i, id)| DieConfig {
                id: *id,
                address: format!("00:00:00:00:00:0{}", i + 1),
                channel: (i + 1) as u8,
            })
            .collect();
        Self {
            dice,
            labels,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for id in DieId::ALL {
            let configured: Vec<_> = self.dice.iter().filter(|d| d.id == id).collect();
            match configured.as_slice() {
                [] => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("die {id} is not configured"),
                }),
                [die] => {
                    if die.address.is_empty() {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Error,
                            message: format!("die {id} has no hardware address"),
                        });
                    }
                }
                _ => warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("die {id} is configured more than once"),
                }),
            }
        }

        for (i, a) in self.dice.iter().enumerate() {
            for b in &self.dice[i + 1..] {
                if !a.address.is_empty() && a.address == b.address {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "dice {} and {} share the hardware address {}",
                            a.id, b.id, a.address
                        ),
                    });
                }
                if a.channel == b.channel {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!(
                            "dice {} and {} share rfcomm channel {}",
                            a.id, b.id, a.channel
                        ),
                    });
                }
            }
        }

        for id in DieId::ALL {
            let axis = id.axis();
            let len = self.labels.axis(axis).len();
            if len != 6 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "axis {axis} has {len} labels, expected 6 (one per side of die {id})"
                    ),
                });
            }
        }

        if self.supply.throttle_cooldown_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "throttle_cooldown_secs is 0: pick requests are not rate-limited".into(),
            });
        }

        if self.supply.min_pregenerated == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "min_pregenerated is 0: the pool is never replenished".into(),
            });
        }

        if self.supply.max_replenish_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "max_replenish_attempts is 0: replenishment runs do nothing".into(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
