use log::{info, warn};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

const CONFIG_PATH: &str = "nanika.ini";

// --- Minimal INI reader ---

/// Flat view of an INI file: values are keyed by `section.key`, both
/// lowercased. `#` and `;` start comments; unrecognizable lines are
/// skipped.
#[derive(Debug, Default)]
struct IniValues {
    values: FxHashMap<String, String>,
}

impl IniValues {
    fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let mut values = FxHashMap::default();
        let mut section = String::new();

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                section = line[1..line.len() - 1].trim().to_ascii_lowercase();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                values.insert(
                    format!("{section}.{}", key.to_ascii_lowercase()),
                    value.trim().to_string(),
                );
            }
        }
        Ok(Self { values })
    }

    fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.values
            .get(&format!(
                "{}.{}",
                section.to_ascii_lowercase(),
                key.to_ascii_lowercase()
            ))
            .map(String::as_str)
    }
}

// --- Settings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevelSetting {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelSetting {
    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }
}

impl FromStr for LogLevelSetting {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: LogLevelSetting,
    /// Ghost launched at boot; first installed one when unset.
    pub default_ghost: Option<String>,
    /// Display scale of the character window, in percent.
    pub shell_scale: u32,
    /// Display scale of the speech bubble, in percent.
    pub balloon_scale: u32,
    /// Log the active surface's hitboxes whenever a ghost launches.
    pub hitbox_overlay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevelSetting::default(),
            default_ghost: None,
            shell_scale: 100,
            balloon_scale: 100,
            hitbox_overlay: false,
        }
    }
}

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

fn clamp_scale(percent: u32) -> u32 {
    percent.clamp(25, 400)
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists() {
        if let Err(e) = write_config_file(&Config::default()) {
            warn!("failed to create default config file: {e}");
        } else {
            info!("'{CONFIG_PATH}' not found, created with default values");
        }
    }

    let ini = match IniValues::load(CONFIG_PATH) {
        Ok(ini) => ini,
        Err(e) => {
            warn!("failed to read '{CONFIG_PATH}': {e}, using defaults");
            return;
        }
    };

    let default = Config::default();
    let mut cfg = CONFIG.lock().unwrap();
    cfg.log_level = ini
        .get("Host", "LogLevel")
        .and_then(|v| LogLevelSetting::from_str(v).ok())
        .unwrap_or(default.log_level);
    cfg.default_ghost = ini
        .get("Host", "DefaultGhost")
        .map(str::to_string)
        .filter(|v| !v.is_empty());
    cfg.shell_scale = ini
        .get("Render", "ShellScale")
        .and_then(|v| v.parse::<u32>().ok())
        .map_or(default.shell_scale, clamp_scale);
    cfg.balloon_scale = ini
        .get("Render", "BalloonScale")
        .and_then(|v| v.parse::<u32>().ok())
        .map_or(default.balloon_scale, clamp_scale);
    cfg.hitbox_overlay = ini
        .get("Render", "HitboxOverlay")
        .and_then(|v| v.parse::<u8>().ok())
        .map_or(default.hitbox_overlay, |v| v != 0);
}

pub fn get() -> Config {
    CONFIG.lock().unwrap().clone()
}

pub fn set_shell_scale(percent: u32) {
    let snapshot = {
        let mut cfg = CONFIG.lock().unwrap();
        cfg.shell_scale = clamp_scale(percent);
        cfg.clone()
    };
    if let Err(e) = write_config_file(&snapshot) {
        warn!("failed to save config file: {e}");
    }
}

fn write_config_file(cfg: &Config) -> Result<(), std::io::Error> {
    let mut content = String::new();
    content.push_str("[Host]\n");
    content.push_str(&format!(
        "DefaultGhost={}\n",
        cfg.default_ghost.as_deref().unwrap_or("")
    ));
    content.push_str(&format!("LogLevel={}\n", cfg.log_level.as_str()));
    content.push_str("\n[Render]\n");
    content.push_str(&format!("BalloonScale={}\n", cfg.balloon_scale));
    content.push_str(&format!(
        "HitboxOverlay={}\n",
        if cfg.hitbox_overlay { "1" } else { "0" }
    ));
    content.push_str(&format!("ShellScale={}\n", cfg.shell_scale));
    std::fs::write(CONFIG_PATH, content)
}
