//! Site configuration – reads/writes `~/.wayfind/config.toml`.
//!
//! ```toml
//! welcome_message = "Welcome! Scan the marker nearest to you to begin."
//!
//! [fence]
//! latitude = 7.28108739005917
//! longitude = 80.62005485982979
//! radius_m = 100.0
//!
//! [timing]
//! retry_backoff_secs = 5
//! fix_wait_attempts = 20
//! fix_wait_interval_ms = 1000
//! scan_cooldown_ms = 2000
//!
//! [[floors]]
//! number = 1
//! destinations = ["Library", "Reception"]
//!
//! [[targets]]
//! name = "Library"
//! floor = 1
//! position = [5.0, 0.0, 0.0]
//! yaw_deg = 90.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use wayfind_kernel::AccessGateConfig;
use wayfind_perception::RecenterConfig;
use wayfind_runtime::{FloorCatalog, SessionConfig};
use wayfind_types::{GeoFenceConfig, GeoPoint, Pose, Quaternion, Target, Vec3};

/// Persisted site configuration stored in `~/.wayfind/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WayfindConfig {
    #[serde(default = "default_welcome")]
    pub welcome_message: String,

    #[serde(default)]
    pub fence: FenceSection,

    #[serde(default)]
    pub timing: TimingSection,

    #[serde(default = "default_floors")]
    pub floors: Vec<FloorSection>,

    #[serde(default = "default_targets")]
    pub targets: Vec<TargetSection>,
}

/// Where wayfinding is allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FenceSection {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl Default for FenceSection {
    fn default() -> Self {
        let fence = GeoFenceConfig::default();
        Self {
            latitude: fence.center.latitude,
            longitude: fence.center.longitude,
            radius_m: fence.radius_meters,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub retry_backoff_secs: u64,
    pub fix_wait_attempts: u32,
    pub fix_wait_interval_ms: u64,
    pub scan_cooldown_ms: u64,
    /// Give up on automatic out-of-range re-polls after this many denials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_denied_retries: Option<u32>,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            retry_backoff_secs: 5,
            fix_wait_attempts: 20,
            fix_wait_interval_ms: 1000,
            scan_cooldown_ms: 2000,
            max_denied_retries: None,
        }
    }
}

/// Destinations offered on one floor, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorSection {
    pub number: u32,
    pub destinations: Vec<String>,
}

/// A surveyed marker/destination pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSection {
    pub name: String,
    pub floor: u32,
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_deg: f32,
}

fn default_welcome() -> String {
    SessionConfig::default().welcome_message
}

fn default_floors() -> Vec<FloorSection> {
    let catalog = FloorCatalog::reference();
    catalog
        .floors()
        .map(|number| FloorSection {
            number,
            destinations: catalog.destinations(number).to_vec(),
        })
        .collect()
}

/// One target per reference destination, laid out on a 5 m grid with 4 m
/// between floors.  Replace with surveyed poses for a real site.
fn default_targets() -> Vec<TargetSection> {
    let catalog = FloorCatalog::reference();
    catalog
        .floors()
        .flat_map(|floor| {
            catalog
                .destinations(floor)
                .iter()
                .enumerate()
                .map(move |(i, name)| TargetSection {
                    name: name.clone(),
                    floor,
                    position: [
                        (i % 3) as f32 * 5.0,
                        (floor - 1) as f32 * 4.0,
                        (i / 3) as f32 * 5.0,
                    ],
                    yaw_deg: 0.0,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

impl Default for WayfindConfig {
    fn default() -> Self {
        Self {
            welcome_message: default_welcome(),
            fence: FenceSection::default(),
            timing: TimingSection::default(),
            floors: default_floors(),
            targets: default_targets(),
        }
    }
}

impl WayfindConfig {
    /// Reject configs the session could not run with.
    pub fn validate(&self) -> Result<(), String> {
        if !self.fence.radius_m.is_finite() || self.fence.radius_m < 0.0 {
            return Err(format!(
                "fence radius must be a finite, non-negative number of meters (got {})",
                self.fence.radius_m
            ));
        }
        if !self.fence.latitude.is_finite() || !self.fence.longitude.is_finite() {
            return Err("fence center must be finite".to_string());
        }
        if let Some(floor) = self.floors.iter().find(|f| f.number == 0) {
            return Err(format!("floor numbers start at 1 (got {})", floor.number));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err("target names must not be empty".to_string());
            }
            if target.floor == 0 {
                return Err(format!("target '{}' has floor 0; floors start at 1", target.name));
            }
            if !seen.insert(target.name.to_lowercase()) {
                return Err(format!("duplicate target name '{}'", target.name));
            }
        }
        Ok(())
    }

    /// Build the runtime session config.
    pub fn to_session_config(&self) -> SessionConfig {
        let access = AccessGateConfig {
            fence: GeoFenceConfig {
                center: GeoPoint::new(self.fence.latitude, self.fence.longitude),
                radius_meters: self.fence.radius_m,
            },
            retry_backoff: Duration::from_secs(self.timing.retry_backoff_secs),
            fix_wait_attempts: self.timing.fix_wait_attempts,
            fix_wait_interval: Duration::from_millis(self.timing.fix_wait_interval_ms),
            max_denied_retries: self.timing.max_denied_retries,
        };
        let recenter = RecenterConfig {
            scan_cooldown: Duration::from_millis(self.timing.scan_cooldown_ms),
        };
        let catalog = self
            .floors
            .iter()
            .fold(FloorCatalog::new(), |catalog, floor| {
                catalog.with_floor(floor.number, floor.destinations.iter().cloned())
            });
        let targets = self
            .targets
            .iter()
            .map(|t| {
                let [x, y, z] = t.position;
                Target::new(
                    t.name.clone(),
                    Pose::new(Vec3::new(x, y, z), Quaternion::from_yaw_degrees(t.yaw_deg)),
                    t.floor,
                )
            })
            .collect();

        SessionConfig {
            access,
            recenter,
            catalog,
            targets,
            welcome_message: self.welcome_message.clone(),
        }
    }
}

/// Return the path to `~/.wayfind/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".wayfind").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<WayfindConfig>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<WayfindConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: WayfindConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()
        .map_err(|e| format!("Invalid config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `WAYFIND_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `WAYFIND_FENCE_LAT` | `fence.latitude` |
/// | `WAYFIND_FENCE_LON` | `fence.longitude` |
/// | `WAYFIND_FENCE_RADIUS_M` | `fence.radius_m` |
/// | `WAYFIND_RETRY_BACKOFF_SECS` | `timing.retry_backoff_secs` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut WayfindConfig) {
    if let Some(v) = env_parse::<f64>("WAYFIND_FENCE_LAT") {
        cfg.fence.latitude = v;
    }
    if let Some(v) = env_parse::<f64>("WAYFIND_FENCE_LON") {
        cfg.fence.longitude = v;
    }
    if let Some(v) = env_parse::<f64>("WAYFIND_FENCE_RADIUS_M") {
        cfg.fence.radius_m = v;
    }
    if let Some(v) = env_parse::<u64>("WAYFIND_RETRY_BACKOFF_SECS") {
        cfg.timing.retry_backoff_secs = v;
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Save the config to disk, creating `~/.wayfind/` if necessary.
pub fn save(cfg: &WayfindConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &WayfindConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
