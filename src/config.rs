use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use ap_adb::{AdbLocator, LookupMode};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, DurationSecondsWithFrac, serde_as};

use crate::liveness::{DEFAULT_UNREACHABLE_MARKERS, ReachabilityProbe};

/// 对应 `auto-exec.toml`
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deadline for bounded commands, in seconds
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub deadline: Duration,
    pub adb: AdbConfig,
    pub liveness: LivenessConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deadline: ap_exec::DEFAULT_DEADLINE,
            adb: AdbConfig::default(),
            liveness: LivenessConfig::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdbConfig {
    /// Use this adb and skip discovery
    pub path: Option<PathBuf>,
    /// Directories searched for adb instead of `PATH`
    pub search_paths: Vec<PathBuf>,
    /// Tried in order when the search fails; empty means the standard SDK locations
    pub fallback_paths: Vec<PathBuf>,
    /// `bare` or `search-path`, defaults to what suits the host
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub lookup: Option<LookupMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub unreachable_markers: Vec<String>,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            unreachable_markers: DEFAULT_UNREACHABLE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Config>(content)?;
        if config.deadline.is_zero() {
            anyhow::bail!("deadline must be positive");
        }
        Ok(config)
    }

    pub fn adb_locator(&self) -> AdbLocator {
        let mut locator = AdbLocator::new().with_search_paths(self.adb.search_paths.clone());
        if !self.adb.fallback_paths.is_empty() {
            locator = locator.with_fallback_paths(self.adb.fallback_paths.clone());
        }
        if let Some(mode) = self.adb.lookup {
            locator = locator.with_mode(mode);
        }
        if let Some(path) = &self.adb.path {
            locator = locator.with_override(path);
        }
        locator
    }

    pub fn adb(&self) -> ap_adb::Adb {
        ap_adb::Adb::locate(&self.adb_locator()).with_deadline(self.deadline)
    }

    pub fn reachability_probe(&self) -> ReachabilityProbe {
        ReachabilityProbe::new()
            .with_deadline(self.deadline)
            .with_unreachable_markers(self.liveness.unreachable_markers.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        println!("{}", toml);
        assert_eq!(Config::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_partial() {
        let config = Config::from_toml(
            r#"
deadline = 2.5

[adb]
path = "/opt/android/platform-tools/adb"
lookup = "search-path"

[liveness]
unreachable_markers = ["unknown host"]
"#,
        )
        .unwrap();

        assert_eq!(config.deadline, Duration::from_millis(2500));
        assert_eq!(config.adb.lookup, Some(LookupMode::SearchPath));
        assert_eq!(
            config.adb_locator().resolve(),
            PathBuf::from("/opt/android/platform-tools/adb")
        );
        assert_eq!(config.adb().program(), "/opt/android/platform-tools/adb");
        assert_eq!(config.liveness.unreachable_markers, ["unknown host"]);
        assert_eq!(config.reachability_probe().deadline(), config.deadline);
    }

    #[test]
    fn test_invalid() {
        assert!(Config::from_toml("deadline = 0").is_err());
        assert!(Config::from_toml("[adb]\nlookup = \"somewhere\"").is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto-exec.toml");
        fs::write(&path, "deadline = 1\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().deadline, Duration::from_secs(1));
        assert!(Config::load(dir.path().join("missing.toml")).is_err());
    }
}
