//! Finding the `adb` executable.
//!
//! On most hosts the bare name is enough and the OS resolves it from `PATH`
//! when the command is spawned. On Windows, where `adb` is often not on
//! `PATH`, a lookup is done up front and a list of fallback install locations
//! is used when that fails.
use std::{env, fmt, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::{debug, warn};

pub const ADB_BINARY: &str = "adb";

/// How [`AdbLocator::resolve`] finds adb when no override is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Use the bare name, resolved at execution time
    Bare,
    /// Look it up now, falling back to the configured install paths
    SearchPath,
}

impl LookupMode {
    /// [`LookupMode::SearchPath`] on Windows, [`LookupMode::Bare`] elsewhere
    pub fn host_default() -> Self {
        if cfg!(windows) {
            LookupMode::SearchPath
        } else {
            LookupMode::Bare
        }
    }
}

impl fmt::Display for LookupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupMode::Bare => f.write_str("bare"),
            LookupMode::SearchPath => f.write_str("search-path"),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown adb lookup mode `{0}`, expected `bare` or `search-path`")]
pub struct UnknownLookupMode(pub String);

impl FromStr for LookupMode {
    type Err = UnknownLookupMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bare" => Ok(LookupMode::Bare),
            "search-path" => Ok(LookupMode::SearchPath),
            _ => Err(UnknownLookupMode(s.to_string())),
        }
    }
}

/// Standard SDK install locations, from `ANDROID_HOME`, `ANDROID_SDK_ROOT` and
/// (on Windows) `%LOCALAPPDATA%\Android\Sdk`
pub fn default_fallback_paths() -> Vec<PathBuf> {
    let adb = format!("{ADB_BINARY}{}", env::consts::EXE_SUFFIX);

    let mut roots = Vec::new();
    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Some(root) = env::var_os(var) {
            roots.push(PathBuf::from(root));
        }
    }
    if cfg!(windows) {
        if let Some(local) = env::var_os("LOCALAPPDATA") {
            roots.push(PathBuf::from(local).join("Android").join("Sdk"));
        }
    }

    roots
        .into_iter()
        .map(|root| root.join("platform-tools").join(&adb))
        .collect()
}

#[derive(Debug, Clone)]
pub struct AdbLocator {
    override_path: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    fallback_paths: Vec<PathBuf>,
    mode: LookupMode,
}

impl Default for AdbLocator {
    fn default() -> Self {
        Self {
            override_path: None,
            search_paths: Vec::new(),
            fallback_paths: default_fallback_paths(),
            mode: LookupMode::host_default(),
        }
    }
}

impl AdbLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always resolve to `path`
    pub fn with_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    /// Directories searched instead of `PATH` in [`LookupMode::SearchPath`]
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_fallback_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.fallback_paths = paths;
        self
    }

    pub fn with_mode(mut self, mode: LookupMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.override_path {
            debug!("using adb override {}", path.display());
            return path.clone();
        }

        match self.mode {
            LookupMode::Bare => PathBuf::from(ADB_BINARY),
            LookupMode::SearchPath => match self.lookup() {
                Some(path) => path,
                None => {
                    let fallback = self.fallback();
                    warn!(
                        "adb not found on the search path, falling back to {}",
                        fallback.display()
                    );
                    fallback
                }
            },
        }
    }

    fn lookup(&self) -> Option<PathBuf> {
        let found = if self.search_paths.is_empty() {
            which::which(ADB_BINARY)
        } else {
            let paths = match env::join_paths(&self.search_paths) {
                Ok(paths) => paths,
                Err(err) => {
                    warn!("invalid adb search path: {err}");
                    return None;
                }
            };
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            which::which_in(ADB_BINARY, Some(paths), cwd)
        };

        match found {
            Ok(path) => Some(path),
            Err(err) => {
                debug!("adb lookup failed: {err}");
                None
            }
        }
    }

    /// The first fallback that exists, else the first configured one, else the bare name
    fn fallback(&self) -> PathBuf {
        self.fallback_paths
            .iter()
            .find(|path| path.is_file())
            .or_else(|| self.fallback_paths.first())
            .cloned()
            .unwrap_or_else(|| PathBuf::from(ADB_BINARY))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs, io,
        sync::{Arc, Mutex},
    };

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    /// Collects formatted log lines so tests can assert on them
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn resolve_capturing_warnings(locator: &AdbLocator) -> (PathBuf, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let resolved = tracing::subscriber::with_default(subscriber, || locator.resolve());
        (resolved, logs.contents())
    }

    #[test]
    fn test_fallback_emits_diagnostic() {
        let empty = tempfile::tempdir().unwrap();
        let locator = AdbLocator::new()
            .with_mode(LookupMode::SearchPath)
            .with_search_paths(vec![empty.path().to_path_buf()])
            .with_fallback_paths(vec![PathBuf::from("/does/not/exist/adb")]);

        let (resolved, logs) = resolve_capturing_warnings(&locator);
        assert_eq!(resolved, PathBuf::from("/does/not/exist/adb"));
        assert!(logs.contains("WARN"), "{logs}");
        assert!(
            logs.contains("adb not found on the search path, falling back to /does/not/exist/adb"),
            "{logs}"
        );

        let (_, logs) = resolve_capturing_warnings(&locator.with_override("/opt/sdk/adb"));
        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_override_wins() {
        let locator = AdbLocator::new()
            .with_mode(LookupMode::SearchPath)
            .with_override("/opt/sdk/adb");
        assert_eq!(locator.resolve(), PathBuf::from("/opt/sdk/adb"));
    }

    #[test]
    fn test_bare_mode() {
        let locator = AdbLocator::new()
            .with_mode(LookupMode::Bare)
            .with_fallback_paths(vec![PathBuf::from("/nowhere/adb")]);
        assert_eq!(locator.resolve(), PathBuf::from(ADB_BINARY));
    }

    #[test]
    fn test_host_default() {
        let expected = if cfg!(windows) {
            LookupMode::SearchPath
        } else {
            LookupMode::Bare
        };
        assert_eq!(AdbLocator::new().mode(), expected);
    }

    #[test]
    fn test_fallback_when_lookup_fails() {
        let empty = tempfile::tempdir().unwrap();
        let sdk = tempfile::tempdir().unwrap();
        let existing = sdk.path().join("adb");
        fs::write(&existing, b"").unwrap();

        let locator = AdbLocator::new()
            .with_mode(LookupMode::SearchPath)
            .with_search_paths(vec![empty.path().to_path_buf()])
            .with_fallback_paths(vec![PathBuf::from("/does/not/exist/adb"), existing.clone()]);
        assert_eq!(locator.resolve(), existing);

        let locator = locator.with_fallback_paths(vec![PathBuf::from("/does/not/exist/adb")]);
        assert_eq!(locator.resolve(), PathBuf::from("/does/not/exist/adb"));

        let locator = locator.with_fallback_paths(Vec::new());
        assert_eq!(locator.resolve(), PathBuf::from(ADB_BINARY));
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_lookup() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let adb = dir.path().join("adb");
        fs::write(&adb, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&adb, fs::Permissions::from_mode(0o755)).unwrap();

        let locator = AdbLocator::new()
            .with_mode(LookupMode::SearchPath)
            .with_search_paths(vec![dir.path().to_path_buf()])
            .with_fallback_paths(vec![PathBuf::from("/does/not/exist/adb")]);
        assert_eq!(locator.resolve(), adb);
    }

    #[test]
    fn test_lookup_mode_from_str() {
        assert_eq!("bare".parse::<LookupMode>().unwrap(), LookupMode::Bare);
        assert_eq!(
            "search-path".parse::<LookupMode>().unwrap(),
            LookupMode::SearchPath
        );
        let err = "path".parse::<LookupMode>().unwrap_err();
        assert_eq!(err.0, "path");
        assert!(err.to_string().contains("`bare` or `search-path`"));
        assert_eq!(LookupMode::SearchPath.to_string(), "search-path");
    }
}
