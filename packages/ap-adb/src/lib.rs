//! ADB (Android Debug Bridge) command-line helpers
//!
//! Locates the `adb` executable and runs it through [`ap_exec`], so every call
//! is bounded by a deadline and reports a classified result.
use std::{collections::BTreeMap, path::Path, str::FromStr, time::Duration};

use ap_exec::{DEFAULT_DEADLINE, ErrorKind, Invocation, Outcome};
use tracing::{debug, trace};

pub mod error;
pub mod locate;

// Re-export commonly used types
pub use error::{AdbError, AdbResult};
pub use locate::{AdbLocator, LookupMode, UnknownLookupMode};

/// One line of `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
    /// `device`, `offline`, `unauthorized`, ...
    pub state: String,
    /// The `key:value` attributes after the state, e.g. `model`, `transport_id`
    pub info: BTreeMap<String, String>,
}

impl DeviceInfo {
    /// Only devices in the `device` state accept commands
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }

    pub fn model(&self) -> Option<&str> {
        self.info.get("model").map(String::as_str)
    }
}

impl FromStr for DeviceInfo {
    type Err = AdbError;

    /// `<serial> <state> [key:value ...]`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_whitespace();
        let (Some(serial), Some(state)) = (fields.next(), fields.next()) else {
            return Err(AdbError::DeviceInfoParseError(format!(
                "expected `<serial> <state>`, got `{line}`"
            )));
        };

        let info = fields
            .filter_map(|field| field.split_once(':'))
            .filter(|(key, value)| !key.is_empty() && !value.is_empty())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        Ok(DeviceInfo {
            serial: serial.to_string(),
            state: state.to_string(),
            info,
        })
    }
}

/// Parse the output of `adb devices -l`, keeping only online devices
pub fn parse_devices(output: &str) -> Vec<DeviceInfo> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices"))
        .filter(|line| !line.starts_with('*'))
        .filter_map(|line| match line.parse::<DeviceInfo>() {
            Ok(device) => Some(device),
            Err(err) => {
                trace!("skipping line: {err}");
                None
            }
        })
        .filter(|device| {
            if !device.is_online() {
                debug!("{} is {}, skipping", device.serial, device.state);
            }
            device.is_online()
        })
        .collect()
}

/// A handle on the `adb` executable
#[derive(Debug, Clone)]
pub struct Adb {
    program: String,
    deadline: Duration,
}

impl Adb {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_string_lossy().into_owned(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn locate(locator: &AdbLocator) -> Self {
        Self::new(locator.resolve())
    }

    /// Deadline applied to every bounded adb call
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn invocation<I, A>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Invocation::new(self.program.as_str(), args)
    }

    /// `adb <args>`, bounded, output on success
    pub fn execute<I, A>(&self, args: I) -> AdbResult<String>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let invocation = self.invocation(args);
        trace!("executing {invocation}...");
        invocation
            .run_bounded(self.deadline)
            .into_result()
            .map_err(AdbError::from)
    }

    /// First line of `adb version`
    pub fn version(&self) -> AdbResult<String> {
        let output = self.execute(["version"])?;
        output
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .ok_or_else(|| AdbError::CommandFailed("`adb version` printed nothing".to_string()))
    }

    /// `adb devices -l`
    pub fn devices(&self) -> AdbResult<Vec<DeviceInfo>> {
        let output = self.execute(["devices", "-l"])?;
        Ok(parse_devices(&output))
    }

    /// `adb connect <serial>`, then make sure the device is listed as online
    ///
    /// Returns [`AdbError::DeviceNotFound`] if it is not.
    pub fn connect(&self, serial: &str) -> AdbResult<DeviceInfo> {
        match self.invocation(["connect", serial]).run_bounded(self.deadline) {
            Outcome::Success { output } => debug!("adb connect {serial}: {}", output.trim()),
            // USB serials can't be `adb connect`ed, the device list below decides
            Outcome::Failure { error, output } if error.kind() == ErrorKind::NonZeroExit => {
                debug!("adb connect {serial} failed: {}", output.trim())
            }
            Outcome::Failure { error, .. } | Outcome::Timeout { error, .. } => {
                return Err(error.into());
            }
        }

        self.devices()?
            .into_iter()
            .find(|device| device.serial == serial)
            .ok_or_else(|| AdbError::DeviceNotFound(serial.to_string()))
    }

    /// `adb disconnect <serial>`
    pub fn disconnect(&self, serial: &str) -> AdbResult<()> {
        self.execute(["disconnect", serial]).map(|_| ())
    }

    /// `adb -s <serial> get-state`, e.g. `device`, `offline`
    pub fn get_state(&self, serial: &str) -> AdbResult<String> {
        let output = self.execute(["-s", serial, "get-state"])?;
        Ok(output.trim().to_string())
    }

    /// `adb -s <serial> shell <command>`
    ///
    /// The outcome is returned as is so the caller can look at the output of a
    /// failed or timed out command.
    pub fn shell(&self, serial: &str, command: &str) -> Outcome {
        self.invocation(["-s", serial, "shell", command])
            .run_bounded(self.deadline)
    }

    /// `adb start-server`, waiting for the daemon without a deadline
    pub fn start_server(&self) -> AdbResult<()> {
        self.invocation(["start-server"])
            .run_silent()
            .map_err(AdbError::from)
    }

    /// `adb kill-server`
    pub fn kill_server(&self) -> AdbResult<()> {
        self.invocation(["kill-server"])
            .run_silent()
            .map_err(AdbError::from)
    }

    /// Start `adb -s <serial> shell <command>` in the background and return immediately
    pub fn spawn_shell(&self, serial: &str, command: &str) -> AdbResult<()> {
        self.invocation(["-s", serial, "shell", command])
            .run_detached()
            .map_err(AdbError::from)
    }
}

impl Default for Adb {
    fn default() -> Self {
        Self::locate(&AdbLocator::default())
    }
}
