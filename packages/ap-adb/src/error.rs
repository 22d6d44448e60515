use ap_exec::ExecError;
use thiserror::Error;

/// Unified ADB error type
#[derive(Error, Debug)]
pub enum AdbError {
    /// Running the adb executable failed
    #[error("adb execution error: {0}")]
    Exec(#[from] ExecError),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device info parse error
    #[error("Failed to parse device info: {0}")]
    DeviceInfoParseError(String),

    /// adb ran but reported something unexpected
    #[error("Command execution failed: {0}")]
    CommandFailed(String),
}

/// ADB result type alias
pub type AdbResult<T> = Result<T, AdbError>;
