pub use ap_adb as adb;
pub use ap_exec as exec;

pub mod config;
pub mod liveness;
pub mod platform;

// Re-export specific items users might need frequently
pub use adb::{Adb, AdbLocator};
pub use config::Config;
pub use exec::{DEFAULT_DEADLINE, Invocation, Outcome, run_bounded, run_detached, run_silent};
pub use liveness::{Reachability, ReachabilityProbe};
pub use platform::{PlatformType, platform_name};
