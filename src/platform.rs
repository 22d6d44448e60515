use std::{fmt, str::FromStr};

/// The kind of device an automation session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlatformType {
    Android = 0,
    Ios = 1,
    Mac = 2,
    Windows = 3,
}

impl PlatformType {
    pub const ALL: [PlatformType; 4] = [
        PlatformType::Android,
        PlatformType::Ios,
        PlatformType::Mac,
        PlatformType::Windows,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformType::Android => "Android",
            PlatformType::Ios => "IOS",
            PlatformType::Mac => "Mac",
            PlatformType::Windows => "Windows",
        }
    }

    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|platform| *platform as u8 == raw)
    }
}

/// Display name for a raw platform identifier, empty if it is not one we know
pub fn platform_name(raw: u8) -> &'static str {
    PlatformType::from_raw(raw)
        .map(|platform| platform.as_str())
        .unwrap_or("")
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown platform `{0}`")]
pub struct UnknownPlatform(pub String);

impl FromStr for PlatformType {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}
