use std::fmt;

use serde::Serialize;

/// Compile-time facts about the running binary, captured by `build.rs`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub target: &'static str,
    pub host: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("REPO_VERSION"),
        build_profile: env!("BUILD_PROFILE"),
        build_features: env!("BUILD_FEATURES"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        rust_version: env!("RUST_VERSION"),
        target: env!("BUILD_TARGET"),
        host: env!("BUILD_HOST"),
    }
}

/// Shorthand for [`build_info`] usable from other crates.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::build_info()
    };
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "version:   {}", self.version)?;
        writeln!(f, "profile:   {}", self.build_profile)?;
        writeln!(f, "features:  {}", self.build_features)?;
        writeln!(f, "built at:  {}", self.build_timestamp)?;
        writeln!(f, "rustc:     {}", self.rust_version)?;
        write!(f, "target:    {} (host {})", self.target, self.host)
    }
}
