//! Build metadata generated by `build.rs`

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Wire protocol revision, from the manifest metadata
pub fn protocol_version() -> u32 {
    PROTOCOL_VERSION.parse().unwrap_or(20250727)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}

/// One-line banner logged at startup
pub fn banner() -> String {
    format!(
        "memsqs {} (protocol {}, built {}, git {})",
        env!("CARGO_PKG_VERSION"),
        protocol_version(),
        build_time(),
        git_hash()
    )
}
