//! Generates `version.rs` with the broker's protocol revision and build stamp.

use chrono::Utc;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Used when the manifest carries no `[package.metadata] protocol_version`
const FALLBACK_PROTOCOL_VERSION: i64 = 20250727;

fn protocol_version(manifest: &Path) -> i64 {
    fs::read_to_string(manifest)
        .ok()
        .and_then(|text| text.parse::<toml::Table>().ok())
        .and_then(|table| {
            table
                .get("package")?
                .get("metadata")?
                .get("protocol_version")?
                .as_integer()
        })
        .unwrap_or(FALLBACK_PROTOCOL_VERSION)
}

fn git_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let manifest_dir =
        PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("cargo sets OUT_DIR"));

    let generated = format!(
        "pub const PROTOCOL_VERSION: &str = \"{}\";\n\
         pub const BUILD_TIME: &str = \"{}\";\n\
         pub const GIT_HASH: &str = \"{}\";\n",
        protocol_version(&manifest_dir.join("Cargo.toml")),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        git_hash(),
    );
    fs::write(out_dir.join("version.rs"), generated).expect("cannot write version.rs");

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=.git/HEAD");
}
