//! Build script for playlog-etl
//!
//! Bakes the build identification shown in the startup line:
//! - Git commit hash (short form, "unknown" outside a checkout)
//! - Build timestamp
//! - Build profile (debug/release)

use std::path::PathBuf;
use std::process::Command;

/// Trimmed stdout of a successful `git` invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let git_hash = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let build_timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);

    println!("cargo:rerun-if-changed=build.rs");

    // Only watch HEAD when there is a checkout; a missing path would rerun every build
    let head = git(&["rev-parse", "--absolute-git-dir"])
        .map(|dir| PathBuf::from(dir).join("HEAD"))
        .filter(|head| head.is_file());
    if let Some(head) = head {
        println!("cargo:rerun-if-changed={}", head.display());
    }
}
