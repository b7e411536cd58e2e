//! Embeds `LSC_REVISION` (git describe plus build profile) and
//! `LSC_BUILT` (UTC, second precision) for the startup banner.

use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    Some(text.trim().to_owned()).filter(|s| !s.is_empty())
}

fn main() {
    let revision = git(&["describe", "--always", "--abbrev=8"])
        .unwrap_or_else(|| "unknown".to_owned());
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_owned());

    println!("cargo:rustc-env=LSC_REVISION={}-{}", revision, profile);
    println!(
        "cargo:rustc-env=LSC_BUILT={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );

    if let Some(head) = git(&["rev-parse", "--git-path", "HEAD"]) {
        println!("cargo:rerun-if-changed={}", head);
    }
    println!("cargo:rerun-if-changed=build.rs");
}
