use std::env;
use std::process::Command;

fn emit(key: &str, value: impl AsRef<str>) {
    println!("cargo:rustc-env={}={}", key, value.as_ref());
}

/// First line of stdout from a successful command, if any.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn report_enabled_features() {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_").map(|f| f.to_lowercase()))
        .collect();
    features.sort();

    if features.is_empty() {
        features.push("none".to_string());
    }
    emit("BUILD_FEATURES", features.join(","));
}

fn report_repository_version() {
    let version = env::var("CI_BUILD_REF")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| command_output("git", &["describe", "--always", "--dirty", "--long", "--tags"]))
        .or_else(|| command_output("git", &["rev-parse", "--short", "HEAD"]))
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "unknown".to_string());

    emit("REPO_VERSION", version);
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    emit(
        "BUILD_PROFILE",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string()),
    );
    report_enabled_features();
    report_repository_version();
    emit("BUILD_TIMESTAMP", chrono::Utc::now().to_rfc3339());
    emit(
        "RUST_VERSION",
        command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string()),
    );
    emit(
        "BUILD_TARGET",
        env::var("TARGET").unwrap_or_else(|_| "unknown".to_string()),
    );
    emit(
        "BUILD_HOST",
        env::var("HOST").unwrap_or_else(|_| "unknown".to_string()),
    );
}
