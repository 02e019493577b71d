use std::env;
use std::process::Command;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const UNKNOWN: &str = "unknown";

struct BuildInfo {
    commit: String,
    commit_short: String,
    date: String,
}

impl BuildInfo {
    fn collect() -> Self {
        let commit = env::var("GITHUB_SHA")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| run_git(&["rev-parse", "HEAD"]));
        let commit_short = commit
            .as_deref()
            .map(|full| full.chars().take(7).collect())
            .unwrap_or_else(|| UNKNOWN.to_string());
        // Outside a checkout there is no commit date; the build time stands in.
        let date = run_git(&["log", "-1", "--format=%cI"])
            .or_else(|| OffsetDateTime::now_utc().format(&Rfc3339).ok())
            .unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            commit: commit.unwrap_or_else(|| UNKNOWN.to_string()),
            commit_short,
            date,
        }
    }

    fn emit(&self) {
        println!("cargo:rustc-env=STREAMSHARK_BUILD_COMMIT={}", self.commit_short);
        println!("cargo:rustc-env=STREAMSHARK_BUILD_COMMIT_FULL={}", self.commit);
        println!("cargo:rustc-env=STREAMSHARK_BUILD_DATE={}", self.date);
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
    BuildInfo::collect().emit();
}

fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}
