//! Shared test utilities for crag-cli integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;

/// Get a Command for the crag binary, isolated from the user's environment.
///
/// # Panics
///
/// Panics if the crag binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn crag_cmd() -> Command {
    let mut cmd = Command::cargo_bin("crag").expect("crag binary should exist");
    cmd.env_remove("CRAG_CONFIG")
        .env_remove("CRAG_VERBOSE")
        .env_remove("CRAG_QUIET")
        .env("NO_COLOR", "1");
    cmd
}

/// Offline config: lexical judge, no fallback search, log in `dir`.
pub fn write_offline_config(dir: &Path, threshold: &str) -> PathBuf {
    let log_path = dir.join("resolutions.jsonl");
    let config = format!(
        "gate:\n  minimum_relevance_score: {}\njudge:\n  provider: lexical\nsearch:\n  provider: none\nlog:\n  resolution_log: {}\n",
        threshold,
        log_path.display()
    );
    let path = dir.join("config.yaml");
    fs::write(&path, config).expect("write config");
    path
}

/// Write primary retrieval output to `dir/name`.
pub fn write_retrieval(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write retrieval");
    path
}
