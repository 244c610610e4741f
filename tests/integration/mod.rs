//! Integration tests module for httprex
//!
//! Shared helpers for the document-to-resolved-request workflows.

pub mod end_to_end_test;
pub mod properties_test;
pub mod secret_resolution_test;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
///
/// Installs a test logger so `RUST_LOG=debug` shows the crate's logging.
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a workspace holding `files` (relative path, content).
pub fn create_workspace(files: &[(&str, &str)]) -> TempDir {
    init_test_env();
    let dir = TempDir::new().expect("Failed to create temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write test file");
    }
    dir
}

pub fn path_in(dir: &TempDir, name: &str) -> PathBuf {
    Path::new(dir.path()).join(name)
}
