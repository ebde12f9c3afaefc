//! Locating optional sample files.
//!
//! Real GEMPAK and GRIB2 samples are large and not checked in; tests that
//! need one look for it in the locations below and skip when it is absent.

use std::path::PathBuf;

fn workspace_root() -> PathBuf {
    // crates/test-utils -> workspace root
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(|p| p.to_path_buf())
        .unwrap_or(manifest_dir)
}

/// Find a sample file by name.
///
/// `TEST_DATA_DIR` is tried first, then the `testdata/` directories of the
/// two parser crates, then `testdata/` at the workspace root.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(dir).join(name));
    }

    let root = workspace_root();
    candidates.extend([
        root.join("crates/gempak-parser/testdata").join(name),
        root.join("crates/grib2-parser/testdata").join(name),
        root.join("testdata").join(name),
    ]);

    candidates.into_iter().find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_holds_workspace_manifest() {
        let manifest = workspace_root().join("Cargo.toml");
        let text = std::fs::read_to_string(&manifest).unwrap();
        assert!(text.contains("[workspace]"), "{:?}", manifest);
    }

    #[test]
    fn test_missing_sample_not_found() {
        assert!(find_test_file("definitely_not_here.gem").is_none());
    }

    #[test]
    fn test_directory_is_not_a_sample() {
        assert!(find_test_file("").is_none());
    }
}
