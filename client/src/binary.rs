//! Engine binary discovery.
//!
//! Installed engine builds live under a versions root laid out as
//! `<root>/<version>/<arch>-<platform triple>/<executable>`. Versions are
//! directory names; the newest (reverse lexical order) version that actually
//! has a binary for this platform wins. The layout is produced by an
//! external downloader — this module only consumes it.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{Error, Result};

/// A resolved engine executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedBinary {
    pub version: String,
    pub path: PathBuf,
}

/// Architecture directory component. Only x86 and x86_64 engine builds
/// exist; anything else is unsupported.
fn arch_component(arch: &str) -> Result<&'static str> {
    match arch {
        "x86" => Ok("i686"),
        "x86_64" => Ok("x86_64"),
        other => Err(Error::UnsupportedArchitecture(other.to_string())),
    }
}

/// Platform triple suffix and executable filename. Only windows, macos and
/// linux engine builds exist; no other platform is attempted.
fn platform_components(os: &str) -> Result<(&'static str, &'static str)> {
    match os {
        "windows" => Ok(("pc-windows-gnu", "scribe-engine.exe")),
        "macos" => Ok(("apple-darwin", "scribe-engine")),
        "linux" => Ok(("unknown-linux-musl", "scribe-engine")),
        other => Err(Error::UnsupportedPlatform(other.to_string())),
    }
}

/// `{arch}-{triple}` directory name for the host platform.
pub fn host_platform_dir() -> Result<String> {
    let arch = arch_component(std::env::consts::ARCH)?;
    let (triple, _) = platform_components(std::env::consts::OS)?;
    Ok(format!("{arch}-{triple}"))
}

/// Engine executable filename for the host platform.
pub fn host_executable_name() -> Result<&'static str> {
    let (_, filename) = platform_components(std::env::consts::OS)?;
    Ok(filename)
}

/// Find the newest installed engine binary under `root`.
pub async fn locate(root: &Path) -> Result<LocatedBinary> {
    let platform_dir = host_platform_dir()?;
    let filename = host_executable_name()?;
    locate_in(root, &platform_dir, filename).await
}

async fn locate_in(root: &Path, platform_dir: &str, filename: &str) -> Result<LocatedBinary> {
    let mut versions = Vec::new();
    let mut entries = fs::read_dir(root).await?;
    while let Some(entry) = entries.next_entry().await? {
        versions.push(entry.file_name().to_string_lossy().into_owned());
    }
    versions.sort();

    let mut tried = Vec::new();
    for version in versions.iter().rev() {
        let candidate = root.join(version).join(platform_dir).join(filename);
        tried.push(candidate.clone());
        match fs::metadata(&candidate).await {
            Ok(_) => {
                return Ok(LocatedBinary {
                    version: version.clone(),
                    path: candidate,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    versions.reverse();
    Err(Error::BinaryNotFound { versions, tried })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLATFORM_DIR: &str = "x86_64-test-triple";
    const FILENAME: &str = "engine";

    fn install(root: &Path, version: &str, with_binary: bool) {
        let dir = root.join(version).join(PLATFORM_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        if with_binary {
            std::fs::write(dir.join(FILENAME), b"#!/bin/sh\n").unwrap();
        }
    }

    #[tokio::test]
    async fn test_picks_newest_version() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "1.2.3", true);
        install(tmp.path(), "1.3.0", true);

        let found = locate_in(tmp.path(), PLATFORM_DIR, FILENAME).await.unwrap();
        assert_eq!(found.version, "1.3.0");
        assert!(found.path.ends_with("1.3.0/x86_64-test-triple/engine"));
    }

    #[tokio::test]
    async fn test_falls_through_to_older_version() {
        // 1.3.0 exists as a directory but has no binary for this platform.
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "1.2.3", true);
        install(tmp.path(), "1.3.0", false);

        let found = locate_in(tmp.path(), PLATFORM_DIR, FILENAME).await.unwrap();
        assert_eq!(found.version, "1.2.3");
    }

    #[tokio::test]
    async fn test_not_found_lists_everything_tried() {
        let tmp = tempfile::tempdir().unwrap();
        install(tmp.path(), "1.2.3", false);
        install(tmp.path(), "1.3.0", false);

        let err = locate_in(tmp.path(), PLATFORM_DIR, FILENAME)
            .await
            .unwrap_err();
        match err {
            Error::BinaryNotFound { versions, tried } => {
                // Newest-first, matching probe order.
                assert_eq!(versions, vec!["1.3.0", "1.2.3"]);
                assert_eq!(tried.len(), 2);
                assert!(tried[0].ends_with("1.3.0/x86_64-test-triple/engine"));
                assert!(tried[1].ends_with("1.2.3/x86_64-test-triple/engine"));
            }
            other => panic!("expected BinaryNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_root_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = locate_in(tmp.path(), PLATFORM_DIR, FILENAME)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::BinaryNotFound { versions, tried } if versions.is_empty() && tried.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_missing_root_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let err = locate_in(&missing, PLATFORM_DIR, FILENAME).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_arch_mapping() {
        assert_eq!(arch_component("x86").unwrap(), "i686");
        assert_eq!(arch_component("x86_64").unwrap(), "x86_64");
        assert!(matches!(
            arch_component("aarch64"),
            Err(Error::UnsupportedArchitecture(a)) if a == "aarch64"
        ));
    }

    #[test]
    fn test_platform_mapping() {
        assert_eq!(
            platform_components("windows").unwrap(),
            ("pc-windows-gnu", "scribe-engine.exe")
        );
        assert_eq!(
            platform_components("macos").unwrap(),
            ("apple-darwin", "scribe-engine")
        );
        assert_eq!(
            platform_components("linux").unwrap(),
            ("unknown-linux-musl", "scribe-engine")
        );
        assert!(matches!(
            platform_components("freebsd"),
            Err(Error::UnsupportedPlatform(p)) if p == "freebsd"
        ));
    }

    #[test]
    fn test_lexical_version_order() {
        // Ordering is lexical by design: "1.9.0" sorts after "1.10.0".
        let mut versions = vec!["1.10.0".to_string(), "1.9.0".to_string()];
        versions.sort();
        assert_eq!(versions.last().unwrap(), "1.9.0");
    }
}
