//! Mirroring of run outputs to object storage

use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Copies a local folder to a remote key such as `artifact/<timestamp>`
pub trait ArtifactSync: Send + Sync {
    fn sync_folder(&self, folder: &Path, key: &str) -> Result<()>;
}

/// Shells out to `aws s3 sync`
#[derive(Debug, Clone)]
pub struct AwsCliSync {
    bucket: String,
}

impl AwsCliSync {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self { bucket: bucket.into() }
    }

    pub fn destination(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }
}

impl ArtifactSync for AwsCliSync {
    fn sync_folder(&self, folder: &Path, key: &str) -> Result<()> {
        let destination = self.destination(key);
        let output = Command::new("aws")
            .arg("s3")
            .arg("sync")
            .arg(folder)
            .arg(&destination)
            .output()
            .map_err(|e| PipelineError::Connection(format!("cannot run aws cli: {}", e)))?;

        if !output.status.success() {
            return Err(PipelineError::Connection(format!(
                "aws s3 sync to {} exited with {}: {}",
                destination,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(folder = %folder.display(), destination = %destination, "synced folder");
        Ok(())
    }
}

/// Copies into a local directory tree, one sub-directory per key
#[derive(Debug, Clone)]
pub struct LocalSync {
    root: PathBuf,
}

impl LocalSync {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn copy_tree(from: &Path, to: &Path) -> Result<()> {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let target = to.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                Self::copy_tree(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), target)?;
            }
        }
        Ok(())
    }
}

impl ArtifactSync for LocalSync {
    fn sync_folder(&self, folder: &Path, key: &str) -> Result<()> {
        let destination = self.root.join(key);
        Self::copy_tree(folder, &destination)?;
        info!(folder = %folder.display(), destination = %destination.display(), "copied folder");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_destination() {
        let sync = AwsCliSync::new("netsec");
        assert_eq!(sync.destination("final_model/01_02_2024_03_04_05"), "s3://netsec/final_model/01_02_2024_03_04_05");
    }

    #[test]
    fn test_local_sync_copies_nested_tree() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("a/b/model.bin"), b"bytes").unwrap();
        fs::write(src.path().join("top.txt"), b"top").unwrap();

        LocalSync::new(dst.path()).sync_folder(src.path(), "artifact/ts").unwrap();

        assert_eq!(fs::read(dst.path().join("artifact/ts/a/b/model.bin")).unwrap(), b"bytes");
        assert_eq!(fs::read(dst.path().join("artifact/ts/top.txt")).unwrap(), b"top");
    }

    #[test]
    fn test_local_sync_missing_folder() {
        let dst = TempDir::new().unwrap();
        let result = LocalSync::new(dst.path()).sync_folder(Path::new("/nonexistent/run"), "artifact/ts");
        assert!(matches!(result, Err(PipelineError::Io(_))));
    }
}
