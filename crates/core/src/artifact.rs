//! The `.dockeriid` marker file.
//!
//! Written by the build chain, consumed by push and start. The file always
//! reflects the most recent build; there is no history.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{DeployError, Result};
use crate::image::ImageId;

/// Default marker file name, placed next to the build context.
pub const IMAGE_ID_FILE: &str = ".dockeriid";

/// Records the built image's id for dependent steps.
#[derive(Debug, Clone)]
pub struct ImageIdFile {
    path: PathBuf,
}

impl ImageIdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(IMAGE_ID_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite any previously recorded id.
    pub fn write(&self, id: &ImageId) -> Result<()> {
        fs::write(&self.path, format!("{id}\n"))?;
        debug!(path = %self.path.display(), image_id = %id, "Wrote image id");
        Ok(())
    }

    /// Read and validate the recorded id.
    pub fn read(&self) -> Result<ImageId> {
        if !self.path.exists() {
            return Err(DeployError::MissingImageId {
                path: self.path.clone(),
            });
        }
        let raw = fs::read_to_string(&self.path)?;
        ImageId::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = ImageIdFile::in_dir(dir.path());
        let id = ImageId::parse("abc123def456").unwrap();

        file.write(&id).unwrap();
        assert_eq!(file.read().unwrap(), id);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = ImageIdFile::in_dir(dir.path());
        let err = file.read().unwrap_err();
        assert!(matches!(err, DeployError::MissingImageId { .. }));
    }

    #[test]
    fn test_garbage_content_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = ImageIdFile::in_dir(dir.path());
        fs::write(file.path(), "not an image id\n").unwrap();
        let err = file.read().unwrap_err();
        assert!(matches!(err, DeployError::InvalidImageId { .. }));
    }

    #[test]
    fn test_rebuild_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let file = ImageIdFile::in_dir(dir.path());

        file.write(&ImageId::parse("abc123def456").unwrap()).unwrap();
        file.write(&ImageId::parse("feed00beef00").unwrap()).unwrap();

        assert_eq!(file.read().unwrap().as_str(), "feed00beef00");
    }
}
