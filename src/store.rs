use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::error::DecpError;

/// Local layout of every downloaded source file and the coverage output.
///
/// All paths hang off a single data root so a run can be pointed at a
/// scratch directory wholesale.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: Utf8PathBuf,
}

impl DataStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn decp_path(&self) -> Utf8PathBuf {
        self.root.join("decp.csv")
    }

    pub fn sirens_path(&self) -> Utf8PathBuf {
        self.root.join("sirens.csv")
    }

    pub fn coverage_path(&self) -> Utf8PathBuf {
        self.root.join("couverture.csv")
    }

    pub fn contours_communes_path(&self) -> Utf8PathBuf {
        self.root.join("contours").join("communes.geojson")
    }

    pub fn contours_departements_path(&self) -> Utf8PathBuf {
        self.root.join("contours").join("departements.geojson")
    }

    pub fn contours_regions_path(&self) -> Utf8PathBuf {
        self.root.join("contours").join("regions.geojson")
    }

    pub fn download_stamp_path(&self, source: &str) -> Utf8PathBuf {
        self.root.join("metadata").join(format!("{source}.json"))
    }

    pub fn ensure_root(&self) -> Result<(), DecpError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| DecpError::Filesystem(err.to_string()))
    }

    pub fn ensure_parent(path: &Utf8Path) -> Result<(), DecpError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    /// Write through a sibling temp file so an interrupted run never leaves
    /// a truncated file behind.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DecpError> {
        Self::ensure_parent(path)?;
        let parent = path
            .parent()
            .ok_or_else(|| DecpError::Filesystem("invalid destination path".to_string()))?;
        let temp = Builder::new()
            .prefix(".decp-couverture")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        fs::write(temp.path(), content).map_err(|err| DecpError::Filesystem(err.to_string()))?;
        if path.as_std_path().exists() {
            fs::remove_file(path.as_std_path())
                .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        }
        temp.persist(path.as_std_path())
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn write_stamp(path: &Utf8Path, stamp: &DownloadStamp) -> Result<(), DecpError> {
        let content = serde_json::to_vec_pretty(stamp)
            .map_err(|err| DecpError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }
}

/// Provenance note written next to each downloaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadStamp {
    pub source: String,
    pub url: String,
    pub downloaded_at: String,
    pub tool: String,
}
