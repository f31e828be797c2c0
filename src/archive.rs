use std::fs;
use std::io;

use camino::Utf8Path;
use zip::ZipArchive;

use crate::error::DecpError;
use crate::store::DataStore;

/// Extract the single CSV entry of a downloaded archive to `destination`.
///
/// The Sirene stock archive holds exactly one CSV; anything else in the
/// archive is ignored.
pub fn extract_csv_entry(zip_path: &Utf8Path, destination: &Utf8Path) -> Result<(), DecpError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| DecpError::Archive(format!("open archive {zip_path}: {err}")))?;
    let mut archive = ZipArchive::new(file).map_err(|err| DecpError::Archive(err.to_string()))?;

    let csv_index = (0..archive.len())
        .find(|&index| {
            archive
                .by_index(index)
                .ok()
                .and_then(|entry| entry.enclosed_name())
                .map(|name| {
                    name.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("csv"))
                        .unwrap_or(false)
                })
                .unwrap_or(false)
        })
        .ok_or_else(|| DecpError::Archive(format!("no CSV entry in {zip_path}")))?;

    let mut entry = archive
        .by_index(csv_index)
        .map_err(|err| DecpError::Archive(err.to_string()))?;

    DataStore::ensure_parent(destination)?;
    let mut outfile = fs::File::create(destination.as_std_path())
        .map_err(|err| DecpError::Filesystem(err.to_string()))?;
    io::copy(&mut entry, &mut outfile).map_err(|err| DecpError::Filesystem(err.to_string()))?;
    Ok(())
}
