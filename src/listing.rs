use crate::datecode::{DateBounds, FilenameConvention};
use crate::error::{Error, Result};
use log::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Lists the date-coded files of `directory` that fall within `bounds`,
/// ascending by date code, as absolute paths.
pub async fn list_files(
    directory: impl AsRef<Path>,
    bounds: &DateBounds,
) -> Result<Vec<PathBuf>> {
    list_files_with(directory, bounds, &FilenameConvention::default()).await
}

pub async fn list_files_with(
    directory: impl AsRef<Path>,
    bounds: &DateBounds,
    convention: &FilenameConvention,
) -> Result<Vec<PathBuf>> {
    let directory = absolute(directory.as_ref())?;
    let list_err = |source| Error::DirectoryList {
        path: directory.clone(),
        source,
    };
    let matcher = convention
        .matcher()
        .map_err(|source| Error::InvalidConvention {
            path: directory.clone(),
            source,
        })?;

    let mut entries = tokio::fs::read_dir(&directory).await.map_err(list_err)?;
    let mut found: Vec<(String, OsString)> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let filename = entry.file_name();
        // the date code is ascii, so matching on the lossy form is enough
        let code = match matcher.extract(&filename.to_string_lossy()) {
            Some(code) => code.to_owned(),
            None => {
                trace!("skipping {:?}: no date code", filename);
                continue;
            }
        };
        if !bounds.contains(&code) {
            continue;
        }
        // directories can carry a date-code name too, but can't be streamed
        if entry.file_type().await.map_err(list_err)?.is_dir() {
            trace!("skipping directory {:?}", filename);
            continue;
        }
        found.push((code, filename));
    }
    found.sort();

    debug!(
        "{} files in {} within {:?}..={:?}",
        found.len(),
        directory.display(),
        bounds.min.as_ref().map(|c| c.as_str()),
        bounds.max.as_ref().map(|c| c.as_str())
    );
    Ok(found
        .into_iter()
        .map(|(_, filename)| directory.join(filename))
        .collect())
}

fn absolute(directory: &Path) -> Result<PathBuf> {
    if directory.is_absolute() {
        return Ok(directory.to_owned());
    }
    let cwd = std::env::current_dir().map_err(|source| Error::DirectoryList {
        path: directory.to_owned(),
        source,
    })?;
    Ok(cwd.join(directory))
}
