use std::path::{Path, PathBuf};

use crate::error::{Result, UnmixError};

/// Sorted `.csv` files in `dir`.
pub fn list_reference_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// True when several references are present, meaning every image was
/// acquired with a single laser and needs the reference for that laser.
pub fn is_single_shot(candidates: &[PathBuf]) -> bool {
    candidates.len() > 1
}

/// Pick the reference for an image acquired with `lasers`.
///
/// One candidate serves every image. With several, the file whose name
/// contains the first laser wavelength wins.
pub fn select_reference_file(candidates: &[PathBuf], lasers: &[u32]) -> Result<PathBuf> {
    match candidates {
        [] => Err(UnmixError::InvalidReference(
            "no reference files found".into(),
        )),
        [only] => Ok(only.clone()),
        _ => {
            let laser = *lasers.first().ok_or_else(|| {
                UnmixError::InvalidReference(
                    "several references available but the image lists no laser".into(),
                )
            })?;
            let needle = laser.to_string();
            candidates
                .iter()
                .find(|path| {
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.contains(&needle))
                })
                .cloned()
                .ok_or(UnmixError::NoReferenceForLaser(laser))
        }
    }
}
