//! Local layout of retrieved files and the sequential download loop.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AsicError, AsicResult};
use crate::metadata::AsicFile;
use crate::reshape::{preprocess, recipe_for, write_csv};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalLayout {
    /// Remote relative path reproduced under the destination root.
    #[default]
    Mirror,
    /// `{remote_parent}/{normalized_version}/{remote_name}`; non-versioned files use the
    /// extension without its dot in place of the version.
    ByVersion,
}

// Remote path segments that are safe to join under a local root.
fn segments(remote: &str) -> impl Iterator<Item = &str> {
    remote.split('/').filter(|s| !s.is_empty() && *s != "." && *s != "..")
}

pub fn local_destination(root: &Path, file: &AsicFile, layout: LocalLayout) -> PathBuf {
    let mut p = root.to_path_buf();
    for s in segments(file.remote_parent()) { p.push(s); }
    if layout == LocalLayout::ByVersion {
        match &file.metadata.version {
            Some(v) => p.push(v),
            None => p.push(file.metadata.extension.trim_start_matches('.')),
        }
    }
    p.push(file.remote_name());
    p
}

/// Where the reshaped table of `file` is written: its by-version location with a `.csv` extension.
pub fn processed_destination(root: &Path, file: &AsicFile) -> PathBuf {
    local_destination(root, file, LocalLayout::ByVersion).with_extension("csv")
}

/// Retrieve files one at a time, creating parent directories as needed.
pub fn download_files<T: Transport>(transport: &mut T, files: &[AsicFile], root: &Path, layout: LocalLayout) -> AsicResult<Vec<(AsicFile, PathBuf)>> {
    let mut out = Vec::with_capacity(files.len());
    for f in files {
        let dest = local_destination(root, f, layout);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AsicError::io(parent.display().to_string(), e))?;
        }
        transport.retrieve_to_local(&f.remote_path, &dest)?;
        info!(target: "asic::download", "{} -> {}", f.remote_path, dest.display());
        out.push((f.clone(), dest));
    }
    Ok(out)
}

/// Reshape downloaded files and write each as CSV. Kinds without a recipe are skipped.
pub fn preprocess_downloads(downloaded: &[(AsicFile, PathBuf)], root: &Path) -> AsicResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (file, local) in downloaded {
        if recipe_for(&file.kind).is_none() {
            warn!(target: "asic::download", "no reshaping recipe for {}, keeping raw {}", file.kind, local.display());
            continue;
        }
        let bytes = std::fs::read(local).map_err(|e| AsicError::io(local.display().to_string(), e))?;
        let mut df = preprocess(&bytes, file)?;
        let dest = processed_destination(root, file);
        write_csv(&mut df, &dest)?;
        info!(target: "asic::download", "reshaped {} rows into {}", df.height(), dest.display());
        written.push(dest);
    }
    Ok(written)
}
