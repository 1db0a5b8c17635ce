//! Resource linker: mirror a directory's entries into a working directory

use crate::error::{FetchError, Result};
use nbfetch_types::{LinkMode, LinkReport};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Path component that some notebook hosts mount one level deeper than
/// requested (`readonly/` becomes `readonly/readonly/`).
const READONLY_DIR: &str = "readonly";

/// Link every top-level entry of `src` into `dst` using the platform's
/// native mode (symlinks, or copies where symlinks are unavailable).
pub async fn link_all_files(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<LinkReport> {
    link_all_files_with(src, dst, LinkMode::native()).await
}

/// Like [`link_all_files`] with an explicit mode.
///
/// `dst` is created if missing. If `src` does not exist, the path with every
/// `readonly` component doubled is used instead. Existing symlinks in `dst`
/// are replaced; an existing regular file with the same name is an error in
/// symlink mode and overwritten in copy mode.
pub async fn link_all_files_with(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    mode: LinkMode,
) -> Result<LinkReport> {
    let dst = dst.as_ref();
    fs::create_dir_all(dst).await?;

    let mut source = src.as_ref().to_path_buf();
    if !fs::try_exists(&source).await.unwrap_or(false) {
        let alternate = nested_readonly(&source);
        debug!(
            "Source {} missing, using {}",
            source.display(),
            alternate.display()
        );
        source = alternate;
    }

    let source = std::path::absolute(&source).map_err(|e| link_error(&source, e))?;
    let mut names = Vec::new();
    let mut entries = fs::read_dir(&source)
        .await
        .map_err(|e| link_error(&source, e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| link_error(&source, e))?
    {
        names.push(entry.file_name());
    }
    names.sort();

    let mut linked = Vec::with_capacity(names.len());
    for name in names {
        let src_file = source.join(&name);
        let dst_file = dst.join(&name);
        link_entry(&src_file, &dst_file, mode)
            .await
            .map_err(|e| link_error(&dst_file, e))?;
        linked.push(dst_file);
    }

    info!(
        "Linked {} entries from {} into {} ({:?})",
        linked.len(),
        source.display(),
        dst.display(),
        mode
    );

    Ok(LinkReport {
        source,
        destination: dst.to_path_buf(),
        mode,
        entries: linked,
    })
}

/// Double every `readonly` component of `path`
pub fn nested_readonly(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        out.push(component);
        if matches!(component, Component::Normal(name) if name == READONLY_DIR) {
            out.push(READONLY_DIR);
        }
    }
    out
}

async fn link_entry(src: &Path, dst: &Path, mode: LinkMode) -> io::Result<()> {
    match mode {
        LinkMode::Copy => fs::copy(src, dst).await.map(|_| ()),
        LinkMode::Symlink => {
            if let Ok(meta) = fs::symlink_metadata(dst).await {
                if meta.file_type().is_symlink() {
                    fs::remove_file(dst).await?;
                }
            }
            create_symlink(src, dst).await
        }
    }
}

#[cfg(unix)]
async fn create_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::symlink(src, dst).await
}

#[cfg(windows)]
async fn create_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::symlink_dir(src, dst).await
    } else {
        fs::symlink_file(src, dst).await
    }
}

fn link_error(path: &Path, source: io::Error) -> FetchError {
    FetchError::Link {
        path: path.to_path_buf(),
        source,
    }
}
