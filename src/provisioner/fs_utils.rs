//! Directory copies used to assemble build contexts.

use std::{fs, path::Path};

use anyhow::{bail, Context};

/// Recursively copy the directory `from` to `to`, which must not exist yet.
///
/// Symbolic links are followed: the copy holds regular files only, so nothing in `to` points
/// back into `from`.
pub fn copy_tree(from: &Path, to: &Path) -> anyhow::Result<()> {
    if to.exists() {
        bail!("'{}' already exists", to.display());
    }
    fs::create_dir_all(to).with_context(|| format!("could not create '{}'", to.display()))?;
    copy_contents(from, to)
}

/// Copy every entry of `from` into the existing directory `to`.
///
/// Files overwrite files of the same name, subdirectories are copied recursively.
pub fn copy_contents(from: &Path, to: &Path) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(from).with_context(|| format!("could not read '{}'", from.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("one entry of '{}' cannot be read", from.display()))?;
        let source = entry.path();
        let dest = to.join(entry.file_name());
        let metadata = fs::metadata(&source)
            .with_context(|| format!("could not stat '{}'", source.display()))?;

        if metadata.is_dir() {
            if !dest.exists() {
                fs::create_dir(&dest)
                    .with_context(|| format!("could not create '{}'", dest.display()))?;
            }
            copy_contents(&source, &dest)?;
        } else {
            fs::copy(&source, &dest).with_context(|| {
                format!("could not copy '{}' to '{}'", source.display(), dest.display())
            })?;
        }
    }
    Ok(())
}
