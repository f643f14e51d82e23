//! Filesystem helpers shared by the pipeline stages

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{InputError, Result};
use crate::make::{CopyGroup, RemoveGroup};

/// Remove a directory tree if it exists
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.is_dir() {
        debug!(path = %path.display(), "removing directory");
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// Remove a file or directory if it exists
pub fn remove_path(path: &Path) -> Result<()> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Copy a file, creating the destination's parent directory
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dst)?;
    Ok(())
}

/// Copy a directory tree, overwriting existing files
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    debug!(from = %src.display(), to = %dst.display(), "copying directory");
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy a file or directory to `dst`
pub fn copy_entry(src: &Path, dst: &Path) -> Result<()> {
    if src.is_dir() {
        copy_dir_recursive(src, dst)
    } else {
        copy_file(src, dst)
    }
}

/// Compile glob patterns into a set matched against entry names
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| InputError::InvalidValue {
            field: "glob".to_string(),
            message: format!("'{}': {}", pattern, e),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| {
        InputError::InvalidValue {
            field: "glob".to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Name-based include/exclude rules for copying the children of a directory
#[derive(Debug)]
pub struct CopyFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl CopyFilter {
    /// Include the given patterns, excluding nothing
    pub fn new(include: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include)?,
            exclude: GlobSet::empty(),
        })
    }

    /// Exclude entries matching any of these names
    pub fn excluding(mut self, exclude: &[String]) -> Result<Self> {
        self.exclude = build_globset(exclude)?;
        Ok(self)
    }

    /// Include everything except the given names
    pub fn all_except(exclude: &[String]) -> Result<Self> {
        Self::new(&["*".to_string()])?.excluding(exclude)
    }

    fn accepts(&self, name: &str) -> bool {
        self.include.is_match(name) && !self.exclude.is_match(name)
    }
}

/// Copy the immediate children of `src` whose names pass `filter` into
/// `dst`. Matching directories are copied with their whole content.
/// Returns the number of entries copied.
pub fn copy_matching(src: &Path, dst: &Path, filter: &CopyFilter) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let mut entries: Vec<_> = std::fs::read_dir(src)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    let mut copied = 0;
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if !filter.accepts(&name) {
            continue;
        }
        copy_entry(&entry.path(), &dst.join(&name))?;
        copied += 1;
    }

    debug!(from = %src.display(), to = %dst.display(), copied, "copied matching entries");
    Ok(copied)
}

/// Copy every file under `src` whose name passes `filter`, keeping its
/// relative location. Directories whose names pass are copied whole.
pub fn copy_matching_recursive(src: &Path, dst: &Path, filter: &CopyFilter) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    let mut walker = WalkDir::new(src).min_depth(1).sort_by_file_name().into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(std::io::Error::from)?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !filter.accepts(&name) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        copy_entry(entry.path(), &dst.join(relative))?;
        copied += 1;

        if entry.file_type().is_dir() {
            walker.skip_current_dir();
        }
    }
    Ok(copied)
}

/// Find paths matching a glob pattern, sorted
pub fn find_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| InputError::InvalidValue {
        field: "pattern".to_string(),
        message: format!("'{}': {}", pattern, e),
    })?;

    let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    found.sort();
    Ok(found)
}

/// Apply a `make.json` copy group: sources are globs relative to
/// `source_root`, copied into `out_dir/<dest>`
pub fn apply_copy_group(source_root: &Path, out_dir: &Path, group: &CopyGroup) -> Result<()> {
    let dest = match &group.dest {
        Some(dest) => out_dir.join(dest),
        None => out_dir.to_path_buf(),
    };
    std::fs::create_dir_all(&dest)?;

    for source in &group.source {
        let pattern = source_root.join(source);
        for path in find_paths(&pattern.to_string_lossy())? {
            let Some(name) = path.file_name() else {
                continue;
            };
            if path.is_dir() && !group.recursive() {
                warn!(path = %path.display(), "skipping directory in non-recursive copy");
                continue;
            }
            copy_entry(&path, &dest.join(name))?;
        }
    }
    Ok(())
}

/// Apply a `make.json` remove group inside `out_dir`
pub fn apply_remove_group(out_dir: &Path, group: &RemoveGroup) -> Result<()> {
    for item in &group.items {
        let pattern = out_dir.join(item);
        for path in find_paths(&pattern.to_string_lossy())? {
            if !path.starts_with(out_dir) {
                continue;
            }
            debug!(path = %path.display(), "removing");
            remove_path(&path)?;
        }
    }
    Ok(())
}

/// A file copied into place for the duration of a scope.
///
/// The copy is removed when the guard drops, unless a file already
/// existed at the destination before staging.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    owned: bool,
}

impl StagedFile {
    /// Copy `src` into `dir`, keeping its file name
    pub fn stage(src: &Path, dir: &Path) -> Result<Self> {
        let name = src
            .file_name()
            .ok_or_else(|| crate::error::NotFoundError::Path(src.to_path_buf()))?;
        let path = dir.join(name);
        let owned = !path.exists();
        if owned {
            copy_file(src, &path)?;
            debug!(path = %path.display(), "staged file");
        }
        Ok(Self { path, owned })
    }

    /// Staged location
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.owned {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove staged file");
            }
        }
    }
}
