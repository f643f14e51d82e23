//! External artifacts declared in `make.json`
//!
//! Downloads land in a cache directory keyed by URL. A `.completed` marker
//! next to each cache entry makes repeated builds skip the download; the
//! cached content is then copied into the output directory on every build.

use std::path::{Path, PathBuf};

use taskpack_core::error::{Result, ToolError};
use taskpack_core::fsutil::{apply_copy_group, copy_entry, remove_dir_if_exists};
use taskpack_core::make::Externals;
use tracing::{debug, info};

use crate::traits::ToolRunner;

const COMPLETED_MARKER: &str = ".completed";

/// Fetches externals through a tool runner into a download cache
pub struct ExternalsFetcher<'a> {
    runner: &'a dyn ToolRunner,
    cache_dir: PathBuf,
}

impl<'a> ExternalsFetcher<'a> {
    /// Create a fetcher caching under `cache_dir`
    pub fn new(runner: &'a dyn ToolRunner, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cache_dir: cache_dir.into(),
        }
    }

    /// Fetch every declared external into `out_dir`
    pub fn fetch_all(&self, externals: &Externals, out_dir: &Path) -> Result<()> {
        for archive in &externals.archive_packages {
            let extracted = self.cached_archive("archive", &archive.url)?;
            copy_entry(&extracted, &out_dir.join(&archive.dest))?;
        }

        for file in &externals.files {
            let cached = self.cached_file(&file.url)?;
            copy_entry(&cached, &out_dir.join(&file.dest))?;
        }

        for package in &externals.nugetv2 {
            let extracted = self.cached_archive("nuget", &package.download_url())?;
            for group in &package.cp {
                apply_copy_group(&extracted, out_dir, group)?;
            }
        }

        Ok(())
    }

    /// Download and extract a zip archive once; returns the extraction directory
    fn cached_archive(&self, kind: &str, url: &str) -> Result<PathBuf> {
        let entry = self.cache_dir.join(kind).join(cache_key(url));
        let extracted = entry.join("extracted");
        let marker = completed_marker(&entry);
        if marker.is_file() {
            debug!(url, "using cached archive");
            return Ok(extracted);
        }

        info!(url, "fetching archive");
        remove_dir_if_exists(&entry)?;
        let archive = entry.join("archive.zip");
        self.runner.fetch(url, &archive)?;
        extract_zip(url, &archive, &extracted)?;
        std::fs::write(&marker, "")?;
        Ok(extracted)
    }

    /// Download a single file once; returns the cached file
    fn cached_file(&self, url: &str) -> Result<PathBuf> {
        let entry = self.cache_dir.join("file").join(cache_key(url));
        let name = url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .map(|s| s.split(['?', '#']).next().unwrap_or(s))
            .unwrap_or("download");
        let file = entry.join(name);
        let marker = completed_marker(&entry);
        if marker.is_file() {
            debug!(url, "using cached file");
            return Ok(file);
        }

        info!(url, "fetching file");
        remove_dir_if_exists(&entry)?;
        self.runner.fetch(url, &file)?;
        std::fs::write(&marker, "")?;
        Ok(file)
    }
}

/// Directory-safe cache key for a URL
fn cache_key(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

fn completed_marker(entry: &Path) -> PathBuf {
    let mut name = entry
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(COMPLETED_MARKER);
    entry.with_file_name(name)
}

fn extract_zip(url: &str, archive: &Path, dest: &Path) -> Result<()> {
    let invalid = |e: zip::result::ZipError| ToolError::Download {
        url: url.to_string(),
        reason: format!("invalid zip archive: {}", e),
    };

    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(invalid)?;
    std::fs::create_dir_all(dest)?;
    zip.extract(dest).map_err(invalid)?;
    debug!(archive = %archive.display(), entries = zip.len(), "extracted archive");
    Ok(())
}
