//! Image sampling and lookup
//!
//! ## Sampling
//!
//! Draws a reproducible subset of `.jpg` entries from the image archive,
//! extracts them flat as `<image_id>.jpg` and writes the sampled ids one per
//! line. The benchmark later restricts its questions to these images.
//! Entries whose file stem was already extracted from another folder are
//! skipped with a warning.
//!
//! ## Lookup
//!
//! [`ImageStore`] resolves an image id to `<dir>/<image_id>.jpg`.

use anyhow::{Context, Result};
use rand::Rng;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::dataset::sample;
use crate::error::{AnalysisError, AnalysisResult};

/// Resolves image ids to readable files
pub trait ImageSource {
    fn locate(&self, image_id: &str) -> AnalysisResult<PathBuf>;
}

/// Flat directory of `<image_id>.jpg` files
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, image_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", image_id))
    }
}

impl ImageSource for ImageStore {
    fn locate(&self, image_id: &str) -> AnalysisResult<PathBuf> {
        let path = self.path_for(image_id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(AnalysisError::MissingResource {
                resource: format!("image {}", path.display()),
            })
        }
    }
}

/// Result of sampling the archive
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// Number of `.jpg` entries in the archive
    pub archive_images: usize,
    /// Sampled ids, in draw order
    pub image_ids: Vec<String>,
}

fn is_jpeg_entry(name: &str) -> bool {
    !name.ends_with('/') && name.to_lowercase().ends_with(".jpg")
}

/// Image id of an archive entry (file stem of its base name)
fn entry_image_id(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Sample `n` images from `archive` and extract them into `out_dir`
pub fn sample_from_archive<R: Rng + ?Sized>(
    archive: &Path,
    out_dir: &Path,
    n: usize,
    rng: &mut R,
) -> Result<ImageSample> {
    let file = File::open(archive).with_context(|| format!("Failed to open image archive: {:?}", archive))?;
    let mut zip = zip::ZipArchive::new(file).with_context(|| format!("Failed to read zip archive: {:?}", archive))?;

    let mut names = Vec::new();
    for i in 0..zip.len() {
        let entry = zip.by_index(i)?;
        if !entry.is_dir() && is_jpeg_entry(entry.name()) {
            names.push(entry.name().to_string());
        }
    }
    tracing::info!("Archive {:?} holds {} images", archive, names.len());
    if names.len() < n {
        tracing::warn!("Requested {} images but archive only has {}", n, names.len());
    }

    std::fs::create_dir_all(out_dir).with_context(|| format!("Failed to create image dir: {:?}", out_dir))?;

    let mut image_ids = Vec::with_capacity(n.min(names.len()));
    let mut seen = HashSet::new();
    for name in sample(&names, n, rng) {
        let Some(image_id) = entry_image_id(name) else {
            tracing::warn!("Skipping archive entry without a file name: {}", name);
            continue;
        };
        // Extraction is flat, so a second entry with the same stem would overwrite the first
        if !seen.insert(image_id.clone()) {
            tracing::warn!("Skipping archive entry {}: image id {} already extracted", name, image_id);
            continue;
        }
        let mut entry = zip.by_name(name).with_context(|| format!("Failed to read archive entry: {}", name))?;
        let target = out_dir.join(format!("{}.jpg", image_id));
        let mut out = File::create(&target).with_context(|| format!("Failed to create {:?}", target))?;
        std::io::copy(&mut entry, &mut out).with_context(|| format!("Failed to extract {}", name))?;
        image_ids.push(image_id);
    }
    tracing::info!("Extracted {} images to {:?}", image_ids.len(), out_dir);

    Ok(ImageSample {
        archive_images: names.len(),
        image_ids,
    })
}

/// Write image ids one per line
pub fn write_image_ids(path: &Path, ids: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, ids.join("\n")).with_context(|| format!("Failed to write image ids: {:?}", path))?;
    Ok(())
}

/// Read the set of sampled image ids (blank lines ignored)
pub fn read_image_ids(path: &Path) -> Result<HashSet<String>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read image ids: {:?}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
