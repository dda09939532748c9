//! On-disk layout of the multi-country dataset.
//!
//! ```text
//! <data_dir>/<country>/train/images/*.jpg
//! <data_dir>/<country>/train/annotations/xmls/*.xml
//! <data_dir>/<country>/train/annotations/yolo/*.txt
//! <data_dir>/<out_name>/{images,labels}/{train,val}/*
//! <data_dir>/stats/results.txt
//! ```

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::PrepError;

/// Image file extensions picked up from image directories.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];
/// Default name of the materialized dataset directory.
pub const DEFAULT_OUTPUT_NAME: &str = "rdd_2022_dashboard";
/// Directory receiving the statistics table.
pub const STATS_DIR: &str = "stats";

/// Paths of one country's source data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountryLayout {
    pub name: String,
    pub root: PathBuf,
}

impl CountryLayout {
    pub fn new(data_dir: &Path, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: data_dir.join(&name),
            name,
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("train").join("images")
    }

    pub fn xml_dir(&self) -> PathBuf {
        self.root.join("train").join("annotations").join("xmls")
    }

    pub fn yolo_dir(&self) -> PathBuf {
        self.root.join("train").join("annotations").join("yolo")
    }
}

/// List the country directories under `data_dir`, sorted by name.
///
/// Hidden directories and any name in `exclude` (the stats directory, the
/// materialized output) are skipped.
pub fn discover_countries(
    data_dir: &Path,
    exclude: &[&str],
) -> Result<Vec<CountryLayout>, PrepError> {
    if !data_dir.is_dir() {
        return Err(PrepError::InvalidConfiguration {
            message: format!("data directory '{}' does not exist", data_dir.display()),
        });
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(data_dir).map_err(PrepError::io_at(data_dir))? {
        let entry = entry.map_err(PrepError::io_at(data_dir))?;
        if !entry.path().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') || exclude.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names
        .into_iter()
        .map(|name| CountryLayout::new(data_dir, name))
        .collect())
}

/// List regular files directly inside `dir` whose extension is in
/// `extensions` (case-insensitive), sorted by file name.
pub fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, PrepError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|source| PrepError::IoAt {
            path: dir.to_path_buf(),
            source: source.into(),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Like [`list_files`] but returns bare file names.
pub fn list_file_names(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, PrepError> {
    Ok(list_files(dir, extensions)?
        .into_iter()
        .filter_map(|path| path.file_name().map(PathBuf::from))
        .collect())
}

/// Create `dir` and its parents; succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<(), PrepError> {
    fs::create_dir_all(dir).map_err(PrepError::io_at(dir))
}

pub(crate) fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}
