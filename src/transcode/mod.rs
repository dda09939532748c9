//! Annotation transcoding from VOC-style XML to normalized YOLO rows.
//!
//! One XML file describes one image. Every `<object>` whose class is in the
//! [`ClassTable`] becomes one row `<class> <cx> <cy> <w> <h>` with the box
//! expressed as center and size relative to the image dimensions, rounded
//! to six decimal places.

mod classes;
mod voc;

pub use classes::{ClassTable, ROAD_DAMAGE_CLASSES};
pub use voc::VocAnnotation;

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::PrepError;

/// Extension of the source annotation files.
pub const XML_EXTENSION: &str = "xml";
/// Extension of the normalized label files.
pub const LABEL_EXTENSION: &str = "txt";
/// Decimal places kept in normalized coordinates.
pub const COORD_DECIMALS: i32 = 6;

const BOUNDS_EPSILON: f64 = 1e-6;

/// Image dimensions in pixels, as declared by the annotation file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// An axis-aligned box in absolute pixel units with a known class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub class_index: usize,
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    /// Express the box as center/size fractions of `size`.
    pub fn normalize(&self, size: ImageSize) -> NormalizedAnnotation {
        let image_w = f64::from(size.width);
        let image_h = f64::from(size.height);

        let norm_xmin = f64::from(self.xmin) / image_w;
        let norm_ymin = f64::from(self.ymin) / image_h;
        let norm_xmax = f64::from(self.xmax) / image_w;
        let norm_ymax = f64::from(self.ymax) / image_h;

        let width = norm_xmax - norm_xmin;
        let height = norm_ymax - norm_ymin;

        NormalizedAnnotation {
            class_index: self.class_index,
            center_x: round_coord(norm_xmin + width / 2.0),
            center_y: round_coord(norm_ymin + height / 2.0),
            width: round_coord(width),
            height: round_coord(height),
        }
    }
}

/// A box as center and size, each a fraction of the image dimension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedAnnotation {
    pub class_index: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedAnnotation {
    /// Returns true if the box has a non-negative size and lies inside the
    /// unit square, within a small tolerance for rounding.
    pub fn is_within_image(&self) -> bool {
        let within = |center: f64, extent: f64| {
            extent >= 0.0
                && center - extent / 2.0 >= -BOUNDS_EPSILON
                && center + extent / 2.0 <= 1.0 + BOUNDS_EPSILON
        };
        within(self.center_x, self.width) && within(self.center_y, self.height)
    }
}

impl fmt::Display for NormalizedAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_index, self.center_x, self.center_y, self.width, self.height
        )
    }
}

/// What to do when the label file for an annotation already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Leave existing label files untouched.
    #[default]
    SkipExisting,
    /// Regenerate label files unconditionally.
    Overwrite,
}

/// Result of writing one label file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Skipped,
}

/// Convert one annotation file into normalized rows.
///
/// Rows keep the order of `<object>` nodes in the file. Objects with an
/// unknown class produce no row.
///
/// # Errors
///
/// [`PrepError::Format`] if the file is not well-formed XML or lacks the
/// required nodes, [`PrepError::IoAt`] if it cannot be read.
pub fn convert(xml_path: &Path, classes: &ClassTable) -> Result<Vec<NormalizedAnnotation>, PrepError> {
    let xml = fs::read_to_string(xml_path).map_err(PrepError::io_at(xml_path))?;
    convert_at(&xml, xml_path, classes)
}

/// Convert annotation XML held in memory.
pub fn convert_str(xml: &str, classes: &ClassTable) -> Result<Vec<NormalizedAnnotation>, PrepError> {
    convert_at(xml, Path::new("<memory>"), classes)
}

/// Parse annotation XML without normalizing it.
///
/// The input must be valid UTF-8.
pub fn parse_voc_slice(bytes: &[u8], classes: &ClassTable) -> Result<VocAnnotation, PrepError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| PrepError::Format {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    voc::parse_voc_str(xml, Path::new("<memory>"), classes)
}

fn convert_at(
    xml: &str,
    path: &Path,
    classes: &ClassTable,
) -> Result<Vec<NormalizedAnnotation>, PrepError> {
    let parsed = voc::parse_voc_str(xml, path, classes)?;

    let rows: Vec<NormalizedAnnotation> = parsed
        .boxes
        .iter()
        .map(|bbox| bbox.normalize(parsed.size))
        .collect();

    for row in rows.iter().filter(|row| !row.is_within_image()) {
        warn!(
            "{}: box '{}' extends outside the {}x{} image",
            path.display(),
            row,
            parsed.size.width,
            parsed.size.height
        );
    }

    Ok(rows)
}

/// Render rows as label file content, one newline-terminated line per row.
pub fn render_labels(rows: &[NormalizedAnnotation]) -> String {
    rows.iter().map(|row| format!("{row}\n")).collect()
}

/// Label file path for an annotation file: same base name, `.txt`, inside
/// `output_dir`.
pub fn label_path_for(xml_path: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(with_label_extension(xml_path))
}

/// File name of the label paired with `path` (an image or annotation):
/// its stem plus `.txt`. Only the last extension is replaced, so
/// `a.b.jpg` pairs with `a.b.txt`.
pub fn with_label_extension(path: &Path) -> PathBuf {
    let mut name = path
        .file_stem()
        .unwrap_or(path.as_os_str())
        .to_os_string();
    name.push(".");
    name.push(LABEL_EXTENSION);
    PathBuf::from(name)
}

/// Write `rows` to `path` according to `policy`.
///
/// With [`WritePolicy::SkipExisting`] the file is created exclusively, so an
/// existing file (even one created concurrently) is never modified.
pub fn write_labels(
    path: &Path,
    rows: &[NormalizedAnnotation],
    policy: WritePolicy,
) -> Result<WriteOutcome, PrepError> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    match policy {
        WritePolicy::SkipExisting => options.create_new(true),
        WritePolicy::Overwrite => options.create(true).truncate(true),
    };

    let file = match options.open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            debug!("{}: exists, skipping", path.display());
            return Ok(WriteOutcome::Skipped);
        }
        Err(err) => return Err(PrepError::IoAt {
            path: path.to_path_buf(),
            source: err,
        }),
    };

    write_or_discard(file, path, render_labels(rows).as_bytes())?;
    Ok(WriteOutcome::Written)
}

/// Write `content` through `file`. On failure `path` is removed, so no
/// partial label file is left behind.
fn write_or_discard(mut file: impl Write, path: &Path, content: &[u8]) -> Result<(), PrepError> {
    let Err(source) = file.write_all(content).and_then(|()| file.flush()) else {
        return Ok(());
    };

    drop(file);
    if let Err(cleanup) = fs::remove_file(path) {
        warn!("could not remove partial label file {}: {cleanup}", path.display());
    }
    Err(PrepError::IoAt {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert `xml_path` and write its label file into `output_dir`.
///
/// Under [`WritePolicy::SkipExisting`] an existing label file short-circuits
/// before the XML is parsed.
pub fn transcode_file(
    xml_path: &Path,
    output_dir: &Path,
    classes: &ClassTable,
    policy: WritePolicy,
) -> Result<WriteOutcome, PrepError> {
    let label_path = label_path_for(xml_path, output_dir);
    if policy == WritePolicy::SkipExisting && label_path.exists() {
        debug!("{}: exists, skipping", label_path.display());
        return Ok(WriteOutcome::Skipped);
    }

    debug!("writing label for {}", xml_path.display());
    let rows = convert(xml_path, classes)?;
    write_labels(&label_path, &rows, policy)
}

fn round_coord(value: f64) -> f64 {
    let scale = 10f64.powi(COORD_DECIMALS);
    (value * scale).round_ties_even() / scale
}
