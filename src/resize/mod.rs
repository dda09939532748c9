//! In-place image resizing.
//!
//! Scales every image so that its shorter side equals the target size while
//! keeping the aspect ratio. Files are rewritten in place in their original
//! format. The pixel work itself sits behind [`PixelResizer`].

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::DynamicImage;
use log::debug;

use crate::error::PrepError;
use crate::orchestrator::{run_parallel, RunOptions, RunReport};
use crate::partition::partition;

/// Default length of the shorter image side after resizing.
pub const DEFAULT_TARGET_SIZE: u32 = 640;

/// Resizes decoded pixels to exact dimensions.
pub trait PixelResizer: Sync {
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage;
}

/// [`PixelResizer`] backed by the `image` crate.
#[derive(Clone, Copy, Debug)]
pub struct ImageResizer {
    pub filter: FilterType,
}

impl Default for ImageResizer {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl PixelResizer for ImageResizer {
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        image.resize_exact(width, height, self.filter)
    }
}

/// What happened to one image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeOutcome {
    Resized {
        from: (u32, u32),
        to: (u32, u32),
    },
    /// Already at the target dimensions; the file was not rewritten.
    Unchanged,
}

/// Options for [`resize_images`].
#[derive(Clone, Debug)]
pub struct ResizeOptions {
    pub workers: usize,
    pub target_size: u32,
    pub run: RunOptions,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            target_size: DEFAULT_TARGET_SIZE,
            run: RunOptions::default(),
        }
    }
}

/// Dimensions after scaling the shorter side of `width`x`height` to `size`.
///
/// The longer side is scaled by the same factor and truncated.
pub fn target_dimensions(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width == height {
        return (size, size);
    }

    let scale_long = |short: u32, long: u32| (f64::from(long) * f64::from(size) / f64::from(short)) as u32;

    if width < height {
        (size, scale_long(width, height))
    } else {
        (scale_long(height, width), size)
    }
}

/// Resize the image at `path` and write it back to the same path.
pub fn resize_in_place(
    path: &Path,
    size: u32,
    resizer: &dyn PixelResizer,
) -> Result<ResizeOutcome, PrepError> {
    let image_err = |source| PrepError::Image {
        path: path.to_path_buf(),
        source,
    };

    let image = image::open(path).map_err(image_err)?;
    let from = (image.width(), image.height());
    let to = target_dimensions(from.0, from.1, size);

    if from == to {
        debug!("{}: already {}x{}", path.display(), to.0, to.1);
        return Ok(ResizeOutcome::Unchanged);
    }

    debug!(
        "{}: {}x{} -> {}x{}",
        path.display(),
        from.0,
        from.1,
        to.0,
        to.1
    );
    resizer
        .resize(&image, to.0, to.1)
        .save(path)
        .map_err(image_err)?;

    Ok(ResizeOutcome::Resized { from, to })
}

/// Resize every image in `paths` in place across `opts.workers` workers.
pub fn resize_images(
    paths: Vec<PathBuf>,
    opts: &ResizeOptions,
    resizer: &dyn PixelResizer,
) -> Result<RunReport<PathBuf>, PrepError> {
    if opts.target_size == 0 {
        return Err(PrepError::InvalidConfiguration {
            message: "target size must be at least 1".to_string(),
        });
    }

    let shards = partition(paths, opts.workers)?;
    run_parallel(shards, &opts.run, |path: &PathBuf| {
        resize_in_place(path, opts.target_size, resizer).map(|_| ())
    })
}
