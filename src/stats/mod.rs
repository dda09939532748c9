//! Per-country dataset statistics.
//!
//! For each country: the dimensions of a sample image, the number of
//! images and the number of normalized label rows.

mod report;

pub use report::{CountryStats, StatsReport};

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::PrepError;
use crate::layout::{self, CountryLayout, IMAGE_EXTENSIONS};
use crate::transcode::LABEL_EXTENSION;

/// File name of the rendered table inside the stats directory.
pub const RESULTS_FILE: &str = "results.txt";

/// Collect statistics for one country.
///
/// The image size is read from the first image by file name; a country
/// without images reports no size.
pub fn collect_country_stats(country: &CountryLayout) -> Result<CountryStats, PrepError> {
    let images = layout::list_files(&country.images_dir(), &IMAGE_EXTENSIONS)?;
    let image_size = images.first().map(|path| read_image_size(path)).transpose()?;

    let yolo_dir = country.yolo_dir();
    let labels = if yolo_dir.is_dir() {
        count_label_rows(&yolo_dir)?
    } else {
        debug!("{}: no label directory", country.name);
        0
    };

    Ok(CountryStats {
        country: country.name.clone(),
        image_size,
        images: images.len(),
        labels,
    })
}

/// Collect statistics for every country in order.
pub fn collect_stats(countries: &[CountryLayout]) -> Result<StatsReport, PrepError> {
    let rows = countries
        .iter()
        .map(collect_country_stats)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(StatsReport { countries: rows })
}

/// Write the rendered table to `<stats_dir>/results.txt`.
pub fn write_report(report: &StatsReport, stats_dir: &Path) -> Result<(), PrepError> {
    layout::ensure_dir(stats_dir)?;
    let path = stats_dir.join(RESULTS_FILE);
    fs::write(&path, report.to_string()).map_err(PrepError::io_at(&path))
}

/// Count non-blank lines across all label files in `dir`.
pub fn count_label_rows(dir: &Path) -> Result<usize, PrepError> {
    let mut total = 0;
    for path in layout::list_files(dir, &[LABEL_EXTENSION])? {
        let content = fs::read_to_string(&path).map_err(PrepError::io_at(&path))?;
        total += content.lines().filter(|line| !line.trim().is_empty()).count();
    }
    Ok(total)
}

fn read_image_size(path: &Path) -> Result<(u32, u32), PrepError> {
    let size = imagesize::size(path).map_err(|source| PrepError::ImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let to_u32 = |value: usize, what: &str| {
        u32::try_from(value).map_err(|_| PrepError::Format {
            path: path.to_path_buf(),
            message: format!("image {what} {value} does not fit in u32"),
        })
    };

    Ok((to_u32(size.width, "width")?, to_u32(size.height, "height")?))
}
