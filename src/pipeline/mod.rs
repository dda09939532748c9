//! Multi-country drivers.
//!
//! Each driver enumerates the countries under the data directory and runs
//! one component per country through partition + orchestrator, joining all
//! workers before moving on to the next country.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{info, warn};

use crate::error::PrepError;
use crate::layout::{self, CountryLayout, IMAGE_EXTENSIONS, STATS_DIR};
use crate::materialize::{self, MaterializeOptions, MaterializeReport, OutputLayout, Subset};
use crate::orchestrator::{run_parallel, RunOptions, RunReport};
use crate::partition::partition;
use crate::resize::{self, ImageResizer, ResizeOptions};
use crate::stats::{self, StatsReport};
use crate::transcode::{transcode_file, ClassTable, WriteOutcome, WritePolicy, XML_EXTENSION};

/// Settings shared by every driver.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Root holding one directory per country.
    pub data_dir: PathBuf,
    /// Workers per orchestrator run.
    pub workers: usize,
    /// Name of the materialized dataset directory under `data_dir`.
    pub out_name: String,
    /// Cancellation and failure policy.
    pub run: RunOptions,
}

impl PipelineConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            workers: 3,
            out_name: layout::DEFAULT_OUTPUT_NAME.to_string(),
            run: RunOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        if self.workers == 0 {
            return Err(PrepError::InvalidConfiguration {
                message: "worker count must be at least 1".to_string(),
            });
        }
        if self.out_name.trim().is_empty() || Path::new(&self.out_name).components().count() != 1 {
            return Err(PrepError::InvalidConfiguration {
                message: format!("output name '{}' must be a single directory name", self.out_name),
            });
        }
        Ok(())
    }

    pub fn output_layout(&self) -> OutputLayout {
        OutputLayout::new(self.data_dir.join(&self.out_name))
    }

    pub fn countries(&self) -> Result<Vec<CountryLayout>, PrepError> {
        layout::discover_countries(&self.data_dir, &[STATS_DIR, self.out_name.as_str()])
    }
}

/// Convert every country's XML annotations into label files next to them.
pub fn convert_all(
    config: &PipelineConfig,
    classes: &ClassTable,
    policy: WritePolicy,
) -> Result<RunReport<PathBuf>, PrepError> {
    config.validate()?;

    let mut report = RunReport::default();
    for country in config.countries()? {
        let xml_dir = country.xml_dir();
        if !xml_dir.is_dir() {
            warn!("{}: no annotation directory, skipping", country.name);
            continue;
        }

        let yolo_dir = country.yolo_dir();
        layout::ensure_dir(&yolo_dir)?;

        let xml_files = layout::list_files(&xml_dir, &[XML_EXTENSION])?;
        info!(
            "{}: converting {} annotation file(s)",
            country.name,
            xml_files.len()
        );

        let written = AtomicUsize::new(0);
        let shards = partition(xml_files, config.workers)?;
        let country_report = run_parallel(shards, &config.run, |xml_path: &PathBuf| {
            if transcode_file(xml_path, &yolo_dir, classes, policy)? == WriteOutcome::Written {
                written.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        })?;

        info!(
            "{}: {} label file(s) written, {} already present, {} failed",
            country.name,
            written.load(Ordering::Relaxed),
            country_report.succeeded() - written.load(Ordering::Relaxed),
            country_report.failed()
        );
        report.absorb(country_report);

        if config.run.cancel.is_cancelled() {
            break;
        }
    }

    Ok(report)
}

/// Split every country into train/val and copy image/label pairs into the
/// shared output tree, then write `data.yaml`.
pub fn materialize_all(
    config: &PipelineConfig,
    train_ratio: f64,
    seed: Option<u64>,
    classes: &ClassTable,
) -> Result<MaterializeReport, PrepError> {
    config.validate()?;
    materialize::validate_ratio(train_ratio)?;

    let out = config.output_layout();
    out.create()?;
    info!("materializing into {}", out.root.display());

    let mut report = MaterializeReport::default();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for (position, country) in config.countries()?.into_iter().enumerate() {
        let images_dir = country.images_dir();
        if !images_dir.is_dir() {
            warn!("{}: no image directory, skipping", country.name);
            continue;
        }

        let images = layout::list_file_names(&images_dir, &IMAGE_EXTENSIONS)?;

        let opts = MaterializeOptions {
            workers: config.workers,
            train_ratio,
            seed: seed.map(|seed| seed.wrapping_add(position as u64)),
            run: config.run.clone(),
        };
        let country_report = materialize::materialize_claiming(
            images,
            &images_dir,
            &country.yolo_dir(),
            &out,
            &opts,
            &mut claimed,
        )?;
        info!(
            "{}: {} pair(s) copied, {} failed",
            country.name,
            country_report.succeeded(),
            country_report.failed()
        );
        report.absorb(country_report);

        if config.run.cancel.is_cancelled() {
            break;
        }
    }

    let yaml_path = materialize::write_data_yaml(&out, classes)?;
    info!("wrote {}", yaml_path.display());

    Ok(report)
}

/// Resize every image of the materialized dataset in place.
pub fn resize_all(
    config: &PipelineConfig,
    target_size: u32,
) -> Result<RunReport<PathBuf>, PrepError> {
    config.validate()?;

    let out = config.output_layout();
    if !out.root.is_dir() {
        return Err(PrepError::InvalidConfiguration {
            message: format!(
                "materialized dataset '{}' does not exist; run the split first",
                out.root.display()
            ),
        });
    }

    let mut paths = Vec::new();
    for subset in [Subset::Train, Subset::Val] {
        let dir = out.images_dir(subset);
        if dir.is_dir() {
            paths.extend(layout::list_files(&dir, &IMAGE_EXTENSIONS)?);
        }
    }
    info!("resizing {} image(s) to {}px", paths.len(), target_size);

    let opts = ResizeOptions {
        workers: config.workers,
        target_size,
        run: config.run.clone(),
    };
    resize::resize_images(paths, &opts, &ImageResizer::default())
}

/// Collect per-country statistics and write `<data_dir>/stats/results.txt`.
pub fn stats_all(config: &PipelineConfig) -> Result<StatsReport, PrepError> {
    config.validate()?;

    let report = stats::collect_stats(&config.countries()?)?;
    stats::write_report(&report, &config.data_dir.join(STATS_DIR))?;
    Ok(report)
}
