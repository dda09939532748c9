//! Train/validation materialization.
//!
//! Shuffles a list of images, splits it by ratio and copies every image
//! together with its label file into the `{images,labels}/{train,val}`
//! output tree. An image and its label are one unit: both are copied or
//! neither is.

mod report;

pub use report::MaterializeReport;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

use crate::error::PrepError;
use crate::layout::{self, ensure_dir};
use crate::orchestrator::{run_parallel, ItemFailure, RunOptions, RunReport};
use crate::partition::partition;
use crate::transcode::{with_label_extension, ClassTable, LABEL_EXTENSION};

/// Default fraction of images assigned to the training subset.
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// The two halves of a split. Together they hold every input item exactly
/// once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub val: Vec<T>,
}

/// Which half of the split a directory belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subset {
    Train,
    Val,
}

impl Subset {
    pub fn dir_name(self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Val => "val",
        }
    }
}

/// Output tree `<root>/{images,labels}/{train,val}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputLayout {
    pub root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self, subset: Subset) -> PathBuf {
        self.root.join("images").join(subset.dir_name())
    }

    pub fn labels_dir(&self, subset: Subset) -> PathBuf {
        self.root.join("labels").join(subset.dir_name())
    }

    /// Create all four leaf directories. Safe to call repeatedly.
    pub fn create(&self) -> Result<(), PrepError> {
        for subset in [Subset::Train, Subset::Val] {
            ensure_dir(&self.images_dir(subset))?;
            ensure_dir(&self.labels_dir(subset))?;
        }
        Ok(())
    }
}

/// An image and the label file sharing its base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PairedRecord {
    pub image: PathBuf,
    pub label: PathBuf,
}

impl PairedRecord {
    /// Pair `image_name` from `image_dir` with its label in `label_dir`.
    ///
    /// # Errors
    ///
    /// [`PrepError::MissingPair`] if the label file does not exist.
    pub fn resolve(image_name: &Path, image_dir: &Path, label_dir: &Path) -> Result<Self, PrepError> {
        let image = image_dir.join(image_name);
        let label = label_dir.join(with_label_extension(image_name));

        if !label.is_file() {
            return Err(PrepError::MissingPair {
                image,
                expected_label: label,
            });
        }

        Ok(Self { image, label })
    }

    /// Copy both files into the given directories, keeping their names.
    ///
    /// If the label copy fails the already copied image is removed again.
    pub fn copy_into(&self, images_out: &Path, labels_out: &Path) -> Result<(), PrepError> {
        let image_dst = images_out.join(file_name(&self.image)?);
        let label_dst = labels_out.join(file_name(&self.label)?);

        debug!("copy {} -> {}", self.image.display(), image_dst.display());
        fs::copy(&self.image, &image_dst).map_err(PrepError::io_at(&self.image))?;

        debug!("copy {} -> {}", self.label.display(), label_dst.display());
        if let Err(source) = fs::copy(&self.label, &label_dst) {
            if let Err(cleanup) = fs::remove_file(&image_dst) {
                warn!(
                    "could not remove unpaired copy {}: {cleanup}",
                    image_dst.display()
                );
            }
            return Err(PrepError::IoAt {
                path: self.label.clone(),
                source,
            });
        }

        Ok(())
    }
}

/// Options for [`materialize`].
#[derive(Clone, Debug)]
pub struct MaterializeOptions {
    /// Number of workers per subset.
    pub workers: usize,
    /// Fraction of images that go to the training subset.
    pub train_ratio: f64,
    /// Seed for a reproducible shuffle; `None` draws from the thread RNG.
    pub seed: Option<u64>,
    /// Cancellation and failure policy shared by both subsets.
    pub run: RunOptions,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            train_ratio: DEFAULT_TRAIN_RATIO,
            seed: None,
            run: RunOptions::default(),
        }
    }
}

/// Reject ratios outside `[0, 1]`.
pub fn validate_ratio(ratio: f64) -> Result<(), PrepError> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(PrepError::InvalidConfiguration {
            message: format!("train ratio must be within [0.0, 1.0], got {ratio}"),
        });
    }
    Ok(())
}

/// Number of training items for `total` items: `floor(total * ratio)`.
pub fn train_len(total: usize, ratio: f64) -> usize {
    ((total as f64 * ratio).floor() as usize).min(total)
}

/// Shuffle `items` with a full uniform permutation.
pub fn shuffle<T>(items: &mut [T], seed: Option<u64>) {
    if let Some(seed) = seed {
        let mut rng = StdRng::seed_from_u64(seed);
        items.shuffle(&mut rng);
    } else {
        let mut rng = rand::rng();
        items.shuffle(&mut rng);
    }
}

/// Split `items` into a training prefix of `floor(len * ratio)` items and a
/// validation remainder. Order is preserved; shuffle first for a random
/// split.
pub fn split_dataset<T>(mut items: Vec<T>, ratio: f64) -> Result<DatasetSplit<T>, PrepError> {
    validate_ratio(ratio)?;
    let val = items.split_off(train_len(items.len(), ratio));
    Ok(DatasetSplit { train: items, val })
}

/// Shuffle, split and copy `image_list` (file names inside `image_dir`)
/// together with their labels from `label_dir` into `out`.
///
/// The output tree is created before any worker starts; a failure there is
/// fatal. Missing labels and copy failures are reported per image in the
/// returned report and do not stop other images. Labels in `label_dir`
/// without a listed image are reported as orphans and never copied.
pub fn materialize(
    image_list: Vec<PathBuf>,
    image_dir: &Path,
    label_dir: &Path,
    out: &OutputLayout,
    opts: &MaterializeOptions,
) -> Result<MaterializeReport, PrepError> {
    let mut claimed = HashSet::new();
    materialize_claiming(image_list, image_dir, label_dir, out, opts, &mut claimed)
}

/// [`materialize`] into an output tree shared with earlier calls.
///
/// `claimed` holds the destination file names (images and labels) used by
/// earlier calls. An image whose name or label name is already claimed, or
/// whose label name is shared with another image in `image_list`, is
/// reported as [`PrepError::NameCollision`] and not copied. Every listed
/// name is added to `claimed`.
pub fn materialize_claiming(
    image_list: Vec<PathBuf>,
    image_dir: &Path,
    label_dir: &Path,
    out: &OutputLayout,
    opts: &MaterializeOptions,
    claimed: &mut HashSet<PathBuf>,
) -> Result<MaterializeReport, PrepError> {
    validate_ratio(opts.train_ratio)?;
    if opts.workers == 0 {
        return Err(PrepError::InvalidConfiguration {
            message: "worker count must be at least 1".to_string(),
        });
    }

    out.create()?;

    let orphan_labels = find_orphan_labels(&image_list, label_dir)?;
    for orphan in &orphan_labels {
        warn!("{}: label has no paired image", orphan.display());
    }

    let (mut image_list, rejected) = reject_collisions(image_list, image_dir, claimed);
    for failure in &rejected {
        warn!("{}", failure.error);
    }

    shuffle(&mut image_list, opts.seed);
    let split = split_dataset(image_list, opts.train_ratio)?;
    let (train_count, val_count) = (split.train.len(), split.val.len());
    info!(
        "{}: {} train / {} val image(s)",
        image_dir.display(),
        train_count,
        val_count
    );

    let mut run = RunReport::default();
    for (subset, items) in [(Subset::Train, split.train), (Subset::Val, split.val)] {
        let images_out = out.images_dir(subset);
        let labels_out = out.labels_dir(subset);

        let shards = partition(items, opts.workers)?;
        let subset_report = run_parallel(shards, &opts.run, |image_name: &PathBuf| {
            PairedRecord::resolve(image_name, image_dir, label_dir)?
                .copy_into(&images_out, &labels_out)
        })?;
        run.absorb(subset_report);
    }

    Ok(MaterializeReport {
        train: train_count,
        val: val_count,
        run,
        rejected,
        orphan_labels,
    })
}

/// Separate images that can be copied without clobbering another item's
/// destination from those that cannot.
///
/// Destinations are bare file names, since train and val share names
/// through the split. Claims are made for every listed image, so a later
/// list never reuses a name even if its first owner failed to copy.
fn reject_collisions(
    image_list: Vec<PathBuf>,
    image_dir: &Path,
    claimed: &mut HashSet<PathBuf>,
) -> (Vec<PathBuf>, Vec<ItemFailure<PathBuf>>) {
    let mut label_owners: HashMap<PathBuf, usize> = HashMap::new();
    for image in &image_list {
        *label_owners.entry(with_label_extension(image)).or_default() += 1;
    }

    let mut accepted = Vec::with_capacity(image_list.len());
    let mut rejected = Vec::new();
    let mut newly_claimed = Vec::with_capacity(image_list.len() * 2);

    for image in image_list {
        let label = with_label_extension(&image);
        let collision = if claimed.contains(&image) {
            Some(image.clone())
        } else if claimed.contains(&label) || label_owners.get(&label).is_some_and(|n| *n > 1) {
            Some(label.clone())
        } else {
            None
        };

        newly_claimed.push(image.clone());
        newly_claimed.push(label);

        match collision {
            Some(destination) => rejected.push(ItemFailure {
                error: PrepError::NameCollision {
                    image: image_dir.join(&image),
                    destination,
                },
                item: image,
            }),
            None => accepted.push(image),
        }
    }

    claimed.extend(newly_claimed);
    (accepted, rejected)
}

/// Label files in `label_dir` whose base name matches no image in
/// `image_list`. A missing label directory yields no orphans.
pub fn find_orphan_labels(image_list: &[PathBuf], label_dir: &Path) -> Result<Vec<PathBuf>, PrepError> {
    if !label_dir.is_dir() {
        return Ok(Vec::new());
    }

    let expected: HashSet<PathBuf> = image_list
        .iter()
        .map(|image| with_label_extension(image))
        .collect();

    Ok(layout::list_files(label_dir, &[LABEL_EXTENSION])?
        .into_iter()
        .filter(|label| {
            label
                .file_name()
                .is_none_or(|name| !expected.contains(Path::new(name)))
        })
        .collect())
}

#[derive(Serialize)]
struct DataYaml {
    path: String,
    train: String,
    val: String,
    names: BTreeMap<usize, String>,
}

/// Write `data.yaml` describing the output tree for detection trainers.
pub fn write_data_yaml(out: &OutputLayout, classes: &ClassTable) -> Result<PathBuf, PrepError> {
    let root = fs::canonicalize(&out.root).map_err(PrepError::io_at(&out.root))?;
    let yaml_path = out.root.join("data.yaml");

    let data = DataYaml {
        path: root.to_string_lossy().to_string(),
        train: format!("images/{}", Subset::Train.dir_name()),
        val: format!("images/{}", Subset::Val.dir_name()),
        names: classes.names().iter().cloned().enumerate().collect(),
    };

    let yaml = serde_yaml::to_string(&data).map_err(|source| PrepError::YamlWrite {
        path: yaml_path.clone(),
        source,
    })?;
    fs::write(&yaml_path, yaml).map_err(PrepError::io_at(&yaml_path))?;
    Ok(yaml_path)
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr, PrepError> {
    path.file_name().ok_or_else(|| PrepError::InvalidConfiguration {
        message: format!("'{}' has no file name", path.display()),
    })
}
