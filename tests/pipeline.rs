//! End-to-end tests for the multi-country drivers.

use std::fs;
use std::path::Path;

use rddprep::materialize::Subset;
use rddprep::pipeline::{self, PipelineConfig};
use rddprep::transcode::{ClassTable, WritePolicy};
use rddprep::PrepError;

mod common;

fn config(data_dir: &Path, workers: usize) -> PipelineConfig {
    let mut config = PipelineConfig::new(data_dir);
    config.workers = workers;
    config
}

#[test]
fn convert_writes_one_label_file_per_annotation() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let czech = common::seed_country(temp.path(), "Czech", 7);
    let india = common::seed_country(temp.path(), "India", 5);

    let report = pipeline::convert_all(
        &config(temp.path(), 3),
        &ClassTable::road_damage(),
        WritePolicy::SkipExisting,
    )
    .expect("convert");

    assert!(report.is_success());
    assert_eq!(report.succeeded(), 12);
    assert_eq!(common::file_names(&czech.yolo_dir()).len(), 7);
    assert_eq!(common::file_names(&india.yolo_dir()).len(), 5);

    let first = fs::read_to_string(czech.yolo_dir().join("Czech_000000.txt")).expect("read label");
    assert_eq!(first, "0 0.258333 0.358333 0.483333 0.650000\n");
}

#[test]
fn output_is_identical_for_any_worker_count() {
    let single = tempfile::tempdir().expect("create temp dir");
    let many = tempfile::tempdir().expect("create temp dir");
    for root in [single.path(), many.path()] {
        common::seed_country(root, "Japan", 23);
        common::seed_country(root, "Norway", 2);
    }

    let classes = ClassTable::road_damage();
    pipeline::convert_all(&config(single.path(), 1), &classes, WritePolicy::SkipExisting)
        .expect("convert with one worker");
    pipeline::convert_all(&config(many.path(), 8), &classes, WritePolicy::SkipExisting)
        .expect("convert with eight workers");

    assert_eq!(common::snapshot(single.path()), common::snapshot(many.path()));
}

#[test]
fn second_convert_run_leaves_existing_labels_untouched() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let country = common::seed_country(temp.path(), "United_States", 4);
    let classes = ClassTable::road_damage();
    let config = config(temp.path(), 2);

    pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("first run");

    let edited = country.yolo_dir().join("United_States_000001.txt");
    fs::write(&edited, "edited by hand\n").expect("edit label");

    let report =
        pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("second run");
    assert!(report.is_success());
    assert_eq!(
        fs::read_to_string(&edited).expect("read label"),
        "edited by hand\n"
    );

    pipeline::convert_all(&config, &classes, WritePolicy::Overwrite).expect("overwrite run");
    assert_ne!(
        fs::read_to_string(&edited).expect("read label"),
        "edited by hand\n"
    );
}

#[test]
fn malformed_annotation_fails_alone() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let country = common::seed_country(temp.path(), "China_MotorBike", 6);
    fs::write(country.xml_dir().join("China_MotorBike_000003.xml"), "<annotation>")
        .expect("corrupt xml");

    let report = pipeline::convert_all(
        &config(temp.path(), 3),
        &ClassTable::road_damage(),
        WritePolicy::SkipExisting,
    )
    .expect("convert");

    assert_eq!(report.succeeded(), 5);
    assert_eq!(report.failed(), 1);
    let failure = report.failures().next().expect("one failure");
    assert!(failure.item.ends_with("China_MotorBike_000003.xml"));
    assert!(matches!(failure.error, PrepError::Format { .. }));
    assert!(!country.yolo_dir().join("China_MotorBike_000003.txt").exists());
}

#[test]
fn split_copies_pairs_and_reports_missing_labels() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let czech = common::seed_country(temp.path(), "Czech", 10);
    common::seed_country(temp.path(), "India", 5);

    let classes = ClassTable::road_damage();
    let config = config(temp.path(), 3);
    pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("convert");
    fs::remove_file(czech.yolo_dir().join("Czech_000004.txt")).expect("remove label");

    let report = pipeline::materialize_all(&config, 0.8, Some(7), &classes).expect("split");

    assert_eq!((report.train, report.val), (8 + 4, 2 + 1));
    assert_eq!(report.succeeded(), 14);
    assert_eq!(report.failed(), 1);
    let failure = report.run.failures().next().expect("one failure");
    assert!(matches!(failure.error, PrepError::MissingPair { .. }));

    let out = config.output_layout();
    let mut images = common::file_names(&out.images_dir(Subset::Train));
    images.extend(common::file_names(&out.images_dir(Subset::Val)));
    let mut labels = common::file_names(&out.labels_dir(Subset::Train));
    labels.extend(common::file_names(&out.labels_dir(Subset::Val)));

    assert_eq!(images.len(), 14);
    assert_eq!(labels.len(), 14);
    assert!(!images.contains(&"Czech_000004.bmp".to_string()));

    for subset in [Subset::Train, Subset::Val] {
        for image in common::file_names(&out.images_dir(subset)) {
            let stem = image.trim_end_matches(".bmp");
            assert!(
                out.labels_dir(subset).join(format!("{stem}.txt")).exists(),
                "{image} copied without its label"
            );
        }
    }

    let yaml = fs::read_to_string(out.root.join("data.yaml")).expect("read data.yaml");
    assert!(yaml.contains("train: images/train"));
    assert!(yaml.contains("D40"));
}

#[test]
fn split_is_reproducible_with_a_seed() {
    let first = tempfile::tempdir().expect("create temp dir");
    let second = tempfile::tempdir().expect("create temp dir");
    let classes = ClassTable::road_damage();

    for root in [first.path(), second.path()] {
        common::seed_country(root, "Japan", 20);
        let config = config(root, 4);
        pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("convert");
        pipeline::materialize_all(&config, 0.5, Some(42), &classes).expect("split");
    }

    let out_first = config(first.path(), 4).output_layout();
    let out_second = config(second.path(), 4).output_layout();
    assert_eq!(
        common::file_names(&out_first.images_dir(Subset::Val)),
        common::file_names(&out_second.images_dir(Subset::Val))
    );
}

#[test]
fn split_output_is_identical_for_any_worker_count() {
    let single = tempfile::tempdir().expect("create temp dir");
    let many = tempfile::tempdir().expect("create temp dir");
    let classes = ClassTable::road_damage();

    for (root, workers) in [(single.path(), 1), (many.path(), 8)] {
        common::seed_country(root, "Czech", 17);
        common::seed_country(root, "Japan", 30);
        let config = config(root, workers);
        pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("convert");
        let report = pipeline::materialize_all(&config, 0.7, Some(11), &classes).expect("split");
        assert!(report.is_success());
    }

    // data.yaml records the absolute root, which differs between the two trees.
    let tree = |root: &Path| {
        let out = config(root, 1).output_layout();
        common::snapshot(&out.root)
            .into_iter()
            .filter(|(path, _)| path != Path::new("data.yaml"))
            .collect::<Vec<_>>()
    };
    let single_tree = tree(single.path());
    assert_eq!(single_tree.len(), 2 * (17 + 30));
    assert_eq!(single_tree, tree(many.path()));
}

#[test]
fn image_names_shared_across_countries_fail_instead_of_overwriting() {
    let temp = tempfile::tempdir().expect("create temp dir");
    for (name, side) in [("Czech", 8), ("India", 16)] {
        let country = rddprep::layout::CountryLayout::new(temp.path(), name);
        common::write_bmp(&country.images_dir().join("x.bmp"), side, side);
        fs::create_dir_all(country.yolo_dir()).expect("create yolo dir");
        fs::write(country.yolo_dir().join("x.txt"), format!("0 0.5 0.5 0.1 0.1 # {name}\n"))
            .expect("write label");
    }

    let config = config(temp.path(), 2);
    let report = pipeline::materialize_all(&config, 1.0, Some(1), &ClassTable::road_damage())
        .expect("split");

    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(!report.is_success());
    let failure = report.rejected.first().expect("one rejected image");
    assert!(matches!(failure.error, PrepError::NameCollision { .. }));
    assert!(failure.error.to_string().contains("India"));

    let out = config.output_layout();
    assert_eq!(common::file_names(&out.images_dir(Subset::Train)), ["x.bmp"]);
    let size = imagesize::size(out.images_dir(Subset::Train).join("x.bmp")).expect("read size");
    assert_eq!((size.width, size.height), (8, 8));
    let label = fs::read_to_string(out.labels_dir(Subset::Train).join("x.txt")).expect("read label");
    assert!(label.contains("# Czech"));
}

#[test]
fn materialized_output_is_not_treated_as_a_country() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::seed_country(temp.path(), "Norway", 3);
    let classes = ClassTable::road_damage();
    let config = config(temp.path(), 2);

    pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("convert");
    pipeline::materialize_all(&config, 0.8, Some(1), &classes).expect("split");

    let report = pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting)
        .expect("convert again");
    assert!(report.is_success());

    let stats = pipeline::stats_all(&config).expect("stats");
    let names: Vec<&str> = stats.countries.iter().map(|c| c.country.as_str()).collect();
    assert_eq!(names, ["Norway"]);
    assert_eq!(stats.countries[0].images, 3);
    assert_eq!(stats.countries[0].labels, 3);
    assert_eq!(stats.countries[0].image_size, Some((8, 8)));
    assert!(temp.path().join("stats").join("results.txt").is_file());
}

#[test]
fn resize_scales_materialized_images() {
    let temp = tempfile::tempdir().expect("create temp dir");
    common::seed_country(temp.path(), "Czech", 4);
    let classes = ClassTable::road_damage();
    let config = config(temp.path(), 2);

    pipeline::convert_all(&config, &classes, WritePolicy::SkipExisting).expect("convert");
    pipeline::materialize_all(&config, 0.5, Some(3), &classes).expect("split");

    let report = pipeline::resize_all(&config, 4).expect("resize");
    assert_eq!(report.succeeded(), 4);

    let out = config.output_layout();
    for subset in [Subset::Train, Subset::Val] {
        for name in common::file_names(&out.images_dir(subset)) {
            let size = imagesize::size(out.images_dir(subset).join(&name)).expect("read size");
            assert_eq!((size.width, size.height), (4, 4));
        }
    }
}

#[test]
fn missing_data_dir_is_a_configuration_error() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let err = pipeline::convert_all(
        &config(&temp.path().join("absent"), 2),
        &ClassTable::road_damage(),
        WritePolicy::SkipExisting,
    )
    .unwrap_err();
    assert!(matches!(err, PrepError::InvalidConfiguration { .. }));
}
