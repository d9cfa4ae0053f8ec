//! End-to-end tests of scanning, indexing and converting acquisitions.

use super::test_utils::{test_patterns, Acquisition};
use std::fs;

use um2bdv::{
    convert_folder, index_folder, AxisValue, PatternSet, SkipReason, WriteOptions, WriteOutcome,
};

// =============================================================================
// Indexing
// =============================================================================

#[test]
fn test_single_tile_scenario() {
    let mut acq = Acquisition::new(4, 3);
    acq.add_stack("img", "channel0_IllLeft.tif", 10, 0, [0.001, 0.002, 0.0]);
    acq.write_stage_log();

    let index = index_folder(acq.path(), test_patterns()).unwrap();

    assert_eq!(index.groups().len(), 1);
    let group = &index.groups()[0];
    assert_eq!(group.len(), 10);
    assert_eq!(group.z_values(), (1..=10).collect::<Vec<i64>>());
    assert_eq!(group.stack_key, "img_Z001_channel0_IllLeft.tif");
    assert_eq!(index.view_indices(group), Some((0, 0)));
    assert_eq!(index.channels().labels(), vec!["0"]);
    assert_eq!(index.illuminations().labels(), vec!["Left"]);
    assert!(index.skipped().is_empty());
}

#[test]
fn test_groups_per_tile_channel_illumination() {
    let mut acq = Acquisition::new(2, 2);
    for (tile, stage) in [("a", [0.0, 0.0, 0.0]), ("b", [0.001, 0.0, 0.0])] {
        for channel in ["channel0", "channel1"] {
            for illumination in ["IllLeft", "IllRight"] {
                let suffix = format!("{}_{}.tif", channel, illumination);
                acq.add_stack(tile, &suffix, 3, 0, stage);
            }
        }
    }
    acq.write_stage_log();

    let index = index_folder(acq.path(), test_patterns()).unwrap();

    assert_eq!(index.groups().len(), 8);
    assert_eq!(index.channels().len(), 2);
    assert_eq!(index.illuminations().len(), 2);
    assert!(index.groups().iter().all(|g| g.len() == 3));

    for (tile, group) in index.groups().iter().enumerate() {
        assert_eq!(group.tile, tile);
        assert!(group.records().iter().all(|r| r.stack_key == group.stack_key));
    }
}

#[test]
fn test_z_order_is_numeric() {
    let mut acq = Acquisition::new(2, 2);
    for z in [10, 9, 1, 2] {
        acq.add_slice(&format!("t_Z{}_channel0.tif", z), z as u16, [0.0; 3]);
    }
    acq.write_stage_log();

    let index = index_folder(acq.path(), test_patterns()).unwrap();

    assert_eq!(index.groups().len(), 1);
    assert_eq!(index.groups()[0].z_values(), vec![1, 2, 9, 10]);
    assert_eq!(index.groups()[0].stack_key, "t_Z1_channel0.tif");
    assert_eq!(index.min_z(), 1);
}

#[test]
fn test_grouping_independent_of_creation_order() {
    let names = [
        "b_Z002_channel1.tif",
        "a_Z001_channel0.tif",
        "b_Z001_channel1.tif",
        "a_Z002_channel0.tif",
    ];

    let build = |order: &[usize]| {
        let mut acq = Acquisition::new(2, 2);
        for &i in order {
            acq.add_slice(names[i], 0, [i as f64 * 0.001, 0.0, 0.0]);
        }
        acq.write_stage_log();
        let index = index_folder(acq.path(), test_patterns()).unwrap();
        index
            .groups()
            .iter()
            .map(|g| (g.stack_key.clone(), g.z_values(), index.view_indices(g)))
            .collect::<Vec<_>>()
    };

    let forward = build(&[0, 1, 2, 3]);
    let backward = build(&[3, 2, 1, 0]);
    assert_eq!(forward, backward);
    assert_eq!(forward.len(), 2);
}

#[test]
fn test_missing_axis_values_get_their_own_slot() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("a", "channel0.tif", 2, 0, [0.0; 3]);
    acq.add_stack("b", "noch.tif", 2, 0, [0.001, 0.0, 0.0]);
    acq.write_stage_log();

    let index = index_folder(acq.path(), test_patterns()).unwrap();

    assert_eq!(index.groups().len(), 2);
    assert_eq!(index.channels().labels(), vec!["0", "nan"]);
    assert_eq!(index.illuminations().values(), &[AxisValue::Missing]);
}

#[test]
fn test_files_without_z_are_excluded() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 3, 0, [0.0; 3]);
    acq.add_slice("img_Zabc_channel0.tif", 0, [0.0; 3]);
    acq.add_slice("img_channel0.tif", 0, [0.0; 3]);
    acq.add_unlisted_slice("img_Z004_channel0.tif", 0);
    acq.write_stage_log();

    // Accepts letters so that a non-numeric token can be captured
    let patterns = PatternSet::new(r".*tif", r"_Z([0-9a-z]+)", r"channel(\d+)", r"_Ill(\w+)").unwrap();
    let index = index_folder(acq.path(), patterns).unwrap();

    assert_eq!(index.groups().len(), 1);
    assert_eq!(index.groups()[0].z_values(), vec![1, 2, 3]);

    let mut skipped: Vec<_> = index
        .skipped()
        .iter()
        .map(|s| (s.filename.as_str(), s.reason.clone()))
        .collect();
    skipped.sort_by(|a, b| a.0.cmp(b.0));
    assert_eq!(
        skipped,
        vec![
            ("img_Z004_channel0.tif", SkipReason::NoStagePosition),
            ("img_Zabc_channel0.tif", SkipReason::NonNumericZ("abc".to_string())),
            ("img_channel0.tif", SkipReason::MissingZ),
        ]
    );
}

#[test]
fn test_whitelist_filters_files() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    fs::write(acq.path().join("notes_Z001.txt"), "not an image").unwrap();
    acq.write_stage_log();

    let index = index_folder(acq.path(), test_patterns()).unwrap();
    assert_eq!(index.records().len(), 2);
    assert!(index.skipped().is_empty());
}

// =============================================================================
// Conversion
// =============================================================================

#[test]
fn test_convert_writes_both_datasets() {
    let mut acq = Acquisition::new(4, 3);
    acq.add_stack("img", "channel0_IllLeft.tif", 10, 0, [0.001, 0.002, 0.0]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let mut options = WriteOptions::new(out.path());
    options.xyspacing = 0.5;
    options.zspacing = 2.0;

    let outcome = convert_folder(acq.path(), test_patterns(), options).unwrap();
    let WriteOutcome::Written(summary) = outcome else {
        panic!("expected datasets to be written");
    };

    assert_eq!(summary.tiles, 1);
    assert_eq!(summary.channels, 1);
    assert_eq!(summary.illuminations, 1);
    assert_eq!(summary.projected, Some(out.path().join("projected/dataset.xml")));
    assert_eq!(summary.volume, Some(out.path().join("volume/dataset.xml")));

    for target in ["projected", "volume"] {
        let xml = fs::read_to_string(out.path().join(target).join("dataset.xml")).unwrap();
        assert!(
            xml.contains("<affine>1.0 0.0 0.0 2000.0 0.0 1.0 0.0 -4000.0 0.0 0.0 1.0 0.0</affine>"),
            "{} descriptor has the stage translation",
            target
        );
        assert!(out.path().join(target).join("dataset.n5").is_dir());
    }
}

#[test]
fn test_projected_only_never_creates_volume() {
    let mut acq = Acquisition::new(4, 3);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let mut options = WriteOptions::new(out.path());
    options.volume = false;

    let outcome = convert_folder(acq.path(), test_patterns(), options).unwrap();
    let WriteOutcome::Written(summary) = outcome else {
        panic!("expected the projected dataset to be written");
    };

    assert!(summary.volume.is_none());
    assert!(out.path().join("projected/dataset.xml").is_file());
    assert!(!out.path().join("volume").exists());
}

#[test]
fn test_nothing_requested_is_a_no_op() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let mut options = WriteOptions::new(out.path());
    options.projected = false;
    options.volume = false;

    let outcome = convert_folder(acq.path(), test_patterns(), options).unwrap();
    assert_eq!(outcome, WriteOutcome::NothingToDo);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}
