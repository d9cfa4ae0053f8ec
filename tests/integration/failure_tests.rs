//! Tests of conversion failures and their cleanup.

use super::test_utils::{test_patterns, Acquisition};
use std::fs;

use um2bdv::{
    convert_folder, ContainerError, LoadError, MosaicError, StageTableError, WriteOptions,
};

#[test]
fn test_missing_stage_log_creates_nothing() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    let out = tempfile::tempdir().unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));

    assert!(matches!(
        result,
        Err(MosaicError::Stage(StageTableError::NotFound(_)))
    ));
    assert!(!out.path().join("projected").exists());
    assert!(!out.path().join("volume").exists());
}

#[test]
fn test_malformed_stage_log() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 1, 0, [0.0; 3]);
    fs::write(
        acq.path().join("tiles.txt"),
        "filename;unknown;stagexyz\nimg_Z001_channel0.tif; 0; (1.0, 2.0)\n",
    )
    .unwrap();
    let out = tempfile::tempdir().unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));
    assert!(matches!(
        result,
        Err(MosaicError::Stage(StageTableError::Malformed { line: 2, .. }))
    ));
}

#[test]
fn test_no_usable_files() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_unlisted_slice("img_Z001_channel0.tif", 0);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));
    assert!(matches!(result, Err(MosaicError::Index(_))));
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_unreadable_slice_removes_partial_datasets() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("a", "channel0.tif", 2, 0, [0.0; 3]);
    acq.add_raw_file("b_Z001_channel0.tif", b"not a tiff", [0.001, 0.0, 0.0]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));

    assert!(matches!(
        result,
        Err(MosaicError::Load(LoadError::Decode { .. }))
    ));
    for target in ["projected", "volume"] {
        assert!(!out.path().join(target).join("dataset.n5").exists());
        assert!(!out.path().join(target).join("dataset.xml").exists());
    }
}

#[test]
fn test_inconsistent_slice_sizes() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_slice("img_Z001_channel0.tif", 0, [0.0; 3]);
    let other = Acquisition::new(3, 2);
    let odd = other.add_unlisted_slice("img_Z002_channel0.tif", 0);
    acq.add_raw_file(
        "img_Z002_channel0.tif",
        &fs::read(&odd).unwrap(),
        [0.0; 3],
    );
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));
    assert!(matches!(
        result,
        Err(MosaicError::Load(LoadError::InconsistentDimensions { .. }))
    ));
}

#[test]
fn test_existing_dataset_requires_overwrite() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let mut options = WriteOptions::new(out.path());
    options.volume = false;
    convert_folder(acq.path(), test_patterns(), options.clone()).unwrap();

    let result = convert_folder(acq.path(), test_patterns(), options.clone());
    assert!(matches!(
        result,
        Err(MosaicError::Container(ContainerError::AlreadyExists(_)))
    ));
    // The existing dataset is left untouched
    assert!(out.path().join("projected/dataset.xml").is_file());
    assert!(out.path().join("projected/dataset.n5/setup0").is_dir());

    options.overwrite = true;
    convert_folder(acq.path(), test_patterns(), options).unwrap();
    assert!(out.path().join("projected/dataset.xml").is_file());
}

#[test]
fn test_stale_descriptor_without_container_is_kept() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();
    let stale = out.path().join("volume/dataset.xml");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "<SpimData/>").unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));

    assert!(matches!(
        result,
        Err(MosaicError::Container(ContainerError::AlreadyExists(ref p))) if *p == stale
    ));
    assert_eq!(fs::read_to_string(&stale).unwrap(), "<SpimData/>");
    assert!(!out.path().join("volume/dataset.n5").exists());
    assert!(!out.path().join("projected/dataset.n5").exists());
    assert!(!out.path().join("projected/dataset.xml").exists());
}

#[test]
fn test_descriptor_failure_removes_both_datasets() {
    let mut acq = Acquisition::new(2, 2);
    acq.add_stack("img", "channel0.tif", 2, 0, [0.0; 3]);
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();
    // A directory in place of the staged volume descriptor makes its write fail
    fs::create_dir_all(out.path().join("volume/dataset.xml.tmp")).unwrap();

    let result = convert_folder(acq.path(), test_patterns(), WriteOptions::new(out.path()));

    assert!(matches!(
        result,
        Err(MosaicError::Container(ContainerError::Io { .. }))
    ));
    for target in ["projected", "volume"] {
        let dir = out.path().join(target);
        assert!(!dir.join("dataset.n5").exists(), "{} container left", target);
        assert!(!dir.join("dataset.xml").exists(), "{} descriptor left", target);
    }
    assert!(!out.path().join("projected/dataset.xml.tmp").exists());
}
