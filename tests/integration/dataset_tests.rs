//! Tests of the written N5 containers and SpimData descriptors.

use super::test_utils::{
    count_view_setups, level_dir, read_attributes, read_u16_block, test_patterns, Acquisition,
};
use serde_json::json;
use std::fs;
use std::path::Path;

use um2bdv::{convert_folder, PixelType, WriteOptions, ZProjection};

/// One 4 x 3 tile, 3 slices; pixel `(x, y)` of slice `z` is `100 * z + 4 * y + x`.
fn single_tile(out: &Path, configure: impl FnOnce(&mut WriteOptions)) {
    let mut acq = Acquisition::new(4, 3);
    acq.add_stack("img", "channel0_IllLeft.tif", 3, 0, [0.001, 0.002, 0.0]);
    acq.write_stage_log();

    let mut options = WriteOptions::new(out);
    options.xyspacing = 0.5;
    options.zspacing = 2.0;
    configure(&mut options);
    convert_folder(acq.path(), test_patterns(), options).unwrap();
}

#[test]
fn test_root_and_setup_attributes() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |_| {});
    let volume = out.path().join("volume");

    assert_eq!(read_attributes(&volume.join("dataset.n5")), json!({ "n5": "4.0.0" }));

    let setup = read_attributes(&volume.join("dataset.n5/setup0"));
    assert_eq!(setup["dataType"], "uint16");
    assert_eq!(
        setup["downsamplingFactors"],
        json!([[1, 1, 1], [2, 2, 1], [4, 4, 1], [8, 8, 1], [16, 16, 2], [32, 32, 4]])
    );

    let timepoint = read_attributes(&volume.join("dataset.n5/setup0/timepoint0"));
    assert_eq!(timepoint["multiScale"], true);
    assert_eq!(timepoint["resolution"], json!([0.5, 0.5, 2.0]));

    let projected = read_attributes(&out.path().join("projected/dataset.n5/setup0"));
    assert_eq!(
        projected["downsamplingFactors"],
        json!([[1, 1, 1], [2, 2, 1], [4, 4, 1], [8, 8, 1], [16, 16, 1]])
    );
}

#[test]
fn test_volume_levels() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |_| {});
    let volume = out.path().join("volume");

    let s0 = read_attributes(&level_dir(&volume, 0, 0));
    assert_eq!(s0["dimensions"], json!([4, 3, 3]));
    assert_eq!(s0["blockSize"], json!([64, 64, 64]));
    assert_eq!(s0["dataType"], "uint16");
    assert_eq!(
        s0["compression"],
        json!({ "type": "gzip", "level": -1, "useZlib": false })
    );

    let s1 = read_attributes(&level_dir(&volume, 0, 1));
    assert_eq!(s1["dimensions"], json!([2, 2, 3]));

    let s4 = read_attributes(&level_dir(&volume, 0, 4));
    assert_eq!(s4["dimensions"], json!([1, 1, 2]));
    assert_eq!(s4["blockSize"], json!([32, 32, 32]));

    let s5 = read_attributes(&level_dir(&volume, 0, 5));
    assert_eq!(s5["dimensions"], json!([1, 1, 1]));
    assert_eq!(s5["blockSize"], json!([16, 16, 16]));
}

#[test]
fn test_volume_block_contents() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |_| {});
    let volume = out.path().join("volume");

    let (size, values) = read_u16_block(&level_dir(&volume, 0, 0).join("0/0/0"));
    assert_eq!(size, [4, 3, 3]);
    let expected: Vec<u16> = (1..=3u16)
        .flat_map(|z| (0..12u16).map(move |i| 100 * z + i))
        .collect();
    assert_eq!(values, expected);

    // Mean of 100, 101, 104, 105 rounds to 103
    let (size, values) = read_u16_block(&level_dir(&volume, 0, 1).join("0/0/0"));
    assert_eq!(size, [2, 2, 3]);
    assert_eq!(values[0], 103);
}

#[test]
fn test_projected_block_is_max_projection() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |_| {});
    let projected = out.path().join("projected");

    let s0 = read_attributes(&level_dir(&projected, 0, 0));
    assert_eq!(s0["dimensions"], json!([4, 3, 1]));
    assert_eq!(s0["blockSize"], json!([64, 64, 1]));

    let (size, values) = read_u16_block(&level_dir(&projected, 0, 0).join("0/0/0"));
    assert_eq!(size, [4, 3, 1]);
    assert_eq!(values, (0..12u16).map(|i| 300 + i).collect::<Vec<_>>());
}

#[test]
fn test_min_projection() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |o| {
        o.volume = false;
        o.projection = ZProjection::Min;
    });

    let (_, values) = read_u16_block(&level_dir(&out.path().join("projected"), 0, 0).join("0/0/0"));
    assert_eq!(values, (0..12u16).map(|i| 100 + i).collect::<Vec<_>>());
}

#[test]
fn test_pixel_type_is_recorded() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |o| {
        o.projected = false;
        o.pixel_type = PixelType::F32;
    });

    let volume = out.path().join("volume");
    assert_eq!(read_attributes(&volume.join("dataset.n5/setup0"))["dataType"], "float32");
    assert_eq!(read_attributes(&level_dir(&volume, 0, 0))["dataType"], "float32");
}

#[test]
fn test_descriptor_contents() {
    let out = tempfile::tempdir().unwrap();
    single_tile(out.path(), |_| {});

    let volume = fs::read_to_string(out.path().join("volume/dataset.xml")).unwrap();
    assert_eq!(count_view_setups(&volume), 1);
    assert!(volume.contains(r#"<n5 type="relative">dataset.n5</n5>"#));
    assert!(volume.contains("<size>4 3 3</size>"));
    assert!(volume.contains("<size>0.5 0.5 2.0</size>"));
    assert!(volume.contains("<Name>tile 0 translation</Name>"));
    assert!(volume.contains("<affine>1.0 0.0 0.0 0.0 0.0 1.0 0.0 0.0 0.0 0.0 4.0 0.0</affine>"));
    assert!(volume.contains("<name>Left</name>"));

    let projected = fs::read_to_string(out.path().join("projected/dataset.xml")).unwrap();
    assert!(projected.contains("<size>4 3 1</size>"));
    assert!(projected.contains("<size>0.5 0.5 0.5</size>"));
    assert!(projected.contains("<Name>proj. tile 0 translation</Name>"));
    assert!(projected.contains("<affine>1.0 0.0 0.0 0.0 0.0 1.0 0.0 0.0 0.0 0.0 1.0 0.0</affine>"));
}

#[test]
fn test_setup_ids_follow_tile_and_illumination() {
    let mut acq = Acquisition::new(2, 2);
    for (tile, stage) in [("a", [0.0, 0.0, 0.0]), ("b", [0.001, 0.0, 0.0])] {
        acq.add_stack(tile, "channel0_IllLeft.tif", 2, 0, stage);
        acq.add_stack(tile, "channel0_IllRight.tif", 2, 0, stage);
    }
    acq.write_stage_log();
    let out = tempfile::tempdir().unwrap();

    let mut options = WriteOptions::new(out.path());
    options.volume = false;
    convert_folder(acq.path(), test_patterns(), options).unwrap();

    // Four groups; Left = 0, Right = 1; setup = tile + 4 * illumination
    let n5 = out.path().join("projected/dataset.n5");
    for setup in [0, 5, 2, 7] {
        assert!(n5.join(format!("setup{}", setup)).is_dir(), "setup{}", setup);
    }
    for setup in [1, 3, 4, 6] {
        assert!(!n5.join(format!("setup{}", setup)).exists(), "setup{}", setup);
    }

    let xml = fs::read_to_string(out.path().join("projected/dataset.xml")).unwrap();
    assert_eq!(count_view_setups(&xml), 4);
    assert!(xml.contains(r#"<ViewRegistration timepoint="0" setup="7">"#));
    assert!(xml.contains("<name>Right</name>"));
}
