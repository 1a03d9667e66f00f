//! In-memory caching of Hald tables and CLF transforms.

mod common;

use std::fs;
use std::io::Write;
use std::sync::Arc;

use clut_core::StoreConfig;
use clut_store::{ClutStore, StoreError};
use common::*;
use flate2::Compression;
use flate2::write::GzEncoder;

#[test]
fn hald_is_cached_until_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lookProPhoto.png");
    write_identity_hald(&path, 2);

    let store = ClutStore::new(config(dir.path()));
    let a = store.hald_clut("lookProPhoto.png").unwrap();
    assert_eq!(a.level(), 2);
    assert_eq!(a.profile(), "ProPhoto");
    let b = store.hald_clut(&path).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // same name, new content
    write_identity_hald(&path, 3);
    let c = store.hald_clut(&path).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(c.level(), 3);
}

#[test]
fn rejects_non_cube_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flat.png");
    let mut img = clut_lut::Rgb16Image::identity_hald(2);
    img.height = 4;
    img.data.truncate(8 * 4 * 3);
    clut_lut::write_png16(&path, &img).unwrap();

    let store = ClutStore::new(config(dir.path()));
    assert!(store.hald_clut("flat.png").is_none());
    assert!(matches!(
        store.try_hald_clut(&path),
        Err(StoreError::Lut(clut_lut::LutError::NotACube { .. }))
    ));
}

#[test]
fn clf_is_cached_until_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.clf");
    fs::write(&path, gain_clf(2.0)).unwrap();

    let store = ClutStore::new(config(dir.path()));
    let a = store.clf_processor("gain.clf").unwrap();
    let b = store.clf_processor("gain.clf").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let mut px = [0.1f32, 0.2, 0.3];
    a.apply_packed(&mut px).unwrap();
    assert_close(px, [0.2, 0.4, 0.6], 1e-6);

    fs::write(&path, gain_clf(3.0)).unwrap();
    let c = store.clf_processor("gain.clf").unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
    let mut px = [0.1f32, 0.2, 0.3];
    c.apply_packed(&mut px).unwrap();
    assert_close(px, [0.3, 0.6, 0.9], 1e-6);
}

#[test]
fn reads_gzipped_clf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gain.clfz");
    let mut enc = GzEncoder::new(fs::File::create(&path).unwrap(), Compression::default());
    enc.write_all(gain_clf(0.5).as_bytes()).unwrap();
    enc.finish().unwrap();

    let store = ClutStore::new(config(dir.path()));
    let proc = store.clf_processor("gain.clfz").unwrap();
    let mut px = [1.0f32, 0.5, 0.25];
    proc.apply_packed(&mut px).unwrap();
    assert_close(px, [0.5, 0.25, 0.125], 1e-6);
}

#[test]
fn broken_clf_yields_none() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.clf"), "<ProcessList><Bogus/></ProcessList>").unwrap();
    let store = ClutStore::new(config(dir.path()));
    assert!(store.clf_processor("bad.clf").is_none());
}

#[test]
fn lru_evicts_least_recently_used() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        write_identity_hald(&dir.path().join(name), 2);
    }
    let store = ClutStore::new(StoreConfig {
        clut_cache_size: 2,
        ..config(dir.path())
    });

    let a = store.hald_clut("a.png").unwrap();
    let b = store.hald_clut("b.png").unwrap();
    // touch a so b becomes the oldest
    assert!(Arc::ptr_eq(&a, &store.hald_clut("a.png").unwrap()));
    store.hald_clut("c.png").unwrap();

    assert!(Arc::ptr_eq(&a, &store.hald_clut("a.png").unwrap()));
    assert!(!Arc::ptr_eq(&b, &store.hald_clut("b.png").unwrap()));
}

#[test]
fn clear_cache_forces_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_identity_hald(&dir.path().join("id.png"), 2);
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();

    let store = ClutStore::new(config(dir.path()));
    let hald = store.hald_clut("id.png").unwrap();
    let clf = store.clf_processor("gain.clf").unwrap();
    store.clear_cache();
    assert!(!Arc::ptr_eq(&hald, &store.hald_clut("id.png").unwrap()));
    assert!(!Arc::ptr_eq(&clf, &store.clf_processor("gain.clf").unwrap()));
}

#[test]
fn display_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("look.ctl"),
        "// @ART-label: \"$LOOK;Soft look\"\n// @ART-order: 2\n",
    )
    .unwrap();
    fs::write(dir.path().join("plain.ctl"), "// no directives\n").unwrap();
    fs::write(
        dir.path().join("gen.json"),
        r#"{"ART-lut3d": {"command": "gen", "label": "Generated"}}"#,
    )
    .unwrap();

    let store = ClutStore::new(config(dir.path()));
    let name = store.display_name("look.ctl");
    assert_eq!((name.name.as_str(), name.order), ("Soft look", 2));
    let name = store.display_name("plain.ctl");
    assert_eq!((name.name.as_str(), name.order), ("plain", -1));
    assert_eq!(store.display_name("gen.json").name, "Generated");
    assert_eq!(store.display_name("FilmsRGB.png").name, "Film");
}
