//! End-to-end application of Hald tables and CLF transforms.

mod common;

use std::fs;
use std::sync::Arc;

use clut_core::{OwnedGrid, ParamValueMap};
use clut_lut::Kernel;
use clut_math::transfer::{gamma_srgb_clipped, igamma_srgb};
use clut_store::{Backend, ClutApplication, ClutStore, Quality};
use common::*;

fn store(dir: &std::path::Path) -> Arc<ClutStore> {
    Arc::new(ClutStore::new(config(dir)))
}

#[test]
fn identity_table_preserves_colors() {
    let dir = tempfile::tempdir().unwrap();
    write_identity_hald(&dir.path().join("id.png"), 2);
    let store = store(dir.path());

    for kernel in [Kernel::Scalar, Kernel::Simd] {
        let app = ClutApplication::new(store.clone(), "id.png", "sRGB", 1.0, 1).with_kernel(kernel);
        assert!(app.ok());
        assert!(matches!(app.backend(), Some(Backend::Table(_))));
        for px in [[20000.0, 20000.0, 20000.0], [1000.0, 30000.0, 60000.0]] {
            assert_close(app.apply_single(px[0], px[1], px[2]), px, 2e-3);
        }
    }
}

#[test]
fn identity_table_in_other_profile() {
    let dir = tempfile::tempdir().unwrap();
    write_identity_hald(&dir.path().join("idProPhoto.png"), 4);
    let app = ClutApplication::new(store(dir.path()), "idProPhoto.png", "sRGB", 1.0, 1);
    assert!(app.ok());
    // converted to ProPhoto and back
    assert_close(app.apply_single(15000.0, 25000.0, 35000.0), [15000.0, 25000.0, 35000.0], 5e-3);
}

#[test]
fn negative_table_inverts_in_gamma_space() {
    let dir = tempfile::tempdir().unwrap();
    write_negative_hald(&dir.path().join("neg.png"), 2);
    let app = ClutApplication::new(store(dir.path()), "neg.png", "sRGB", 1.0, 1);

    let expected = |v: f32| igamma_srgb(65535.0 - gamma_srgb_clipped(v));
    let out = app.apply_single(5000.0, 20000.0, 50000.0);
    assert_close(out, [expected(5000.0), expected(20000.0), expected(50000.0)], 2e-3);
}

#[test]
fn zero_strength_is_identity() {
    let dir = tempfile::tempdir().unwrap();
    write_negative_hald(&dir.path().join("neg.png"), 2);
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();
    let store = store(dir.path());

    for file in ["neg.png", "gain.clf"] {
        let app = ClutApplication::new(store.clone(), file, "sRGB", 0.0, 1);
        assert!(app.ok(), "{file}");
        assert_close(app.apply_single(12000.0, 24000.0, 36000.0), [12000.0, 24000.0, 36000.0], 1e-3);
    }
}

#[test]
fn strength_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();
    let store = store(dir.path());
    assert_eq!(ClutApplication::new(store.clone(), "gain.clf", "sRGB", 3.0, 1).strength(), 1.0);
    assert_eq!(ClutApplication::new(store, "gain.clf", "sRGB", -1.0, 1).strength(), 0.0);
}

#[test]
fn clf_gain_in_any_working_profile() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();
    let store = store(dir.path());

    for profile in ["ACESp0", "sRGB", "ProPhoto"] {
        let app = ClutApplication::new(store.clone(), "gain.clf", profile, 1.0, 1);
        assert!(matches!(app.backend(), Some(Backend::ExternalProcessor(_))));
        assert_close(app.apply_single(1000.0, 2000.0, 3000.0), [2000.0, 4000.0, 6000.0], 1e-3);
    }

    let half = ClutApplication::new(store, "gain.clf", "sRGB", 0.5, 1);
    assert_close(half.apply_single(1000.0, 2000.0, 3000.0), [1500.0, 3000.0, 4500.0], 1e-3);
}

#[test]
fn parameterless_backends_reject_values() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();
    let mut app = ClutApplication::new(store(dir.path()), "gain.clf", "sRGB", 1.0, 1);

    assert!(app.param_descriptors().is_empty());
    assert!(app.set_param_values(&ParamValueMap::new(), Quality::Low));
    let values: ParamValueMap = [("gain".to_string(), vec![1.0])].into_iter().collect();
    assert!(!app.set_param_values(&values, Quality::Highest));
}

#[test]
fn unresolvable_luts_are_not_ok() {
    let dir = tempfile::tempdir().unwrap();
    let mut flat = clut_lut::Rgb16Image::identity_hald(2);
    flat.height = 4;
    flat.data.truncate(8 * 4 * 3);
    clut_lut::write_png16(&dir.path().join("flat.png"), &flat).unwrap();
    fs::write(dir.path().join("gain.clf"), gain_clf(2.0)).unwrap();
    write_identity_hald(&dir.path().join("id.png"), 2);
    let store = store(dir.path());

    for file in ["flat.png", "missing.png", "missing.clf", "missing.json", "missing.ctl"] {
        let app = ClutApplication::new(store.clone(), file, "sRGB", 1.0, 1);
        assert!(!app.ok(), "{file}");
        assert!(app.backend().is_none());
        assert_eq!(app.apply_single(1.0, 2.0, 3.0), [1.0, 2.0, 3.0]);
    }

    // a known LUT in an unknown working profile
    for file in ["gain.clf", "id.png"] {
        assert!(!ClutApplication::new(store.clone(), file, "Bogus", 1.0, 1).ok(), "{file}");
    }
}

#[test]
fn applies_planes_in_parallel() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("gain.clf"), gain_clf(0.5)).unwrap();
    let app = ClutApplication::new(store(dir.path()), "gain.clf", "Rec2020", 1.0, 0);
    assert!(app.num_threads() >= 1);

    let (w, h) = (37, 19);
    let mut r = OwnedGrid::filled(w, h, 10000.0f32);
    let mut g = OwnedGrid::filled(w, h, 20000.0f32);
    let mut b = OwnedGrid::filled(w, h, 40000.0f32);
    b[(5, 3)] = 4000.0;
    app.apply_planes(&mut r, &mut g, &mut b);

    for y in 0..h {
        for x in 0..w {
            let want_b = if (y, x) == (5, 3) { 2000.0 } else { 20000.0 };
            assert_close([r[(y, x)], g[(y, x)], b[(y, x)]], [5000.0, 10000.0, want_b], 1e-3);
        }
    }
}

#[test]
fn scanlines_match_single_pixels() {
    let dir = tempfile::tempdir().unwrap();
    write_negative_hald(&dir.path().join("negProPhoto.png"), 3);
    let app = ClutApplication::new(store(dir.path()), "negProPhoto.png", "sRGB", 0.7, 2);

    let mut r: Vec<f32> = (0..11).map(|i| i as f32 * 6000.0).collect();
    let mut g: Vec<f32> = r.iter().rev().copied().collect();
    let mut b = vec![30000.0f32; 11];
    let expected: Vec<_> = (0..11).map(|i| app.apply_single(r[i], g[i], b[i])).collect();

    app.apply(1, &mut r, &mut g, &mut b);
    for i in 0..11 {
        assert_close([r[i], g[i], b[i]], expected[i], 1e-3);
    }
}

#[test]
fn backend_follows_file_kind() {
    let dir = tempfile::tempdir().unwrap();
    write_identity_hald(&dir.path().join("look.png"), 2);
    fs::write(dir.path().join("look.clf"), gain_clf(2.0)).unwrap();
    fs::write(
        dir.path().join("look.json"),
        r#"{"ART-lut3d": {"command": "generate-lut", "params": [["gain", "Gain", 0.0, 4.0, 1.5]]}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("look.ctl"),
        "// @ART-param: [\"gain\", \"Gain\", 0.0, 4.0, 1.0]\nvoid ART_main() {}\n",
    )
    .unwrap();
    // a table stored under a transform's extension
    fs::copy(dir.path().join("look.png"), dir.path().join("table.clf")).unwrap();

    let store = Arc::new(
        ClutStore::new(config(dir.path()))
            .with_command_runner(Arc::new(FakeRunner::default()))
            .with_script_engine(Arc::new(FakeEngine::gain())),
    );
    let app = |file: &str| ClutApplication::new(store.clone(), file, "sRGB", 1.0, 1);

    let table = app("look.png");
    assert!(matches!(table.backend(), Some(Backend::Table(_))));
    assert!(table.param_descriptors().is_empty());

    let clf = app("look.clf");
    assert!(matches!(clf.backend(), Some(Backend::ExternalProcessor(_))));
    assert!(clf.param_descriptors().is_empty());

    let manifest = app("look.json");
    assert!(matches!(manifest.backend(), Some(Backend::ExternalManifest(_))));
    assert_eq!(manifest.param_descriptors().len(), 1);

    let script = app("look.ctl");
    assert!(matches!(script.backend(), Some(Backend::CompiledScript { .. })));
    assert_eq!(script.param_descriptors()[0].name, "gain");

    // no fallback to another backend when the file is not what its name says
    let wrong = app("table.clf");
    assert!(!wrong.ok());
    assert!(wrong.backend().is_none());
}
