use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const RAMP_GMS: &str =
    "TIN\nBEGT\nVERT 3\n0 0 0\n10 0 0\n0 10 10\nTRI 1\n1 3 2\nENDT\n";

#[test]
fn info_reports_counts_and_extents() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let gms = tmp.child("surface.gms");
    gms.write_str(RAMP_GMS).unwrap();
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args(["info", gms.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("vertices: 3")
                .and(predicate::str::contains("triangles: 1"))
                .and(predicate::str::contains("elevation: 0.000 .. 10.000")),
        );
}

#[test]
fn convert_to_native_then_query() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let gms = tmp.child("surface.gms");
    gms.write_str(RAMP_GMS).unwrap();
    let tin = tmp.child("surface.tin");
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args([
            "convert",
            "--progress",
            gms.path().to_str().unwrap(),
            tin.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("100%"));
    tin.assert(predicate::path::exists());
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args(["query", tin.path().to_str().unwrap(), "2", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.000"));
}

#[test]
fn query_outside_surface_fails() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let gms = tmp.child("surface.gms");
    gms.write_str(RAMP_GMS).unwrap();
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args(["query", gms.path().to_str().unwrap(), "50", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the surface"));
}

#[test]
fn clean_reports_weld_and_prune_counts() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let gms = tmp.child("dirty.gms");
    // the shared edge vertices appear twice and one vertex is unreferenced
    gms.write_str(
        "TIN\nBEGT\nVERT 7\n0 0 1\n10 0 2\n0 10 3\n10 0 2\n0 10 3\n10 10 4\n99 99 0\nTRI 2\n1 3 2\n4 5 6\nENDT\n",
    )
    .unwrap();
    let out = tmp.child("clean.gms");
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args([
            "clean",
            gms.path().to_str().unwrap(),
            out.path().to_str().unwrap(),
            "--weld",
            "--fix-winding",
            "--prune",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("welded: 2").and(predicate::str::contains("pruned: 1")),
        );
    out.assert(predicate::path::exists());
}

#[test]
fn unsupported_extension_is_an_error() {
    let tmp = assert_fs::TempDir::new().unwrap();
    let file = tmp.child("surface.obj");
    file.write_str("whatever").unwrap();
    Command::cargo_bin("terrain_tin_cli")
        .unwrap()
        .args(["info", file.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported input format"));
}
