extern crate assert_cmd;
extern crate image;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn fractal() -> Command {
    Command::cargo_bin("fractal").unwrap()
}

#[test]
fn writes_a_png() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("julia.png");
    fractal()
        .args(&["--type", "julia", "--size", "40x30", "--supersample", "1"])
        .arg("--output")
        .arg(&path)
        .assert()
        .success();

    let bytes = fs::read(&path).unwrap();
    assert!(bytes.starts_with(PNG_MAGIC));
    let decoded = image::open(&path).unwrap().to_rgba();
    assert_eq!(decoded.dimensions(), (40, 30));
}

#[test]
fn writes_to_stdout() {
    let output = fractal()
        .args(&["-t", "newton", "-s", "8x8", "-j", "1", "-o", "-"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.starts_with(PNG_MAGIC));
}

#[test]
fn deep_zoom_at_arbitrary_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.png");
    fractal()
        .args(&[
            "-s", "6x4", "-c", "-0.75,0.1", "-z", "0.001", "-p", "bigfloat", "-b", "96", "-i",
            "60",
        ])
        .arg("-o")
        .arg(&path)
        .assert()
        .success();
    assert!(path.exists());
}

#[test]
fn zero_width_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.png");
    fractal()
        .args(&["--size", "0x10"])
        .arg("--output")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Render failure").and(predicate::str::contains("0x10")));
    assert!(!path.exists());
}

#[test]
fn unknown_palette_is_rejected() {
    fractal()
        .args(&["--palette", "sepia", "-o", "-"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sepia"));
}

#[test]
fn expired_timeout_reports_cancellation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("slow.png");
    fractal()
        .args(&[
            "-s", "512x512", "-p", "rational", "-b", "256", "-i", "5000", "--timeout", "1",
        ])
        .arg("-o")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cancelled"));
}
