//! Integration tests for the nisupply CLI

use assert_cmd::Command;
use nisupply_compress::Compression;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A command running inside `dir`, isolated from the user's config and
/// environment overrides.
fn nisupply(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("nisupply").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &Path, relative: &str, contents: &[u8]) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Two subjects' n-back scans plus a resting-state scan and a text file.
fn fmri_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "raw/s1/fmri_nback_subject_1.nii.gz", b"one");
    write(dir.path(), "raw/s2/fmri_nback_subject_2.nii.gz", b"two");
    write(dir.path(), "raw/s2/fmri_rest_subject_2.nii.gz", b"rest");
    write(dir.path(), "raw/s2/notes.txt", b"notes");
    dir
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("nisupply").unwrap();
    cmd.arg("--help").assert().success().stdout(predicate::str::contains("scan")).stdout(predicate::str::contains("transfer"));
}

#[test]
fn test_invalid_subcommand() {
    let mut cmd = Command::cargo_bin("nisupply").unwrap();
    cmd.arg("teleport").assert().failure().stderr(predicate::str::contains("error"));
}

#[test]
fn test_scan_prints_table() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["scan", "--source", "raw", "--suffix", ".nii.gz", "--prefix", "fmri_nback"])
        .args(["--field", r"subject:1=subject_(\d+)"])
        .assert()
        .success()
        .stdout(
            "filepath,subject\n\
             raw/s1/fmri_nback_subject_1.nii.gz,1\n\
             raw/s2/fmri_nback_subject_2.nii.gz,2\n",
        );
}

#[test]
fn test_scan_writes_output_file() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["scan", "-s", "raw", "--suffix", ".txt", "--output", "table.csv"])
        .assert()
        .success()
        .stdout("");
    let table = fs::read_to_string(dir.path().join("table.csv")).unwrap();
    assert_eq!(table, "filepath\nraw/s2/notes.txt\n");
}

#[test]
fn test_scan_require_drops_nulls() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["scan", "-s", "raw", "--suffix", ".nii.gz", "--field", "task:1=fmri_([a-z]+)_", "--field", "nback=nback"])
        .args(["--require", "nback"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rest").not())
        .stdout(predicate::str::contains("raw/s2/fmri_nback_subject_2.nii.gz,nback,nback"));
}

#[test]
fn test_scan_ranks_sessions_into_timepoints() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "raw/sub-1/ses-02/bold.nii", b"");
    write(dir.path(), "raw/sub-1/ses-01/bold.nii", b"");
    write(dir.path(), "raw/sub-2/ses-07/bold.nii", b"");
    nisupply(dir.path())
        .args(["scan", "-s", "raw", "--field", r"subject:1=sub-(\d+)", "--field", r"session:1=ses-(\d+)"])
        .args(["--rank", "t=subject:session"])
        .assert()
        .success()
        .stdout(
            "filepath,session,subject,t\n\
             raw/sub-1/ses-01/bold.nii,01,1,0\n\
             raw/sub-1/ses-02/bold.nii,02,1,1\n\
             raw/sub-2/ses-07/bold.nii,07,2,0\n",
        );
}

#[test]
fn test_scan_from_config_file() {
    let dir = fmri_fixture();
    write(
        dir.path(),
        "nisupply.toml",
        b"sources = [\"raw\"]\n[filter]\nsuffixes = [\".nii.gz\"]\ncontains_all = [\"rest\"]\n[fields.subject]\npattern = 'subject_(\\d+)'\ngroup = 1\n",
    );
    nisupply(dir.path())
        .args(["--config", "nisupply.toml", "scan"])
        .assert()
        .success()
        .stdout("filepath,subject\nraw/s2/fmri_rest_subject_2.nii.gz,2\n");
}

#[test]
fn test_scan_without_sources_fails() {
    let dir = TempDir::new().unwrap();
    nisupply(dir.path()).arg("scan").assert().failure().stderr(predicate::str::contains("no source directories"));
}

#[test]
fn test_scan_missing_source_fails() {
    let dir = TempDir::new().unwrap();
    nisupply(dir.path()).args(["scan", "-s", "nowhere"]).assert().failure().stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_run_copies_to_template() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["run", "-s", "raw", "--suffix", ".nii.gz", "--prefix", "fmri_nback"])
        .args(["--field", r"subject:1=subject_(\d+)", "--require", "subject"])
        .args(["--template", "{dst}/sub-{subject}/sub-{subject}_task-nback{file_extension}", "--set", "dst=./out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 2 of 2 files"));
    assert_eq!(fs::read(dir.path().join("out/sub-1/sub-1_task-nback.nii.gz")).unwrap(), b"one");
    assert_eq!(fs::read(dir.path().join("out/sub-2/sub-2_task-nback.nii.gz")).unwrap(), b"two");
    assert!(dir.path().join("raw/s1/fmri_nback_subject_1.nii.gz").exists());
}

#[test]
fn test_run_dry_run_touches_nothing() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["run", "-s", "raw", "--prefix", "fmri_nback", "--field", r"subject:1=subject_(\d+)"])
        .args(["--template", "out/{subject}{file_extension}", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("filepath,subject,destination_path"))
        .stdout(predicate::str::contains("raw/s1/fmri_nback_subject_1.nii.gz,1,out/1.nii.gz"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_run_moves_and_decompresses() {
    let dir = TempDir::new().unwrap();
    let compressed = Compression::Gzip.compress(b"volume").unwrap();
    write(dir.path(), "raw/bold_subject_3.nii.gz", &compressed);
    nisupply(dir.path())
        .args(["run", "-s", "raw", "--field", r"subject:1=subject_(\d+)", "--template", "out/{subject}{file_extension}"])
        .args(["--move", "--decompress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(1 decompressed)"));
    assert_eq!(fs::read(dir.path().join("out/3.nii")).unwrap(), b"volume");
    assert!(!dir.path().join("out/3.nii.gz").exists());
    assert!(!dir.path().join("raw/bold_subject_3.nii.gz").exists());
}

#[test]
fn test_run_without_template_fails() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["run", "-s", "raw"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no destination template"));
}

#[test]
fn test_run_unresolved_placeholder_fails_before_transfer() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["run", "-s", "raw", "--suffix", ".nii.gz", "--field", "task:1=fmri_(nback)"])
        .args(["--template", "out/{task}{file_extension}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("task"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_run_drop_unresolved_transfers_the_rest() {
    let dir = fmri_fixture();
    nisupply(dir.path())
        .args(["run", "-s", "raw", "--suffix", ".nii.gz", "--field", r"subject:1=nback_subject_(\d+)"])
        .args(["--template", "out/{subject}{file_extension}", "--drop-unresolved"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Transferred 2 of 2 files"));
    assert!(dir.path().join("out/1.nii.gz").exists());
    assert!(dir.path().join("out/2.nii.gz").exists());
}

#[test]
fn test_transfer_from_table() {
    let dir = fmri_fixture();
    write(
        dir.path(),
        "table.csv",
        b"filepath,destination_path\nraw/s2/notes.txt,copied/notes.txt\nraw/missing.txt,copied/missing.txt\n",
    );
    nisupply(dir.path())
        .args(["transfer", "table.csv"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Transferred 1 of 2 files"))
        .stderr(predicate::str::contains("raw/missing.txt"));
    assert_eq!(fs::read(dir.path().join("copied/notes.txt")).unwrap(), b"notes");
}

#[test]
fn test_transfer_refuses_to_overwrite() {
    let dir = fmri_fixture();
    write(dir.path(), "copied/notes.txt", b"existing");
    write(dir.path(), "table.csv", b"filepath,destination_path\nraw/s2/notes.txt,copied/notes.txt\n");
    nisupply(dir.path()).args(["transfer", "table.csv"]).assert().failure();
    assert_eq!(fs::read(dir.path().join("copied/notes.txt")).unwrap(), b"existing");

    nisupply(dir.path()).args(["transfer", "table.csv", "--overwrite"]).assert().success();
    assert_eq!(fs::read(dir.path().join("copied/notes.txt")).unwrap(), b"notes");
}

#[test]
fn test_transfer_table_without_destinations_fails() {
    let dir = fmri_fixture();
    write(dir.path(), "table.csv", b"subject\n1\n");
    nisupply(dir.path()).args(["transfer", "table.csv"]).assert().failure().stderr(predicate::str::contains("table.csv"));
}
