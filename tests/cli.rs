use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const MARKER: &str = ".deja-dup-ignore";

fn cmd() -> Command {
    Command::cargo_bin("skipmark").unwrap()
}

#[test]
fn help_exits_with_one() {
    cmd()
        .arg("--help")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Directory to walk"));
}

#[test]
fn too_many_arguments_exits_with_one() {
    let dir = tempdir().unwrap();
    cmd()
        .arg(dir.path())
        .arg(dir.path())
        .assert()
        .code(1);
}

#[test]
fn missing_directory_is_an_error() {
    let dir = tempdir().unwrap();
    cmd()
        .arg(dir.path().join("nope"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn marks_build_output() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("app/build/libs")).unwrap();
    fs::write(root.join("app/settings.gradle"), "").unwrap();
    fs::create_dir_all(root.join("lib/target")).unwrap();
    fs::write(root.join("lib/pom.xml"), "<project/>").unwrap();
    fs::create_dir_all(root.join("docs/build")).unwrap();

    cmd()
        .arg(root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked 2 directories"))
        .stdout(predicate::str::contains("gradle build"))
        .stdout(predicate::str::contains("maven/cargo target"));

    assert!(root.join("app/build").join(MARKER).is_file());
    assert!(root.join("lib/target").join(MARKER).is_file());
    assert!(!root.join("docs/build").join(MARKER).exists());
}

#[test]
fn report_lists_markers() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("tool/obj")).unwrap();

    cmd()
        .arg(root)
        .arg("--report")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            root.join("tool/obj").join(MARKER).display().to_string(),
        ));
}

#[test]
fn explicit_directory_keeps_earlier_markers_unless_reset() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("photos")).unwrap();
    fs::write(root.join("photos").join(MARKER), "").unwrap();

    cmd().arg(root).assert().success();
    assert!(root.join("photos").join(MARKER).exists());

    cmd().arg(root).arg("--reset").assert().success();
    assert!(!root.join("photos").join(MARKER).exists());
}

#[test]
fn home_mode_resets_and_marks_package_caches() {
    let dir = tempdir().unwrap();
    let home = dir.path();
    fs::create_dir_all(home.join(".m2/repository")).unwrap();
    fs::create_dir_all(home.join(".cargo/registry")).unwrap();
    fs::create_dir_all(home.join("old")).unwrap();
    fs::write(home.join("old").join(MARKER), "").unwrap();
    fs::write(home.join("git_backup_ignore_explanations.txt"), "stale\n").unwrap();

    cmd()
        .env("HOME", home)
        .assert()
        .success()
        .stdout(predicate::str::contains("package cache"))
        .stdout(predicate::str::contains("Marked 2 directories"));

    assert!(home.join(".m2/repository").join(MARKER).is_file());
    assert!(home.join(".cargo/registry").join(MARKER).is_file());
    assert!(!home.join("old").join(MARKER).exists());
    assert!(!home.join("git_backup_ignore_explanations.txt").exists());
}

#[test]
fn config_override_changes_output_names() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("tree");
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(root.join("out")).unwrap();
    let config = dir.path().join("skipmark.toml");
    fs::write(&config, "[build]\noutput_dirs = [\"out\"]\n").unwrap();

    cmd()
        .arg(&root)
        .arg("--config")
        .arg(&config)
        .assert()
        .success();

    assert!(root.join("out").join(MARKER).is_file());
    assert!(!root.join("bin").join(MARKER).exists());
}

#[test]
fn invalid_config_is_an_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[build\n").unwrap();

    cmd()
        .arg(dir.path())
        .arg("-c")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn home_mode_clears_markers_of_caches_no_longer_configured() {
    let dir = tempdir().unwrap();
    let home = dir.path().join("home");
    fs::create_dir_all(home.join(".m2/repository")).unwrap();
    fs::create_dir_all(home.join(".cargo/registry")).unwrap();
    fs::write(home.join(".cargo/registry").join(MARKER), "").unwrap();
    let config = dir.path().join("skipmark.toml");
    fs::write(&config, "[home]\npackage_caches = [\".m2/repository\"]\n").unwrap();

    cmd()
        .env("HOME", &home)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Marked 1 directories"));

    assert!(home.join(".m2/repository").join(MARKER).is_file());
    assert!(!home.join(".cargo/registry").join(MARKER).exists());
}
