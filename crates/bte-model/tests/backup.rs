use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use bte_model::Backups;
use tempfile::TempDir;

#[test]
fn digest_is_a_short_sha256() {
    assert_eq!(Backups::digest(""), "e3b0c44298fc");
    assert_eq!(Backups::digest("root\n  success\n").len(), 12);
}

#[test]
fn identical_content_is_written_once() {
    let dir = TempDir::new().unwrap();
    let backups = Backups::new(dir.path().join("backups"), 0);

    let first = backups.write("dog", "root\n  success\n").unwrap();
    let second = backups.write("dog", "root\n  success\n").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.file_name().unwrap().to_str().unwrap(),
        format!("dog_{}.tree", Backups::digest("root\n  success\n"))
    );
    assert_eq!(fs::read_to_string(&first).unwrap(), "root\n  success\n");
    assert_eq!(backups.list("dog").unwrap().len(), 1);
}

#[test]
fn prunes_per_tree_name() {
    let dir = TempDir::new().unwrap();
    let backups = Backups::new(dir.path(), 2);

    for ticks in 1..=4 {
        backups
            .write("dog", &format!("root\n  wait ticks:{ticks}\n"))
            .unwrap();
    }
    backups.write("cat", "root\n  success\n").unwrap();

    assert_eq!(backups.list("dog").unwrap().len(), 2);
    assert_eq!(backups.list("cat").unwrap().len(), 1);
}

fn age(path: &Path, seconds: u64) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(seconds))
        .unwrap();
}

#[test]
fn revisited_content_becomes_the_newest_backup() {
    let dir = TempDir::new().unwrap();
    let backups = Backups::new(dir.path(), 2);

    let one = backups.write("dog", "root\n  wait ticks:1\n").unwrap();
    let two = backups.write("dog", "root\n  wait ticks:2\n").unwrap();
    age(&one, 20);
    age(&two, 10);

    assert_eq!(backups.write("dog", "root\n  wait ticks:1\n").unwrap(), one);
    assert_eq!(backups.list("dog").unwrap().last(), Some(&one));

    let three = backups.write("dog", "root\n  wait ticks:3\n").unwrap();
    let kept = backups.list("dog").unwrap();
    assert_eq!(kept.len(), 2);
    assert!(kept.contains(&one));
    assert!(kept.contains(&three));
    assert!(!two.exists());
}

#[test]
fn missing_directory_lists_nothing() {
    let dir = TempDir::new().unwrap();
    let backups = Backups::new(dir.path().join("never"), 5);
    assert!(backups.list("dog").unwrap().is_empty());
}

#[test]
fn unrelated_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dog_notes.tree"), "x").unwrap();
    fs::write(dir.path().join("dog_e3b0c44298fc.txt"), "x").unwrap();
    let backups = Backups::new(dir.path(), 5);
    assert!(backups.list("dog").unwrap().is_empty());
}
