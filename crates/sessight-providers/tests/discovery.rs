use filetime::{FileTime, set_file_mtime};
use sessight_providers::discover_log_files;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_log(root: &Path, project: &str, name: &str, age_days: u64) -> PathBuf {
    let dir = root.join(project);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, "{}\n").unwrap();

    let mtime = SystemTime::now() - Duration::from_secs(age_days * 86_400 + 60);
    set_file_mtime(&path, FileTime::from_system_time(mtime)).unwrap();
    path
}

#[test]
fn test_lookback_window_filters_old_files() {
    let root = TempDir::new().unwrap();
    write_log(root.path(), "-work-app", "fresh.jsonl", 1);
    write_log(root.path(), "-work-app", "stale.jsonl", 20);

    let files = discover_log_files(root.path(), 7, None);
    let names: Vec<_> = files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["fresh.jsonl"]);

    assert_eq!(discover_log_files(root.path(), 30, None).len(), 2);
}

#[test]
fn test_newest_first() {
    let root = TempDir::new().unwrap();
    let old = write_log(root.path(), "-a", "old.jsonl", 3);
    let new = write_log(root.path(), "-b", "new.jsonl", 0);
    let mid = write_log(root.path(), "-a", "mid.jsonl", 1);

    let files = discover_log_files(root.path(), 7, None);
    let paths: Vec<_> = files.into_iter().map(|f| f.path).collect();
    assert_eq!(paths, vec![new, mid, old]);
}

#[test]
fn test_project_filter_is_case_sensitive_substring() {
    let root = TempDir::new().unwrap();
    write_log(root.path(), "-Users-me-webapp", "a.jsonl", 0);
    write_log(root.path(), "-Users-me-cli", "b.jsonl", 0);

    let web = discover_log_files(root.path(), 7, Some("webapp"));
    assert_eq!(web.len(), 1);
    assert_eq!(web[0].project, "-Users-me-webapp");

    assert!(discover_log_files(root.path(), 7, Some("WEBAPP")).is_empty());
    assert_eq!(discover_log_files(root.path(), 7, Some("-Users-me")).len(), 2);
}

#[test]
fn test_reports_size_of_each_file() {
    let root = TempDir::new().unwrap();
    let path = write_log(root.path(), "-p", "s.jsonl", 0);
    fs::write(&path, "{\"type\":\"summary\"}\n").unwrap();

    let files = discover_log_files(root.path(), 7, None);
    assert_eq!(files[0].size, 19);
}
