use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use eclair_tasks::dispatch::{find_new_rasters, RasterScan};
use eclair_tasks::fs::mock::MemoryFileSystem;

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn scan(dir: &str, since: u64, extension: &str) -> RasterScan {
    RasterScan {
        dir: PathBuf::from(dir),
        since: at(since),
        extension: extension.to_string(),
    }
}

#[test]
fn only_files_newer_than_task_start_are_found() {
    let fs = MemoryFileSystem::new();
    fs.add_file_modified("/out/a.nc", "x", at(100));
    fs.add_file_modified("/out/b.nc", "x", at(200));
    fs.add_file_modified("/out/c.nc", "x", at(300));

    let found = find_new_rasters(&fs, &scan("/out", 200, "nc")).unwrap();
    assert_eq!(found, vec![PathBuf::from("/out/c.nc")]);
}

#[test]
fn extension_and_entry_type_are_filtered() {
    let fs = MemoryFileSystem::new();
    fs.add_file_modified("/out/b.nc", "x", at(500));
    fs.add_file_modified("/out/a.nc", "x", at(500));
    fs.add_file_modified("/out/a.tif", "x", at(500));
    fs.add_file_modified("/out/a.nc.bak", "x", at(500));
    fs.add_file_modified("/out/nested/deep.nc", "x", at(500));
    fs.add_dir("/out/dir.nc");

    let found = find_new_rasters(&fs, &scan("/out", 0, "nc")).unwrap();
    assert_eq!(
        found,
        vec![PathBuf::from("/out/a.nc"), PathBuf::from("/out/b.nc")]
    );
}

#[test]
fn leading_dot_in_extension_is_tolerated() {
    let fs = MemoryFileSystem::new();
    fs.add_file_modified("/out/a.tif", "x", at(500));

    let found = find_new_rasters(&fs, &scan("/out", 0, ".tif")).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn missing_directory_is_an_error() {
    let fs = MemoryFileSystem::new();
    assert!(find_new_rasters(&fs, &scan("/missing", 0, "nc")).is_err());
}

#[test]
fn real_directory_scan_uses_modification_times() {
    use eclair_tasks::fs::RealFileSystem;

    let dir = tempfile::tempdir().unwrap();
    let since = SystemTime::now() - Duration::from_secs(3600);
    std::fs::write(dir.path().join("nox.nc"), [1u8, 2, 3]).unwrap();
    std::fs::write(dir.path().join("readme.md"), "x").unwrap();

    let scan = RasterScan {
        dir: dir.path().to_path_buf(),
        since,
        extension: "nc".into(),
    };
    let found = find_new_rasters(&RealFileSystem, &scan).unwrap();
    assert_eq!(found, vec![dir.path().join("nox.nc")]);
}
