#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn write_workspace_db(path: &Path, first_name: &str) {
    let conn = rusqlite::Connection::open(path).expect("open sqlite");
    conn.execute_batch(
        "CREATE TABLE students(id INTEGER PRIMARY KEY, first_name TEXT NOT NULL, last_name TEXT NOT NULL)",
    )
    .expect("create students");
    conn.execute(
        "INSERT INTO students(first_name, last_name) VALUES(?, 'Lovelace')",
        [first_name],
    )
    .expect("insert student");
}

fn first_student_name(path: &Path) -> String {
    let conn = rusqlite::Connection::open(path).expect("open sqlite");
    conn.query_row("SELECT first_name FROM students ORDER BY id LIMIT 1", [], |r| {
        r.get(0)
    })
    .expect("query student")
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("srms-backup-src");
    let workspace2 = temp_dir("srms-backup-dst");
    let out_dir = temp_dir("srms-backup-out");

    let db_src = workspace.join("student_results.sqlite3");
    write_workspace_db(&db_src, "Ada");
    let bytes = std::fs::read(&db_src).expect("read source db");

    let bundle_path = out_dir.join("workspace.srmsbackup.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.entry_count, 2);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/student_results.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);

    let restored = std::fs::read(workspace2.join("student_results.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);
    assert!(!workspace2
        .join("student_results.sqlite3.importing")
        .exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_database_entry_is_rejected() {
    let out_dir = temp_dir("srms-backup-tamper");
    let workspace = temp_dir("srms-backup-tamper-dst");
    let bundle_path = out_dir.join("tampered.zip");

    {
        let f = File::create(&bundle_path).expect("create zip");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        zip.write_all(
            serde_json::json!({
                "format": backup::BUNDLE_FORMAT,
                "dbSha256": "0000000000000000000000000000000000000000000000000000000000000000"
            })
            .to_string()
            .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("db/student_results.sqlite3", opts)
            .expect("db entry");
        zip.write_all(b"not what the manifest promised")
            .expect("write db");
        zip.finish().expect("finish zip");
    }

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).unwrap_err();
    assert!(format!("{e:#}").contains("checksum mismatch"));
    assert!(!workspace.join("student_results.sqlite3").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn raw_sqlite_import_is_supported() {
    let out_dir = temp_dir("srms-backup-raw");
    let workspace = temp_dir("srms-backup-raw-dst");

    let raw_file = out_dir.join("copy.sqlite3");
    write_workspace_db(&raw_file, "Grace");
    let bytes = std::fs::read(&raw_file).expect("read raw sqlite file");

    let import = backup::import_workspace_bundle(&raw_file, &workspace).expect("import raw sqlite");
    assert_eq!(import.bundle_format_detected, backup::RAW_SQLITE_FORMAT);

    let restored_path = workspace.join("student_results.sqlite3");
    let restored = std::fs::read(&restored_path).expect("read restored sqlite");
    assert_eq!(restored, bytes);
    assert_eq!(first_student_name(&restored_path), "Grace");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_without_database_fails() {
    let workspace = temp_dir("srms-backup-empty");
    let out = workspace.join("out.zip");
    assert!(backup::export_workspace_bundle(&workspace, &out).is_err());
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn non_database_input_leaves_workspace_intact() {
    let out_dir = temp_dir("srms-backup-garbage");
    let workspace = temp_dir("srms-backup-garbage-dst");
    let live = workspace.join("student_results.sqlite3");
    write_workspace_db(&live, "Ada");
    let before = std::fs::read(&live).expect("read live db");

    let notes = out_dir.join("notes.txt");
    std::fs::write(&notes, "hello, not a database").expect("write notes");
    let e = backup::import_workspace_bundle(&notes, &workspace).unwrap_err();
    assert!(format!("{e:#}").contains("not a backup bundle or sqlite database"));

    let empty = out_dir.join("empty.sqlite3");
    std::fs::write(&empty, b"").expect("write empty file");
    assert!(backup::import_workspace_bundle(&empty, &workspace).is_err());

    assert_eq!(std::fs::read(&live).expect("read live db"), before);
    assert_eq!(first_student_name(&live), "Ada");
    assert!(!workspace.join("student_results.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn sqlite_file_without_students_table_is_rejected() {
    let out_dir = temp_dir("srms-backup-foreign");
    let workspace = temp_dir("srms-backup-foreign-dst");
    let live = workspace.join("student_results.sqlite3");
    write_workspace_db(&live, "Ada");

    let foreign = out_dir.join("other.sqlite3");
    {
        let conn = rusqlite::Connection::open(&foreign).expect("open foreign db");
        conn.execute_batch("CREATE TABLE notes(body TEXT)")
            .expect("create notes");
    }

    let e = backup::import_workspace_bundle(&foreign, &workspace).unwrap_err();
    assert!(format!("{e:#}").contains("no students table"));
    assert_eq!(first_student_name(&live), "Ada");
    assert!(!workspace.join("student_results.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
