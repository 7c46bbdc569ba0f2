use std::fs;
use std::path::Path;

use media_catalog::models::{FileKind, IndexStatus, Subtype};
use media_catalog::{Catalog, Error, Settings};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// movies/{a.mp4,b.MKV}, music/song.mp3, notes.txt
fn media_tree() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "movies/a.mp4", "aaaa");
    write(dir.path(), "movies/b.MKV", "bb");
    write(dir.path(), "music/song.mp3", "la");
    write(dir.path(), "notes.txt", "hello");
    dir
}

fn open(root: &Path) -> Catalog {
    Catalog::open(Settings::new(root)).unwrap()
}

fn id_of(catalog: &Catalog, key: &str) -> i64 {
    catalog
        .db()
        .find_file_by_path(key)
        .unwrap()
        .unwrap_or_else(|| panic!("{key} not indexed"))
        .0
}

#[test]
fn test_index_tree_records_every_entry() {
    let dir = media_tree();
    let catalog = open(dir.path());

    let summary = catalog.index_tree().unwrap();
    assert_eq!(summary.indexed, 6);
    assert_eq!(summary.failed, 0);

    let files = catalog.files().unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "/movies",
            "/movies/a.mp4",
            "/movies/b.MKV",
            "/music",
            "/music/song.mp3",
            "/notes.txt"
        ]
    );

    let movie = files.iter().find(|f| f.path == "/movies/a.mp4").unwrap();
    assert_eq!(movie.kind, FileKind::File);
    assert_eq!(movie.subtype, Subtype::Video);
    assert_eq!(movie.size, Some(4));
    assert!(movie.last_modified.is_some());

    let loud = files.iter().find(|f| f.path == "/movies/b.MKV").unwrap();
    assert_eq!(loud.subtype, Subtype::Video);

    let folder = files.iter().find(|f| f.path == "/music").unwrap();
    assert_eq!(folder.kind, FileKind::Directory);
    assert_eq!(folder.subtype, Subtype::Text);
    assert_eq!(folder.size, None);
}

#[test]
fn test_database_files_are_not_indexed() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();

    let files = catalog.files().unwrap();
    assert!(files.iter().all(|f| !f.path.starts_with("/file_paths.db")));
}

#[test]
fn test_children_link_to_their_directory() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();

    let movies = id_of(&catalog, "/movies");
    let children = catalog.db().list_children(Some(movies)).unwrap();
    let names: Vec<&str> = children.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["a.mp4", "b.MKV"]);

    let top = catalog.db().list_children(None).unwrap();
    let names: Vec<&str> = top.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["movies", "music", "notes.txt"]);
}

#[test]
fn test_reindexing_is_idempotent() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();
    let before = catalog.files().unwrap();

    let summary = catalog.index_tree().unwrap();
    assert_eq!(summary.indexed, 0);
    assert_eq!(summary.already_indexed, 6);
    assert_eq!(catalog.files().unwrap(), before);
}

#[test]
fn test_reindex_picks_up_new_children_of_known_directories() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();
    let movies = id_of(&catalog, "/movies");

    write(dir.path(), "movies/extras/c.webm", "c");
    let summary = catalog.index_tree().unwrap();
    assert_eq!(summary.indexed, 2);

    let extras = catalog
        .db()
        .get_file(id_of(&catalog, "/movies/extras"))
        .unwrap()
        .unwrap();
    assert_eq!(extras.parent_id, Some(movies));
    let clip = catalog
        .db()
        .get_file(id_of(&catalog, "/movies/extras/c.webm"))
        .unwrap()
        .unwrap();
    assert_eq!(clip.parent_id, Some(extras.id));
}

#[test]
fn test_index_path_resolves_parent() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();

    write(dir.path(), "music/live.flac", "x");
    let outcome = catalog
        .index_path(&dir.path().join("music/./live.flac"))
        .unwrap();
    assert_eq!(outcome.status, IndexStatus::Indexed);

    let entry = catalog.db().get_file(outcome.id).unwrap().unwrap();
    assert_eq!(entry.path, "/music/live.flac");
    assert_eq!(entry.subtype, Subtype::Audio);
    assert_eq!(entry.parent_id, Some(id_of(&catalog, "/music")));

    let again = catalog.index_path(&dir.path().join("music/live.flac")).unwrap();
    assert_eq!(again.status, IndexStatus::AlreadyExists);
    assert_eq!(again.id, outcome.id);
}

#[test]
fn test_index_path_at_top_level_has_no_parent() {
    let dir = media_tree();
    let catalog = open(dir.path());

    let outcome = catalog.index_path(&dir.path().join("notes.txt")).unwrap();
    let entry = catalog.db().get_file(outcome.id).unwrap().unwrap();
    assert_eq!(entry.parent_id, None);
}

#[test]
fn test_paths_outside_root_are_rejected() {
    let dir = media_tree();
    let other = tempfile::tempdir().unwrap();
    write(other.path(), "stray.mp4", "x");
    let catalog = open(dir.path());

    let err = catalog
        .index_path(&other.path().join("stray.mp4"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let escape = dir.path().join("movies/../../stray.mp4");
    assert!(matches!(
        catalog.index_path(&escape).unwrap_err(),
        Error::InvalidInput(_)
    ));
}

#[test]
fn test_missing_path_is_an_io_error() {
    let dir = media_tree();
    let catalog = open(dir.path());

    let err = catalog.index_path(&dir.path().join("ghost.mp4")).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert!(catalog.db().find_file_by_path("/ghost.mp4").unwrap().is_none());
}

#[test]
fn test_directory_subtype_is_configurable() {
    let dir = media_tree();
    let mut settings = Settings::new(dir.path());
    settings.directory_subtype = Subtype::Image;
    let catalog = Catalog::open(settings).unwrap();
    catalog.index_tree().unwrap();

    let music = catalog.db().get_file(id_of(&catalog, "/music")).unwrap().unwrap();
    assert_eq!(music.subtype, Subtype::Image);
}

#[test]
fn test_reclassify_fixes_stale_subtypes() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();

    let song = id_of(&catalog, "/music/song.mp3");
    catalog.db().update_subtype(song, Subtype::Image).unwrap();

    assert_eq!(catalog.reclassify().unwrap(), 1);
    let entry = catalog.db().get_file(song).unwrap().unwrap();
    assert_eq!(entry.subtype, Subtype::Audio);
    assert_eq!(catalog.reclassify().unwrap(), 0);
}

#[cfg(unix)]
#[test]
fn test_broken_symlink_does_not_stop_the_walk() {
    let dir = media_tree();
    std::os::unix::fs::symlink(dir.path().join("nowhere.mp4"), dir.path().join("dangling.mp4"))
        .unwrap();
    let catalog = open(dir.path());

    let summary = catalog.index_tree().unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 6);
    assert!(catalog.db().find_file_by_path("/dangling.mp4").unwrap().is_none());
}

#[cfg(unix)]
#[test]
fn test_symlinked_directories_are_not_descended() {
    let dir = media_tree();
    std::os::unix::fs::symlink(dir.path().join("music"), dir.path().join("mirror")).unwrap();
    let catalog = open(dir.path());
    catalog.index_tree().unwrap();

    let mirror = catalog.db().get_file(id_of(&catalog, "/mirror")).unwrap().unwrap();
    assert_eq!(mirror.kind, FileKind::Directory);
    assert!(catalog
        .db()
        .find_file_by_path("/mirror/song.mp3")
        .unwrap()
        .is_none());
}

#[test]
fn test_root_itself_is_not_indexed() {
    let dir = media_tree();
    let catalog = open(dir.path());

    let err = catalog.index_path(dir.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(matches!(
        catalog.index_path(&dir.path().join("movies/..")).unwrap_err(),
        Error::InvalidInput(_)
    ));

    catalog.index_tree().unwrap();
    assert!(catalog.db().find_file_by_path("/").unwrap().is_none());
    let notes = catalog.db().get_file(id_of(&catalog, "/notes.txt")).unwrap().unwrap();
    assert_eq!(notes.parent_id, None);
}

#[test]
fn test_rejected_insert_skips_only_that_branch() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog
        .db()
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_music BEFORE INSERT ON files WHEN NEW.path = '/music' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();

    let summary = catalog.index_tree().unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.indexed, 4);

    let db = catalog.db();
    assert!(db.find_file_by_path("/music").unwrap().is_none());
    assert!(db.find_file_by_path("/music/song.mp3").unwrap().is_none());
    for key in ["/movies", "/movies/a.mp4", "/movies/b.MKV", "/notes.txt"] {
        assert!(db.find_file_by_path(key).unwrap().is_some(), "{key}");
    }
}

#[test]
fn test_store_failure_aborts_the_walk() {
    let dir = media_tree();
    let catalog = open(dir.path());
    catalog
        .db()
        .connection()
        .execute_batch("PRAGMA query_only = ON;")
        .unwrap();

    let err = catalog.index_tree().unwrap_err();
    assert!(matches!(err, Error::Database(_)));
    assert!(err.is_store_failure());
}
