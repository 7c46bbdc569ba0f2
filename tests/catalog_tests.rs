use media_catalog::cache::CacheEvent;
use media_catalog::models::{FileKind, NewFileEntry, Subtype};
use media_catalog::payload::NewTag;
use media_catalog::{Catalog, Database, Settings};

fn catalog_with_file() -> (Catalog, i64) {
    let db = Database::open_in_memory().unwrap();
    db.insert_file(&NewFileEntry {
        path: "/a.mp4".to_string(),
        kind: FileKind::File,
        subtype: Subtype::Video,
        parent_id: None,
        size: None,
        last_modified: None,
    })
    .unwrap();
    let (id, _) = db.find_file_by_path("/a.mp4").unwrap().unwrap();
    (Catalog::new(db, Settings::new("/srv/static")), id)
}

#[test]
fn test_details_are_served_from_cache() {
    let (catalog, file) = catalog_with_file();
    let events = catalog.cache().subscribe();

    let first = catalog.file_details(file).unwrap();
    assert_eq!(events.try_recv().unwrap(), CacheEvent::Updated(file));

    // a write that bypasses the catalog is not seen until invalidation
    catalog.db().add_like(file, 3).unwrap();
    assert_eq!(catalog.file_details(file).unwrap(), first);
    assert!(events.try_recv().is_err());

    catalog.cache().invalidate(&file);
    assert_eq!(catalog.file_details(file).unwrap().like_count, 1);
}

#[test]
fn test_mutations_invalidate_details() {
    let (catalog, file) = catalog_with_file();
    catalog.file_details(file).unwrap();
    let events = catalog.cache().subscribe();

    catalog.add_like(file, 2.0).unwrap();
    assert_eq!(events.try_recv().unwrap(), CacheEvent::Invalidated(file));
    assert_eq!(catalog.file_details(file).unwrap().like_count, 1);

    catalog.record_view(file, Subtype::Video).unwrap();
    let details = catalog.file_details(file).unwrap();
    assert_eq!(details.analytics.map(|a| a.view_count), Some(1));

    let tag = catalog.create_tag(&NewTag::new("calm", None, None).unwrap()).unwrap();
    catalog.tag_file(file, tag.id).unwrap();
    assert_eq!(catalog.file_details(file).unwrap().tags, vec![tag.id]);

    catalog.delete_tag(tag.id).unwrap();
    assert!(catalog.file_details(file).unwrap().tags.is_empty());
}

#[test]
fn test_delete_clears_cache() {
    let (catalog, file) = catalog_with_file();
    catalog.file_details(file).unwrap();
    let events = catalog.cache().subscribe();

    catalog.delete_file(file).unwrap();
    assert_eq!(events.try_recv().unwrap(), CacheEvent::Cleared);
    assert!(catalog.cache().is_empty());
    assert!(catalog.file_details(file).is_err());
}

#[test]
fn test_failed_lookups_are_not_cached() {
    let (catalog, _) = catalog_with_file();
    assert!(catalog.file_details(404).is_err());
    assert!(catalog.cache().is_empty());
}
