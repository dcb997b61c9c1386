use std::fs;

use corpora_crawler::{DocumentDescriptor, DocumentStore};

#[test]
fn saves_under_root_creating_directories() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());
    let descriptor = DocumentDescriptor::new("1", "https://site/1", "en/books/00001.txt");

    assert!(!store.exists(&descriptor));
    let path = store.save(&descriptor, "Once upon a time").unwrap();

    assert_eq!(dir.path().join("en/books/00001.txt"), path);
    assert_eq!("Once upon a time", fs::read_to_string(&path).unwrap());
    assert!(store.exists(&descriptor));
    assert!(!dir.path().join("en/books/00001.txt.part").exists());
}

#[test]
fn overwrites_existing_documents() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());
    let descriptor = DocumentDescriptor::new("1", "https://site/1", "00001.txt");

    store.save(&descriptor, "first").unwrap();
    let path = store.save(&descriptor, "second").unwrap();

    assert_eq!("second", fs::read_to_string(path).unwrap());
}

#[test]
fn partial_files_are_not_documents() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path());
    let descriptor = DocumentDescriptor::new("1", "https://site/1", "00001.txt");

    fs::write(dir.path().join("00001.txt.part"), "truncat").unwrap();
    assert!(!store.exists(&descriptor));

    store.save(&descriptor, "complete").unwrap();
    assert!(store.exists(&descriptor));
    assert!(!dir.path().join("00001.txt.part").exists());
}

#[test]
fn absolute_targets_ignore_root() {
    let root = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let target = elsewhere.path().join("a.txt");
    let store = DocumentStore::new(root.path());
    let descriptor = DocumentDescriptor::new("a", "https://site/a", &target);

    assert_eq!(target, store.save(&descriptor, "a").unwrap());
    assert!(store.exists(&descriptor));
}
