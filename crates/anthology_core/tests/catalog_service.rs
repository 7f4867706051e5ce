use anthology_core::mapper::entity;
use anthology_core::{
    open_store, open_store_in_memory, Author, Book, CatalogService, Genre, SaveOutcome,
    UpdatePolicy,
};

#[test]
fn provision_creates_every_table_and_is_repeatable() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();
    service.provision().unwrap();

    for table in [
        "Authors",
        "Books",
        "Genres",
        "SubGenres",
        "Subjects",
        "Quotes",
        "Readings",
        "books_authors",
        "books_genres",
    ] {
        assert!(store.table_exists(table).unwrap(), "missing {table}");
    }
}

#[test]
fn add_book_links_new_and_existing_authors() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();

    let mut existing = Author::new("Terry", "Pratchett");
    entity::save(&store, &mut existing, UpdatePolicy::Update).unwrap();

    let mut book = Book {
        publishloc: "London".to_string(),
        publishyear: "1990".to_string(),
        ..Book::new("Good Omens", "First")
    };
    let mut authors = vec![Author::new("Terry", "Pratchett"), Author::new("Neil", "Gaiman")];
    let outcome = service.add_book(&mut book, &mut authors).unwrap();

    assert!(matches!(outcome, SaveOutcome::Inserted(id) if id == book.id));
    assert_eq!(authors[0].id, existing.id);
    assert_ne!(authors[1].id, 0);
    assert_eq!(store.row_count("Authors").unwrap(), 2);
    assert_eq!(
        service.book_author_ids(book.id).unwrap(),
        vec![existing.id, authors[1].id]
    );
    assert_eq!(service.author_book_ids(existing.id).unwrap(), vec![book.id]);

    let loaded = service.book_authors(book.id).unwrap();
    assert_eq!(loaded, authors);
    assert_eq!(service.author_books(authors[1].id).unwrap(), vec![book.clone()]);

    assert_eq!(
        service.citation(book.id).unwrap().as_deref(),
        Some("Good Omens by Terry Pratchett and Neil Gaiman, London, 1990")
    );
}

#[test]
fn add_book_with_duplicate_natural_key_links_nothing() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();

    let mut original = Book::new("Beloved", "First");
    service.add_book(&mut original, &mut []).unwrap();

    let mut duplicate = Book::new("Beloved", "First");
    let mut authors = vec![Author::new("Toni", "Morrison")];
    let outcome = service.add_book(&mut duplicate, &mut authors).unwrap();

    assert!(outcome.failure().is_some());
    assert_eq!(duplicate.id, 0);
    assert_eq!(authors[0].id, 0);
    assert_eq!(store.row_count("books_authors").unwrap(), 0);
}

#[test]
fn citation_handles_missing_books_and_sparse_fields() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();

    assert_eq!(service.citation(12).unwrap(), None);

    let mut book = Book::new("Untitled Draft", "");
    service.add_book(&mut book, &mut []).unwrap();
    assert_eq!(
        service.citation(book.id).unwrap().as_deref(),
        Some("Untitled Draft")
    );
}

#[test]
fn genres_link_through_the_service() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();

    let mut book = Book::new("Dune", "First");
    let mut genre = Genre::new("Science Fiction");
    service.add_book(&mut book, &mut []).unwrap();
    service.save_or_reuse(&mut genre).unwrap();

    assert!(service.link_genre(genre.id, book.id).unwrap().is_saved());
    assert_eq!(service.book_genres(book.id).unwrap(), vec![genre]);
}

#[test]
fn link_author_reports_foreign_key_failures() {
    let store = open_store_in_memory().unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();

    let outcome = service.link_author(3, 4).unwrap();
    assert!(outcome.failure().is_some());
}

#[test]
fn catalog_survives_reopening_a_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("anthology.db");

    let book_id = {
        let store = open_store(&path).unwrap();
        let service = CatalogService::new(&store);
        service.provision().unwrap();
        let mut book = Book::new("Piranesi", "First");
        let mut authors = vec![Author::new("Susanna", "Clarke")];
        service.add_book(&mut book, &mut authors).unwrap();
        book.id
    };

    let store = open_store(&path).unwrap();
    let service = CatalogService::new(&store);
    service.provision().unwrap();
    assert_eq!(
        service.citation(book_id).unwrap().as_deref(),
        Some("Piranesi by Susanna Clarke")
    );
}
