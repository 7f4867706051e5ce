use anthology_core::mapper::{entity, relation, Entity, Relation};
use anthology_core::{
    open_store_in_memory, Author, Book, BookAuthor, BookGenre, Genre, MapperError, SaveOutcome,
    Side, Store, UpdatePolicy, WriteFailureKind,
};

fn catalog_store() -> Store {
    let store = open_store_in_memory().unwrap();
    entity::create::<Author>(&store).unwrap();
    entity::create::<Book>(&store).unwrap();
    entity::create::<Genre>(&store).unwrap();
    relation::create::<BookAuthor>(&store).unwrap();
    relation::create::<BookGenre>(&store).unwrap();
    store
}

fn saved<T: Entity>(store: &Store, mut item: T) -> T {
    let outcome = entity::save(store, &mut item, UpdatePolicy::Update).unwrap();
    assert!(outcome.is_saved(), "fixture save failed: {outcome:?}");
    item
}

/// Relation whose two sides resolve to the same junction column.
struct AuthorMentor;

impl Relation for AuthorMentor {
    type A = Author;
    type B = Author;

    const TABLE_NAME: &'static str = "authors_mentors";
}

#[test]
fn book_lookup_returns_the_linked_author() {
    let store = open_store_in_memory().unwrap();
    entity::create::<Author>(&store).unwrap();
    entity::create::<Book>(&store).unwrap();
    let author = saved(&store, Author::new("Terry", "Cotta"));
    let book = saved(&store, Book::new("X", "First"));

    relation::create::<BookAuthor>(&store).unwrap();
    let outcome = relation::save::<BookAuthor>(&store, (author.id, book.id)).unwrap();
    assert!(matches!(outcome, SaveOutcome::Inserted(_)));

    let ids = relation::lookup_related_ids::<BookAuthor>(&store, book.id, Side::B).unwrap();
    assert_eq!(ids, vec![author.id]);
}

#[test]
fn lookups_are_symmetric() {
    let store = catalog_store();
    let author = saved(&store, Author::new("Ursula", "Le Guin"));
    let first = saved(&store, Book::new("The Dispossessed", "First"));
    let second = saved(&store, Book::new("The Lathe of Heaven", "First"));

    relation::save::<BookAuthor>(&store, (author.id, first.id)).unwrap();
    relation::save::<BookAuthor>(&store, (author.id, second.id)).unwrap();

    assert_eq!(
        relation::lookup_related_ids::<BookAuthor>(&store, author.id, Side::A).unwrap(),
        vec![first.id, second.id]
    );
    for book in [&first, &second] {
        assert_eq!(
            relation::lookup_related_ids::<BookAuthor>(&store, book.id, Side::B).unwrap(),
            vec![author.id]
        );
    }
}

#[test]
fn junction_uses_lowercase_type_columns() {
    let store = catalog_store();
    let mut stmt = store
        .conn()
        .prepare("PRAGMA table_info(books_authors);")
        .unwrap();
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(columns, vec!["author_id", "book_id"]);
}

fn pragma_rows(store: &Store, pragma: &str, table: &str) -> Vec<String> {
    let mut stmt = store
        .conn()
        .prepare(&format!("PRAGMA {pragma}({table});"))
        .unwrap();
    let width = stmt.column_count();
    let mut rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|index| {
                    row.get::<_, rusqlite::types::Value>(index)
                        .map(|cell| format!("{cell:?}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|cells| cells.join("|"))
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows.sort();
    rows
}

fn index_names(store: &Store, table: &str) -> Vec<String> {
    let mut stmt = store
        .conn()
        .prepare(&format!("PRAGMA index_list({table});"))
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    names
}

#[test]
fn create_is_idempotent() {
    let store = catalog_store();
    let before = ["books_authors", "books_genres"].map(|table| {
        (
            pragma_rows(&store, "table_info", table),
            pragma_rows(&store, "index_list", table),
        )
    });

    relation::create::<BookAuthor>(&store).unwrap();
    relation::create::<BookGenre>(&store).unwrap();

    let after = ["books_authors", "books_genres"].map(|table| {
        (
            pragma_rows(&store, "table_info", table),
            pragma_rows(&store, "index_list", table),
        )
    });
    assert_eq!(after, before);
    assert_eq!(before[0].1.len(), 2, "expected UNIQUE and B-side indexes");
}

#[test]
fn b_side_lookups_are_served_by_an_index() {
    let store = catalog_store();
    assert!(index_names(&store, "books_authors").contains(&"books_authors_book_id_idx".to_string()));
    assert!(index_names(&store, "books_genres").contains(&"books_genres_book_id_idx".to_string()));

    let mut stmt = store
        .conn()
        .prepare("EXPLAIN QUERY PLAN SELECT author_id FROM books_authors WHERE book_id = ?1 ORDER BY rowid;")
        .unwrap();
    let details = stmt
        .query_map([1_i64], |row| row.get::<_, String>(3))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert!(
        details
            .iter()
            .any(|detail| detail.starts_with("SEARCH") && detail.contains("book_id=?")),
        "B-side lookup scans the junction: {details:?}"
    );
}

#[test]
fn duplicate_pair_is_a_constraint_failure() {
    let store = catalog_store();
    let author = saved(&store, Author::new("Terry", "Cotta"));
    let book = saved(&store, Book::new("X", "First"));

    assert!(relation::save::<BookAuthor>(&store, (author.id, book.id))
        .unwrap()
        .is_saved());
    let outcome = relation::save::<BookAuthor>(&store, (author.id, book.id)).unwrap();

    assert_eq!(
        outcome.failure().map(|failure| failure.kind),
        Some(WriteFailureKind::Constraint)
    );
    assert_eq!(store.row_count("books_authors").unwrap(), 1);
}

#[test]
fn linking_unknown_ids_is_rejected_by_foreign_keys() {
    let store = catalog_store();
    let book = saved(&store, Book::new("X", "First"));

    let outcome = relation::save::<BookAuthor>(&store, (999, book.id)).unwrap();
    assert_eq!(
        outcome.failure().map(|failure| failure.kind),
        Some(WriteFailureKind::Constraint)
    );
    assert_eq!(store.row_count("books_authors").unwrap(), 0);
}

#[test]
fn load_table_returns_pairs_in_link_order() {
    let store = catalog_store();
    let fantasy = saved(&store, Genre::new("Fantasy"));
    let horror = saved(&store, Genre::new("Horror"));
    let book = saved(&store, Book::new("Gormenghast", "First"));

    relation::save::<BookGenre>(&store, (horror.id, book.id)).unwrap();
    relation::save::<BookGenre>(&store, (fantasy.id, book.id)).unwrap();

    assert_eq!(
        relation::load_table::<BookGenre>(&store).unwrap(),
        vec![(horror.id, book.id), (fantasy.id, book.id)]
    );
    assert!(relation::load_table::<BookAuthor>(&store).unwrap().is_empty());
}

#[test]
fn lookup_for_unlinked_id_is_empty() {
    let store = catalog_store();
    assert!(relation::lookup_related_ids::<BookAuthor>(&store, 5, Side::A)
        .unwrap()
        .is_empty());
}

#[test]
fn self_relation_with_colliding_columns_is_rejected() {
    let store = catalog_store();
    let err = relation::create::<AuthorMentor>(&store).unwrap_err();
    assert!(matches!(err, MapperError::InvalidSchema { .. }));
    assert!(!store.table_exists("authors_mentors").unwrap());
}

#[test]
fn side_other_flips() {
    assert_eq!(Side::A.other(), Side::B);
    assert_eq!(Side::B.other(), Side::A);
}
