//! Book catalog use-case service.
//!
//! # Responsibility
//! - Provision every journal table in dependency order.
//! - Resolve book/author associations into loaded entities.
//!
//! # Invariants
//! - Service APIs go through the mapper; no SQL is issued here.
//! - Write failures stay values (`SaveOutcome::Failed`), as in the mapper.

use crate::db::Store;
use crate::mapper::{entity, relation, Entity, MapperResult, SaveOutcome, Side, UpdatePolicy};
use crate::model::book::{oxford_comma_list, Book, BookAuthor, BookGenre};
use crate::model::category::{Genre, SubGenre, Subject};
use crate::model::creator::Author;
use crate::model::session::{Quote, Reading};
use log::{info, warn};

/// Use-case service over the journal tables of one store.
pub struct CatalogService<'s> {
    store: &'s Store,
}

impl<'s> CatalogService<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'s Store {
        self.store
    }

    /// Creates every entity and junction table. Safe to call on every run.
    pub fn provision(&self) -> MapperResult<()> {
        entity::create::<Author>(self.store)?;
        entity::create::<Book>(self.store)?;
        entity::create::<Genre>(self.store)?;
        entity::create::<SubGenre>(self.store)?;
        entity::create::<Subject>(self.store)?;
        entity::create::<Quote>(self.store)?;
        entity::create::<Reading>(self.store)?;
        relation::create::<BookAuthor>(self.store)?;
        relation::create::<BookGenre>(self.store)?;
        info!("event=catalog_provision module=service status=ok");
        Ok(())
    }

    /// Saves a transient entity, or adopts the id of the stored row sharing
    /// its natural key.
    ///
    /// Returns the entity id, or `None` when the write failed.
    pub fn save_or_reuse<T: Entity>(&self, item: &mut T) -> MapperResult<Option<i64>> {
        if item.id() != 0 {
            return Ok(Some(item.id()));
        }
        if let Some(existing) = entity::find_by_natural_key(self.store, item)? {
            item.set_id(existing.id());
            return Ok(Some(existing.id()));
        }
        Ok(entity::save(self.store, item, UpdatePolicy::Skip)?.id())
    }

    /// Saves a book with its authors and links each author to it.
    ///
    /// Authors that already exist are reused. Returns the book's save outcome;
    /// authors are only linked when the book was stored.
    pub fn add_book(&self, book: &mut Book, authors: &mut [Author]) -> MapperResult<SaveOutcome> {
        let outcome = entity::save(self.store, book, UpdatePolicy::Update)?;
        let Some(book_id) = outcome.id() else {
            return Ok(outcome);
        };

        for author in authors.iter_mut() {
            match self.save_or_reuse(author)? {
                Some(author_id) => {
                    self.link_author(author_id, book_id)?;
                }
                None => warn!(
                    "event=catalog_add_book module=service status=partial book_id={book_id} author_saved=false"
                ),
            }
        }
        Ok(outcome)
    }

    pub fn link_author(&self, author_id: i64, book_id: i64) -> MapperResult<SaveOutcome> {
        relation::save::<BookAuthor>(self.store, (author_id, book_id))
    }

    pub fn link_genre(&self, genre_id: i64, book_id: i64) -> MapperResult<SaveOutcome> {
        relation::save::<BookGenre>(self.store, (genre_id, book_id))
    }

    pub fn book_author_ids(&self, book_id: i64) -> MapperResult<Vec<i64>> {
        relation::lookup_related_ids::<BookAuthor>(self.store, book_id, Side::B)
    }

    pub fn author_book_ids(&self, author_id: i64) -> MapperResult<Vec<i64>> {
        relation::lookup_related_ids::<BookAuthor>(self.store, author_id, Side::A)
    }

    pub fn book_authors(&self, book_id: i64) -> MapperResult<Vec<Author>> {
        self.load_all(self.book_author_ids(book_id)?)
    }

    pub fn author_books(&self, author_id: i64) -> MapperResult<Vec<Book>> {
        self.load_all(self.author_book_ids(author_id)?)
    }

    pub fn book_genres(&self, book_id: i64) -> MapperResult<Vec<Genre>> {
        let ids = relation::lookup_related_ids::<BookGenre>(self.store, book_id, Side::B)?;
        self.load_all(ids)
    }

    /// "Title by A, B, and C, Location, Year", or `None` for an unknown book.
    pub fn citation(&self, book_id: i64) -> MapperResult<Option<String>> {
        let Some(book) = entity::load::<Book>(self.store, book_id)? else {
            return Ok(None);
        };
        let names = self
            .book_authors(book_id)?
            .iter()
            .map(Author::first_last)
            .collect::<Vec<_>>();

        let mut citation = book.title.clone();
        if !names.is_empty() {
            citation.push_str(" by ");
            citation.push_str(&oxford_comma_list(&names));
        }
        for part in [&book.publishloc, &book.publishyear] {
            if !part.is_empty() {
                citation.push_str(", ");
                citation.push_str(part);
            }
        }
        Ok(Some(citation))
    }

    fn load_all<T: Entity>(&self, ids: Vec<i64>) -> MapperResult<Vec<T>> {
        let mut loaded = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = entity::load::<T>(self.store, id)? {
                loaded.push(item);
            }
        }
        Ok(loaded)
    }
}
