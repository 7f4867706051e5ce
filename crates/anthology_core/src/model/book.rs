//! Book records and their relations to authors and genres.
//!
//! # Invariants
//! - A book is unique by (title, edition).
//! - `books_authors` links Author (A side) to Book (B side).
//! - `books_genres` links Genre (A side) to Book (B side).

use super::category::Genre;
use super::creator::Author;
use crate::mapper::{Entity, FieldKind, FieldSpec, MapperResult, Record, Relation};
use std::fmt::{Display, Formatter};

const BOOK_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_meta("title", FieldKind::Text, "Title", "Title of the book"),
    FieldSpec::with_meta("publisher", FieldKind::Text, "Publisher", "Publishing house"),
    FieldSpec::with_meta("publishyear", FieldKind::Text, "Publish Year", "Year of publication"),
    FieldSpec::with_meta("publishloc", FieldKind::Text, "Publish Location", "Place of publication"),
    FieldSpec::with_meta("edition", FieldKind::Text, "Edition", "Edition of the book"),
    FieldSpec::with_meta("numpages", FieldKind::Integer, "Number of Pages", "Pages to read"),
    FieldSpec::with_meta("curpage", FieldKind::Integer, "Current Page", "Bookmark position"),
    FieldSpec::with_meta("timesread", FieldKind::Integer, "Times Read", "Completed readings"),
    FieldSpec::with_meta("rating", FieldKind::Integer, "Rating", "Personal rating"),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publisher: String,
    pub publishyear: String,
    pub publishloc: String,
    pub edition: String,
    pub numpages: i64,
    pub curpage: i64,
    pub timesread: i64,
    pub rating: i64,
}

impl Book {
    pub fn new(title: impl Into<String>, edition: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            edition: edition.into(),
            ..Self::default()
        }
    }

    /// Reading progress in `[0, 1]`; zero when the page count is unknown.
    pub fn progress(&self) -> f64 {
        if self.numpages <= 0 {
            return 0.0;
        }
        (self.curpage.clamp(0, self.numpages) as f64) / (self.numpages as f64)
    }
}

impl Display for Book {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)?;
        for part in [&self.publishloc, &self.publishyear] {
            if !part.is_empty() {
                write!(f, ", {part}")?;
            }
        }
        Ok(())
    }
}

impl Entity for Book {
    const TYPE_NAME: &'static str = "Book";

    fn fields() -> &'static [FieldSpec] {
        BOOK_FIELDS
    }

    fn unique_key() -> &'static [&'static str] {
        &["title", "edition"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("title", self.title.as_str())
            .with("publisher", self.publisher.as_str())
            .with("publishyear", self.publishyear.as_str())
            .with("publishloc", self.publishloc.as_str())
            .with("edition", self.edition.as_str())
            .with("numpages", self.numpages)
            .with("curpage", self.curpage)
            .with("timesread", self.timesread)
            .with("rating", self.rating)
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self {
            id: 0,
            title: record.take_text("title")?,
            publisher: record.take_text("publisher")?,
            publishyear: record.take_text("publishyear")?,
            publishloc: record.take_text("publishloc")?,
            edition: record.take_text("edition")?,
            numpages: record.take_int("numpages")?,
            curpage: record.take_int("curpage")?,
            timesread: record.take_int("timesread")?,
            rating: record.take_int("rating")?,
        })
    }
}

/// Many-to-many link between authors and books.
pub struct BookAuthor;

impl Relation for BookAuthor {
    type A = Author;
    type B = Book;

    const TABLE_NAME: &'static str = "books_authors";
}

/// Many-to-many link between genres and books.
pub struct BookGenre;

impl Relation for BookGenre {
    type A = Genre;
    type B = Book;

    const TABLE_NAME: &'static str = "books_genres";
}

/// Joins names as "A", "A and B" or "A, B, and C".
pub fn oxford_comma_list(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} and {second}"),
        [head @ .., last] => format!("{}, and {last}", head.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::{oxford_comma_list, Book};

    #[test]
    fn oxford_comma_list_handles_every_length() {
        let names = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(oxford_comma_list(&names(&[])), "");
        assert_eq!(oxford_comma_list(&names(&["A"])), "A");
        assert_eq!(oxford_comma_list(&names(&["A", "B"])), "A and B");
        assert_eq!(oxford_comma_list(&names(&["A", "B", "C"])), "A, B, and C");
    }

    #[test]
    fn display_skips_empty_publication_details() {
        let mut book = Book::new("X", "First");
        assert_eq!(book.to_string(), "X");
        book.publishloc = "Ellicott City, MD".to_string();
        book.publishyear = "2021".to_string();
        assert_eq!(book.to_string(), "X, Ellicott City, MD, 2021");
    }

    #[test]
    fn progress_is_clamped() {
        let mut book = Book::new("X", "First");
        assert_eq!(book.progress(), 0.0);
        book.numpages = 200;
        book.curpage = 50;
        assert_eq!(book.progress(), 0.25);
        book.curpage = 900;
        assert_eq!(book.progress(), 1.0);
    }
}
