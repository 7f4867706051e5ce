//! Categories used to classify media: genre, sub-genre and subject.

use crate::mapper::{Entity, FieldKind, FieldSpec, MapperResult, Record};
use std::fmt::{Display, Formatter};

const NAME_FIELD: FieldSpec =
    FieldSpec::with_meta("name", FieldKind::Text, "Name", "Category name");

const GENRE_FIELDS: &[FieldSpec] = &[NAME_FIELD];

const SUBJECT_FIELDS: &[FieldSpec] = &[
    NAME_FIELD,
    FieldSpec::with_meta(
        "synonyms",
        FieldKind::List,
        "Synonyms",
        "Related key words that help searching",
    ),
];

/// Broad genre within a medium (fiction, non-fiction, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Narrower genre within a medium (science fiction, horror, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubGenre {
    pub id: i64,
    pub name: String,
}

/// Subject matter (engineering, philosophy, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub synonyms: Vec<String>,
}

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

impl SubGenre {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

impl Subject {
    pub fn new(name: impl Into<String>, synonyms: Vec<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            synonyms,
        }
    }

    /// Case-insensitive match against the name or any synonym.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim();
        !term.is_empty()
            && std::iter::once(&self.name)
                .chain(self.synonyms.iter())
                .any(|word| word.eq_ignore_ascii_case(term))
    }
}

impl Display for Genre {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Display for SubGenre {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.synonyms.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} ({})", self.name, self.synonyms.join(", "))
        }
    }
}

impl Entity for Genre {
    const TYPE_NAME: &'static str = "Genre";

    fn fields() -> &'static [FieldSpec] {
        GENRE_FIELDS
    }

    fn unique_key() -> &'static [&'static str] {
        &["name"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME).with("name", self.name.as_str())
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self::new(record.take_text("name")?))
    }
}

impl Entity for SubGenre {
    const TYPE_NAME: &'static str = "SubGenre";

    fn fields() -> &'static [FieldSpec] {
        GENRE_FIELDS
    }

    fn unique_key() -> &'static [&'static str] {
        &["name"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME).with("name", self.name.as_str())
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self::new(record.take_text("name")?))
    }
}

impl Entity for Subject {
    const TYPE_NAME: &'static str = "Subject";

    fn fields() -> &'static [FieldSpec] {
        SUBJECT_FIELDS
    }

    fn unique_key() -> &'static [&'static str] {
        &["name"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("name", self.name.as_str())
            .with("synonyms", self.synonyms.clone())
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self::new(
            record.take_text("name")?,
            record.take_text_list("synonyms")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::Subject;

    #[test]
    fn subject_matches_name_and_synonyms() {
        let subject = Subject::new("Philosophy", vec!["ethics".into(), "logic".into()]);
        assert!(subject.matches("philosophy"));
        assert!(subject.matches(" Logic "));
        assert!(!subject.matches("physics"));
        assert!(!subject.matches(""));
        assert_eq!(subject.to_string(), "Philosophy (ethics, logic)");
    }
}
