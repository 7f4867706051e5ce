//! Creators of media: people who write, edit or record a work.
//!
//! # Invariants
//! - An author is unique by (firstname, midname, lastname).

use crate::mapper::{Entity, FieldKind, FieldSpec, MapperResult, Record};
use std::fmt::{Display, Formatter};

const AUTHOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_meta("firstname", FieldKind::Text, "First Name", "Given name"),
    FieldSpec::with_meta("midname", FieldKind::Text, "Middle Name", "Middle name or initial"),
    FieldSpec::with_meta("lastname", FieldKind::Text, "Last Name", "Family name"),
    FieldSpec::with_meta("gender", FieldKind::Text, "Gender", "Gender identity"),
    FieldSpec::with_meta("country", FieldKind::Text, "Country", "Country of association"),
];

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Author {
    pub id: i64,
    pub firstname: String,
    pub midname: String,
    pub lastname: String,
    pub gender: String,
    pub country: String,
}

impl Author {
    pub fn new(firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        Self {
            firstname: firstname.into(),
            lastname: lastname.into(),
            ..Self::default()
        }
    }

    /// "First Middle Last", skipping an empty middle name.
    pub fn first_last(&self) -> String {
        [
            self.firstname.as_str(),
            self.midname.as_str(),
            self.lastname.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// "Last, First Middle".
    pub fn last_first(&self) -> String {
        let given = [self.firstname.as_str(), self.midname.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if given.is_empty() {
            self.lastname.clone()
        } else {
            format!("{}, {given}", self.lastname)
        }
    }
}

impl Display for Author {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.last_first())
    }
}

impl Entity for Author {
    const TYPE_NAME: &'static str = "Author";

    fn fields() -> &'static [FieldSpec] {
        AUTHOR_FIELDS
    }

    fn unique_key() -> &'static [&'static str] {
        &["firstname", "midname", "lastname"]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("firstname", self.firstname.as_str())
            .with("midname", self.midname.as_str())
            .with("lastname", self.lastname.as_str())
            .with("gender", self.gender.as_str())
            .with("country", self.country.as_str())
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self {
            id: 0,
            firstname: record.take_text("firstname")?,
            midname: record.take_text("midname")?,
            lastname: record.take_text("lastname")?,
            gender: record.take_text("gender")?,
            country: record.take_text("country")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Author;

    #[test]
    fn name_renderings_skip_empty_middle_name() {
        let mut author = Author::new("Terry", "Cotta");
        assert_eq!(author.first_last(), "Terry Cotta");
        assert_eq!(author.to_string(), "Cotta, Terry");

        author.midname = "J".to_string();
        assert_eq!(author.first_last(), "Terry J Cotta");
        assert_eq!(author.last_first(), "Cotta, Terry J");
    }
}
