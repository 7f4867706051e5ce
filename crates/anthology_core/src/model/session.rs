//! Reading sessions and the quotes collected during them.
//!
//! # Invariants
//! - Sessions and quotes have no natural key; every save inserts a new row.
//! - `source_id` names a row in the table selected by `sourcetype`.

use crate::mapper::{Entity, FieldKind, FieldSpec, MapperResult, Record};
use chrono::{Duration, NaiveDateTime};
use std::fmt::{Display, Formatter};

const READING_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_meta("starttime", FieldKind::DateTime, "Start Time", "Session start date and time"),
    FieldSpec::with_meta("endtime", FieldKind::DateTime, "End Time", "Session end date and time"),
    FieldSpec::with_meta("startpage", FieldKind::Integer, "Start Page", "First page read"),
    FieldSpec::with_meta("endpage", FieldKind::Integer, "End Page", "Last page read"),
    FieldSpec::with_meta("sourcetype", FieldKind::Text, "Source Type", "Media format of the source"),
    FieldSpec::new("source_id", FieldKind::Integer),
];

const QUOTE_FIELDS: &[FieldSpec] = &[
    FieldSpec::with_meta("excerpt", FieldKind::Text, "Excerpt", "Text copied from the source"),
    FieldSpec::with_meta("pagenum", FieldKind::Integer, "Page", "Page where the excerpt begins"),
    FieldSpec::with_meta("response", FieldKind::Text, "Response", "Personal reflection"),
    FieldSpec::with_meta("sourcetype", FieldKind::Text, "Source Type", "Media format of the source"),
    FieldSpec::new("source_id", FieldKind::Integer),
    FieldSpec::with_meta("categories", FieldKind::List, "Categories", "Subjects the quote applies to"),
];

/// One occasion of reading a range of pages from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub id: i64,
    pub starttime: NaiveDateTime,
    pub endtime: NaiveDateTime,
    pub startpage: i64,
    pub endpage: i64,
    pub sourcetype: String,
    pub source_id: i64,
}

impl Reading {
    pub fn new(
        starttime: NaiveDateTime,
        endtime: NaiveDateTime,
        sourcetype: impl Into<String>,
        source_id: i64,
    ) -> Self {
        Self {
            id: 0,
            starttime,
            endtime,
            startpage: 0,
            endpage: 0,
            sourcetype: sourcetype.into(),
            source_id,
        }
    }

    pub fn duration(&self) -> Duration {
        self.endtime - self.starttime
    }

    /// Pages covered, counting both the start and end page.
    pub fn num_pages_read(&self) -> i64 {
        if self.endpage < self.startpage {
            0
        } else {
            self.endpage.saturating_sub(self.startpage).saturating_add(1)
        }
    }
}

impl Display for Reading {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}#{} pp. {}-{} ({} min)",
            self.starttime.format("%Y-%m-%d %H:%M"),
            self.sourcetype,
            self.source_id,
            self.startpage,
            self.endpage,
            self.duration().num_minutes()
        )
    }
}

impl Entity for Reading {
    const TYPE_NAME: &'static str = "Reading";

    fn fields() -> &'static [FieldSpec] {
        READING_FIELDS
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("starttime", self.starttime)
            .with("endtime", self.endtime)
            .with("startpage", self.startpage)
            .with("endpage", self.endpage)
            .with("sourcetype", self.sourcetype.as_str())
            .with("source_id", self.source_id)
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self {
            id: 0,
            starttime: record.take_datetime("starttime")?,
            endtime: record.take_datetime("endtime")?,
            startpage: record.take_int("startpage")?,
            endpage: record.take_int("endpage")?,
            sourcetype: record.take_text("sourcetype")?,
            source_id: record.take_int("source_id")?,
        })
    }
}

/// Direct excerpt copied from a source, with a personal response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Quote {
    pub id: i64,
    pub excerpt: String,
    pub pagenum: i64,
    pub response: String,
    pub sourcetype: String,
    pub source_id: i64,
    pub categories: Vec<String>,
}

impl Display for Quote {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" (p. {})", self.excerpt, self.pagenum)
    }
}

impl Entity for Quote {
    const TYPE_NAME: &'static str = "Quote";

    fn fields() -> &'static [FieldSpec] {
        QUOTE_FIELDS
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn to_record(&self) -> Record {
        Record::new(Self::TYPE_NAME)
            .with("excerpt", self.excerpt.as_str())
            .with("pagenum", self.pagenum)
            .with("response", self.response.as_str())
            .with("sourcetype", self.sourcetype.as_str())
            .with("source_id", self.source_id)
            .with("categories", self.categories.clone())
    }

    fn from_record(record: &mut Record) -> MapperResult<Self> {
        Ok(Self {
            id: 0,
            excerpt: record.take_text("excerpt")?,
            pagenum: record.take_int("pagenum")?,
            response: record.take_text("response")?,
            sourcetype: record.take_text("sourcetype")?,
            source_id: record.take_int("source_id")?,
            categories: record.take_text_list("categories")?,
        })
    }
}
