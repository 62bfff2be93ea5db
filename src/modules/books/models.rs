use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BookError;
use crate::utils;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_LIMIT: usize = 10;
const DEFAULT_PAGES: i64 = 1;
const DEFAULT_YEAR: i64 = 0;
const ID_BYTES: usize = 4;

/// Body keys accepted by an update.
pub const UPDATABLE_FIELDS: &[&str] = &[
    "author",
    "country",
    "imageLink",
    "language",
    "pages",
    "title",
    "year",
];

/// Opaque book identifier: lowercase hex of random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Fresh identifier from a cryptographically secure RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for BookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BookId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A persisted book record.
///
/// `pages` and `year` are integers when written by create, but an update stores
/// whatever JSON value was submitted, so they stay untyped here. Keys this
/// struct does not know about are carried through in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub author: String,
    pub country: String,
    #[serde(rename = "imageLink")]
    pub image_link: String,
    pub language: String,
    pub link: String,
    pub pages: Value,
    pub title: String,
    pub year: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Book {
    /// Value of a filterable text field.
    pub fn field(&self, field: FilterField) -> &str {
        match field {
            FilterField::Author => &self.author,
            FilterField::Country => &self.country,
            FilterField::Title => &self.title,
            FilterField::Language => &self.language,
        }
    }

    /// Shallow merge: every field present in `patch` overwrites the stored one.
    pub fn apply(&mut self, patch: BookPatch) {
        let BookPatch {
            author,
            country,
            image_link,
            language,
            pages,
            title,
            year,
        } = patch;

        if let Some(author) = author {
            self.author = author;
        }
        if let Some(country) = country {
            self.country = country;
        }
        if let Some(image_link) = image_link {
            self.image_link = image_link;
        }
        if let Some(language) = language {
            self.language = language;
        }
        if let Some(pages) = pages {
            self.pages = pages;
        }
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(year) = year {
            self.year = year;
        }
    }
}

/// The persisted document: the book collection plus any sibling keys,
/// which are written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub books: Vec<Book>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Library {
    pub fn position(&self, id: &BookId) -> Option<usize> {
        self.books.iter().position(|book| &book.id == id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.position(id).is_some()
    }
}

/// Validated creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateBook {
    pub author: String,
    pub country: String,
    pub image_link: String,
    pub language: String,
    pub link: String,
    pub pages: i64,
    pub title: String,
    pub year: i64,
}

impl CreateBook {
    /// Check that every field is present and non-empty, then coerce the numeric
    /// ones. A present but non-numeric `pages` or `year` passes and falls back to
    /// its default.
    pub fn from_body(body: &Map<String, Value>) -> Result<Self, BookError> {
        let required = [
            "author",
            "country",
            "imageLink",
            "language",
            "link",
            "pages",
            "title",
            "year",
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|key| !body.get(**key).is_some_and(is_truthy))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(BookError::validation("Missing body info!", missing));
        }

        let text = |key: &str| -> Result<String, BookError> {
            match body.get(key) {
                Some(Value::String(value)) => Ok(value.clone()),
                _ => Err(BookError::validation(
                    format!("Field {} must be a string", key),
                    vec![key.to_string()],
                )),
            }
        };
        let number = |key: &str, default: i64| {
            body.get(key)
                .and_then(utils::coerce_int)
                .filter(|n| *n != 0)
                .unwrap_or(default)
        };

        Ok(Self {
            author: text("author")?,
            country: text("country")?,
            image_link: text("imageLink")?,
            language: text("language")?,
            link: text("link")?,
            pages: number("pages", DEFAULT_PAGES),
            title: text("title")?,
            year: number("year", DEFAULT_YEAR),
        })
    }

    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            author: self.author,
            country: self.country,
            image_link: self.image_link,
            language: self.language,
            link: self.link,
            pages: Value::from(self.pages),
            title: self.title,
            year: Value::from(self.year),
            extra: Map::new(),
        }
    }
}

/// Partial update. Text fields must be strings; `pages` and `year` are stored as
/// submitted, `null` included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub author: Option<String>,
    pub country: Option<String>,
    pub image_link: Option<String>,
    pub language: Option<String>,
    pub pages: Option<Value>,
    pub title: Option<String>,
    pub year: Option<Value>,
}

impl BookPatch {
    /// Reject the whole body if any key is outside [`UPDATABLE_FIELDS`].
    pub fn from_body(body: Map<String, Value>) -> Result<Self, BookError> {
        let mut rejected: Vec<String> = body
            .keys()
            .filter(|key| !UPDATABLE_FIELDS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !rejected.is_empty() {
            rejected.sort();
            return Err(BookError::validation("Update field not allowed", rejected));
        }

        let mut patch = Self::default();
        for (key, value) in body {
            match key.as_str() {
                "author" => patch.author = Some(patch_text(&key, value)?),
                "country" => patch.country = Some(patch_text(&key, value)?),
                "imageLink" => patch.image_link = Some(patch_text(&key, value)?),
                "language" => patch.language = Some(patch_text(&key, value)?),
                "title" => patch.title = Some(patch_text(&key, value)?),
                "pages" => patch.pages = Some(value),
                "year" => patch.year = Some(value),
                _ => {}
            }
        }
        Ok(patch)
    }
}

fn patch_text(key: &str, value: Value) -> Result<String, BookError> {
    match value {
        Value::String(text) => Ok(text),
        _ => Err(BookError::validation(
            format!("Invalid update: {} must be a string", key),
            vec![key.to_string()],
        )),
    }
}

/// Book fields a listing can be narrowed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FilterField {
    Author,
    Country,
    Title,
    Language,
}

impl FilterField {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "author" => Some(Self::Author),
            "country" => Some(Self::Country),
            "title" => Some(Self::Title),
            "language" => Some(Self::Language),
            _ => None,
        }
    }
}

/// Parsed listing query: pagination plus exact-match filters.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: usize,
    pub limit: usize,
    pub filters: Vec<(FilterField, String)>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            filters: Vec::new(),
        }
    }
}

impl ListQuery {
    /// `page` and `limit` are taken out first; every remaining key must name a
    /// filterable field.
    pub fn from_params(mut params: BTreeMap<String, String>) -> Result<Self, BookError> {
        let page = positive_or(params.remove("page"), DEFAULT_PAGE);
        let limit = positive_or(params.remove("limit"), DEFAULT_LIMIT);

        let mut filters = Vec::with_capacity(params.len());
        for (key, value) in params {
            match FilterField::from_key(&key) {
                Some(field) => filters.push((field, value)),
                None => {
                    return Err(BookError::validation(
                        format!("Query {} is not allowed", key),
                        vec![key],
                    ))
                }
            }
        }

        Ok(Self {
            page,
            limit,
            filters,
        })
    }

    pub fn offset(&self) -> usize {
        self.limit.saturating_mul(self.page.saturating_sub(1))
    }

    pub fn matches(&self, book: &Book) -> bool {
        self.filters
            .iter()
            .all(|(field, value)| book.field(*field) == value.as_str())
    }
}

fn positive_or(raw: Option<String>, default: usize) -> usize {
    raw.as_deref()
        .and_then(utils::parse_int_prefix)
        .filter(|n| *n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(default)
}

/// Truthiness of a submitted value: absent-like values are null, false, zero
/// and the empty string.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
