//! Field metadata handed to the dialect by the host framework.
//!
//! A [`FieldDescriptor`] is the dialect's view of one model field: its kind,
//! its size, the tag settings written on it, and whether the caller supplied
//! a value for the current insert.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DialectError;
use crate::typemap::ColumnType;

/// Tag key requesting (or refusing) an identity column.
pub const TAG_AUTO_INCREMENT: &str = "AUTO_INCREMENT";
/// Tag key carrying the column size.
pub const TAG_SIZE: &str = "SIZE";
/// Tag key overriding the column type.
pub const TAG_TYPE: &str = "TYPE";
/// Tag key marking the primary key.
pub const TAG_PRIMARY_KEY: &str = "PRIMARY_KEY";
/// Tag key for a NOT NULL column.
pub const TAG_NOT_NULL: &str = "NOT NULL";
/// Tag key for a UNIQUE column.
pub const TAG_UNIQUE: &str = "UNIQUE";
/// Tag key carrying a DEFAULT expression.
pub const TAG_DEFAULT: &str = "DEFAULT";

/// Engine-native types that map to a fixed column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DmType {
    /// `TIMESTAMP`
    Timestamp,
    /// `DECIMAL`
    Decimal,
    /// `BLOB`
    Blob,
    /// `CLOB`
    Clob,
    /// `INTERVAL YEAR TO MONTH`
    IntervalYearToMonth,
    /// `INTERVAL DAY TO SECOND`
    IntervalDayToSecond,
}

impl DmType {
    /// Returns the column type for this engine type.
    #[must_use]
    pub const fn sql_type(self) -> &'static str {
        match self {
            Self::Timestamp => "TIMESTAMP",
            Self::Decimal => "DECIMAL",
            Self::Blob => "BLOB",
            Self::Clob => "CLOB",
            Self::IntervalYearToMonth => "INTERVAL YEAR TO MONTH",
            Self::IntervalDayToSecond => "INTERVAL DAY TO SECOND",
        }
    }
}

/// The primitive kind of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    String,
    Bytes,
    Time,
    /// An engine-native type.
    Dm(DmType),
    /// A host type the dialect has no mapping for.
    ///
    /// Such a field only resolves when it carries an explicit `TYPE` tag.
    Other(String),
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint => "uint",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Uintptr => "uintptr",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Time => "time",
            Self::Dm(DmType::Timestamp) => "dm_timestamp",
            Self::Dm(DmType::Decimal) => "dm_decimal",
            Self::Dm(DmType::Blob) => "dm_blob",
            Self::Dm(DmType::Clob) => "dm_clob",
            Self::Dm(DmType::IntervalYearToMonth) => "dm_interval_ym",
            Self::Dm(DmType::IntervalDayToSecond) => "dm_interval_dt",
            Self::Other(name) => name,
        };
        f.write_str(name)
    }
}

impl FromStr for ColumnKind {
    type Err = DialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Self::Bool,
            "int" => Self::Int,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "uint" => Self::Uint,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "uintptr" => Self::Uintptr,
            "float32" => Self::Float32,
            "float64" | "float" => Self::Float64,
            "string" => Self::String,
            "bytes" => Self::Bytes,
            "time" => Self::Time,
            "dm_timestamp" => Self::Dm(DmType::Timestamp),
            "dm_decimal" => Self::Dm(DmType::Decimal),
            "dm_blob" => Self::Dm(DmType::Blob),
            "dm_clob" => Self::Dm(DmType::Clob),
            "dm_interval_ym" => Self::Dm(DmType::IntervalYearToMonth),
            "dm_interval_dt" => Self::Dm(DmType::IntervalDayToSecond),
            other => return Err(DialectError::UnknownKind(other.to_string())),
        };
        Ok(kind)
    }
}

/// Tag settings written on a field, keyed by upper-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSettings(BTreeMap<String, String>);

impl TagSettings {
    /// Creates an empty tag map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the host tag syntax `KEY[:VALUE];KEY[:VALUE]...`.
    ///
    /// Keys are trimmed and upper-cased. A bare key maps to itself, so
    /// `NOT NULL` becomes `NOT NULL => NOT NULL`. Values may contain `:`.
    #[must_use]
    pub fn parse(tag: &str) -> Self {
        let mut settings = Self::new();
        for part in tag.split(';') {
            let mut pieces = part.splitn(2, ':');
            let key = pieces.next().unwrap_or_default().trim().to_uppercase();
            if key.is_empty() {
                continue;
            }
            let value = match pieces.next() {
                Some(value) => value.to_string(),
                None => key.clone(),
            };
            settings.0.insert(key, value);
        }
        settings
    }

    /// Returns the value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns whether a key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Sets a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns whether no tags are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The dialect's view of one model field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Primitive kind.
    pub kind: ColumnKind,
    /// Size constraint, if any.
    #[serde(default)]
    pub size: Option<u32>,
    /// Tag settings.
    #[serde(default)]
    pub tags: TagSettings,
    /// Whether the field belongs to the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the caller left the value blank for the current insert.
    #[serde(default = "default_blank")]
    pub is_blank: bool,
}

const fn default_blank() -> bool {
    true
}

impl FieldDescriptor {
    /// Creates a field with no size, no tags and a blank value.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            size: None,
            tags: TagSettings::new(),
            primary_key: false,
            is_blank: true,
        }
    }

    /// Creates a field from a host tag string.
    ///
    /// `SIZE` and `PRIMARY_KEY` tags populate the matching descriptor fields.
    #[must_use]
    pub fn from_tag(name: impl Into<String>, kind: ColumnKind, tag: &str) -> Self {
        let tags = TagSettings::parse(tag);
        let size = tags.get(TAG_SIZE).and_then(|s| s.trim().parse().ok());
        let primary_key = tags.contains(TAG_PRIMARY_KEY);
        Self {
            name: name.into(),
            kind,
            size,
            tags,
            primary_key,
            is_blank: true,
        }
    }

    /// Sets the size.
    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Marks the field as primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.set(key, value);
        self
    }

    /// Marks the field as carrying an explicit value for the current insert.
    #[must_use]
    pub fn with_value(mut self) -> Self {
        self.is_blank = false;
        self
    }

    /// Returns the effective size: the descriptor size, else the `SIZE` tag.
    #[must_use]
    pub fn effective_size(&self) -> Option<u32> {
        self.size
            .or_else(|| self.tags.get(TAG_SIZE).and_then(|s| s.trim().parse().ok()))
    }

    /// Returns whether the field is tagged auto-increment.
    ///
    /// An `AUTO_INCREMENT:false` tag counts as not tagged.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.tags
            .get(TAG_AUTO_INCREMENT)
            .is_some_and(|v| !v.eq_ignore_ascii_case("false"))
    }

    /// Returns whether the field may become an identity column.
    ///
    /// An explicit `AUTO_INCREMENT` tag decides; otherwise primary keys are
    /// eligible.
    #[must_use]
    pub fn can_auto_increment(&self) -> bool {
        match self.tags.get(TAG_AUTO_INCREMENT) {
            Some(value) => !value.eq_ignore_ascii_case("false"),
            None => self.primary_key,
        }
    }

    /// Records an inferred identity column as an `AUTO_INCREMENT` tag.
    pub fn apply_column_type(&mut self, column: &ColumnType) {
        if column.infer_auto_increment {
            self.tags.set(TAG_AUTO_INCREMENT, TAG_AUTO_INCREMENT);
        }
    }

    /// Returns the modifiers appended after the column type.
    #[must_use]
    pub fn additional_type(&self) -> String {
        let mut parts = Vec::new();
        if let Some(not_null) = self.tags.get(TAG_NOT_NULL) {
            parts.push(not_null.to_string());
        }
        if let Some(unique) = self.tags.get(TAG_UNIQUE) {
            parts.push(unique.to_string());
        }
        if let Some(default) = self.tags.get(TAG_DEFAULT) {
            parts.push(format!("DEFAULT {default}"));
        }
        parts.join(" ").trim().to_string()
    }
}
