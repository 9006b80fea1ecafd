//! Column type mapping for DM.
//!
//! Maps a [`FieldDescriptor`] to the column type used in `CREATE TABLE` and
//! `ALTER TABLE` statements. Integer primary keys become identity columns
//! unless the field opts out with `AUTO_INCREMENT:false`.

use crate::error::{DialectError, Result};
use crate::field::{ColumnKind, FieldDescriptor, TAG_TYPE};

/// Sizes from this value up are stored as large objects.
pub const MAX_INLINE_SIZE: u32 = 32768;

/// A resolved column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// The full type text, including modifiers.
    pub sql_type: String,
    /// Whether the field was turned into an identity column and should be
    /// tagged `AUTO_INCREMENT` by the caller.
    pub infer_auto_increment: bool,
}

impl ColumnType {
    fn new(base: impl Into<String>, infer_auto_increment: bool) -> Self {
        Self {
            sql_type: base.into(),
            infer_auto_increment,
        }
    }
}

/// Resolves the column type of a field.
///
/// # Errors
///
/// Returns [`DialectError::UnmappableKind`] for an [`ColumnKind::Other`]
/// field without an explicit `TYPE` tag.
pub fn resolve_column_type(field: &FieldDescriptor) -> Result<ColumnType> {
    let mut resolved = match field.tags.get(TAG_TYPE).map(str::trim) {
        Some(explicit) if !explicit.is_empty() => ColumnType::new(explicit, false),
        _ => base_type(field)?,
    };

    let additional = field.additional_type();
    if !additional.is_empty() {
        resolved.sql_type = format!("{} {}", resolved.sql_type, additional);
    }
    Ok(resolved)
}

fn base_type(field: &FieldDescriptor) -> Result<ColumnType> {
    let size = field.effective_size().filter(|s| *s > 0 && *s < MAX_INLINE_SIZE);

    let column = match &field.kind {
        ColumnKind::Dm(dm) => ColumnType::new(dm.sql_type(), false),
        ColumnKind::Bool => ColumnType::new("BIT", false),
        ColumnKind::Int
        | ColumnKind::Int8
        | ColumnKind::Int16
        | ColumnKind::Int32
        | ColumnKind::Uint
        | ColumnKind::Uint8
        | ColumnKind::Uint16
        | ColumnKind::Uintptr => integer("INT", field),
        ColumnKind::Int64 | ColumnKind::Uint32 | ColumnKind::Uint64 => integer("BIGINT", field),
        ColumnKind::Float32 | ColumnKind::Float64 => ColumnType::new("DOUBLE", false),
        ColumnKind::String => match size {
            Some(n) => ColumnType::new(format!("VARCHAR({n})"), false),
            None => ColumnType::new("CLOB", false),
        },
        ColumnKind::Time => ColumnType::new("TIMESTAMP WITH TIME ZONE", false),
        ColumnKind::Bytes => match size {
            Some(n) => ColumnType::new(format!("VARBINARY({n})"), false),
            None => ColumnType::new("BLOB", false),
        },
        ColumnKind::Other(kind) => {
            return Err(DialectError::UnmappableKind {
                field: field.name.clone(),
                kind: kind.clone(),
            });
        }
    };
    Ok(column)
}

fn integer(base: &str, field: &FieldDescriptor) -> ColumnType {
    if field.can_auto_increment() {
        ColumnType::new(format!("{base} IDENTITY(1,1)"), true)
    } else {
        ColumnType::new(base, false)
    }
}

/// Resolves every field, failing on the first one that cannot be mapped.
///
/// Hosts call this when a model is registered so that a bad field definition
/// is reported before any statement is built.
///
/// # Errors
///
/// Returns the first resolution error.
pub fn validate_fields(fields: &[FieldDescriptor]) -> Result<Vec<ColumnType>> {
    fields.iter().map(resolve_column_type).collect()
}
