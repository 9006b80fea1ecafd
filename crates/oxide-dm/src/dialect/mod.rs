//! The dialect contract consumed by the ORM.
//!
//! The ORM builds queries and DDL through a [`Dialect`]; each database
//! engine supplies one implementation.

mod dm;

pub use dm::{DM_DIALECT_NAME, DmDialect};

use std::fmt::Display;

use crate::error::Result;
use crate::executor::BoxFuture;
use crate::field::FieldDescriptor;

/// Engine-specific SQL generation and schema introspection.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the bind-variable placeholder for the `index`-th parameter.
    fn bind_var(&self, index: usize) -> String;

    /// Quotes an identifier.
    fn quote(&self, key: &str) -> String;

    /// Returns the column type of a field.
    ///
    /// When the field is turned into an identity column, its tag settings
    /// gain `AUTO_INCREMENT` so the insert hooks can see it.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnmappableKind`](crate::error::DialectError::UnmappableKind)
    /// if the field kind has no column type.
    fn data_type_of(&self, field: &mut FieldDescriptor) -> Result<String>;

    /// Checks whether an index exists.
    fn has_index<'a>(&'a self, table: &'a str, index: &'a str) -> BoxFuture<'a, bool>;

    /// Drops an index.
    fn remove_index<'a>(&'a self, table: &'a str, index: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Checks whether a foreign key exists.
    fn has_foreign_key<'a>(&'a self, table: &'a str, foreign_key: &'a str) -> BoxFuture<'a, bool>;

    /// Checks whether a table exists.
    fn has_table<'a>(&'a self, table: &'a str) -> BoxFuture<'a, bool>;

    /// Checks whether a column exists.
    fn has_column<'a>(&'a self, table: &'a str, column: &'a str) -> BoxFuture<'a, bool>;

    /// Changes the type of a column. Identifiers arrive already quoted.
    fn modify_column<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
        sql_type: &'a str,
    ) -> BoxFuture<'a, Result<()>>;

    /// Returns the current schema.
    fn current_database(&self) -> BoxFuture<'_, Result<String>>;

    /// Returns the `LIMIT`/`OFFSET` suffix for a query.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is not an integer.
    fn limit_and_offset_sql(
        &self,
        limit: Option<&dyn Display>,
        offset: Option<&dyn Display>,
    ) -> Result<String>;

    /// Returns the FROM clause used when selecting without a table.
    fn select_from_dummy_table(&self) -> &'static str;

    /// Returns the clause placed between the column list and VALUES to
    /// output the inserted id.
    fn last_insert_id_output_interstitial(&self, table: &str, column: &str, columns: &[String]) -> String;

    /// Returns the suffix appended to an INSERT to return the inserted id.
    fn last_insert_id_returning_suffix(&self, table: &str, column: &str) -> String;

    /// Returns the clause for an INSERT without columns.
    fn default_value_str(&self) -> &'static str;

    /// Builds an index or constraint name.
    fn build_key_name(&self, kind: &str, table: &str, fields: &[&str]) -> String;

    /// Normalizes index and column names read back from the catalog.
    fn normalize_index_and_column(&self, index: &str, column: &str) -> (String, String);
}
