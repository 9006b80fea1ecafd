//! DM dialect.

use std::fmt::Display;

use super::Dialect;
use crate::catalog::Catalog;
use crate::error::Result;
use crate::executor::{BoxFuture, SqlExecutor};
use crate::field::FieldDescriptor;
use crate::naming::build_key_name;
use crate::pagination::limit_and_offset_sql;
use crate::typemap::resolve_column_type;

/// Name under which the DM dialect registers.
pub const DM_DIALECT_NAME: &str = "dm";

/// DM dialect over an executor.
///
/// Best used against databases created with `CASE_SENSITIVE=N`, since the
/// ORM does not quote identifiers consistently.
#[derive(Debug, Clone)]
pub struct DmDialect<E> {
    db: E,
}

impl<E: SqlExecutor> DmDialect<E> {
    /// Creates a DM dialect.
    #[must_use]
    pub const fn new(db: E) -> Self {
        Self { db }
    }

    /// Returns the executor.
    #[must_use]
    pub const fn db(&self) -> &E {
        &self.db
    }

    /// Returns catalog queries over this dialect's executor.
    #[must_use]
    pub const fn catalog(&self) -> Catalog<'_, E> {
        Catalog::new(&self.db)
    }
}

impl<E: SqlExecutor> Dialect for DmDialect<E> {
    fn name(&self) -> &'static str {
        DM_DIALECT_NAME
    }

    fn bind_var(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn quote(&self, key: &str) -> String {
        format!("\"{key}\"")
    }

    fn data_type_of(&self, field: &mut FieldDescriptor) -> Result<String> {
        let column = resolve_column_type(field)?;
        field.apply_column_type(&column);
        Ok(column.sql_type)
    }

    fn has_index<'a>(&'a self, table: &'a str, index: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.catalog().has_index(table, index).await })
    }

    fn remove_index<'a>(&'a self, table: &'a str, index: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.catalog().remove_index(table, index).await })
    }

    fn has_foreign_key<'a>(&'a self, table: &'a str, foreign_key: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.catalog().has_foreign_key(table, foreign_key).await })
    }

    fn has_table<'a>(&'a self, table: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.catalog().has_table(table).await })
    }

    fn has_column<'a>(&'a self, table: &'a str, column: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(async move { self.catalog().has_column(table, column).await })
    }

    fn modify_column<'a>(
        &'a self,
        table: &'a str,
        column: &'a str,
        sql_type: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move { self.catalog().modify_column(table, column, sql_type).await })
    }

    fn current_database(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { self.catalog().current_database().await })
    }

    fn limit_and_offset_sql(
        &self,
        limit: Option<&dyn Display>,
        offset: Option<&dyn Display>,
    ) -> Result<String> {
        limit_and_offset_sql(limit, offset)
    }

    fn select_from_dummy_table(&self) -> &'static str {
        "FROM DUAL"
    }

    fn last_insert_id_output_interstitial(&self, _table: &str, _column: &str, _columns: &[String]) -> String {
        String::new()
    }

    fn last_insert_id_returning_suffix(&self, _table: &str, _column: &str) -> String {
        String::new()
    }

    fn default_value_str(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    fn build_key_name(&self, kind: &str, table: &str, fields: &[&str]) -> String {
        build_key_name(kind, table, fields)
    }

    fn normalize_index_and_column(&self, index: &str, column: &str) -> (String, String) {
        (index.to_string(), column.to_string())
    }
}
