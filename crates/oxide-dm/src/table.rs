//! Schema-qualified table references.

/// A table name, optionally qualified by its schema (`SCHEMA.TABLE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef<'a> {
    /// The schema, when the name was qualified.
    pub schema: Option<&'a str>,
    /// The table name.
    pub table: &'a str,
}

impl<'a> TableRef<'a> {
    /// Splits a table name on its first `.`.
    ///
    /// Anything after the first dot belongs to the table, so `A.B.C` is
    /// table `B.C` in schema `A`.
    #[must_use]
    pub fn parse(name: &'a str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) => Self {
                schema: Some(schema),
                table,
            },
            None => Self {
                schema: None,
                table: name,
            },
        }
    }

    /// Returns whether the name carried its own schema.
    #[must_use]
    pub const fn is_qualified(&self) -> bool {
        self.schema.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name() {
        let table = TableRef::parse("SCHEMA.TABLE");
        assert_eq!(table.schema, Some("SCHEMA"));
        assert_eq!(table.table, "TABLE");
        assert!(table.is_qualified());
    }

    #[test]
    fn test_unqualified_name() {
        let table = TableRef::parse("TABLE");
        assert_eq!(table.schema, None);
        assert_eq!(table.table, "TABLE");
        assert!(!table.is_qualified());
    }

    #[test]
    fn test_only_first_dot_splits() {
        let table = TableRef::parse("A.B.C");
        assert_eq!(table.schema, Some("A"));
        assert_eq!(table.table, "B.C");
    }
}
