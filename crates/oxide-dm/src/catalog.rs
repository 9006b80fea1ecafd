//! Catalog introspection and schema DDL.
//!
//! Existence checks run fixed queries against the `SYS` catalog views and
//! treat a non-zero count as "exists". Unqualified table names are resolved
//! against the session's current schema first.
//!
//! The `has_*` methods answer `false` when the catalog query fails, exactly
//! as they do for a missing object, and log the failure. Callers that need to
//! tell the two apart use the `try_has_*` variants.

use tracing::{debug, warn};

use crate::error::{DialectError, Result};
use crate::executor::SqlExecutor;
use crate::table::TableRef;

/// Returns the schema of the current session.
pub const CURRENT_SCHEMA_SQL: &str = "SELECT SYS_CONTEXT('USERENV', 'CURRENT_SCHEMA');";

/// Counts indexes with the given name keyed on columns of the table.
///
/// Binds: schema, table, index.
pub const HAS_INDEX_SQL: &str = r"SELECT /*+ MAX_OPT_N_TABLES(5) */ COUNT(DISTINCT OBJ_INDS.NAME) FROM
(SELECT ID FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCH' AND NAME = ?) USERS,
(SELECT ID, SCHID FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCHOBJ' AND SUBTYPE$ = 'UTAB' AND NAME = ?) TAB,
(SELECT ID, PID, NAME FROM SYS.SYSOBJECTS WHERE SUBTYPE$='INDEX' AND NAME = ?) OBJ_INDS,
SYS.SYSINDEXES AS INDS, SYS.SYSCOLUMNS AS COLS
WHERE TAB.ID =COLS.ID AND TAB.ID =OBJ_INDS.PID AND INDS.ID=OBJ_INDS.ID AND TAB.SCHID= USERS.ID
AND SF_COL_IS_IDX_KEY(INDS.KEYNUM, INDS.KEYINFO, COLS.COLID)=1;";

/// Counts the referencing columns of a named foreign key.
///
/// Binds: constraint, schema, table.
pub const HAS_FOREIGN_KEY_SQL: &str = r"SELECT /*+ MAX_OPT_N_TABLES(5) */ COUNT(T_REF.REF_CONS_NAME) FROM 
(SELECT T_REF_TAB.NAME AS NAME, T_REF_TAB.SCHNAME AS SCHNAME, T_REF_CONS.FINDEXID AS REFED_ID, 
T_REF_CONS.NAME AS REF_CONS_NAME, SF_GET_INDEX_KEY_SEQ(T_REF_IND.KEYNUM, T_REF_IND.KEYINFO, T_REF_COL.COLID) AS REF_KEYNO,
T_REF_COL.NAME AS REF_COL_NAME, T_REF_CONS.FACTION AS FACTION FROM (SELECT NAME, INDEXID, FINDEXID, TABLEID, FACTION,
CONS.TYPE$ as TYPE FROM SYS.SYSCONS CONS, SYS.SYSOBJECTS OBJECTS WHERE NAME = ? AND CONS.ID = OBJECTS.ID) AS T_REF_CONS,
(SELECT TABS.NAME AS NAME, TABS.ID, SCHEMAS.NAME AS SCHNAME FROM(SELECT ID, PID, NAME FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCH' AND NAME = ?) SCHEMAS,
(SELECT ID, SCHID, NAME FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCHOBJ' AND SUBTYPE$ = 'UTAB' AND NAME = ?) TABS 
WHERE SCHEMAS.ID == TABS.SCHID)T_REF_TAB,SYS.SYSINDEXES AS T_REF_IND, (SELECT ID, PID FROM SYS.SYSOBJECTS WHERE SUBTYPE$='INDEX') AS T_REF_INDS_OBJ, 
SYS.SYSCOLUMNS AS T_REF_COL WHERE T_REF_TAB.ID = T_REF_CONS.TABLEID AND T_REF_CONS.TYPE='F' AND T_REF_TAB.ID = T_REF_INDS_OBJ.PID AND 
T_REF_TAB.ID = T_REF_COL.ID AND T_REF_CONS.INDEXID = T_REF_INDS_OBJ.ID AND T_REF_IND.ID = T_REF_INDS_OBJ.ID AND 
SF_COL_IS_IDX_KEY(T_REF_IND.KEYNUM, T_REF_IND.KEYINFO, T_REF_COL.COLID)=1) AS T_REF, 
(SELECT T_REFED_CONS.INDEXID AS REFED_ID, T_REFED_TAB.SCH_NAME AS SCHNAME, T_REFED_TAB.TAB_NAME AS NAME, T_REFED_IND.ID AS REFED_IND_ID,
T_REFED_CONS.NAME AS REFED_CONS_NAME, SF_GET_INDEX_KEY_SEQ(T_REFED_IND.KEYNUM, T_REFED_IND.KEYINFO, T_REFED_COL.COLID) AS REFED_KEYNO,
T_REFED_COL.NAME AS REFED_COL_NAME FROM (SELECT NAME, INDEXID, FINDEXID, TABLEID, FACTION, CONS.TYPE$ as TYPE FROM 
SYS.SYSCONS CONS, SYS.SYSOBJECTS OBJECTS WHERE CONS.ID = OBJECTS.ID) AS T_REFED_CONS, (SELECT TAB.ID AS ID, TAB.NAME AS TAB_NAME,
SCH.NAME AS SCH_NAME FROM SYS.SYSOBJECTS TAB, SYS.SYSOBJECTS SCH WHERE TAB.SUBTYPE$='UTAB' AND SCH.TYPE$='SCH' AND TAB.SCHID=SCH.ID) AS T_REFED_TAB,
SYS.SYSINDEXES AS T_REFED_IND, (SELECT ID, PID, NAME FROM SYS.SYSOBJECTS WHERE SUBTYPE$='INDEX') AS T_REFED_INDS_OBJ, SYS.SYSCOLUMNS AS T_REFED_COL
WHERE T_REFED_TAB.ID = T_REFED_CONS.TABLEID AND T_REFED_CONS.TYPE='P' AND T_REFED_TAB.ID = T_REFED_INDS_OBJ.PID AND 
T_REFED_TAB.ID = T_REFED_COL.ID AND T_REFED_CONS.INDEXID = T_REFED_INDS_OBJ.ID AND T_REFED_IND.ID = T_REFED_INDS_OBJ.ID AND
SF_COL_IS_IDX_KEY(T_REFED_IND.KEYNUM, T_REFED_IND.KEYINFO, T_REFED_COL.COLID)=1) AS T_REFED WHERE 
T_REF.REFED_ID = T_REFED.REFED_ID AND T_REF.REF_KEYNO = T_REFED.REFED_KEYNO;";

/// Counts visible tables, views and synonyms with the given name.
///
/// Binds: schema, table.
pub const HAS_TABLE_SQL: &str = r"SELECT /*+ MAX_OPT_N_TABLES(5) */ COUNT(TABS.NAME) FROM
(SELECT ID, PID FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCH' AND NAME = ?) SCHEMAS,
(SELECT ID, SCHID, NAME FROM SYS.SYSOBJECTS WHERE
NAME = ? AND TYPE$ = 'SCHOBJ' AND SUBTYPE$ IN ('UTAB', 'STAB', 'VIEW', 'SYNOM')
AND ((SUBTYPE$ ='UTAB' AND CAST((INFO3 & 0x00FF & 0x003F) AS INT) not in (9, 27, 29, 25, 12, 7, 21, 23, 18, 5))
OR SUBTYPE$ in ('STAB', 'VIEW', 'SYNOM'))) TABS
WHERE TABS.SCHID = SCHEMAS.ID AND SF_CHECK_PRIV_OPT(UID(), CURRENT_USERTYPE(), TABS.ID, SCHEMAS.PID, -1, TABS.ID) = 1;";

/// Counts columns with the given name on a table or view.
///
/// Binds: schema, table, column.
pub const HAS_COLUMN_SQL: &str = r"SELECT /*+ MAX_OPT_N_TABLES(5) */ COUNT(DISTINCT COLS.NAME) FROM
(SELECT ID FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCH' AND NAME = ?) SCHS,
(SELECT ID, SCHID FROM SYS.SYSOBJECTS WHERE TYPE$ = 'SCHOBJ' AND SUBTYPE$ IN ('UTAB', 'STAB', 'VIEW') AND NAME = ?) TABS,
(SELECT NAME, ID FROM SYS.SYSCOLUMNS WHERE NAME = ?) COLS
WHERE TABS.ID = COLS.ID AND SCHS.ID = TABS.SCHID;";

/// Catalog queries over a borrowed executor.
pub struct Catalog<'a, E: SqlExecutor + ?Sized> {
    db: &'a E,
}

impl<'a, E: SqlExecutor + ?Sized> Catalog<'a, E> {
    /// Creates a catalog over the given executor.
    #[must_use]
    pub const fn new(db: &'a E) -> Self {
        Self { db }
    }

    /// Returns the name of the current schema.
    ///
    /// # Errors
    ///
    /// Returns [`DialectError::UnknownSchema`] if the session reports no
    /// schema, or the executor's error if the query fails.
    pub async fn current_database(&self) -> Result<String> {
        match self.db.query_string(CURRENT_SCHEMA_SQL).await? {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(DialectError::UnknownSchema),
        }
    }

    /// Splits a table name into schema and table, filling in the current
    /// schema when the name is unqualified.
    ///
    /// # Errors
    ///
    /// Returns an error if the current schema is needed and cannot be read.
    pub async fn schema_and_table<'n>(&self, name: &'n str) -> Result<(String, &'n str)> {
        let table = TableRef::parse(name);
        let schema = match table.schema {
            Some(schema) => schema.to_string(),
            None => self.current_database().await?,
        };
        Ok((schema, table.table))
    }

    async fn exists(&self, sql: &str, args: &[&str]) -> Result<bool> {
        let count = self.db.query_count(sql, args).await?;
        Ok(count > 0)
    }

    /// Checks whether a table, view or synonym exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lookup or the catalog query fails.
    pub async fn try_has_table(&self, table: &str) -> Result<bool> {
        let (schema, table) = self.schema_and_table(table).await?;
        self.exists(HAS_TABLE_SQL, &[schema.as_str(), table]).await
    }

    /// Checks whether a column exists on a table or view.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lookup or the catalog query fails.
    pub async fn try_has_column(&self, table: &str, column: &str) -> Result<bool> {
        let (schema, table) = self.schema_and_table(table).await?;
        self.exists(HAS_COLUMN_SQL, &[schema.as_str(), table, column]).await
    }

    /// Checks whether an index exists on a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lookup or the catalog query fails.
    pub async fn try_has_index(&self, table: &str, index: &str) -> Result<bool> {
        let (schema, table) = self.schema_and_table(table).await?;
        self.exists(HAS_INDEX_SQL, &[schema.as_str(), table, index]).await
    }

    /// Checks whether a foreign key exists on a table.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lookup or the catalog query fails.
    pub async fn try_has_foreign_key(&self, table: &str, foreign_key: &str) -> Result<bool> {
        let (schema, table) = self.schema_and_table(table).await?;
        self.exists(HAS_FOREIGN_KEY_SQL, &[foreign_key, schema.as_str(), table])
            .await
    }

    /// Like [`Self::try_has_table`], with failures reported as `false`.
    pub async fn has_table(&self, table: &str) -> bool {
        or_absent("table", table, self.try_has_table(table).await)
    }

    /// Like [`Self::try_has_column`], with failures reported as `false`.
    pub async fn has_column(&self, table: &str, column: &str) -> bool {
        or_absent("column", column, self.try_has_column(table, column).await)
    }

    /// Like [`Self::try_has_index`], with failures reported as `false`.
    pub async fn has_index(&self, table: &str, index: &str) -> bool {
        or_absent("index", index, self.try_has_index(table, index).await)
    }

    /// Like [`Self::try_has_foreign_key`], with failures reported as `false`.
    pub async fn has_foreign_key(&self, table: &str, foreign_key: &str) -> bool {
        or_absent(
            "foreign key",
            foreign_key,
            self.try_has_foreign_key(table, foreign_key).await,
        )
    }

    /// Drops an index in the schema of `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema lookup or the `DROP INDEX` fails.
    pub async fn remove_index(&self, table: &str, index: &str) -> Result<()> {
        let (schema, _) = self.schema_and_table(table).await?;
        let sql = format!(r#"DROP INDEX "{schema}"."{index}";"#);
        debug!(sql = %sql, "Removing index");
        self.db.execute(&sql).await?;
        Ok(())
    }

    /// Changes the type of a column.
    ///
    /// `table` and `column` are used as given; the host passes them already
    /// quoted.
    ///
    /// # Errors
    ///
    /// Returns the executor's error if the `ALTER TABLE` fails.
    pub async fn modify_column(&self, table: &str, column: &str, sql_type: &str) -> Result<()> {
        let sql = format!("ALTER TABLE {table} MODIFY {column} {sql_type}");
        debug!(sql = %sql, "Modifying column");
        self.db.execute(&sql).await?;
        Ok(())
    }
}

fn or_absent(object: &str, name: &str, result: Result<bool>) -> bool {
    result.unwrap_or_else(|err| {
        warn!(object, name, error = %err, "Catalog lookup failed, reporting as absent");
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::{MockExecutor, failure};

    #[tokio::test]
    async fn test_current_database() {
        let db = MockExecutor::with_schema("SYSDBA");
        let catalog = Catalog::new(&db);
        assert_eq!(catalog.current_database().await.unwrap(), "SYSDBA");
        assert_eq!(db.statements(), vec![CURRENT_SCHEMA_SQL.to_string()]);
    }

    #[tokio::test]
    async fn test_current_database_unknown() {
        let db = MockExecutor::default();
        let catalog = Catalog::new(&db);
        assert!(matches!(
            catalog.current_database().await,
            Err(DialectError::UnknownSchema)
        ));
    }

    #[tokio::test]
    async fn test_schema_and_table() {
        let db = MockExecutor::with_schema("APP");
        let catalog = Catalog::new(&db);

        let (schema, table) = catalog.schema_and_table("SALES.ORDERS").await.unwrap();
        assert_eq!((schema.as_str(), table), ("SALES", "ORDERS"));
        assert!(db.calls().is_empty());

        let (schema, table) = catalog.schema_and_table("ORDERS").await.unwrap();
        assert_eq!((schema.as_str(), table), ("APP", "ORDERS"));
        assert_eq!(db.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_has_table_binds_schema_and_table() {
        let db = MockExecutor::with_schema("APP");
        db.push_count(Ok(1));
        let catalog = Catalog::new(&db);

        assert!(catalog.has_table("users").await);
        let calls = db.calls();
        assert_eq!(calls[1].sql, HAS_TABLE_SQL);
        assert_eq!(calls[1].args, vec!["APP", "users"]);
    }

    #[tokio::test]
    async fn test_has_column_binds_column() {
        let db = MockExecutor::with_schema("APP");
        db.push_count(Ok(1));
        let catalog = Catalog::new(&db);

        assert!(catalog.has_column("S.users", "email").await);
        let calls = db.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sql, HAS_COLUMN_SQL);
        assert_eq!(calls[0].args, vec!["S", "users", "email"]);
    }

    #[tokio::test]
    async fn test_has_index_and_foreign_key_argument_order() {
        let db = MockExecutor::with_schema("APP");
        db.push_count(Ok(2));
        db.push_count(Ok(1));
        let catalog = Catalog::new(&db);

        assert!(catalog.has_index("S.users", "idx_users_email").await);
        assert!(catalog.has_foreign_key("S.orders", "fk_orders_user").await);

        let calls = db.calls();
        assert_eq!(calls[0].sql, HAS_INDEX_SQL);
        assert_eq!(calls[0].args, vec!["S", "users", "idx_users_email"]);
        assert_eq!(calls[1].sql, HAS_FOREIGN_KEY_SQL);
        assert_eq!(calls[1].args, vec!["fk_orders_user", "S", "orders"]);
    }

    #[tokio::test]
    async fn test_zero_count_is_absent() {
        let db = MockExecutor::with_schema("APP");
        db.push_count(Ok(0));
        let catalog = Catalog::new(&db);
        assert!(!catalog.try_has_table("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_failure_is_reported_as_absent() {
        let db = MockExecutor::with_schema("APP");
        db.push_count(Err(failure("catalog unavailable")));
        db.push_count(Err(failure("catalog unavailable")));
        let catalog = Catalog::new(&db);

        assert!(!catalog.has_column("users", "email").await);
        assert!(matches!(
            catalog.try_has_column("users", "email").await,
            Err(DialectError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_schema_is_reported_as_absent() {
        let db = MockExecutor::default();
        let catalog = Catalog::new(&db);
        assert!(!catalog.has_index("users", "idx").await);
        assert!(matches!(
            catalog.try_has_index("users", "idx").await,
            Err(DialectError::UnknownSchema)
        ));
    }

    #[tokio::test]
    async fn test_remove_index() {
        let db = MockExecutor::with_schema("APP");
        let catalog = Catalog::new(&db);

        catalog.remove_index("users", "idx_users_email").await.unwrap();
        catalog.remove_index("S.users", "idx_users_name").await.unwrap();

        let statements = db.statements();
        assert_eq!(statements[1], r#"DROP INDEX "APP"."idx_users_email";"#);
        assert_eq!(statements[2], r#"DROP INDEX "S"."idx_users_name";"#);
    }

    #[tokio::test]
    async fn test_ddl_errors_are_propagated() {
        let db = MockExecutor::with_schema("APP").fail_on("DROP INDEX");
        assert!(matches!(
            Catalog::new(&db).remove_index("S.users", "idx").await,
            Err(DialectError::Database(_))
        ));

        let db = MockExecutor::default().fail_on("ALTER TABLE");
        assert!(matches!(
            Catalog::new(&db)
                .modify_column("\"users\"", "\"age\"", "BIGINT")
                .await,
            Err(DialectError::Database(_))
        ));
    }

    #[tokio::test]
    async fn test_modify_column_does_not_quote() {
        let db = MockExecutor::default();
        let catalog = Catalog::new(&db);
        catalog
            .modify_column("\"users\"", "\"age\"", "BIGINT NOT NULL")
            .await
            .unwrap();
        assert_eq!(
            db.statements(),
            vec![r#"ALTER TABLE "users" MODIFY "age" BIGINT NOT NULL"#.to_string()]
        );
    }

    #[test]
    fn test_catalog_queries_are_parameterized() {
        assert_eq!(HAS_TABLE_SQL.matches('?').count(), 2);
        assert_eq!(HAS_COLUMN_SQL.matches('?').count(), 3);
        assert_eq!(HAS_INDEX_SQL.matches('?').count(), 3);
        assert_eq!(HAS_FOREIGN_KEY_SQL.matches('?').count(), 3);
        for sql in [HAS_TABLE_SQL, HAS_COLUMN_SQL, HAS_INDEX_SQL, HAS_FOREIGN_KEY_SQL] {
            assert!(sql.starts_with("SELECT /*+ MAX_OPT_N_TABLES(5) */ COUNT("));
        }
    }
}
