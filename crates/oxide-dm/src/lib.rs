//! DM database dialect for the oxide ORM.
//!
//! `oxide-dm` lets the ORM run against a DM database by translating its
//! field metadata and query intents into DM SQL:
//!
//! - **Type mapping** - field kinds to column types, with integer primary
//!   keys turned into `IDENTITY(1,1)` columns
//! - **Catalog introspection** - table, column, index and foreign key checks
//!   against the `SYS` catalog views
//! - **Key naming** - index and constraint names bounded to 128 characters
//! - **Pagination** - `LIMIT`/`OFFSET` suffixes
//! - **Identity insert** - create hooks that allow explicit primary key
//!   values inside a transaction
//!
//! # Example
//!
//! ```rust,ignore
//! use oxide_dm::prelude::*;
//!
//! sqlx::any::install_default_drivers();
//! let pool = sqlx::AnyPool::connect(&database_url).await?;
//! let dialect = DmDialect::new(pool);
//!
//! let mut id = FieldDescriptor::new("id", ColumnKind::Int64).primary_key();
//! assert_eq!(dialect.data_type_of(&mut id)?, "BIGINT IDENTITY(1,1)");
//!
//! if !dialect.has_table("APP.USERS").await {
//!     // create it
//! }
//!
//! let mut callbacks = CreateCallbacks::new();
//! register_identity_insert_hooks(&mut callbacks);
//! ```

pub mod catalog;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod field;
pub mod naming;
pub mod pagination;
pub mod session;
pub mod table;
pub mod typemap;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::dialect::{DM_DIALECT_NAME, Dialect, DmDialect};
    pub use crate::error::{DialectError, Result};
    pub use crate::executor::{BoxFuture, SharedTransaction, SqlExecutor};
    pub use crate::field::{ColumnKind, DmType, FieldDescriptor, TagSettings};
    pub use crate::naming::build_key_name;
    pub use crate::pagination::limit_and_offset_sql;
    pub use crate::session::{
        CreateCallbacks, CreateHook, CreateScope, HookPoint, IdentityInsertState,
        create_in_transaction, register_identity_insert_hooks,
    };
    pub use crate::table::TableRef;
    pub use crate::typemap::{ColumnType, resolve_column_type, validate_fields};
}
