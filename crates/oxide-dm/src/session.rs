//! Identity insert around inserts that carry explicit primary keys.
//!
//! DM rejects explicit values for an identity column unless
//! `SET IDENTITY_INSERT <table> ON` was issued in the same session. The two
//! hooks in this module bracket an insert inside its transaction:
//!
//! - `dm:set_identity_insert` runs right after the transaction begins and
//!   switches identity insert on when an auto-increment primary key carries a
//!   value.
//! - `dm:turn_off_identity_insert` runs right before commit or rollback and
//!   switches it off again for every table that was switched on.
//!
//! The hooks are injected into the ORM's [`CreateCallbacks`] with
//! [`register_identity_insert_hooks`]; [`create_in_transaction`] drives the
//! lifecycle and always runs the second hook, whether the insert succeeded
//! or not.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use tracing::{debug, error, warn};

use crate::dialect::DM_DIALECT_NAME;
use crate::error::Result;
use crate::executor::{BoxFuture, SqlExecutor};
use crate::field::FieldDescriptor;

/// Hook name for switching identity insert on.
pub const SET_IDENTITY_INSERT: &str = "dm:set_identity_insert";
/// Hook name for switching identity insert off.
pub const TURN_OFF_IDENTITY_INSERT: &str = "dm:turn_off_identity_insert";

/// Tables whose identity insert is currently on, for one transaction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IdentityInsertState {
    enabled: BTreeSet<String>,
}

impl IdentityInsertState {
    /// Creates an empty state (every table off).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether identity insert is on for a table.
    #[must_use]
    pub fn is_on(&self, table: &str) -> bool {
        self.enabled.contains(table)
    }

    /// Returns whether every table is off.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    /// Returns the tables that are on.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.enabled.iter().map(String::as_str)
    }

    fn mark_on(&mut self, table: &str) {
        self.enabled.insert(table.to_string());
    }

    fn take(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.enabled)
    }
}

/// Per-insert transaction scope handed to the create hooks.
#[derive(Debug)]
pub struct CreateScope {
    dialect: &'static str,
    table: String,
    primary_fields: Vec<FieldDescriptor>,
    identity_insert: IdentityInsertState,
}

impl CreateScope {
    /// Creates a scope for inserting into `table` through `dialect`.
    #[must_use]
    pub fn new(dialect: &'static str, table: impl Into<String>, primary_fields: Vec<FieldDescriptor>) -> Self {
        Self {
            dialect,
            table: table.into(),
            primary_fields,
            identity_insert: IdentityInsertState::new(),
        }
    }

    /// Returns the dialect name.
    #[must_use]
    pub const fn dialect(&self) -> &'static str {
        self.dialect
    }

    /// Returns the target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the primary key fields of the row being inserted.
    #[must_use]
    pub fn primary_fields(&self) -> &[FieldDescriptor] {
        &self.primary_fields
    }

    /// Returns the identity insert state.
    #[must_use]
    pub const fn identity_insert(&self) -> &IdentityInsertState {
        &self.identity_insert
    }

    fn needs_identity_insert(&self) -> bool {
        self.primary_fields
            .iter()
            .any(|f| f.is_auto_increment() && !f.is_blank)
    }
}

impl Drop for CreateScope {
    fn drop(&mut self) {
        if !self.identity_insert.is_empty() {
            warn!(
                tables = ?self.identity_insert.enabled,
                "Transaction scope ended with identity insert still on"
            );
        }
    }
}

/// Where in the transaction lifecycle a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Right after the transaction begins.
    AfterBeginTransaction,
    /// Right before the transaction commits or rolls back.
    BeforeCommitOrRollback,
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AfterBeginTransaction => f.write_str("after begin_transaction"),
            Self::BeforeCommitOrRollback => f.write_str("before commit_or_rollback_transaction"),
        }
    }
}

/// A named callback in the create chain.
pub trait CreateHook: Send + Sync {
    /// Returns the hook name.
    fn name(&self) -> &'static str;

    /// Returns where the hook runs.
    fn point(&self) -> HookPoint;

    /// Runs the hook on the transaction's executor.
    fn call<'a>(&'a self, scope: &'a mut CreateScope, db: &'a dyn SqlExecutor) -> BoxFuture<'a, Result<()>>;
}

/// Switches identity insert on for inserts with explicit primary keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetIdentityInsert;

impl CreateHook for SetIdentityInsert {
    fn name(&self) -> &'static str {
        SET_IDENTITY_INSERT
    }

    fn point(&self) -> HookPoint {
        HookPoint::AfterBeginTransaction
    }

    fn call<'a>(&'a self, scope: &'a mut CreateScope, db: &'a dyn SqlExecutor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if scope.dialect != DM_DIALECT_NAME || !scope.needs_identity_insert() {
                return Ok(());
            }
            if scope.identity_insert.is_on(&scope.table) {
                return Ok(());
            }

            let sql = format!("SET IDENTITY_INSERT {} ON", scope.table);
            debug!(table = %scope.table, "Enabling identity insert");
            db.execute(&sql).await?;
            let table = scope.table.clone();
            scope.identity_insert.mark_on(&table);
            Ok(())
        })
    }
}

/// Switches identity insert off for every table it was switched on for.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOffIdentityInsert;

impl CreateHook for TurnOffIdentityInsert {
    fn name(&self) -> &'static str {
        TURN_OFF_IDENTITY_INSERT
    }

    fn point(&self) -> HookPoint {
        HookPoint::BeforeCommitOrRollback
    }

    fn call<'a>(&'a self, scope: &'a mut CreateScope, db: &'a dyn SqlExecutor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if scope.dialect != DM_DIALECT_NAME {
                return Ok(());
            }

            // The state is cleared even if a statement fails; it must not
            // outlive the transaction.
            let mut first_error = None;
            for table in scope.identity_insert.take() {
                let sql = format!("SET IDENTITY_INSERT {table} OFF");
                debug!(table = %table, "Disabling identity insert");
                if let Err(err) = db.execute(&sql).await {
                    error!(table = %table, error = %err, "Failed to disable identity insert");
                    first_error.get_or_insert(err);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }
}

/// The ORM's chain of create callbacks, in registration order.
#[derive(Default)]
pub struct CreateCallbacks {
    hooks: Vec<Box<dyn CreateHook>>,
}

impl fmt::Debug for CreateCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| (h.point(), h.name())))
            .finish()
    }
}

impl CreateCallbacks {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a hook, replacing an existing hook with the same name.
    pub fn register(&mut self, hook: impl CreateHook + 'static) -> &mut Self {
        match self.hooks.iter().position(|h| h.name() == hook.name()) {
            Some(i) => self.hooks[i] = Box::new(hook),
            None => self.hooks.push(Box::new(hook)),
        }
        self
    }

    /// Returns the hook names registered at a point, in order.
    #[must_use]
    pub fn names(&self, point: HookPoint) -> Vec<&'static str> {
        self.hooks
            .iter()
            .filter(|h| h.point() == point)
            .map(|h| h.name())
            .collect()
    }

    /// Runs every hook registered at `point`.
    ///
    /// After-begin hooks stop at the first error. Before-commit-or-rollback
    /// hooks all run even when one fails, so that a failing hook cannot keep
    /// identity insert switched on past the transaction.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by a hook; later ones are logged.
    pub async fn run(&self, point: HookPoint, scope: &mut CreateScope, db: &dyn SqlExecutor) -> Result<()> {
        let mut first_error = None;
        for hook in self.hooks.iter().filter(|h| h.point() == point) {
            debug!(hook = hook.name(), point = %point, "Running create hook");
            if let Err(err) = hook.call(scope, db).await {
                if point == HookPoint::AfterBeginTransaction {
                    return Err(err);
                }
                if first_error.is_some() {
                    error!(hook = hook.name(), error = %err, "Create hook failed");
                } else {
                    warn!(hook = hook.name(), error = %err, "Create hook failed, running remaining hooks");
                    first_error = Some(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Injects both identity insert hooks into a create chain.
pub fn register_identity_insert_hooks(callbacks: &mut CreateCallbacks) {
    callbacks
        .register(SetIdentityInsert)
        .register(TurnOffIdentityInsert);
}

/// Runs an insert between the two hook points of a transaction.
///
/// `db` must be the executor of the open transaction. The
/// before-commit-or-rollback hooks run on every path, including when an
/// after-begin hook or the insert fails.
///
/// # Errors
///
/// Returns the first error from the after-begin hooks, the insert or the
/// before-commit-or-rollback hooks; later ones are logged.
pub async fn create_in_transaction<'db, T, F, Fut>(
    callbacks: &CreateCallbacks,
    scope: &mut CreateScope,
    db: &'db dyn SqlExecutor,
    insert: F,
) -> Result<T>
where
    T: Send,
    F: FnOnce(&'db dyn SqlExecutor) -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
{
    let outcome = match callbacks.run(HookPoint::AfterBeginTransaction, scope, db).await {
        Ok(()) => insert(db).await,
        Err(err) => Err(err),
    };

    let cleanup = callbacks
        .run(HookPoint::BeforeCommitOrRollback, scope, db)
        .await;

    match (outcome, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup_err)) => {
            error!(error = %cleanup_err, "Create hook failed after insert error");
            Err(err)
        }
    }
}
