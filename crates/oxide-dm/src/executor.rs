//! Query execution capability.
//!
//! The dialect never owns a connection. Everything it sends to the engine goes
//! through [`SqlExecutor`], which the host implements for whatever handle it
//! holds (a pool, or the connection of an open transaction).

use std::future::Future;
use std::pin::Pin;

use sqlx::{Any, AnyPool, Transaction};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// A boxed future for async executor operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes SQL text against the engine.
///
/// All statements use positional `?` placeholders.
pub trait SqlExecutor: Send + Sync {
    /// Runs a query returning a single integer (typically `COUNT(...)`).
    fn query_count<'a>(&'a self, sql: &'a str, args: &'a [&'a str]) -> BoxFuture<'a, Result<i64>>;

    /// Runs a query returning at most one string value.
    fn query_string<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Executes a statement and returns the number of affected rows.
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64>>;
}

impl SqlExecutor for AnyPool {
    fn query_count<'a>(&'a self, sql: &'a str, args: &'a [&'a str]) -> BoxFuture<'a, Result<i64>> {
        Box::pin(async move {
            debug!(sql = %sql, args = ?args, "Executing count query");
            let mut query = sqlx::query_scalar::<_, i64>(sql);
            for arg in args {
                query = query.bind((*arg).to_string());
            }
            Ok(query.fetch_one(self).await?)
        })
    }

    fn query_string<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            debug!(sql = %sql, "Executing query");
            let value = sqlx::query_scalar::<_, Option<String>>(sql)
                .fetch_optional(self)
                .await?;
            Ok(value.flatten())
        })
    }

    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            debug!(sql = %sql, "Executing SQL");
            let result = sqlx::query(sql).execute(self).await?;
            Ok(result.rows_affected())
        })
    }
}

/// An open transaction shared between the host and the dialect hooks.
///
/// Identity insert is a session setting, so the hooks must run on the same
/// connection as the insert they guard.
pub type SharedTransaction = Mutex<Transaction<'static, Any>>;

impl SqlExecutor for SharedTransaction {
    fn query_count<'a>(&'a self, sql: &'a str, args: &'a [&'a str]) -> BoxFuture<'a, Result<i64>> {
        Box::pin(async move {
            debug!(sql = %sql, args = ?args, "Executing count query in transaction");
            let mut query = sqlx::query_scalar::<_, i64>(sql);
            for arg in args {
                query = query.bind((*arg).to_string());
            }
            Ok(query.fetch_one(&mut **self.lock().await).await?)
        })
    }

    fn query_string<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(async move {
            debug!(sql = %sql, "Executing query in transaction");
            let value = sqlx::query_scalar::<_, Option<String>>(sql)
                .fetch_optional(&mut **self.lock().await)
                .await?;
            Ok(value.flatten())
        })
    }

    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            debug!(sql = %sql, "Executing SQL in transaction");
            let result = sqlx::query(sql).execute(&mut **self.lock().await).await?;
            Ok(result.rows_affected())
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording executor used by the unit tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::{BoxFuture, SqlExecutor};
    use crate::error::{DialectError, Result};

    /// One recorded call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub sql: String,
        pub args: Vec<String>,
    }

    /// Replays scripted results and records every statement it receives.
    #[derive(Default)]
    pub struct MockExecutor {
        pub calls: Mutex<Vec<Call>>,
        pub counts: Mutex<VecDeque<Result<i64>>>,
        pub schema: Option<String>,
        pub fail_statements_containing: Option<String>,
    }

    pub fn failure(message: &str) -> DialectError {
        DialectError::Database(sqlx::Error::Protocol(message.to_string()))
    }

    impl MockExecutor {
        pub fn with_schema(schema: &str) -> Self {
            Self {
                schema: Some(schema.to_string()),
                ..Self::default()
            }
        }

        pub fn push_count(&self, result: Result<i64>) {
            self.counts.lock().unwrap().push_back(result);
        }

        pub fn fail_on(mut self, needle: &str) -> Self {
            self.fail_statements_containing = Some(needle.to_string());
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn statements(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.sql).collect()
        }

        fn record(&self, sql: &str, args: &[&str]) {
            self.calls.lock().unwrap().push(Call {
                sql: sql.to_string(),
                args: args.iter().map(|a| (*a).to_string()).collect(),
            });
        }
    }

    impl SqlExecutor for MockExecutor {
        fn query_count<'a>(
            &'a self,
            sql: &'a str,
            args: &'a [&'a str],
        ) -> BoxFuture<'a, Result<i64>> {
            Box::pin(async move {
                self.record(sql, args);
                self.counts.lock().unwrap().pop_front().unwrap_or(Ok(0))
            })
        }

        fn query_string<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
            Box::pin(async move {
                self.record(sql, &[]);
                Ok(self.schema.clone())
            })
        }

        fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Result<u64>> {
            Box::pin(async move {
                self.record(sql, &[]);
                match &self.fail_statements_containing {
                    Some(needle) if sql.contains(needle.as_str()) => Err(failure("statement rejected")),
                    _ => Ok(0),
                }
            })
        }
    }
}
