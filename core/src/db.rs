// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database access shared by all backends.
//!
//! Services talk to the database through the `Db` trait and issue their queries against an
//! `Executor`, which they destructure to pick the SQL dialect of the backend in use.  SQLite is
//! good enough for small deployments and is what most tests run against, as it can live entirely
//! in memory.  PostgreSQL is the choice for anything else.

use async_trait::async_trait;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Errors raised by the persistence layer.
///
/// Backend failures that we do not know how to classify end up as `BackendError`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// A row with the same key already exists.
    #[error("Already exists")]
    AlreadyExists,

    /// Unclassified failure reported by the database.
    #[error("Database error: {0}")]
    BackendError(String),

    /// The data stored in the database cannot be represented by our types.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The requested row does not exist.
    #[error("Entity not found")]
    NotFound,

    /// The database cannot serve the request right now, such as when it runs out of connections.
    #[error("Unavailable")]
    Unavailable,
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Handle to issue queries against one of the supported backends.
///
/// The handle may be backed by a pooled connection or by an open transaction: queries do not need
/// to care which.
#[derive(Debug)]
pub enum Executor {
    /// Handle for PostgreSQL.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// Handle for SQLite.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An `Executor` tied to an open transaction, which is rolled back on drop unless committed.
#[derive(Debug)]
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Gives access to the executor to issue queries within the transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction and releases its connection.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.commit().await,
        }
    }

    /// Discards the changes made within the transaction and releases its connection.
    ///
    /// Unlike dropping the executor, this waits for the database to complete the rollback.
    pub async fn rollback(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.rollback().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.rollback().await,
        }
    }
}

/// A connection pool to one of the supported backends.
#[async_trait]
pub trait Db {
    /// Takes a connection out of the pool.  The connection returns to the pool on drop.
    async fn ex(&self) -> DbResult<Executor>;

    /// Takes a connection out of the pool and opens a transaction on it.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Like `begin`, but for transactions that read data and then write based on it.
    ///
    /// Backends with coarse locks take the write lock upfront so that concurrent writers queue up
    /// instead of deadlocking on each other's read locks.
    async fn begin_write(&self) -> DbResult<TxExecutor>;

    /// Waits for all connections to return to the pool and closes them.
    ///
    /// Must be called before dropping the database.
    async fn close(&self);
}

/// Helpers to run the same test body against every backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Instantiates one `#[tokio::test]` per `name` that calls `module::name` with the database
    /// returned by the `setup` expression.
    ///
    /// An optional leading `#[extra]` attribute is attached to every generated test, which is
    /// useful to mark tests for backends that need external configuration as ignored.
    #[macro_export]
    macro_rules! generate_tests [
        ( @one $name:ident, $setup:expr, $module:path, [ $( $extra:meta ),* ] ) => {
            #[tokio::test]
            $( #[$extra] )*
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        };

        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident )+ ) => {
            $(
                $crate::db::testutils::generate_tests!(@one $name, $setup, $module, [$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident )+ ) => {
            $(
                $crate::db::testutils::generate_tests!(@one $name, $setup, $module, []);
            )+
        };
    ];

    pub use generate_tests;
}

#[cfg(all(test, any(feature = "postgres", feature = "sqlite")))]
mod tests {
    use super::*;
    use sqlx::Row;
    use std::sync::Arc;

    /// Runs a `statement` valid in all backends on `ex`.
    async fn exec(ex: &mut Executor, statement: &str) {
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => {
                sqlx::query(statement).execute(ex.conn()).await.unwrap();
            }

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => {
                sqlx::query(statement).execute(ex.conn()).await.unwrap();
            }
        }
    }

    /// Counts the rows in the `counters` test table.
    async fn count_rows(ex: &mut Executor) -> i64 {
        let query_str = "SELECT COUNT(*) AS total FROM counters";
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => {
                sqlx::query(query_str).fetch_one(ex.conn()).await.unwrap().get("total")
            }

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => {
                sqlx::query(query_str).fetch_one(ex.conn()).await.unwrap().get("total")
            }
        }
    }

    /// Creates the `counters` test table.
    async fn create_counters(db: &(dyn Db + Send + Sync)) {
        exec(&mut db.ex().await.unwrap(), "CREATE TABLE counters (value INTEGER)").await;
    }

    pub(super) async fn test_direct_execution(db: Arc<dyn Db + Send + Sync>) {
        create_counters(db.as_ref()).await;

        exec(&mut db.ex().await.unwrap(), "INSERT INTO counters (value) VALUES (3)").await;
        assert_eq!(1, count_rows(&mut db.ex().await.unwrap()).await);

        db.close().await;
    }

    pub(super) async fn test_tx_commit(db: Arc<dyn Db + Send + Sync>) {
        create_counters(db.as_ref()).await;

        let mut tx = db.begin().await.unwrap();
        exec(tx.ex(), "INSERT INTO counters (value) VALUES (3)").await;
        exec(tx.ex(), "INSERT INTO counters (value) VALUES (4)").await;
        assert_eq!(2, count_rows(tx.ex()).await);
        tx.commit().await.unwrap();

        assert_eq!(2, count_rows(&mut db.ex().await.unwrap()).await);

        db.close().await;
    }

    pub(super) async fn test_tx_rollback(db: Arc<dyn Db + Send + Sync>) {
        create_counters(db.as_ref()).await;

        let mut tx = db.begin().await.unwrap();
        exec(tx.ex(), "INSERT INTO counters (value) VALUES (3)").await;
        tx.rollback().await.unwrap();

        assert_eq!(0, count_rows(&mut db.ex().await.unwrap()).await);

        db.close().await;
    }

    pub(super) async fn test_tx_begin_write(db: Arc<dyn Db + Send + Sync>) {
        create_counters(db.as_ref()).await;

        let mut tx = db.begin_write().await.unwrap();
        exec(tx.ex(), "INSERT INTO counters (value) VALUES (3)").await;
        tx.commit().await.unwrap();

        let mut tx = db.begin_write().await.unwrap();
        exec(tx.ex(), "INSERT INTO counters (value) VALUES (4)").await;
        tx.rollback().await.unwrap();

        assert_eq!(1, count_rows(&mut db.ex().await.unwrap()).await);

        db.close().await;
    }

    /// Instantiates the tests in this module for the database returned by `setup`.
    macro_rules! generate_core_db_tests [
        ( $setup:expr $(, #[$extra:meta] )? ) => {
            $crate::db::testutils::generate_tests!(
                $( #[$extra], )?
                $setup,
                $crate::db::tests,
                test_direct_execution,
                test_tx_begin_write,
                test_tx_commit,
                test_tx_rollback
            );
        }
    ];

    pub(super) use generate_core_db_tests;
}
