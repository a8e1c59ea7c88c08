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

//! SQLite backend.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use log::warn;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;

/// Primary result code for a database file locked by another connection.
const SQLITE_BUSY: i32 = 5;

/// Primary result code for a table locked within a shared cache, including detected deadlocks.
const SQLITE_LOCKED: i32 = 6;

/// Classifies a raw SQLx error `e` reported by SQLite.
///
/// SQLx reports extended result codes, whose low byte is the primary result code.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => match e.code().and_then(|code| code.parse::<i32>().ok()) {
            Some(787 /* SQLITE_CONSTRAINT_FOREIGNKEY */) => DbError::NotFound,
            Some(1555 /* SQLITE_CONSTRAINT_PRIMARYKEY */) => DbError::AlreadyExists,
            Some(2067 /* SQLITE_CONSTRAINT_UNIQUE */) => DbError::AlreadyExists,
            Some(code) if code & 0xff == SQLITE_BUSY || code & 0xff == SQLITE_LOCKED => {
                DbError::Unavailable
            }
            _ => DbError::BackendError(e.to_string()),
        },
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Opens the database described by `conn_str`, which can be a file path, a `sqlite:` URL, or
/// `:memory:`.
///
/// An in-memory database is shared by all connections in the pool and vanishes once the pool is
/// closed.  The pool keeps its last connection open forever so that such a database survives idle
/// periods.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(conn_str)
        .await
        .map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// Handle to issue queries against SQLite.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// Queries run on a connection taken from the pool.
    PoolExec(PoolConnection<Sqlite>),

    /// Queries run within an open transaction.
    TxExec(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Returns the connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            SqliteExecutor::PoolExec(conn) => &mut **conn,
            SqliteExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction backing this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::PoolExec(_) => unreachable!("Only transactions can be committed"),
            SqliteExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }

    /// Rolls back the transaction backing this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn rollback(self) -> DbResult<()> {
        match self {
            SqliteExecutor::PoolExec(_) => unreachable!("Only transactions can be rolled back"),
            SqliteExecutor::TxExec(tx) => tx.rollback().await.map_err(map_sqlx_error),
        }
    }
}

/// Connection pool to a SQLite database.
pub struct SqliteDb {
    /// The pool.  Connections are handed out to executors and return here on drop.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Takes a connection out of the pool without erasing the backend type.
    pub async fn typed_ex(&self) -> DbResult<SqliteExecutor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(SqliteExecutor::PoolExec(conn))
    }
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("SQLite database dropped without calling close()");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        self.typed_ex().await.map(Executor::Sqlite)
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn begin_write(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema`, which may contain comments.
pub async fn run_schema(ex: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(ex.conn()).await.map_err(map_sqlx_error).map(|_| ())
}

/// Test utilities for the SQLite backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database.  Each call yields an independent database.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}
