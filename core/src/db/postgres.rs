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

//! PostgreSQL backend.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use crate::env::{get_optional_var, get_required_var};
use async_trait::async_trait;
use derivative::Derivative;
use log::warn;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{
    PgConnectOptions, PgConnection, PgDatabaseError, PgPool, PgPoolOptions, Postgres,
};
use sqlx::Transaction;
use std::future::Future;
use std::time::Duration;

/// Number of times to retry acquiring a connection unless configured otherwise.
const DEFAULT_MAX_RETRIES: u16 = 60;

/// Seconds to wait for a free connection in the pool unless configured otherwise.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 2;

/// Classifies a raw SQLx error `e` reported by PostgreSQL.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::Database(e) => {
            let Some(pg) = e.try_downcast_ref::<PgDatabaseError>() else {
                return DbError::BackendError(e.to_string());
            };
            match pg.code() {
                "23503" /* foreign_key_violation */ => DbError::NotFound,
                "23505" /* unique_violation */ => DbError::AlreadyExists,
                "53300" /* too_many_connections */ => DbError::Unavailable,
                "57P03" /* cannot_connect_now */ => DbError::Unavailable,
                code => DbError::BackendError(format!("pgsql error {}: {}", code, e)),
            }
        }
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        sqlx::Error::RowNotFound => DbError::NotFound,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Advisory lock key held by transactions opened with `Db::begin_write`.
const WRITE_LOCK_KEY: i64 = 0x4949_4956;

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default)]
#[cfg_attr(test, derivative(PartialEq))]
pub struct PostgresOptions {
    /// Server hostname.
    pub host: String,

    /// Server port, typically 5432.
    pub port: u16,

    /// Name of the database holding the service's tables.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password of `username`.
    #[derivative(Debug = "ignore")]
    pub password: String,

    /// Connections to keep open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on open connections.
    pub max_connections: Option<u32>,

    /// How long to wait for a connection before considering the database unavailable.
    pub acquire_timeout: Duration,

    /// How many times to retry taking a connection while the database is unavailable.
    pub max_retries: u16,
}

impl PostgresOptions {
    /// Reads the options from the `<prefix>_*` environment variables.
    ///
    /// `HOST`, `PORT`, `DATABASE`, `USERNAME` and `PASSWORD` are required.  `MIN_CONNECTIONS`,
    /// `MAX_CONNECTIONS`, `ACQUIRE_TIMEOUT_SECS` and `MAX_RETRIES` are optional.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        let acquire_timeout = get_optional_var::<u64>(prefix, "ACQUIRE_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS);
        Ok(PostgresOptions {
            host: get_required_var::<String>(prefix, "HOST")?,
            port: get_required_var::<u16>(prefix, "PORT")?,
            database: get_required_var::<String>(prefix, "DATABASE")?,
            username: get_required_var::<String>(prefix, "USERNAME")?,
            password: get_required_var::<String>(prefix, "PASSWORD")?,
            min_connections: get_optional_var::<u32>(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var::<u32>(prefix, "MAX_CONNECTIONS")?,
            acquire_timeout: Duration::from_secs(acquire_timeout),
            max_retries: get_optional_var::<u16>(prefix, "MAX_RETRIES")?
                .unwrap_or(DEFAULT_MAX_RETRIES),
        })
    }
}

/// Handle to issue queries against PostgreSQL.
#[derive(Debug)]
pub enum PostgresExecutor {
    /// Queries run on a connection taken from the pool.
    PoolExec(PoolConnection<Postgres>),

    /// Queries run within an open transaction.
    TxExec(Transaction<'static, Postgres>),
}

impl PostgresExecutor {
    /// Returns the connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut PgConnection {
        match self {
            PostgresExecutor::PoolExec(conn) => &mut **conn,
            PostgresExecutor::TxExec(tx) => &mut **tx,
        }
    }

    /// Commits the transaction backing this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            PostgresExecutor::PoolExec(_) => unreachable!("Only transactions can be committed"),
            PostgresExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }

    /// Rolls back the transaction backing this executor.
    ///
    /// Panics if the executor is not backed by a transaction.
    pub(super) async fn rollback(self) -> DbResult<()> {
        match self {
            PostgresExecutor::PoolExec(_) => unreachable!("Only transactions can be rolled back"),
            PostgresExecutor::TxExec(tx) => tx.rollback().await.map_err(map_sqlx_error),
        }
    }
}

/// Randomized, growing delays between attempts to reach an unavailable database.
struct Backoff {
    /// Delay to apply before the next attempt.
    delay: Duration,

    /// Number of attempts still allowed.
    retries_left: u16,
}

impl Backoff {
    /// Delays stop growing once they reach this value.
    const MAX_DELAY: Duration = Duration::from_secs(5);

    /// Creates a backoff that allows `max_retries` more attempts.
    fn new(max_retries: u16) -> Self {
        let delay = Duration::from_millis(100 + u64::from(rand::random::<u16>() % 900));
        Self { delay, retries_left: max_retries }
    }

    /// Consumes one attempt and returns how long to wait before it, or `None` if there are no
    /// attempts left.
    fn next_delay(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;

        let delay = self.delay;
        if self.delay < Self::MAX_DELAY {
            self.delay += Duration::from_millis(u64::from(rand::random::<u16>() % 1000));
        }
        Some(delay)
    }
}

/// Runs `op` until it succeeds, fails for a reason other than the database being unavailable, or
/// `max_retries` is exhausted.
async fn with_retries<Op, OpFut, T>(max_retries: u16, op: Op) -> DbResult<T>
where
    Op: Fn() -> OpFut,
    OpFut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut backoff = Backoff::new(max_retries);
    loop {
        match op().await.map_err(map_sqlx_error) {
            Err(DbError::Unavailable) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "PostgreSQL unavailable; retrying in {}ms ({} attempts left)",
                        delay.as_millis(),
                        backoff.retries_left
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(DbError::Unavailable),
            },
            result => return result,
        }
    }
}

/// Connection pool to a PostgreSQL database.
pub struct PostgresDb {
    /// The pool.  Connections are handed out to executors and return here on drop.
    pool: PgPool,

    /// How many times to retry taking a connection while the database is unavailable.
    max_retries: u16,
}

impl PostgresDb {
    /// Prepares a pool for the server described by `opts`.
    ///
    /// No connection is established until the first query.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let mut pool_options = PgPoolOptions::new().acquire_timeout(opts.acquire_timeout);
        if let Some(n) = opts.min_connections {
            pool_options = pool_options.min_connections(n);
        }
        if let Some(n) = opts.max_connections {
            pool_options = pool_options.max_connections(n);
        }

        let connect_options = PgConnectOptions::new()
            .host(&opts.host)
            .port(opts.port)
            .database(&opts.database)
            .username(&opts.username)
            .password(&opts.password)
            .application_name("customers");

        let pool = pool_options.connect_lazy_with(connect_options);
        Ok(Self { pool, max_retries: opts.max_retries })
    }

    /// Takes a connection out of the pool without erasing the backend type.
    pub async fn typed_ex(&self) -> DbResult<PostgresExecutor> {
        with_retries(self.max_retries, || self.pool.acquire()).await.map(PostgresExecutor::PoolExec)
    }
}

impl Drop for PostgresDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("PostgreSQL database dropped without calling close()");
        }
    }
}

#[async_trait]
impl Db for PostgresDb {
    async fn ex(&self) -> DbResult<Executor> {
        self.typed_ex().await.map(Executor::Postgres)
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = with_retries(self.max_retries, || self.pool.begin()).await?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::TxExec(tx))))
    }

    async fn begin_write(&self) -> DbResult<TxExecutor> {
        let mut tx = with_retries(self.max_retries, || self.pool.begin()).await?;
        // Writers queue on a transaction-scoped advisory lock, which is released on commit or
        // rollback.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(WRITE_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Postgres(PostgresExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Runs every statement in `schema`, which may contain comments.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(ex.conn()).await.map_err(map_sqlx_error).map(|_| ())
}

/// Test utilities for the PostgreSQL backend.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the server configured via the `PGSQL_TEST_*` environment variables.
    ///
    /// Tables are created in the `pg_temp` schema so that they vanish when the connection closes.
    /// This only works if the pool holds exactly one connection for its whole life, so the pool
    /// is sized accordingly.  Panics on any error.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let opts = PostgresOptions {
            min_connections: Some(1),
            max_connections: Some(1),
            ..PostgresOptions::from_env("PGSQL_TEST").unwrap()
        };
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        db
    }
}
