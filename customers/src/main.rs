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

//! Entry point to the customers service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use customers::config::{Config, DbBackend};
use customers::db::init_schema;
use customers::serve;
use customers_core::db::postgres::{PostgresDb, PostgresOptions};
use customers_core::db::{sqlite, Db};
use log::info;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Opens the database selected by `backend`.
async fn connect(backend: DbBackend) -> Result<Arc<dyn Db + Send + Sync>, String> {
    match backend {
        DbBackend::Postgres => {
            info!("Using PostgreSQL database");
            let opts = PostgresOptions::from_env("PGSQL_PROD")?;
            let db = PostgresDb::connect(opts).map_err(|e| e.to_string())?;
            Ok(Arc::new(db))
        }
        DbBackend::Sqlite(path) => {
            info!("Using SQLite database {}", path);
            let db = sqlite::connect(&path).await.map_err(|e| e.to_string())?;
            Ok(Arc::new(db))
        }
    }
}

/// Prepares the database schema and serves the API until the process is interrupted.
async fn run(
    db: Arc<dyn Db + Send + Sync>,
    addr: SocketAddr,
    request_timeout: Duration,
) -> Result<(), String> {
    let mut ex = db.ex().await.map_err(|e| format!("Failed to connect to database: {}", e))?;
    init_schema(&mut ex).await.map_err(|e| format!("Failed to initialize schema: {}", e))?;
    drop(ex);

    serve(addr, db, request_timeout).await.map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), String> {
    env_logger::init();

    let config = Config::from_env("CUSTOMERS")?;
    let addr = SocketAddr::new(config.bind_addr, config.port);

    let db = connect(config.db).await?;
    let result = run(db.clone(), addr, config.request_timeout).await;
    db.close().await;
    result
}
