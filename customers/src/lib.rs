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

//! REST service to manage customer records.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use crate::driver::Driver;
use crate::repository::DbCustomerRepository;
use crate::rest::app;
use customers_core::db::Db;
use log::{info, warn};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub mod config;
pub mod db;
pub mod driver;
pub mod model;
pub mod repository;
mod rest;

/// Waits until the process is asked to terminate.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            warn!("Cannot listen for termination signals: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Serves the customers API on `bind_addr` using `db` for persistence until the process is
/// interrupted.
///
/// Requests that take longer than `request_timeout` are aborted.  The caller retains ownership of
/// `db` and is responsible for closing it once this returns.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
    request_timeout: Duration,
) -> Result<(), Box<dyn Error>> {
    let repo = Arc::new(DbCustomerRepository::new(db));
    let driver = Driver::new(repo);
    let app = app(driver, request_timeout);

    let listener = TcpListener::bind(bind_addr.into()).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}
