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

//! Service configuration.

use customers_core::env::get_optional_var;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default TCP port to listen on.
const DEFAULT_PORT: u16 = 3000;

/// Default maximum duration of a request, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default SQLite database to use, which lives only as long as the process does.
const DEFAULT_SQLITE_PATH: &str = ":memory:";

/// Database backend to store customers in.
#[derive(Debug, PartialEq)]
pub enum DbBackend {
    /// PostgreSQL, configured via the `PGSQL_PROD_*` variables.
    Postgres,

    /// SQLite, at the given path or connection string.
    Sqlite(String),
}

/// Configuration of the service.
#[derive(Debug, PartialEq)]
pub struct Config {
    /// Address to listen on.
    pub bind_addr: IpAddr,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum duration of a request before it is aborted.
    pub request_timeout: Duration,

    /// Database to store customers in.
    pub db: DbBackend,
}

impl Config {
    /// Initializes the configuration from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_BIND_ADDR`, `<prefix>_PORT`,
    /// `<prefix>_REQUEST_TIMEOUT_SECS`, `<prefix>_DB` and `<prefix>_SQLITE_PATH`.  All of them are
    /// optional.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        let db = match get_optional_var::<String>(prefix, "DB")?.as_deref() {
            None | Some("sqlite") => DbBackend::Sqlite(
                get_optional_var::<String>(prefix, "SQLITE_PATH")?
                    .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_owned()),
            ),
            Some("postgres") => DbBackend::Postgres,
            Some(other) => {
                return Err(format!(
                    "Invalid value in environment variable {}_DB: unknown backend {}",
                    prefix, other
                ))
            }
        };

        Ok(Config {
            bind_addr: get_optional_var::<IpAddr>(prefix, "BIND_ADDR")?
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(DEFAULT_PORT),
            request_timeout: Duration::from_secs(
                get_optional_var::<u64>(prefix, "REQUEST_TIMEOUT_SECS")?
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            db,
        })
    }
}
