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

//! REST interface for the customers service.

use crate::driver::Driver;
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

mod customer_delete;
mod customer_get;
mod customer_put;
mod customers_get;
mod customers_post;
#[cfg(test)]
mod testutils;

/// Creates the router for the application, aborting any request that takes longer than
/// `timeout` to complete.
pub(crate) fn app(driver: Driver, timeout: Duration) -> Router {
    use axum::routing::get;
    Router::new()
        .route(
            "/api/v1/customers/:id",
            get(customer_get::handler).put(customer_put::handler).delete(customer_delete::handler),
        )
        .route("/api/v1/customers", get(customers_get::handler).post(customers_post::handler))
        .layer(TimeoutLayer::new(timeout))
        .with_state(driver)
}
