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

//! API to create a new customer.

use crate::driver::Driver;
use crate::model::Customer;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http;
use axum::Json;
use customers_core::rest::{RestError, RestResult};

/// POST handler for this API.
///
/// On success, responds with the stored customer and points to it via the `Location` header.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    candidate: Result<Json<Customer>, JsonRejection>,
) -> RestResult<(http::StatusCode, [(http::HeaderName, String); 1], Json<Customer>)> {
    let Json(candidate) = candidate?;
    match driver.create(candidate).await? {
        Some(customer) => {
            let location = format!("/api/v1/customers/{}", customer.id());
            Ok((http::StatusCode::CREATED, [(http::header::LOCATION, location)], Json(customer)))
        }
        None => Err(RestError::InvalidRequest("Invalid customer".to_owned())),
    }
}
