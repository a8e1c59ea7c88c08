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

//! API to replace the details of an existing customer.

use crate::driver::Driver;
use crate::model::{Customer, CustomerId};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http;
use axum::Json;
use customers_core::rest::{RestError, RestResult};

/// PUT handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    path: Result<Path<CustomerId>, PathRejection>,
    customer: Result<Json<Customer>, JsonRejection>,
) -> RestResult<http::StatusCode> {
    let Path(id) = path?;
    let Json(customer) = customer?;

    if *customer.id() != id {
        return Err(RestError::InvalidRequest(format!(
            "Customer id {} does not match id {} in the URL",
            customer.id(),
            id
        )));
    }

    if driver.update(customer).await? {
        Ok(http::StatusCode::NO_CONTENT)
    } else {
        Err(RestError::InvalidRequest("Invalid customer".to_owned()))
    }
}
