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

//! API to search customers by name.

use crate::driver::Driver;
use crate::model::Customer;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use customers_core::rest::{EmptyBody, RestResult};
use serde::{Deserialize, Serialize};

/// Query parameters for this API.
#[derive(Default, Deserialize, Serialize)]
pub(crate) struct NameQuery {
    /// Substring to look for in the first and last names of the customers.  If missing, the
    /// search yields no results.
    pub(crate) name: Option<String>,
}

/// GET handler for this API.
pub(crate) async fn handler(
    State(driver): State<Driver>,
    query: Result<Query<NameQuery>, QueryRejection>,
    _: EmptyBody,
) -> RestResult<Json<Vec<Customer>>> {
    let Query(query) = query?;
    let customers = driver.get_by_name(query.name.as_deref()).await?;
    Ok(Json(customers))
}
