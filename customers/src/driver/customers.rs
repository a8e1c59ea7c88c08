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

//! Operations on the collection of customers.

use crate::driver::{check_fields, Driver};
use crate::model::Customer;
use customers_core::driver::DriverResult;
use log::debug;

impl Driver {
    /// Gets all customers whose first or last name contains `term`, ignoring case.
    pub(crate) async fn get_by_name(self, term: Option<&str>) -> DriverResult<Vec<Customer>> {
        Ok(self.repo.find_by_name_substring(term).await?)
    }

    /// Creates a new customer from `candidate` and returns it with its assigned identifier.
    ///
    /// Returns `None` if `candidate` does not pass validation or if it cannot be stored.
    pub(crate) async fn create(self, candidate: Customer) -> DriverResult<Option<Customer>> {
        if let Err(rule) = check_fields(&candidate, true) {
            debug!("Rejecting creation of customer: {}", rule);
            return Ok(None);
        }

        if self.repo.find_by_id(*candidate.id()).await?.is_some() {
            debug!("Rejecting creation of customer: id {} already exists", candidate.id());
            return Ok(None);
        }

        Ok(self.repo.create(candidate).await?)
    }
}
