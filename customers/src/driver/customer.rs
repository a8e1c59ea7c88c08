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

//! Operations on one customer.

use crate::driver::{check_fields, Driver};
use crate::model::{Customer, CustomerId};
use customers_core::driver::DriverResult;
use log::debug;

impl Driver {
    /// Gets the customer identified by `id`.
    pub(crate) async fn get_by_id(self, id: CustomerId) -> DriverResult<Option<Customer>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    /// Replaces the details of an existing customer with those in `customer`.
    ///
    /// Returns false if `customer` does not pass validation or if it does not exist.
    pub(crate) async fn update(self, customer: Customer) -> DriverResult<bool> {
        if let Err(rule) = check_fields(&customer, false) {
            debug!("Rejecting update of customer {}: {}", customer.id(), rule);
            return Ok(false);
        }

        if self.repo.find_by_id(*customer.id()).await?.is_none() {
            debug!("Rejecting update of customer {}: not found", customer.id());
            return Ok(false);
        }

        Ok(self.repo.update(&customer).await?)
    }

    /// Deletes the customer identified by `id`.  Returns false if it does not exist.
    pub(crate) async fn delete(self, id: CustomerId) -> DriverResult<bool> {
        Ok(self.repo.delete(id).await?)
    }
}
