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

//! Test utilities for the business layer.

use crate::driver::Driver;
use crate::model::{Customer, CustomerId};
use crate::repository::testutils::InMemoryCustomerRepository;
use std::sync::Arc;
use time::Date;

/// State of a running test.
pub(crate) struct TestContext {
    /// The repository backing the driver, exposed to let tests prepare and inspect its state.
    repo: Arc<InMemoryCustomerRepository>,

    /// The driver under test.
    driver: Driver,
}

impl TestContext {
    /// Initializes the driver using an in-memory repository.
    pub(crate) fn setup() -> Self {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let repo = Arc::new(InMemoryCustomerRepository::default());
        let driver = Driver::new(repo.clone());
        Self { repo, driver }
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }

    /// Gets access to the repository that backs the driver.
    pub(crate) fn repo(&self) -> &InMemoryCustomerRepository {
        &self.repo
    }

    /// Stores a customer directly in the repository, bypassing validation.
    pub(crate) async fn insert(
        &self,
        id: i32,
        first_name: &str,
        last_name: &str,
        date_of_birth: Date,
    ) -> Customer {
        let customer = Customer::new(
            CustomerId::new(id),
            first_name.to_owned(),
            last_name.to_owned(),
            date_of_birth,
        );
        self.repo.insert_raw(customer.clone()).await;
        customer
    }
}
