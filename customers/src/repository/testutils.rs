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

//! Test utilities for the repository layer.

use crate::model::{Customer, CustomerId};
use crate::repository::CustomerRepository;
use async_trait::async_trait;
use customers_core::db::{DbError, DbResult};
use futures::lock::Mutex;
use std::collections::BTreeMap;

/// A repository that keeps customers in memory.
///
/// This mimics `DbCustomerRepository` so that higher layers can be tested without a database.
/// Failures can be injected with `fail_with` to exercise error propagation.
#[derive(Default)]
pub(crate) struct InMemoryCustomerRepository {
    /// Stored customers keyed by their identifier.
    customers: Mutex<BTreeMap<CustomerId, Customer>>,

    /// Error to return from the next operation, if any.
    failure: Mutex<Option<DbError>>,
}

impl InMemoryCustomerRepository {
    /// Makes the next operation fail with `error`.
    pub(crate) async fn fail_with(&self, error: DbError) {
        *self.failure.lock().await = Some(error);
    }

    /// Returns an error if one was injected with `fail_with`.
    async fn check_failure(&self) -> DbResult<()> {
        match self.failure.lock().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stores `customer` as is, bypassing all checks.
    pub(crate) async fn insert_raw(&self, customer: Customer) {
        self.customers.lock().await.insert(*customer.id(), customer);
    }

    /// Returns a snapshot of all stored customers sorted by identifier.
    pub(crate) async fn all(&self) -> Vec<Customer> {
        self.customers.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_name_substring(&self, term: Option<&str>) -> DbResult<Vec<Customer>> {
        self.check_failure().await?;
        let term = match term {
            Some(term) => term.to_lowercase(),
            None => return Ok(vec![]),
        };
        let customers = self.customers.lock().await;
        Ok(customers.values().filter(|c| c.name_contains(&term)).cloned().collect())
    }

    async fn find_by_id(&self, id: CustomerId) -> DbResult<Option<Customer>> {
        self.check_failure().await?;
        Ok(self.customers.lock().await.get(&id).cloned())
    }

    async fn create(&self, candidate: Customer) -> DbResult<Option<Customer>> {
        self.check_failure().await?;
        if !candidate.id().is_unassigned() {
            return Ok(None);
        }

        let mut customers = self.customers.lock().await;
        if customers.contains_key(candidate.id()) {
            return Ok(None);
        }
        let max_id = customers.keys().next_back().copied().unwrap_or(CustomerId::UNASSIGNED);
        let id = match max_id.next() {
            Some(id) => id,
            None => {
                return Err(DbError::BackendError("Ran out of customer identifiers".to_owned()))
            }
        };
        let customer = candidate.with_id(id);
        customers.insert(id, customer.clone());
        Ok(Some(customer))
    }

    async fn update(&self, customer: &Customer) -> DbResult<bool> {
        self.check_failure().await?;
        match self.customers.lock().await.get_mut(customer.id()) {
            Some(existing) => {
                *existing = customer.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: CustomerId) -> DbResult<bool> {
        self.check_failure().await?;
        Ok(self.customers.lock().await.remove(&id).is_some())
    }
}
