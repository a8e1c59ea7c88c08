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

//! Business logic for the service.

use crate::model::Customer;
use crate::repository::CustomerRepository;
use std::sync::Arc;

mod customer;
mod customers;
#[cfg(test)]
pub(crate) mod testutils;

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot", so these operations consume
/// the driver in an attempt to minimize the possibility of executing two operations.
///
/// Requests that violate the business rules are rejected with `None` or `false`, not with an
/// error, and the reason is logged at the debug level.
#[derive(Clone)]
pub struct Driver {
    /// The repository that the driver uses for persistence.
    repo: Arc<dyn CustomerRepository + Send + Sync>,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub fn new(repo: Arc<dyn CustomerRepository + Send + Sync>) -> Self {
        Self { repo }
    }
}

/// Validates the fields of `customer` before persisting it.
///
/// `is_new_record` indicates whether `customer` is about to be created, in which case it must not
/// carry an identifier yet, or updated, in which case it must.  Returns the violated rule on
/// failure.
pub(crate) fn check_fields(customer: &Customer, is_new_record: bool) -> Result<(), &'static str> {
    match (customer.id().is_unassigned(), is_new_record) {
        (true, false) => return Err("Existing customers must have an id"),
        (false, true) => return Err("New customers cannot have an id"),
        (true, true) | (false, false) => (),
    }

    if customer.first_name().trim().is_empty() {
        return Err("First name cannot be blank");
    }
    if customer.last_name().trim().is_empty() {
        return Err("Last name cannot be blank");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CustomerId;
    use time::macros::date;

    /// Syntactic sugar to instantiate a customer.
    fn customer(id: i32, first_name: &str, last_name: &str) -> Customer {
        Customer::new(
            CustomerId::new(id),
            first_name.to_owned(),
            last_name.to_owned(),
            date!(1983 - 01 - 01),
        )
    }

    #[test]
    fn test_check_fields_new_record() {
        assert_eq!(Ok(()), check_fields(&customer(0, "Bill", "Bob"), true));
        assert_eq!(
            Err("New customers cannot have an id"),
            check_fields(&customer(8, "Bill", "Bob"), true)
        );
    }

    #[test]
    fn test_check_fields_existing_record() {
        assert_eq!(Ok(()), check_fields(&customer(8, "Bill", "Bob"), false));
        assert_eq!(
            Err("Existing customers must have an id"),
            check_fields(&customer(0, "Bill", "Bob"), false)
        );
    }

    #[test]
    fn test_check_fields_blank_names() {
        for is_new_record in [true, false] {
            let id = if is_new_record { 0 } else { 1 };
            assert_eq!(
                Err("First name cannot be blank"),
                check_fields(&customer(id, "", "Bob"), is_new_record)
            );
            assert_eq!(
                Err("First name cannot be blank"),
                check_fields(&customer(id, " \t\n", "Bob"), is_new_record)
            );
            assert_eq!(
                Err("Last name cannot be blank"),
                check_fields(&customer(id, "Bill", ""), is_new_record)
            );
            assert_eq!(
                Err("Last name cannot be blank"),
                check_fields(&customer(id, "Bill", "   "), is_new_record)
            );
        }
    }

    #[test]
    fn test_check_fields_id_checked_first() {
        assert_eq!(
            Err("New customers cannot have an id"),
            check_fields(&customer(3, "", ""), true)
        );
    }
}
