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

//! High-level data types.

use derive_getters::Getters;
use derive_more::{Constructor, Display};
use serde::{Deserialize, Deserializer, Serialize};
use time::Date;

time::serde::format_description!(date_format, Date, "[year]-[month]-[day]");

/// Newtype pattern for the identifiers of customers.
///
/// The zero value is reserved to represent customers that have not been persisted yet.
#[derive(
    Clone, Copy, Constructor, Debug, Default, Deserialize, Display, Eq, Hash, Ord, PartialEq,
    PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct CustomerId(i32);

impl CustomerId {
    /// Identifier carried by customers that have not been assigned one yet.
    pub const UNASSIGNED: CustomerId = CustomerId(0);

    /// Returns true if this identifier has not been assigned by the repository.
    pub fn is_unassigned(self) -> bool {
        self == Self::UNASSIGNED
    }

    /// Returns the identifier that follows this one, or `None` if the space is exhausted.
    pub fn next(self) -> Option<CustomerId> {
        self.0.checked_add(1).map(CustomerId)
    }

    /// Returns the identifier as an `i32`.
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

/// Deserializes a name field treating `null` as the empty string.
fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A customer record.
///
/// Names are not validated here: the persistence layer accepts any value and it is the driver's
/// responsibility to reject blank names.
#[derive(Clone, Constructor, Debug, Deserialize, Eq, Getters, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique identifier of the customer, or `CustomerId::UNASSIGNED` for new records.
    #[serde(default)]
    id: CustomerId,

    /// Given name.
    #[serde(default, deserialize_with = "deserialize_name")]
    first_name: String,

    /// Family name.
    #[serde(default, deserialize_with = "deserialize_name")]
    last_name: String,

    /// Date of birth, serialized as `YYYY-MM-DD`.
    #[serde(with = "date_format")]
    date_of_birth: Date,
}

impl Customer {
    /// Consumes the customer and returns a copy with its identifier set to `id`.
    pub fn with_id(self, id: CustomerId) -> Self {
        Self { id, ..self }
    }

    /// Returns true if either name contains `lowercase_term`.  The term must already be in
    /// lowercase form.
    pub(crate) fn name_contains(&self, lowercase_term: &str) -> bool {
        self.first_name.to_lowercase().contains(lowercase_term)
            || self.last_name.to_lowercase().contains(lowercase_term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn test_customer_id_next() {
        assert_eq!(CustomerId::new(1), CustomerId::UNASSIGNED.next().unwrap());
        assert_eq!(CustomerId::new(43), CustomerId::new(42).next().unwrap());
        assert_eq!(None, CustomerId::new(i32::MAX).next());
    }

    #[test]
    fn test_customer_id_is_unassigned() {
        assert!(CustomerId::UNASSIGNED.is_unassigned());
        assert!(CustomerId::default().is_unassigned());
        assert!(!CustomerId::new(5).is_unassigned());
    }

    #[test]
    fn test_customer_ser() {
        let customer = Customer::new(
            CustomerId::new(7),
            "Heath".to_owned(),
            "Smith".to_owned(),
            date!(1986 - 01 - 01),
        );
        assert_eq!(
            json!({
                "id": 7,
                "firstName": "Heath",
                "lastName": "Smith",
                "dateOfBirth": "1986-01-01",
            }),
            serde_json::to_value(&customer).unwrap()
        );
    }

    #[test]
    fn test_customer_de_null_and_missing_fields() {
        let customer: Customer = serde_json::from_value(json!({
            "firstName": null,
            "dateOfBirth": "1983-01-01",
        }))
        .unwrap();
        assert_eq!(
            Customer::new(
                CustomerId::UNASSIGNED,
                "".to_owned(),
                "".to_owned(),
                date!(1983 - 01 - 01)
            ),
            customer
        );
    }

    #[test]
    fn test_customer_de_bad_date() {
        let err = serde_json::from_value::<Customer>(json!({
            "id": 1,
            "firstName": "A",
            "lastName": "B",
            "dateOfBirth": "01/01/1983",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("year"), "Unexpected error: {}", err);
    }

    #[test]
    fn test_customer_with_id() {
        let customer = Customer::new(
            CustomerId::UNASSIGNED,
            "A".to_owned(),
            "B".to_owned(),
            date!(2000 - 01 - 01),
        );
        assert_eq!(CustomerId::new(3), *customer.with_id(CustomerId::new(3)).id());
    }

    #[test]
    fn test_customer_name_contains() {
        let customer = Customer::new(
            CustomerId::new(1),
            "Alan".to_owned(),
            "Smith".to_owned(),
            date!(2000 - 01 - 01),
        );
        assert!(customer.name_contains("alan"));
        assert!(customer.name_contains("mit"));
        assert!(customer.name_contains(""));
        assert!(!customer.name_contains("bob"));
        assert!(!customer.name_contains("alan smith"));
    }
}
