//! Customer entity types.
//!
//! The [`Customer`] is the record that flows through every store: the
//! relational record store (source of truth), the expiring cache, the
//! search index, and change events.

use serde::{Deserialize, Serialize};

/// Opaque server-assigned identity. Assigned by the record store on create,
/// immutable afterwards, never reused after a delete.
pub type CustomerId = i64;

/// A persisted customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Server-assigned identity
    pub id: CustomerId,
    /// Display name (non-empty)
    pub name: String,
    /// Contact email (non-empty; uniqueness is left to the record store schema)
    pub email: String,
}

impl Customer {
    /// Rebind this record to a different id.
    ///
    /// Used by the update path, where the id addressed by the caller always
    /// wins over whatever id the payload happens to carry.
    #[must_use]
    pub fn with_id(mut self, id: CustomerId) -> Self {
        self.id = id;
        self
    }
}

/// A customer that has not been persisted yet (no id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
}

impl NewCustomer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Materialize into a full record once the record store has assigned an id.
    #[must_use]
    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name,
            email: self.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_rebinds() {
        let customer = Customer {
            id: 99,
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
        };

        let rebound = customer.with_id(1);
        assert_eq!(rebound.id, 1);
        assert_eq!(rebound.name, "Ada");
    }

    #[test]
    fn test_new_customer_into_customer() {
        let new = NewCustomer::new("Ada", "ada@x.com");
        let customer = new.into_customer(7);

        assert_eq!(customer.id, 7);
        assert_eq!(customer.name, "Ada");
        assert_eq!(customer.email, "ada@x.com");
    }

    #[test]
    fn test_serialize_round_trip() {
        let customer = Customer {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
        };

        let json = serde_json::to_string(&customer).unwrap();
        let back: Customer = serde_json::from_str(&json).unwrap();

        assert_eq!(back, customer);
    }
}
