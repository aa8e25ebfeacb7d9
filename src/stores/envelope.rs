//! Typed serialization contract for cached values.
//!
//! The cache layer stores opaque strings. To keep it from ever handing back
//! an ambiguously-typed value, every cached customer is wrapped in an
//! envelope carrying an explicit schema tag:
//!
//! ```json
//! {"schema": "customer.v1", "record": {"id": 1, "name": "Ada", "email": "ada@x.com"}}
//! ```
//!
//! A payload whose tag is not the current [`SCHEMA`] decodes to
//! [`StoreError::SchemaMismatch`]; the read path treats that as a cache miss
//! rather than trusting a value of unknown shape.

use serde::{Deserialize, Serialize};

use super::traits::StoreError;
use crate::customer::Customer;

/// Schema tag for the current cached-customer layout.
pub const SCHEMA: &str = "customer.v1";

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    schema: String,
    record: Customer,
}

/// Wrap a customer in the current envelope and serialize it.
pub fn encode(customer: &Customer) -> Result<String, StoreError> {
    let envelope = Envelope {
        schema: SCHEMA.to_string(),
        record: customer.clone(),
    };
    serde_json::to_string(&envelope).map_err(|e| StoreError::Backend(e.to_string()))
}

/// Decode a cached payload, verifying its schema tag.
///
/// `key` is only used for error context.
pub fn decode(key: &str, payload: &str) -> Result<Customer, StoreError> {
    let envelope: Envelope = serde_json::from_str(payload).map_err(|e| {
        StoreError::SchemaMismatch {
            key: key.to_string(),
            found: format!("<undecodable: {}>", e),
            expected: SCHEMA,
        }
    })?;

    if envelope.schema != SCHEMA {
        return Err(StoreError::SchemaMismatch {
            key: key.to_string(),
            found: envelope.schema,
            expected: SCHEMA,
        });
    }

    Ok(envelope.record)
}
