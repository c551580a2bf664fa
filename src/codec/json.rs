//! JSON request bodies.

use serde::Serialize;

use crate::types::extension::WireFields;
use crate::{Error, ErrorContext, Result};

/// Reject extension keys that would shadow a declared field on the wire.
pub fn check_collisions<T: WireFields + ?Sized>(value: &T) -> Result<()> {
    let keys = value.colliding_extension_keys();
    match keys.first() {
        None => Ok(()),
        Some(first) => Err(Error::validation_with_context(
            "extension key collides with a declared field",
            ErrorContext::new()
                .with_field_path(first.clone())
                .with_details(keys.join(", "))
                .with_source("json_encoder"),
        )),
    }
}

/// Encode a request body. Extension keys are emitted as siblings of the declared fields.
pub fn encode<T: Serialize + WireFields + ?Sized>(value: &T) -> Result<Vec<u8>> {
    check_collisions(value)?;
    Ok(serde_json::to_vec(value)?)
}
