//! Layer flattening for the merged settings view.
//!
//! Maps are merged key by key with the upper layer winning; any other value
//! (scalars, sequences) in the upper layer replaces the lower one outright.
//! An upper `null` leaves the lower value in place.

use serde_json::{Map, Value};

/// Merge `upper` into `lower` in place.
pub fn merge_into(lower: &mut Value, upper: Value) {
    match (lower, upper) {
        (_, Value::Null) => {}
        (Value::Object(lower_map), Value::Object(upper_map)) => {
            for (key, upper_value) in upper_map {
                match lower_map.get_mut(&key) {
                    Some(lower_value) => merge_into(lower_value, upper_value),
                    None => {
                        if !upper_value.is_null() {
                            lower_map.insert(key, upper_value);
                        }
                    }
                }
            }
        }
        (lower, upper) => *lower = upper,
    }
}

/// Flatten layers given lowest precedence first.
///
/// A layer whose root is not a map has no addressable keys and contributes
/// nothing. The result is always a map, even when every layer is empty.
pub fn flatten_layers(layers: impl IntoIterator<Item = Value>) -> Value {
    let mut merged = Value::Object(Map::new());
    for layer in layers.into_iter().filter(Value::is_object) {
        merge_into(&mut merged, layer);
    }
    merged
}
