pub mod attribute_value;

// Re-export all public types
pub use attribute_value::{AttributeType, AttributeValue};
