use crate::core::errors::AttributeError;
use serde::{Deserialize, Serialize};

/// Declared value type of a producer or consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    Scalar,
    Vector,
    Matrix,
    Integer,
    Boolean,
    Text,
}

impl AttributeType {
    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::Scalar => "scalar",
            AttributeType::Vector => "vector",
            AttributeType::Matrix => "matrix",
            AttributeType::Integer => "integer",
            AttributeType::Boolean => "boolean",
            AttributeType::Text => "text",
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Value carried across a coupling, tagged with its type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl AttributeValue {
    /// Get the type tag of the contained value
    pub fn value_type(&self) -> AttributeType {
        match self {
            AttributeValue::Scalar(_) => AttributeType::Scalar,
            AttributeValue::Vector(_) => AttributeType::Vector,
            AttributeValue::Matrix(_) => AttributeType::Matrix,
            AttributeValue::Integer(_) => AttributeType::Integer,
            AttributeValue::Boolean(_) => AttributeType::Boolean,
            AttributeValue::Text(_) => AttributeType::Text,
        }
    }

    /// Check if the contained value is of the given type
    pub fn is_type(&self, value_type: AttributeType) -> bool {
        self.value_type() == value_type
    }

    pub fn as_scalar(&self) -> Result<f64, AttributeError> {
        match self {
            AttributeValue::Scalar(v) => Ok(*v),
            other => Err(other.mismatch(AttributeType::Scalar)),
        }
    }

    pub fn as_vector(&self) -> Result<&[f64], AttributeError> {
        match self {
            AttributeValue::Vector(v) => Ok(v),
            other => Err(other.mismatch(AttributeType::Vector)),
        }
    }

    pub fn into_vector(self) -> Result<Vec<f64>, AttributeError> {
        match self {
            AttributeValue::Vector(v) => Ok(v),
            other => Err(other.mismatch(AttributeType::Vector)),
        }
    }

    pub fn as_matrix(&self) -> Result<&[Vec<f64>], AttributeError> {
        match self {
            AttributeValue::Matrix(m) => Ok(m),
            other => Err(other.mismatch(AttributeType::Matrix)),
        }
    }

    pub fn as_integer(&self) -> Result<i64, AttributeError> {
        match self {
            AttributeValue::Integer(v) => Ok(*v),
            other => Err(other.mismatch(AttributeType::Integer)),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, AttributeError> {
        match self {
            AttributeValue::Boolean(v) => Ok(*v),
            other => Err(other.mismatch(AttributeType::Boolean)),
        }
    }

    pub fn as_text(&self) -> Result<&str, AttributeError> {
        match self {
            AttributeValue::Text(v) => Ok(v),
            other => Err(other.mismatch(AttributeType::Text)),
        }
    }

    fn mismatch(&self, expected: AttributeType) -> AttributeError {
        AttributeError::ValueTypeMismatch {
            expected,
            found: self.value_type(),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Scalar(value)
    }
}

impl From<Vec<f64>> for AttributeValue {
    fn from(value: Vec<f64>) -> Self {
        AttributeValue::Vector(value)
    }
}

impl From<Vec<Vec<f64>>> for AttributeValue {
    fn from(value: Vec<Vec<f64>>) -> Self {
        AttributeValue::Matrix(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_value_basic() {
        let value = AttributeValue::from(5.0);
        assert_eq!(value.as_scalar().unwrap(), 5.0);
        assert!(value.is_type(AttributeType::Scalar));
        assert!(!value.is_type(AttributeType::Vector));
    }

    #[test]
    fn test_attribute_value_type_mismatch() {
        let value = AttributeValue::from(vec![1.0, 2.0]);
        let result = value.as_scalar();
        assert_eq!(
            result.unwrap_err(),
            AttributeError::ValueTypeMismatch {
                expected: AttributeType::Scalar,
                found: AttributeType::Vector,
            }
        );
    }
}
