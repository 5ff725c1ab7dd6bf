//! Result type alias for fhirflat
//!
//! This module provides a convenient Result type alias that uses FlatError
//! as the error type.

use super::errors::FlatError;

/// Result type alias for fhirflat operations
///
/// # Examples
///
/// ```
/// use fhirflat::domain::result::Result;
/// use fhirflat::domain::errors::FlatError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(FlatError::Extraction("record root is not an object".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, FlatError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::FlatError;

    #[test]
    fn test_result_ok() {
        let result: Result<i32> = Ok(42);
        assert!(result.is_ok());
    }

    #[test]
    fn test_result_err() {
        let result: Result<i32> = Err(FlatError::Io("test error".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
