//! Result type alias for Caravel
//!
//! This module provides a convenient Result type alias that uses CaravelError
//! as the error type.

use super::errors::CaravelError;

/// Result type alias for Caravel operations
///
/// This is a convenience type alias that uses `CaravelError` as the error type.
/// Use this throughout the codebase for fallible operations.
///
/// # Examples
///
/// ```
/// use caravel::domain::result::Result;
/// use caravel::domain::errors::CaravelError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CaravelError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CaravelError>;
