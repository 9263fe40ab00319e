//! Result type alias for AzLearn

use super::errors::AzLearnError;

/// Result type alias for AzLearn operations
///
/// # Examples
///
/// ```
/// use azlearn::domain::result::Result;
/// use azlearn::domain::errors::AzLearnError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(AzLearnError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AzLearnError>;
