//! Validation helpers for configuration values
//!
//! Each config section implements [`ConfigSection`], which bundles validation
//! with merge support for override chains.

pub use crate::error::ValidationError;

/// A configuration section that can validate and merge itself
pub trait ConfigSection: Default {
    /// Validates the section, returning every problem found
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Merges `other` into this section; values from `other` win
    fn merge(&mut self, other: Self);

    /// Section name used as the prefix in error field paths
    fn section_name(&self) -> &'static str;
}

/// Common validators for config values
pub struct Validator;

impl Validator {
    /// Validates that a numeric value lies in `[min, max]`
    ///
    /// NaN never satisfies the range.
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(ValidationError::with_value(
                field,
                format!("must be between {} and {}", min, max),
                value,
            ))
        }
    }

    /// Collects multiple validation results into a single result
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = results.into_iter().filter_map(|r| r.err()).collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
