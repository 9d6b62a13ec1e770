//! Input validation for record fields
//!
//! The store and collection manager accept any string; these checks run at
//! the input boundary (the CLI) before a record is created or edited.

use std::fmt;
use std::ops::RangeInclusive;

use thiserror::Error;

use crate::models::{RecordFields, RecordPatch};

/// Allowed title length, in characters
pub const TITLE_LEN: RangeInclusive<usize> = 2..=64;

/// Allowed description length, in characters
pub const DESCRIPTION_LEN: RangeInclusive<usize> = 2..=2500;

/// Record field being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Description,
}

impl Field {
    fn bounds(self) -> &'static RangeInclusive<usize> {
        match self {
            Field::Title => &TITLE_LEN,
            Field::Description => &DESCRIPTION_LEN,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => write!(f, "Title"),
            Field::Description => write!(f, "Description"),
        }
    }
}

/// A field value outside its allowed length
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be at least {min} characters.")]
    TooShort { field: Field, min: usize },

    #[error("Can not exceed max {max} characters.")]
    TooLong { field: Field, max: usize },
}

impl ValidationError {
    /// Field that failed
    pub fn field(&self) -> Field {
        match self {
            ValidationError::TooShort { field, .. } | ValidationError::TooLong { field, .. } => {
                *field
            }
        }
    }
}

/// Check a single field value
pub fn validate_field(field: Field, value: &str) -> Result<(), ValidationError> {
    let bounds = field.bounds();
    let len = value.chars().count();

    if len < *bounds.start() {
        return Err(ValidationError::TooShort {
            field,
            min: *bounds.start(),
        });
    }
    if len > *bounds.end() {
        return Err(ValidationError::TooLong {
            field,
            max: *bounds.end(),
        });
    }
    Ok(())
}

/// Check the fields of a new record
pub fn validate_fields(fields: &RecordFields) -> Result<(), ValidationError> {
    validate_field(Field::Title, &fields.title)?;
    validate_field(Field::Description, &fields.description)
}

/// Check the fields a patch would change; absent fields are not checked
pub fn validate_patch(patch: &RecordPatch) -> Result<(), ValidationError> {
    if let Some(ref title) = patch.title {
        validate_field(Field::Title, title)?;
    }
    if let Some(ref description) = patch.description {
        validate_field(Field::Description, description)?;
    }
    Ok(())
}
