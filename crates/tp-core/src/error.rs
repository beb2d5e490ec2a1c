//! Core error types for Timepiece RS
//!
//! Every library crate converts its own failures into [`TpError`] at the
//! service boundary.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::traits::Id;

/// Core error type for all Timepiece operations
#[derive(Error, Debug)]
pub enum TpError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Contract {contract_id} has no weeks remaining")]
    NoWeeksRemaining { contract_id: Id },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TpError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        TpError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            TpError::NotFound { .. } => "not_found",
            TpError::Validation(_) => "validation_failed",
            TpError::Conflict { .. } => "conflict",
            TpError::Database(_) => "database_error",
            TpError::Config(_) => "configuration_error",
            TpError::NoWeeksRemaining { .. } => "no_weeks_remaining",
            TpError::Internal(_) => "internal_error",
        }
    }
}

/// Validation errors collection, grouped by attribute
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    /// Field-specific errors: field_name -> Vec<error_messages>
    pub errors: BTreeMap<String, Vec<String>>,
    /// Base errors not tied to a specific field
    pub base_errors: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn add_base(&mut self, message: impl Into<String>) {
        self.base_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.base_errors.is_empty()
    }

    /// Check if there are errors for a specific field
    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Get errors for a specific field
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.base_errors.extend(other.base_errors);
    }

    pub fn full_messages(&self) -> Vec<String> {
        let mut messages = self.base_errors.clone();
        for (field, field_messages) in &self.errors {
            for msg in field_messages {
                messages.push(format!("{} {}", field, msg));
            }
        }
        messages
    }

    /// `Ok(())` when empty, otherwise the collected errors
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}
