//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate repository failures into the stable `ServiceError` kinds.
//!
//! # Invariants
//! - Only `EnrollmentManager` writes reference sets or deletes documents.
//! - `NotFound`, `Conflict` and `Validation` keep their kind across layers;
//!   every other failure becomes `Internal`.

pub mod course_service;
pub mod enrollment_service;
pub mod student_service;

use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Aggregate named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Student,
    Course,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Course => "course",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure returned by every service operation.
#[derive(Debug)]
pub enum ServiceError {
    NotFound { entity: EntityKind, id: Uuid },
    Conflict(String),
    Validation(ValidationError),
    /// Storage failure. `Display` stays opaque; details live in `source()`.
    Internal(RepoError),
}

impl ServiceError {
    pub(crate) fn student_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: EntityKind::Student,
            id,
        }
    }

    pub(crate) fn course_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: EntityKind::Course,
            id,
        }
    }

    /// Stable machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }

    /// Fixed status table applied by an HTTP boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Validation(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} with id {id} not found"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Internal(_) => write!(f, "internal storage failure"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Internal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Internal(other),
        }
    }
}
