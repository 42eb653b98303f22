//! Course aggregate.
//!
//! # Invariants
//! - `name` is unique across the collection (exact match, enforced by storage).
//! - `student_refs` is a set kept in insertion order; only the enrollment
//!   manager mutates it.

use super::student::StudentId;
use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a course document.
pub type CourseId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseType {
    Technical,
    #[serde(rename = "Non-Technical")]
    NonTechnical,
    Language,
    #[serde(rename = "Soft Skills")]
    SoftSkills,
}

/// Canonical course document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub description: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: CourseType,
    /// Free-form duration label, e.g. `3 months`.
    pub duration: String,
    pub topics: Vec<String>,
    /// Students this course lists as enrolled.
    pub student_refs: Vec<StudentId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Course {
    /// Builds a fresh document from create input with a generated ID and an
    /// empty reference set.
    pub fn from_new(input: NewCourse) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            kind: input.kind,
            duration: input.duration,
            topics: input.topics,
            student_refs: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        require_text("duration", &self.duration)?;
        validate_topics(&self.topics)
    }

    pub fn lists_student(&self, student_id: StudentId) -> bool {
        self.student_refs.contains(&student_id)
    }
}

/// Create input for a course. Carries no reference fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCourse {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CourseType,
    pub duration: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Partial update for a course. `topics` replaces the whole list when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CoursePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<CourseType>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
}

impl CoursePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = self.name.as_deref() {
            require_text("name", name)?;
        }
        if let Some(description) = self.description.as_deref() {
            require_text("description", description)?;
        }
        if let Some(duration) = self.duration.as_deref() {
            require_text("duration", duration)?;
        }
        if let Some(topics) = self.topics.as_ref() {
            validate_topics(topics)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.kind.is_none()
            && self.duration.is_none()
            && self.topics.is_none()
    }

    /// Applies present fields onto `course`, leaving references untouched.
    pub fn apply_to(&self, course: &mut Course) {
        if let Some(name) = self.name.as_ref() {
            course.name = name.clone();
        }
        if let Some(description) = self.description.as_ref() {
            course.description = description.clone();
        }
        if let Some(kind) = self.kind {
            course.kind = kind;
        }
        if let Some(duration) = self.duration.as_ref() {
            course.duration = duration.clone();
        }
        if let Some(topics) = self.topics.as_ref() {
            course.topics = topics.clone();
        }
    }
}

fn validate_topics(topics: &[String]) -> Result<(), ValidationError> {
    for (index, topic) in topics.iter().enumerate() {
        if topic.trim().is_empty() {
            return Err(ValidationError::EmptyListItem {
                field: "topics",
                index,
            });
        }
    }
    Ok(())
}
