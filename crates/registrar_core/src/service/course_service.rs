//! Course use-case service.
//!
//! # Invariants
//! - Course names are unique by exact name only.
//! - Never mutates `student_refs`.

use super::{ServiceError, ServiceResult};
use crate::model::course::{Course, CourseId, CoursePatch, NewCourse};
use crate::model::ValidationError;
use crate::repo::{CourseRepository, Filter, Update};
use log::{info, warn};

/// Course service facade over a course collection.
pub struct CourseService<R: CourseRepository> {
    repo: R,
}

impl<R: CourseRepository> CourseService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a course with an empty student set.
    ///
    /// Duplicate names are rejected up front, and again by the storage
    /// constraint if two creates race.
    pub fn create_course(&self, input: NewCourse) -> ServiceResult<Course> {
        let course = Course::from_new(input);
        course.validate()?;

        let name = course.name.trim();
        let duplicate = !self
            .repo
            .find_where(&Filter::NameEquals(name.to_string()))?
            .is_empty();
        if duplicate {
            warn!("event=course_create module=service status=error error_code=conflict");
            return Err(ServiceError::Conflict(format!(
                "course with name `{name}` already exists"
            )));
        }

        let created = self.repo.insert(&course)?;
        info!(
            "event=course_create module=service status=ok course_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn list_courses(&self) -> ServiceResult<Vec<Course>> {
        Ok(self.repo.find_where(&Filter::All)?)
    }

    pub fn get_course(&self, id: CourseId) -> ServiceResult<Course> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::course_not_found(id))
    }

    /// Applies a partial update. A rename onto an existing name is a `Conflict`.
    pub fn update_course(&self, id: CourseId, patch: CoursePatch) -> ServiceResult<Course> {
        patch.validate()?;
        self.repo
            .update_by_id(id, &Update::Set(patch))?
            .ok_or_else(|| ServiceError::course_not_found(id))
    }

    /// Case-insensitive substring search over every topic of every course.
    pub fn find_courses_by_topic(&self, fragment: &str) -> ServiceResult<Vec<Course>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ValidationError::EmptyField("topic").into());
        }
        Ok(self
            .repo
            .find_where(&Filter::TopicContains(fragment.to_string()))?)
    }
}
