//! Student use-case service.
//!
//! # Responsibility
//! - Provide create/read/search/update entry points for students.
//! - Reject input before it reaches persistence.
//!
//! # Invariants
//! - Never mutates `course_refs`; patches cannot express reference changes.
//! - Deletion is not offered here; see `EnrollmentManager::cascade_delete_student`.

use super::{ServiceError, ServiceResult};
use crate::model::course::CourseId;
use crate::model::student::{NewStudent, Student, StudentId, StudentPatch};
use crate::model::ValidationError;
use crate::repo::{Filter, StudentRepository, Update};
use log::info;

/// Student service facade over a student collection.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a student with an empty course set.
    ///
    /// Returns `Conflict` when `student_code` is already taken.
    pub fn create_student(&self, input: NewStudent) -> ServiceResult<Student> {
        let student = Student::from_new(input);
        student.validate()?;
        let created = self.repo.insert(&student)?;
        info!(
            "event=student_create module=service status=ok student_id={}",
            created.id
        );
        Ok(created)
    }

    /// Lists all students in insertion order.
    pub fn list_students(&self) -> ServiceResult<Vec<Student>> {
        Ok(self.repo.find_where(&Filter::All)?)
    }

    /// Case-insensitive substring search on student name.
    ///
    /// No match yields an empty list, not `NotFound`.
    pub fn find_students_by_name(&self, fragment: &str) -> ServiceResult<Vec<Student>> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return Err(ValidationError::EmptyField("name").into());
        }
        Ok(self
            .repo
            .find_where(&Filter::NameContains(fragment.to_string()))?)
    }

    pub fn get_student(&self, id: StudentId) -> ServiceResult<Student> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::student_not_found(id))
    }

    /// Applies a partial update and returns the stored state.
    pub fn update_student(&self, id: StudentId, patch: StudentPatch) -> ServiceResult<Student> {
        patch.validate()?;
        self.repo
            .update_by_id(id, &Update::Set(patch))?
            .ok_or_else(|| ServiceError::student_not_found(id))
    }

    /// Students whose own course set lists `course_id`.
    ///
    /// This is the student-side view and may briefly disagree with the
    /// course's `student_refs` after an interrupted enrollment.
    pub fn find_students_by_course(&self, course_id: CourseId) -> ServiceResult<Vec<Student>> {
        Ok(self.repo.find_where(&Filter::References(course_id))?)
    }
}
