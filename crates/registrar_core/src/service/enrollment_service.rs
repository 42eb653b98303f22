//! Enrollment consistency manager.
//!
//! # Responsibility
//! - Sole writer of `Student::course_refs` and `Course::student_refs`.
//! - Own cascade deletes of both aggregates.
//! - Compose one aggregate's relations from the other collection.
//!
//! # Invariants
//! - `s.course_refs` contains `c.id` iff `c.student_refs` contains `s.id`,
//!   except inside the window between the two writes of one call.
//! - Writes are issued student-side first, then course-side, never
//!   concurrently.
//! - Every operation is idempotent; retries are safe.
//! - A dangling reference never turns valid again because ids are never
//!   reused, so composition may drop it permanently.

use super::{ServiceError, ServiceResult};
use crate::model::course::{Course, CourseId};
use crate::model::student::{StudentId, StudentSummary};
use crate::repo::{CourseRepository, Filter, StudentRepository, Update};
use log::{error, info, warn};
use std::collections::HashMap;
use uuid::Uuid;

/// Enrollment manager over one student and one course collection.
pub struct EnrollmentManager<S: StudentRepository, C: CourseRepository> {
    students: S,
    courses: C,
}

impl<S: StudentRepository, C: CourseRepository> EnrollmentManager<S, C> {
    /// Creates a manager over the two collections it keeps in sync.
    pub fn new(students: S, courses: C) -> Self {
        Self { students, courses }
    }

    /// Enrolls a student in a course and returns the course state.
    ///
    /// # Contract
    /// - `NotFound` when either side is missing; the student is checked
    ///   first and nothing is written.
    /// - Already enrolled on both sides: no write, current course returned.
    /// - Otherwise the student set is extended first, then the course set.
    ///   An interruption in between leaves only the student-side reference,
    ///   which a repeated `enroll` or a `withdraw` reconciles.
    pub fn enroll(&self, student_id: StudentId, course_id: CourseId) -> ServiceResult<Course> {
        let student = self
            .students
            .find_by_id(student_id)?
            .ok_or_else(|| ServiceError::student_not_found(student_id))?;
        let course = self
            .courses
            .find_by_id(course_id)?
            .ok_or_else(|| ServiceError::course_not_found(course_id))?;

        let student_side = student.is_enrolled_in(course_id);
        let course_side = course.lists_student(student_id);
        if student_side && course_side {
            info!(
                "event=enroll module=enrollment status=skipped reason=already_enrolled student_id={student_id} course_id={course_id}"
            );
            return Ok(course);
        }

        if !student_side {
            self.students
                .update_by_id(student_id, &Update::AddRef(course_id))
                .map_err(|err| log_write_failure("enroll", "student", student_id, course_id, err))?
                .ok_or_else(|| ServiceError::student_not_found(student_id))?;
        }

        let course = if course_side {
            course
        } else {
            self.courses
                .update_by_id(course_id, &Update::AddRef(student_id))
                .map_err(|err| log_write_failure("enroll", "course", student_id, course_id, err))?
                .ok_or_else(|| ServiceError::course_not_found(course_id))?
        };

        info!(
            "event=enroll module=enrollment status=ok student_id={student_id} course_id={course_id} repaired={}",
            student_side != course_side
        );
        Ok(course)
    }

    /// Removes the enrollment on both sides.
    ///
    /// No existence check: a missing document or an absent reference is a
    /// no-op, so this also clears a one-sided leftover.
    pub fn withdraw(&self, student_id: StudentId, course_id: CourseId) -> ServiceResult<()> {
        let student_doc = self
            .students
            .update_by_id(student_id, &Update::PullRef(course_id))
            .map_err(|err| log_write_failure("withdraw", "student", student_id, course_id, err))?;
        let course_doc = self
            .courses
            .update_by_id(course_id, &Update::PullRef(student_id))
            .map_err(|err| log_write_failure("withdraw", "course", student_id, course_id, err))?;

        info!(
            "event=withdraw module=enrollment status=ok student_id={student_id} course_id={course_id} student_found={} course_found={}",
            student_doc.is_some(),
            course_doc.is_some()
        );
        Ok(())
    }

    /// Deletes a student, then pulls its id from every course.
    ///
    /// A failed pull after a successful delete is logged as a recoverable
    /// inconsistency and the call still succeeds.
    pub fn cascade_delete_student(&self, student_id: StudentId) -> ServiceResult<()> {
        if !self.students.delete_by_id(student_id)? {
            return Err(ServiceError::student_not_found(student_id));
        }

        match self.courses.update_many(
            &Filter::References(student_id),
            &Update::PullRef(student_id),
        ) {
            Ok(pulled) => info!(
                "event=cascade_delete module=enrollment status=ok entity=student id={student_id} pulled={pulled}"
            ),
            Err(err) => warn!(
                "event=cascade_delete module=enrollment status=partial entity=student id={student_id} classification=recoverable_inconsistency error={err}"
            ),
        }
        Ok(())
    }

    /// Deletes a course, then pulls its id from every student.
    pub fn cascade_delete_course(&self, course_id: CourseId) -> ServiceResult<()> {
        if !self.courses.delete_by_id(course_id)? {
            return Err(ServiceError::course_not_found(course_id));
        }

        match self
            .students
            .update_many(&Filter::References(course_id), &Update::PullRef(course_id))
        {
            Ok(pulled) => info!(
                "event=cascade_delete module=enrollment status=ok entity=course id={course_id} pulled={pulled}"
            ),
            Err(err) => warn!(
                "event=cascade_delete module=enrollment status=partial entity=course id={course_id} classification=recoverable_inconsistency error={err}"
            ),
        }
        Ok(())
    }

    /// Courses the student is enrolled in, in enrollment order.
    ///
    /// Dangling course ids are skipped and pulled from the student's set.
    pub fn compose_enrolled_courses(&self, student_id: StudentId) -> ServiceResult<Vec<Course>> {
        let student = self
            .students
            .find_by_id(student_id)?
            .ok_or_else(|| ServiceError::student_not_found(student_id))?;

        let found = self
            .courses
            .find_where(&Filter::IdIn(student.course_refs.clone()))?;
        let (courses, dangling) = order_by_refs(&student.course_refs, found, |course| course.id);

        for course_id in dangling {
            warn!(
                "event=dangling_ref module=enrollment status=repair owner=student owner_id={student_id} ref_id={course_id}"
            );
            if let Err(err) = self
                .students
                .update_by_id(student_id, &Update::PullRef(course_id))
            {
                warn!(
                    "event=dangling_ref module=enrollment status=error owner=student owner_id={student_id} ref_id={course_id} error={err}"
                );
            }
        }
        Ok(courses)
    }

    /// Students listed by the course, projected to name, code and email.
    ///
    /// Dangling student ids are skipped and pulled from the course's set.
    pub fn compose_enrolled_students(
        &self,
        course_id: CourseId,
    ) -> ServiceResult<Vec<StudentSummary>> {
        let course = self
            .courses
            .find_by_id(course_id)?
            .ok_or_else(|| ServiceError::course_not_found(course_id))?;

        let found = self
            .students
            .find_where(&Filter::IdIn(course.student_refs.clone()))?;
        let (students, dangling) = order_by_refs(&course.student_refs, found, |student| student.id);

        for student_id in dangling {
            warn!(
                "event=dangling_ref module=enrollment status=repair owner=course owner_id={course_id} ref_id={student_id}"
            );
            if let Err(err) = self
                .courses
                .update_by_id(course_id, &Update::PullRef(student_id))
            {
                warn!(
                    "event=dangling_ref module=enrollment status=error owner=course owner_id={course_id} ref_id={student_id} error={err}"
                );
            }
        }
        Ok(students.iter().map(|student| student.summary()).collect())
    }
}

/// Reorders `found` to follow `refs` and returns the ids that did not resolve.
fn order_by_refs<T>(refs: &[Uuid], found: Vec<T>, id_of: impl Fn(&T) -> Uuid) -> (Vec<T>, Vec<Uuid>) {
    let mut by_id: HashMap<Uuid, T> = found.into_iter().map(|doc| (id_of(&doc), doc)).collect();
    let mut ordered = Vec::with_capacity(refs.len());
    let mut dangling = Vec::new();
    for id in refs {
        match by_id.remove(id) {
            Some(doc) => ordered.push(doc),
            None => dangling.push(*id),
        }
    }
    (ordered, dangling)
}

fn log_write_failure(
    operation: &'static str,
    side: &'static str,
    student_id: StudentId,
    course_id: CourseId,
    err: crate::repo::RepoError,
) -> ServiceError {
    error!(
        "event={operation} module=enrollment status=error side={side} student_id={student_id} course_id={course_id} error={err}"
    );
    err.into()
}

#[cfg(test)]
mod tests {
    use super::order_by_refs;
    use uuid::Uuid;

    #[test]
    fn order_by_refs_follows_reference_order_and_reports_missing() {
        let (a, b, missing) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let refs = vec![b, missing, a];
        let (ordered, dangling) = order_by_refs(&refs, vec![a, b], |id| *id);
        assert_eq!(ordered, vec![b, a]);
        assert_eq!(dangling, vec![missing]);
    }

    #[test]
    fn order_by_refs_of_empty_set_is_empty() {
        let (ordered, dangling) = order_by_refs::<Uuid>(&[], Vec::new(), |id| *id);
        assert!(ordered.is_empty());
        assert!(dangling.is_empty());
    }
}
