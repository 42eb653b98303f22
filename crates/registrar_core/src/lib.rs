//! Core domain logic for the student registrar.
//! This crate owns the student/course enrollment invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RegistrarConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::course::{Course, CourseId, CoursePatch, CourseType, NewCourse};
pub use model::student::{
    Address, AddressType, Gender, NewStudent, Parents, Student, StudentId, StudentPatch,
    StudentSummary,
};
pub use model::ValidationError;
pub use repo::course_repo::SqliteCourseRepository;
pub use repo::student_repo::SqliteStudentRepository;
pub use repo::{
    CourseRepository, DocumentRepository, Filter, RepoError, RepoResult, StudentRepository,
    Update,
};
pub use service::course_service::CourseService;
pub use service::enrollment_service::EnrollmentManager;
pub use service::student_service::StudentService;
pub use service::{EntityKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
