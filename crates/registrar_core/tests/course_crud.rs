mod common;

use common::new_course;
use registrar_core::db::open_db_in_memory;
use registrar_core::{
    CoursePatch, CourseService, CourseType, DocumentRepository, EntityKind, Filter, RepoError,
    ServiceError, SqliteCourseRepository, SqliteStudentRepository, ValidationError,
};
use uuid::Uuid;

#[test]
fn create_course_starts_with_empty_student_set() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);

    let created = service
        .create_course(new_course("Rust", &["ownership", "traits"]))
        .unwrap();

    assert!(created.student_refs.is_empty());
    assert_eq!(created.topics, vec!["ownership", "traits"]);
    assert_eq!(service.get_course(created.id).unwrap(), created);
}

#[test]
fn duplicate_name_is_conflict_but_description_may_repeat() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    service.create_course(new_course("Rust", &[])).unwrap();

    let err = service.create_course(new_course("Rust", &[])).unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let mut other = new_course("Rust Advanced", &[]);
    other.description = "Rust fundamentals".to_string();
    service.create_course(other).unwrap();
    assert_eq!(service.list_courses().unwrap().len(), 2);
}

#[test]
fn padded_duplicate_name_is_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    service.create_course(new_course("Rust", &[])).unwrap();

    let err = service.create_course(new_course("  Rust ", &[])).unwrap_err();

    assert_eq!(err.error_code(), "conflict");
    assert_eq!(
        repo.find_where(&Filter::NameEquals(" Rust ".to_string()))
            .unwrap()
            .len(),
        1
    );
    assert!(repo
        .find_where(&Filter::NameEquals("rust".to_string()))
        .unwrap()
        .is_empty());
}

#[test]
fn topic_search_folds_non_ascii_case() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    service
        .create_course(new_course("French", &["Écriture", "Grammaire"]))
        .unwrap();

    let hits = service.find_courses_by_topic("écri").unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "French");
}

#[test]
fn storage_rejects_duplicate_name_without_service_precheck() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    CourseService::new(&repo)
        .create_course(new_course("SQL", &[]))
        .unwrap();

    let duplicate = registrar_core::Course::from_new(new_course("SQL", &[]));
    let err = repo.insert(&duplicate).unwrap_err();

    assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn rename_onto_existing_name_is_conflict() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    service.create_course(new_course("Rust", &[])).unwrap();
    let go = service.create_course(new_course("Go", &[])).unwrap();

    let err = service
        .update_course(
            go.id,
            CoursePatch {
                name: Some("Rust".to_string()),
                ..CoursePatch::default()
            },
        )
        .unwrap_err();

    assert_eq!(err.error_code(), "conflict");
    assert_eq!(service.get_course(go.id).unwrap().name, "Go");
}

#[test]
fn update_course_replaces_present_fields_only() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    let course = service
        .create_course(new_course("Rust", &["ownership"]))
        .unwrap();

    let updated = service
        .update_course(
            course.id,
            CoursePatch {
                kind: Some(CourseType::Language),
                topics: Some(vec!["lifetimes".to_string(), "macros".to_string()]),
                ..CoursePatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Rust");
    assert_eq!(updated.kind, CourseType::Language);
    assert_eq!(updated.topics, vec!["lifetimes", "macros"]);
    assert_eq!(updated.duration, course.duration);
}

#[test]
fn update_course_rejects_blank_topic_and_missing_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    let course = service.create_course(new_course("Rust", &[])).unwrap();

    let err = service
        .update_course(
            course.id,
            CoursePatch {
                topics: Some(vec!["ok".to_string(), " ".to_string()]),
                ..CoursePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyListItem { index: 1, .. })
    ));

    let err = service
        .update_course(Uuid::new_v4(), CoursePatch::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { entity: EntityKind::Course, .. }
    ));
}

#[test]
fn find_courses_by_topic_matches_any_topic_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    service
        .create_course(new_course("Rust", &["Ownership", "Async Programming"]))
        .unwrap();
    service
        .create_course(new_course("JavaScript", &["Closures", "async/await"]))
        .unwrap();
    service
        .create_course(new_course("Spanish", &["Grammar"]))
        .unwrap();

    let hits = service.find_courses_by_topic("ASYNC").unwrap();
    assert_eq!(
        hits.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["Rust", "JavaScript"]
    );
    assert!(service.find_courses_by_topic("poetry").unwrap().is_empty());
    assert_eq!(
        service.find_courses_by_topic("").unwrap_err().error_code(),
        "validation"
    );
}

#[test]
fn course_type_labels_survive_storage() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    let service = CourseService::new(&repo);
    let mut input = new_course("Public Speaking", &[]);
    input.kind = CourseType::SoftSkills;
    let created = service.create_course(input).unwrap();

    let json = serde_json::to_value(service.get_course(created.id).unwrap()).unwrap();
    assert_eq!(json["type"], "Soft Skills");
    assert!(json["studentRefs"].as_array().unwrap().is_empty());
}

#[test]
fn topic_filter_is_unsupported_for_students() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let err = repo
        .find_where(&Filter::TopicContains("rust".to_string()))
        .unwrap_err();

    assert!(matches!(err, RepoError::UnsupportedFilter { .. }));
}

#[test]
fn id_in_with_empty_list_matches_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCourseRepository::try_new(&conn).unwrap();
    CourseService::new(&repo)
        .create_course(new_course("Rust", &[]))
        .unwrap();

    assert!(repo.find_where(&Filter::IdIn(Vec::new())).unwrap().is_empty());
}
