//! Command dispatch onto the core services.

use crate::args::{Command, CourseCommand, StudentCommand};
use crate::errors::{CliError, CliResult};
use registrar_core::{
    CourseService, EnrollmentManager, SqliteCourseRepository, SqliteStudentRepository,
    StudentService,
};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

/// Runs one command against an open connection and returns its JSON output.
pub fn execute(conn: &Connection, command: Command) -> CliResult<Value> {
    let students_repo = SqliteStudentRepository::try_new(conn)?;
    let courses_repo = SqliteCourseRepository::try_new(conn)?;
    let students = StudentService::new(&students_repo);
    let courses = CourseService::new(&courses_repo);
    let enrollment = EnrollmentManager::new(&students_repo, &courses_repo);

    match command {
        Command::Student(command) => match command {
            StudentCommand::Create { json } => to_json(students.create_student(parse(&json)?)?),
            StudentCommand::List { name: Some(name) } => {
                to_json(students.find_students_by_name(&name)?)
            }
            StudentCommand::List { name: None } => to_json(students.list_students()?),
            StudentCommand::Get { id } => to_json(students.get_student(id)?),
            StudentCommand::Update { id, json } => {
                to_json(students.update_student(id, parse(&json)?)?)
            }
            StudentCommand::Delete { id } => {
                enrollment.cascade_delete_student(id)?;
                Ok(json!({ "deleted": id }))
            }
            StudentCommand::Courses { id } => to_json(enrollment.compose_enrolled_courses(id)?),
            StudentCommand::ByCourse { course_id } => {
                to_json(students.find_students_by_course(course_id)?)
            }
        },
        Command::Course(command) => match command {
            CourseCommand::Create { json } => to_json(courses.create_course(parse(&json)?)?),
            CourseCommand::List { topic: Some(topic) } => {
                to_json(courses.find_courses_by_topic(&topic)?)
            }
            CourseCommand::List { topic: None } => to_json(courses.list_courses()?),
            CourseCommand::Get { id } => to_json(courses.get_course(id)?),
            CourseCommand::Update { id, json } => to_json(courses.update_course(id, parse(&json)?)?),
            CourseCommand::Delete { id } => {
                enrollment.cascade_delete_course(id)?;
                Ok(json!({ "deleted": id }))
            }
            CourseCommand::Students { id } => to_json(enrollment.compose_enrolled_students(id)?),
        },
        Command::Enroll {
            student_id,
            course_id,
        } => to_json(enrollment.enroll(student_id, course_id)?),
        Command::Withdraw {
            student_id,
            course_id,
        } => {
            enrollment.withdraw(student_id, course_id)?;
            Ok(json!({ "studentId": student_id, "courseId": course_id, "enrolled": false }))
        }
    }
}

fn parse<T: DeserializeOwned>(raw: &str) -> CliResult<T> {
    serde_json::from_str(raw).map_err(CliError::InvalidJson)
}

fn to_json<T: Serialize>(value: T) -> CliResult<Value> {
    serde_json::to_value(value).map_err(CliError::Output)
}
