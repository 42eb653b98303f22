#![allow(dead_code)]

use registrar_core::{
    Address, AddressType, CourseType, Gender, NewCourse, NewStudent, Parents,
};

pub fn new_student(name: &str, code: &str) -> NewStudent {
    NewStudent {
        name: name.to_string(),
        date_of_birth: "2001-04-12".to_string(),
        gender: Gender::Female,
        student_code: code.to_string(),
        addresses: vec![Address {
            kind: AddressType::Permanent,
            street: "12 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip_code: "62701".to_string(),
        }],
        email: Some(format!("{}@example.edu", code.to_ascii_lowercase())),
        mobile: Some("555-0100".to_string()),
        parents: Some(Parents {
            father_name: Some("John".to_string()),
            mother_name: None,
        }),
    }
}

pub fn new_course(name: &str, topics: &[&str]) -> NewCourse {
    NewCourse {
        name: name.to_string(),
        description: format!("{name} fundamentals"),
        kind: CourseType::Technical,
        duration: "3 months".to_string(),
        topics: topics.iter().map(|topic| topic.to_string()).collect(),
    }
}
