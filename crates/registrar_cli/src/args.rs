//! Command-line surface of the `registrar` binary.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// Student and course registrar backed by a local SQLite file.
#[derive(Parser, Debug)]
#[command(name = "registrar")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// SQLite database file; overrides REGISTRAR_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// trace|debug|info|warn|error; overrides REGISTRAR_LOG_LEVEL
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files; overrides REGISTRAR_LOG_DIR
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Student operations
    #[command(subcommand)]
    Student(StudentCommand),

    /// Course operations
    #[command(subcommand)]
    Course(CourseCommand),

    /// Enroll a student in a course
    Enroll {
        student_id: Uuid,
        course_id: Uuid,
    },

    /// Remove a student from a course on both sides
    Withdraw {
        student_id: Uuid,
        course_id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum StudentCommand {
    /// Create a student from a JSON document
    Create {
        #[arg(long)]
        json: String,
    },
    /// List students, optionally filtered by a name fragment
    List {
        #[arg(long)]
        name: Option<String>,
    },
    Get {
        id: Uuid,
    },
    /// Apply a JSON patch (email, mobile, addresses, parents)
    Update {
        id: Uuid,
        #[arg(long)]
        json: String,
    },
    /// Delete a student and remove it from every course
    Delete {
        id: Uuid,
    },
    /// Courses the student is enrolled in
    Courses {
        id: Uuid,
    },
    /// Students whose course set lists the given course
    ByCourse {
        course_id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommand {
    /// Create a course from a JSON document
    Create {
        #[arg(long)]
        json: String,
    },
    /// List courses, optionally filtered by a topic fragment
    List {
        #[arg(long)]
        topic: Option<String>,
    },
    Get {
        id: Uuid,
    },
    /// Apply a JSON patch (name, description, type, duration, topics)
    Update {
        id: Uuid,
        #[arg(long)]
        json: String,
    },
    /// Delete a course and remove it from every student
    Delete {
        id: Uuid,
    },
    /// Students enrolled in the course
    Students {
        id: Uuid,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, CourseCommand, StudentCommand};
    use clap::Parser;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "registrar",
            "student",
            "list",
            "--name",
            "ali",
            "--db",
            "/tmp/r.db",
        ])
        .unwrap();
        assert_eq!(cli.global.db.as_deref(), Some(std::path::Path::new("/tmp/r.db")));
        assert!(matches!(
            cli.command,
            Command::Student(StudentCommand::List { name: Some(ref n) }) if n == "ali"
        ));
    }

    #[test]
    fn rejects_malformed_ids() {
        let result = Cli::try_parse_from(["registrar", "course", "get", "not-a-uuid"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_course_update() {
        let id = uuid::Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "registrar",
            "course",
            "update",
            &id,
            "--json",
            r#"{"duration":"8 weeks"}"#,
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Course(CourseCommand::Update { .. })
        ));
    }
}
