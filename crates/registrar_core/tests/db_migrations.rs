use registrar_core::db::migrations::{current_user_version, latest_version};
use registrar_core::db::{open_db, open_db_in_memory, DbError};
use registrar_core::{RepoError, SqliteCourseRepository, SqliteStudentRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "students",
        "courses",
        "student_course_refs",
        "course_student_refs",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("registrar.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "students");
}

#[test]
fn repositories_refuse_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), 0);

    let err = SqliteStudentRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
    assert!(SqliteCourseRepository::try_new(&conn).is_err());
}

#[test]
fn deleting_owner_cascades_its_reference_rows_only() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO students (id, name, date_of_birth, gender, student_code)
         VALUES ('s1', 'Ada', '2000-01-01', 'female', 'STU001');
         INSERT INTO student_course_refs (student_id, course_id, position)
         VALUES ('s1', 'c1', 0);
         INSERT INTO courses (id, name, description, type, duration)
         VALUES ('c1', 'Rust', 'Systems', 'technical', '3 months');
         INSERT INTO course_student_refs (course_id, student_id, position)
         VALUES ('c1', 's1', 0);
         DELETE FROM students WHERE id = 's1';",
    )
    .unwrap();

    assert_eq!(count(&conn, "student_course_refs"), 0);
    assert_eq!(count(&conn, "course_student_refs"), 1);
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
