//! Student collection backed by SQLite.
//!
//! # Responsibility
//! - Map `Student` documents onto `students` rows plus the owner-keyed
//!   `student_course_refs` reference set.
//! - Implement the `DocumentRepository` contract for students.
//!
//! # Invariants
//! - Write paths call `Student::validate()` / `StudentPatch::validate()`
//!   before SQL mutations.
//! - `student_course_refs` rows are deleted only with their owning student
//!   or by an explicit `PullRef`.
//! - Reference order is the order ids were first added.

use super::{
    decode_json, encode_json, ensure_connection_ready, id_list_params, map_unique_violation,
    parse_uuid, DocumentRepository, Filter, RepoError, RepoResult, Update,
};
use crate::db::CONTAINS_CI;
use crate::model::course::CourseId;
use crate::model::student::{Gender, Student, StudentId, StudentPatch};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    name,
    date_of_birth,
    gender,
    student_code,
    addresses,
    email,
    mobile,
    parents,
    created_at,
    updated_at
FROM students";

const TOUCH_SQL: &str = "UPDATE students
     SET updated_at = (strftime('%s', 'now') * 1000)
     WHERE id = ?1;";

/// SQLite-backed student collection.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["students", "student_course_refs"])?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteStudentRepository<'_> {
    type Doc = Student;
    type Patch = StudentPatch;

    fn find_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        load_student(self.conn, id)
    }

    fn find_where(&self, filter: &Filter) -> RepoResult<Vec<Student>> {
        let (clause, bind_values) = filter_clause(filter)?;
        let sql = format!("{STUDENT_SELECT_SQL} WHERE {clause} ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            let mut student = parse_student_row(row)?;
            student.course_refs = load_course_refs(self.conn, student.id)?;
            students.push(student);
        }
        Ok(students)
    }

    fn insert(&self, doc: &Student) -> RepoResult<Student> {
        doc.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO students (
                id,
                name,
                date_of_birth,
                gender,
                student_code,
                addresses,
                email,
                mobile,
                parents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                doc.id.to_string(),
                doc.name.trim(),
                doc.date_of_birth.as_str(),
                gender_to_db(doc.gender),
                doc.student_code.trim(),
                encode_json(&doc.addresses, "students.addresses")?,
                doc.email.as_deref(),
                doc.mobile.as_deref(),
                doc.parents
                    .as_ref()
                    .map(|parents| encode_json(parents, "students.parents"))
                    .transpose()?,
            ],
        )
        .map_err(|err| {
            map_unique_violation(err, || {
                format!(
                    "student with code `{}` already exists",
                    doc.student_code.trim()
                )
            })
        })?;
        for course_id in &doc.course_refs {
            add_course_ref(&tx, doc.id, *course_id)?;
        }
        tx.commit()?;

        load_student(self.conn, doc.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("student {} missing after insert", doc.id))
        })
    }

    fn update_by_id(
        &self,
        id: StudentId,
        update: &Update<StudentPatch>,
    ) -> RepoResult<Option<Student>> {
        let tx = self.conn.unchecked_transaction()?;
        if apply_update(&tx, id, update)?.is_none() {
            return Ok(None);
        }
        tx.commit()?;
        load_student(self.conn, id)
    }

    fn delete_by_id(&self, id: StudentId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn update_many(&self, filter: &Filter, update: &Update<StudentPatch>) -> RepoResult<u64> {
        let (clause, filter_values) = filter_clause(filter)?;
        let tx = self.conn.unchecked_transaction()?;

        let modified = if let Update::PullRef(course_id) = update {
            // Set-wide pull: touch only owners that actually hold the ref,
            // then drop the refs in one statement.
            let mut touch_values = filter_values.clone();
            touch_values.push(Value::Text(course_id.to_string()));
            let touched = tx.execute(
                &format!(
                    "UPDATE students
                     SET updated_at = (strftime('%s', 'now') * 1000)
                     WHERE {clause}
                       AND id IN (SELECT student_id FROM student_course_refs WHERE course_id = ?);"
                ),
                params_from_iter(touch_values),
            )?;

            let mut delete_values = vec![Value::Text(course_id.to_string())];
            delete_values.extend(filter_values);
            tx.execute(
                &format!(
                    "DELETE FROM student_course_refs
                     WHERE course_id = ?
                       AND student_id IN (SELECT id FROM students WHERE {clause});"
                ),
                params_from_iter(delete_values),
            )?;
            touched as u64
        } else {
            let ids = matching_ids(&tx, &clause, filter_values)?;
            let mut modified = 0;
            for id in ids {
                if apply_update(&tx, id, update)? == Some(true) {
                    modified += 1;
                }
            }
            modified
        };

        tx.commit()?;
        Ok(modified)
    }
}

/// Applies one update inside the caller's transaction.
///
/// Returns `None` when the student does not exist, otherwise whether any
/// row changed.
fn apply_update(
    conn: &Connection,
    id: StudentId,
    update: &Update<StudentPatch>,
) -> RepoResult<Option<bool>> {
    match update {
        Update::Set(patch) => {
            patch.validate()?;
            let Some(mut student) = load_student(conn, id)? else {
                return Ok(None);
            };
            if patch.is_empty() {
                return Ok(Some(false));
            }
            patch.apply_to(&mut student);
            conn.execute(
                "UPDATE students
                 SET
                    email = ?2,
                    mobile = ?3,
                    addresses = ?4,
                    parents = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    student.email.as_deref(),
                    student.mobile.as_deref(),
                    encode_json(&student.addresses, "students.addresses")?,
                    student
                        .parents
                        .as_ref()
                        .map(|parents| encode_json(parents, "students.parents"))
                        .transpose()?,
                ],
            )?;
            Ok(Some(true))
        }
        Update::AddRef(course_id) => {
            if !student_exists(conn, id)? {
                return Ok(None);
            }
            let added = add_course_ref(conn, id, *course_id)?;
            if added {
                conn.execute(TOUCH_SQL, [id.to_string()])?;
            }
            Ok(Some(added))
        }
        Update::PullRef(course_id) => {
            if !student_exists(conn, id)? {
                return Ok(None);
            }
            let removed = conn.execute(
                "DELETE FROM student_course_refs WHERE student_id = ?1 AND course_id = ?2;",
                params![id.to_string(), course_id.to_string()],
            )? > 0;
            if removed {
                conn.execute(TOUCH_SQL, [id.to_string()])?;
            }
            Ok(Some(removed))
        }
    }
}

fn filter_clause(filter: &Filter) -> RepoResult<(String, Vec<Value>)> {
    match filter {
        Filter::All => Ok(("1 = 1".to_string(), Vec::new())),
        Filter::IdIn(ids) if ids.is_empty() => Ok(("0 = 1".to_string(), Vec::new())),
        Filter::IdIn(ids) => {
            let (placeholders, values) = id_list_params(ids);
            Ok((format!("students.id IN ({placeholders})"), values))
        }
        Filter::References(course_id) => Ok((
            "EXISTS (
                SELECT 1
                FROM student_course_refs r
                WHERE r.student_id = students.id
                  AND r.course_id = ?
            )"
            .to_string(),
            vec![Value::Text(course_id.to_string())],
        )),
        Filter::NameEquals(name) => Ok((
            "students.name = ?".to_string(),
            vec![Value::Text(name.trim().to_string())],
        )),
        Filter::NameContains(fragment) => Ok((
            format!("{CONTAINS_CI}(students.name, ?)"),
            vec![Value::Text(fragment.clone())],
        )),
        Filter::TopicContains(_) => Err(RepoError::UnsupportedFilter {
            collection: "students",
            filter: filter.label(),
        }),
    }
}

fn matching_ids(conn: &Connection, clause: &str, values: Vec<Value>) -> RepoResult<Vec<StudentId>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM students WHERE {clause} ORDER BY created_at ASC, rowid ASC"
    ))?;
    let mut rows = stmt.query(params_from_iter(values))?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "students.id")?);
    }
    Ok(ids)
}

fn load_student(conn: &Connection, id: StudentId) -> RepoResult<Option<Student>> {
    let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        let mut student = parse_student_row(row)?;
        student.course_refs = load_course_refs(conn, student.id)?;
        return Ok(Some(student));
    }
    Ok(None)
}

fn student_exists(conn: &Connection, id: StudentId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Set-union insert. Returns `true` when the ref was not present before.
fn add_course_ref(conn: &Connection, student_id: StudentId, course_id: CourseId) -> RepoResult<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO student_course_refs (student_id, course_id, position)
         SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
         FROM student_course_refs
         WHERE student_id = ?1;",
        params![student_id.to_string(), course_id.to_string()],
    )?;
    Ok(changed > 0)
}

fn load_course_refs(conn: &Connection, student_id: StudentId) -> RepoResult<Vec<CourseId>> {
    let mut stmt = conn.prepare(
        "SELECT course_id
         FROM student_course_refs
         WHERE student_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([student_id.to_string()])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        refs.push(parse_uuid(&value, "student_course_refs.course_id")?);
    }
    Ok(refs)
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "students.id")?;

    let gender_text: String = row.get("gender")?;
    let gender = parse_gender(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gender `{gender_text}` in students.gender"))
    })?;

    let addresses_json: String = row.get("addresses")?;
    let parents = match row.get::<_, Option<String>>("parents")? {
        Some(json) => Some(decode_json(&json, "students.parents")?),
        None => None,
    };

    Ok(Student {
        id,
        name: row.get("name")?,
        date_of_birth: row.get("date_of_birth")?,
        gender,
        student_code: row.get("student_code")?,
        addresses: decode_json(&addresses_json, "students.addresses")?,
        email: row.get("email")?,
        mobile: row.get("mobile")?,
        parents,
        course_refs: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn gender_to_db(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "other",
    }
}

fn parse_gender(value: &str) -> Option<Gender> {
    match value {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        "other" => Some(Gender::Other),
        _ => None,
    }
}
