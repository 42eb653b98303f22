//! Course collection backed by SQLite.
//!
//! # Invariants
//! - Write paths validate before SQL mutations.
//! - Course names are unique; a colliding insert or rename is a `Conflict`.
//! - `course_student_refs` rows are deleted only with their owning course or
//!   by an explicit `PullRef`.

use super::{
    decode_json, encode_json, ensure_connection_ready, id_list_params, map_unique_violation,
    parse_uuid, DocumentRepository, Filter, RepoError, RepoResult, Update,
};
use crate::db::CONTAINS_CI;
use crate::model::course::{Course, CourseId, CoursePatch, CourseType};
use crate::model::student::StudentId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const COURSE_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    type,
    duration,
    topics,
    created_at,
    updated_at
FROM courses";

const TOUCH_SQL: &str = "UPDATE courses
     SET updated_at = (strftime('%s', 'now') * 1000)
     WHERE id = ?1;";

/// SQLite-backed course collection.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["courses", "course_student_refs"])?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteCourseRepository<'_> {
    type Doc = Course;
    type Patch = CoursePatch;

    fn find_by_id(&self, id: CourseId) -> RepoResult<Option<Course>> {
        load_course(self.conn, id)
    }

    fn find_where(&self, filter: &Filter) -> RepoResult<Vec<Course>> {
        let (clause, bind_values) = filter_clause(filter)?;
        let sql = format!("{COURSE_SELECT_SQL} WHERE {clause} ORDER BY created_at ASC, rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            let mut course = parse_course_row(row)?;
            course.student_refs = load_student_refs(self.conn, course.id)?;
            courses.push(course);
        }
        Ok(courses)
    }

    fn insert(&self, doc: &Course) -> RepoResult<Course> {
        doc.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO courses (
                id,
                name,
                description,
                type,
                duration,
                topics
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                doc.id.to_string(),
                doc.name.trim(),
                doc.description.as_str(),
                course_type_to_db(doc.kind),
                doc.duration.as_str(),
                encode_json(&doc.topics, "courses.topics")?,
            ],
        )
        .map_err(|err| {
            map_unique_violation(err, || {
                format!("course with name `{}` already exists", doc.name.trim())
            })
        })?;
        for student_id in &doc.student_refs {
            add_student_ref(&tx, doc.id, *student_id)?;
        }
        tx.commit()?;

        load_course(self.conn, doc.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("course {} missing after insert", doc.id))
        })
    }

    fn update_by_id(
        &self,
        id: CourseId,
        update: &Update<CoursePatch>,
    ) -> RepoResult<Option<Course>> {
        let tx = self.conn.unchecked_transaction()?;
        if apply_update(&tx, id, update)?.is_none() {
            return Ok(None);
        }
        tx.commit()?;
        load_course(self.conn, id)
    }

    fn delete_by_id(&self, id: CourseId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM courses WHERE id = ?1;", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn update_many(&self, filter: &Filter, update: &Update<CoursePatch>) -> RepoResult<u64> {
        let (clause, filter_values) = filter_clause(filter)?;
        let tx = self.conn.unchecked_transaction()?;

        let modified = if let Update::PullRef(student_id) = update {
            let mut touch_values = filter_values.clone();
            touch_values.push(Value::Text(student_id.to_string()));
            let touched = tx.execute(
                &format!(
                    "UPDATE courses
                     SET updated_at = (strftime('%s', 'now') * 1000)
                     WHERE {clause}
                       AND id IN (SELECT course_id FROM course_student_refs WHERE student_id = ?);"
                ),
                params_from_iter(touch_values),
            )?;

            let mut delete_values = vec![Value::Text(student_id.to_string())];
            delete_values.extend(filter_values);
            tx.execute(
                &format!(
                    "DELETE FROM course_student_refs
                     WHERE student_id = ?
                       AND course_id IN (SELECT id FROM courses WHERE {clause});"
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

fn apply_update(
    conn: &Connection,
    id: CourseId,
    update: &Update<CoursePatch>,
) -> RepoResult<Option<bool>> {
    match update {
        Update::Set(patch) => {
            patch.validate()?;
            let Some(mut course) = load_course(conn, id)? else {
                return Ok(None);
            };
            if patch.is_empty() {
                return Ok(Some(false));
            }
            patch.apply_to(&mut course);
            conn.execute(
                "UPDATE courses
                 SET
                    name = ?2,
                    description = ?3,
                    type = ?4,
                    duration = ?5,
                    topics = ?6,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    course.name.trim(),
                    course.description.as_str(),
                    course_type_to_db(course.kind),
                    course.duration.as_str(),
                    encode_json(&course.topics, "courses.topics")?,
                ],
            )
            .map_err(|err| {
                map_unique_violation(err, || {
                    format!("course with name `{}` already exists", course.name.trim())
                })
            })?;
            Ok(Some(true))
        }
        Update::AddRef(student_id) => {
            if !course_exists(conn, id)? {
                return Ok(None);
            }
            let added = add_student_ref(conn, id, *student_id)?;
            if added {
                conn.execute(TOUCH_SQL, [id.to_string()])?;
            }
            Ok(Some(added))
        }
        Update::PullRef(student_id) => {
            if !course_exists(conn, id)? {
                return Ok(None);
            }
            let removed = conn.execute(
                "DELETE FROM course_student_refs WHERE course_id = ?1 AND student_id = ?2;",
                params![id.to_string(), student_id.to_string()],
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
            Ok((format!("courses.id IN ({placeholders})"), values))
        }
        Filter::References(student_id) => Ok((
            "EXISTS (
                SELECT 1
                FROM course_student_refs r
                WHERE r.course_id = courses.id
                  AND r.student_id = ?
            )"
            .to_string(),
            vec![Value::Text(student_id.to_string())],
        )),
        Filter::NameEquals(name) => Ok((
            "courses.name = ?".to_string(),
            vec![Value::Text(name.trim().to_string())],
        )),
        Filter::NameContains(fragment) => Ok((
            format!("{CONTAINS_CI}(courses.name, ?)"),
            vec![Value::Text(fragment.clone())],
        )),
        Filter::TopicContains(fragment) => Ok((
            format!(
                "EXISTS (
                SELECT 1
                FROM json_each(courses.topics) t
                WHERE {CONTAINS_CI}(t.value, ?)
            )"
            ),
            vec![Value::Text(fragment.clone())],
        )),
    }
}

fn matching_ids(conn: &Connection, clause: &str, values: Vec<Value>) -> RepoResult<Vec<CourseId>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM courses WHERE {clause} ORDER BY created_at ASC, rowid ASC"
    ))?;
    let mut rows = stmt.query(params_from_iter(values))?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "courses.id")?);
    }
    Ok(ids)
}

fn load_course(conn: &Connection, id: CourseId) -> RepoResult<Option<Course>> {
    let mut stmt = conn.prepare(&format!("{COURSE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        let mut course = parse_course_row(row)?;
        course.student_refs = load_student_refs(conn, course.id)?;
        return Ok(Some(course));
    }
    Ok(None)
}

fn course_exists(conn: &Connection, id: CourseId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn add_student_ref(conn: &Connection, course_id: CourseId, student_id: StudentId) -> RepoResult<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO course_student_refs (course_id, student_id, position)
         SELECT ?1, ?2, COALESCE(MAX(position), -1) + 1
         FROM course_student_refs
         WHERE course_id = ?1;",
        params![course_id.to_string(), student_id.to_string()],
    )?;
    Ok(changed > 0)
}

fn load_student_refs(conn: &Connection, course_id: CourseId) -> RepoResult<Vec<StudentId>> {
    let mut stmt = conn.prepare(
        "SELECT student_id
         FROM course_student_refs
         WHERE course_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([course_id.to_string()])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        refs.push(parse_uuid(&value, "course_student_refs.student_id")?);
    }
    Ok(refs)
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "courses.id")?;

    let type_text: String = row.get("type")?;
    let kind = parse_course_type(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid course type `{type_text}` in courses.type"))
    })?;

    let topics_json: String = row.get("topics")?;

    Ok(Course {
        id,
        name: row.get("name")?,
        description: row.get("description")?,
        kind,
        duration: row.get("duration")?,
        topics: decode_json(&topics_json, "courses.topics")?,
        student_refs: Vec::new(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn course_type_to_db(kind: CourseType) -> &'static str {
    match kind {
        CourseType::Technical => "technical",
        CourseType::NonTechnical => "non_technical",
        CourseType::Language => "language",
        CourseType::SoftSkills => "soft_skills",
    }
}

fn parse_course_type(value: &str) -> Option<CourseType> {
    match value {
        "technical" => Some(CourseType::Technical),
        "non_technical" => Some(CourseType::NonTechnical),
        "language" => Some(CourseType::Language),
        "soft_skills" => Some(CourseType::SoftSkills),
        _ => None,
    }
}
