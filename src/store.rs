use crate::error::{Entity, StoreError, StoreResult};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

pub const DEFAULT_MAX_MARKS: i64 = 100;

const STUDENT_COLUMNS: &str = "id, first_name, last_name, class_section, credential, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub class_section: Option<String>,
    #[serde(skip_serializing)]
    pub credential: Option<String>,
    pub updated_at: Option<String>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_credential(&self) -> bool {
        self.credential.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            class_section: row.get(3)?,
            credential: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub max_marks: i64,
}

impl Subject {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Subject {
            id: row.get(0)?,
            name: row.get(1)?,
            max_marks: row.get::<_, Option<i64>>(2)?.unwrap_or(DEFAULT_MAX_MARKS),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub id: i64,
    pub student_id: i64,
    pub subject_id: i64,
    pub value: i64,
}

/// Fields for a new student. `credential` is already hashed.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub class_section: Option<String>,
    pub credential: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub class_section: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectInsert {
    Created(Subject),
    AlreadyExists(Subject),
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn create_student(conn: &Connection, new: &NewStudent) -> StoreResult<Student> {
    conn.execute(
        "INSERT INTO students(first_name, last_name, class_section, credential, updated_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            new.first_name.trim(),
            new.last_name.trim(),
            new.class_section.as_deref().map(str::trim),
            new.credential.as_deref(),
            now_rfc3339(),
        ),
    )?;
    let id = conn.last_insert_rowid();
    get_student(conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Student, id))
}

pub fn get_student(conn: &Connection, id: i64) -> StoreResult<Option<Student>> {
    let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS);
    Ok(conn.query_row(&sql, [id], Student::from_row).optional()?)
}

pub fn require_student(conn: &Connection, id: i64) -> StoreResult<Student> {
    get_student(conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Student, id))
}

pub fn list_students(conn: &Connection) -> StoreResult<Vec<Student>> {
    let sql = format!("SELECT {} FROM students ORDER BY id", STUDENT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], Student::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Matches an exact id or a case-insensitive fragment of either name.
pub fn search_students(conn: &Connection, term: &str) -> StoreResult<Vec<Student>> {
    let term = term.trim().to_lowercase();
    let pattern = format!("%{}%", term);
    let sql = format!(
        "SELECT {} FROM students
         WHERE CAST(id AS TEXT) = ?1 OR LOWER(first_name) LIKE ?2 OR LOWER(last_name) LIKE ?2
         ORDER BY id",
        STUDENT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map((&term, &pattern), Student::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_student(conn: &Connection, id: i64, patch: &StudentPatch) -> StoreResult<Student> {
    let current = require_student(conn, id)?;

    let keep = |new: &Option<String>, old: &str| -> String {
        match new.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => old.to_string(),
        }
    };
    let first_name = keep(&patch.first_name, &current.first_name);
    let last_name = keep(&patch.last_name, &current.last_name);
    let class_section = match patch.class_section.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => current.class_section.clone(),
    };
    let credential = match patch.credential.as_deref() {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => current.credential.clone(),
    };

    conn.execute(
        "UPDATE students
         SET first_name = ?, last_name = ?, class_section = ?, credential = ?, updated_at = ?
         WHERE id = ?",
        (
            &first_name,
            &last_name,
            &class_section,
            &credential,
            now_rfc3339(),
            id,
        ),
    )?;
    require_student(conn, id)
}

/// Removes the student; marks go with it through the foreign-key cascade.
pub fn delete_student(conn: &Connection, id: i64) -> StoreResult<()> {
    let n = conn.execute("DELETE FROM students WHERE id = ?", [id])?;
    if n == 0 {
        return Err(StoreError::not_found(Entity::Student, id));
    }
    Ok(())
}

pub fn get_subject(conn: &Connection, id: i64) -> StoreResult<Option<Subject>> {
    Ok(conn
        .query_row(
            "SELECT id, name, max_marks FROM subjects WHERE id = ?",
            [id],
            Subject::from_row,
        )
        .optional()?)
}

pub fn require_subject(conn: &Connection, id: i64) -> StoreResult<Subject> {
    get_subject(conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Subject, id))
}

fn get_subject_by_name(conn: &Connection, name: &str) -> StoreResult<Option<Subject>> {
    Ok(conn
        .query_row(
            "SELECT id, name, max_marks FROM subjects WHERE name = ?",
            [name],
            Subject::from_row,
        )
        .optional()?)
}

pub fn list_subjects(conn: &Connection) -> StoreResult<Vec<Subject>> {
    let mut stmt = conn.prepare("SELECT id, name, max_marks FROM subjects ORDER BY id")?;
    let rows = stmt
        .query_map([], Subject::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn search_subjects(conn: &Connection, term: &str) -> StoreResult<Vec<Subject>> {
    let pattern = format!("%{}%", term.trim().to_lowercase());
    let mut stmt = conn.prepare(
        "SELECT id, name, max_marks FROM subjects WHERE LOWER(name) LIKE ? ORDER BY id",
    )?;
    let rows = stmt
        .query_map([&pattern], Subject::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts the subject, or hands back the row that already owns the name.
/// Both steps run in one transaction so the fetched row is the one that
/// blocked the insert.
pub fn insert_or_fetch_subject(
    conn: &Connection,
    name: &str,
    max_marks: i64,
) -> StoreResult<SubjectInsert> {
    let name = name.trim();
    if max_marks <= 0 {
        return Err(StoreError::ConstraintViolation(format!(
            "max_marks must be positive, got {}",
            max_marks
        )));
    }

    let tx = conn.unchecked_transaction()?;
    let inserted = tx.execute(
        "INSERT INTO subjects(name, max_marks) VALUES(?, ?)
         ON CONFLICT(name) DO NOTHING",
        (name, max_marks),
    )?;
    let outcome = if inserted == 1 {
        let id = tx.last_insert_rowid();
        SubjectInsert::Created(require_subject(&tx, id)?)
    } else {
        let existing = get_subject_by_name(&tx, name)?.ok_or_else(|| {
            StoreError::ConstraintViolation(format!("subject '{}' rejected by store", name))
        })?;
        SubjectInsert::AlreadyExists(existing)
    };
    tx.commit()?;
    Ok(outcome)
}

pub fn create_subject(conn: &Connection, name: &str, max_marks: i64) -> StoreResult<Subject> {
    match insert_or_fetch_subject(conn, name, max_marks)? {
        SubjectInsert::Created(s) => Ok(s),
        SubjectInsert::AlreadyExists(s) => Err(StoreError::DuplicateName {
            name: s.name,
            existing_id: s.id,
        }),
    }
}

pub fn delete_subject(conn: &Connection, id: i64) -> StoreResult<()> {
    let n = conn.execute("DELETE FROM subjects WHERE id = ?", [id])?;
    if n == 0 {
        return Err(StoreError::not_found(Entity::Subject, id));
    }
    Ok(())
}

pub fn get_mark(conn: &Connection, student_id: i64, subject_id: i64) -> StoreResult<Option<Mark>> {
    Ok(conn
        .query_row(
            "SELECT id, student_id, subject_id, value FROM marks
             WHERE student_id = ? AND subject_id = ?",
            (student_id, subject_id),
            |r| {
                Ok(Mark {
                    id: r.get(0)?,
                    student_id: r.get(1)?,
                    subject_id: r.get(2)?,
                    value: r.get::<_, Option<i64>>(3)?.unwrap_or(0),
                })
            },
        )
        .optional()?)
}

/// Insert, or overwrite the value of, the mark for this pair. Callers are
/// expected to have validated the value; see `marks::record_mark`.
pub fn upsert_mark(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
    value: i64,
) -> StoreResult<Mark> {
    conn.execute(
        "INSERT INTO marks(student_id, subject_id, value) VALUES(?, ?, ?)
         ON CONFLICT(student_id, subject_id) DO UPDATE SET value = excluded.value",
        (student_id, subject_id, value),
    )?;
    get_mark(conn, student_id, subject_id)?.ok_or_else(|| {
        StoreError::ConstraintViolation(format!(
            "mark for student {} subject {} not stored",
            student_id, subject_id
        ))
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn memory_store() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        crate::db::init_schema(&conn).expect("init schema");
        conn
    }

    pub fn student(conn: &Connection, first: &str, last: &str) -> Student {
        create_student(
            conn,
            &NewStudent {
                first_name: first.to_string(),
                last_name: last.to_string(),
                class_section: Some("10A".to_string()),
                credential: None,
            },
        )
        .expect("create student")
    }

    pub fn count_marks(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM marks", [], |r| r.get(0))
            .expect("count marks")
    }
}
