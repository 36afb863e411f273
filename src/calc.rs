use crate::error::StoreResult;
use crate::store;
use rusqlite::Connection;
use serde::Serialize;

/// Percentages are reported to two decimals.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `None` when nothing has been marked yet, so callers never divide by zero.
pub fn percentage(total_obtained: i64, total_max: i64) -> Option<f64> {
    if total_max > 0 {
        Some(round_2_decimals(
            100.0 * (total_obtained as f64) / (total_max as f64),
        ))
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub class_section: Option<String>,
    pub subject_count: i64,
    pub total_obtained: i64,
    pub total_max: i64,
    pub percentage: Option<f64>,
}

impl PerformanceSummary {
    pub fn has_marks(&self) -> bool {
        self.total_max > 0
    }
}

/// One summary per student in id order, students without marks included.
///
/// A single grouped query, so every row reflects the same snapshot.
pub fn compute_performance(conn: &Connection) -> StoreResult<Vec<PerformanceSummary>> {
    let mut stmt = conn.prepare(
        "SELECT
           st.id,
           st.first_name,
           st.last_name,
           st.class_section,
           COUNT(m.id) AS subject_count,
           COALESCE(SUM(m.value), 0) AS total_obtained,
           COALESCE(SUM(su.max_marks), 0) AS total_max
         FROM students st
         LEFT JOIN marks m ON m.student_id = st.id
         LEFT JOIN subjects su ON su.id = m.subject_id
         GROUP BY st.id, st.first_name, st.last_name, st.class_section
         ORDER BY st.id",
    )?;

    let rows = stmt
        .query_map([], |r| {
            let total_obtained: i64 = r.get(5)?;
            let total_max: i64 = r.get(6)?;
            Ok(PerformanceSummary {
                student_id: r.get(0)?,
                first_name: r.get(1)?,
                last_name: r.get(2)?,
                class_section: r.get(3)?,
                subject_count: r.get(4)?,
                total_obtained,
                total_max,
                percentage: percentage(total_obtained, total_max),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksheetLine {
    pub subject_id: i64,
    pub subject_name: String,
    pub obtained: i64,
    pub max_marks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marksheet {
    pub student: store::Student,
    pub lines: Vec<MarksheetLine>,
    pub total_obtained: i64,
    pub total_max: i64,
    pub percentage: Option<f64>,
}

pub fn student_marksheet(conn: &Connection, student_id: i64) -> StoreResult<Marksheet> {
    let student = store::require_student(conn, student_id)?;

    let mut stmt = conn.prepare(
        "SELECT su.id, su.name, COALESCE(m.value, 0), COALESCE(su.max_marks, 0)
         FROM marks m
         JOIN subjects su ON su.id = m.subject_id
         WHERE m.student_id = ?
         ORDER BY su.id",
    )?;
    let lines = stmt
        .query_map([student_id], |r| {
            Ok(MarksheetLine {
                subject_id: r.get(0)?,
                subject_name: r.get(1)?,
                obtained: r.get(2)?,
                max_marks: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let total_obtained: i64 = lines.iter().map(|l| l.obtained).sum();
    let total_max: i64 = lines.iter().map(|l| l.max_marks).sum();

    Ok(Marksheet {
        student,
        lines,
        total_obtained,
        total_max,
        percentage: percentage(total_obtained, total_max),
    })
}
