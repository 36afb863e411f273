use crate::auth::Session;
use crate::error::{StoreError, StoreResult};
use crate::store::{self, Mark};
use rusqlite::{Connection, TransactionBehavior};

pub const MIN_MARK: i64 = 0;

pub fn check_range(value: i64, max_marks: i64) -> StoreResult<()> {
    if (MIN_MARK..=max_marks).contains(&value) {
        Ok(())
    } else {
        Err(StoreError::OutOfRange {
            value,
            min: MIN_MARK,
            max: max_marks,
        })
    }
}

/// Records (or overwrites) a student's mark for a subject.
///
/// Checks run in order: admin session, student, subject, range. The lookups
/// and the write share one immediate transaction so another writer on the
/// same file cannot slip in between the check and the upsert. The range is
/// checked against the subject's current `max_marks` only.
pub fn record_mark(
    conn: &mut Connection,
    session: &Session,
    student_id: i64,
    subject_id: i64,
    value: i64,
) -> StoreResult<Mark> {
    session.require_admin()?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    store::require_student(&tx, student_id)?;
    let subject = store::require_subject(&tx, subject_id)?;
    check_range(value, subject.max_marks)?;
    let mark = store::upsert_mark(&tx, student_id, subject_id, value)?;
    tx.commit()?;

    tracing::info!(student_id, subject_id, value, "mark recorded");
    Ok(mark)
}
