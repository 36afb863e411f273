use crate::db;
use crate::error::{StoreError, StoreResult};
use crate::store;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

const ADMIN_SETTINGS_KEY: &str = "auth.admin";
const HASH_SCHEME: &str = "sha256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "camelCase")]
pub enum Session {
    #[serde(rename_all = "camelCase")]
    Admin { username: String },
    #[serde(rename_all = "camelCase")]
    Student { student_id: i64 },
}

impl Session {
    pub fn role_str(&self) -> &'static str {
        match self {
            Session::Admin { .. } => "admin",
            Session::Student { .. } => "student",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Session::Admin { .. })
    }

    pub fn require_admin(&self) -> StoreResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(StoreError::AccessDenied)
        }
    }

    /// Students may only read their own record.
    pub fn require_student_or_admin(&self, student_id: i64) -> StoreResult<()> {
        match self {
            Session::Admin { .. } => Ok(()),
            Session::Student { student_id: own } if *own == student_id => Ok(()),
            Session::Student { .. } => Err(StoreError::AccessDenied),
        }
    }
}

fn digest_hex(salt: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Encodes as `sha256$<salt>$<hex>` with a fresh random salt.
pub fn hash_credential(secret: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}${}", HASH_SCHEME, salt, digest_hex(&salt, secret))
}

pub fn verify_credential(stored: &str, attempt: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let actual = digest_hex(salt, attempt);
    // Compare every byte regardless of where the first mismatch is.
    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub credential: String,
}

fn load_admin(conn: &Connection) -> StoreResult<Option<AdminAccount>> {
    let raw = db::settings_get_json(conn, ADMIN_SETTINGS_KEY)
        .map_err(|e| StoreError::Storage(e.to_string()))?;
    Ok(raw.and_then(|v| {
        let username = v.get("username")?.as_str()?.to_string();
        let credential = v.get("credential")?.as_str()?.to_string();
        Some(AdminAccount {
            username,
            credential,
        })
    }))
}

fn store_admin(conn: &Connection, username: &str, password: &str) -> StoreResult<()> {
    db::settings_set_json(
        conn,
        ADMIN_SETTINGS_KEY,
        &json!({
            "username": username,
            "credential": hash_credential(password),
        }),
    )
    .map_err(|e| StoreError::Storage(e.to_string()))
}

/// Seeds the admin account on a workspace that has none. Returns whether a
/// new account was written.
pub fn ensure_admin_account(conn: &Connection, username: &str, password: &str) -> StoreResult<bool> {
    if load_admin(conn)?.is_some() {
        return Ok(false);
    }
    store_admin(conn, username, password)?;
    Ok(true)
}

pub fn login_admin(conn: &Connection, username: &str, password: &str) -> StoreResult<Session> {
    let Some(account) = load_admin(conn)? else {
        return Err(StoreError::InvalidCredentials);
    };
    if account.username != username || !verify_credential(&account.credential, password) {
        return Err(StoreError::InvalidCredentials);
    }
    Ok(Session::Admin {
        username: account.username,
    })
}

/// A student without a stored credential signs in by id alone.
pub fn login_student(
    conn: &Connection,
    student_id: i64,
    password: Option<&str>,
) -> StoreResult<Session> {
    let student = store::require_student(conn, student_id)?;
    if let Some(stored) = student.credential.as_deref().filter(|c| !c.is_empty()) {
        let attempt = password.unwrap_or("");
        if !verify_credential(stored, attempt) {
            return Err(StoreError::InvalidCredentials);
        }
    }
    Ok(Session::Student { student_id })
}

pub fn change_admin_password(conn: &Connection, session: &Session, password: &str) -> StoreResult<()> {
    session.require_admin()?;
    let Session::Admin { username } = session else {
        return Err(StoreError::AccessDenied);
    };
    store_admin(conn, username, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::memory_store;
    use crate::store::{create_student, NewStudent};

    #[test]
    fn hashes_are_salted_and_verify() {
        let a = hash_credential("secret");
        let b = hash_credential("secret");
        assert_ne!(a, b);
        assert!(a.starts_with("sha256$"));
        assert!(verify_credential(&a, "secret"));
        assert!(!verify_credential(&a, "Secret"));
        assert!(!verify_credential("plaintext", "plaintext"));
    }

    #[test]
    fn admin_login_uses_seeded_account() {
        let conn = memory_store();
        assert!(ensure_admin_account(&conn, "admin", "admin123").expect("seed"));
        assert!(!ensure_admin_account(&conn, "admin", "other").expect("seed again"));

        let session = login_admin(&conn, "admin", "admin123").expect("login");
        assert!(session.is_admin());
        assert!(matches!(
            login_admin(&conn, "admin", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            login_admin(&conn, "root", "admin123"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn admin_can_change_password() {
        let conn = memory_store();
        ensure_admin_account(&conn, "admin", "admin123").expect("seed");
        let session = login_admin(&conn, "admin", "admin123").expect("login");
        change_admin_password(&conn, &session, "n3w").expect("change");
        assert!(login_admin(&conn, "admin", "admin123").is_err());
        assert!(login_admin(&conn, "admin", "n3w").is_ok());

        let student = Session::Student { student_id: 1 };
        assert!(matches!(
            change_admin_password(&conn, &student, "x"),
            Err(StoreError::AccessDenied)
        ));
    }

    #[test]
    fn student_login_checks_hashed_credential() {
        let conn = memory_store();
        let with_pw = create_student(
            &conn,
            &NewStudent {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                class_section: None,
                credential: Some(hash_credential("pw")),
            },
        )
        .expect("student");
        let without_pw = create_student(
            &conn,
            &NewStudent {
                first_name: "Alan".into(),
                last_name: "Turing".into(),
                ..Default::default()
            },
        )
        .expect("student");

        assert_eq!(
            login_student(&conn, with_pw.id, Some("pw")).expect("login"),
            Session::Student {
                student_id: with_pw.id
            }
        );
        assert!(matches!(
            login_student(&conn, with_pw.id, None),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(login_student(&conn, without_pw.id, None).is_ok());
        assert_eq!(
            login_student(&conn, 999, None).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn student_sessions_only_see_themselves() {
        let s = Session::Student { student_id: 3 };
        assert!(s.require_student_or_admin(3).is_ok());
        assert!(s.require_student_or_admin(4).is_err());
        assert!(s.require_admin().is_err());
        let a = Session::Admin {
            username: "admin".into(),
        };
        assert!(a.require_student_or_admin(4).is_ok());
    }

    #[test]
    fn session_serializes_with_role_tag() {
        let v = serde_json::to_value(Session::Student { student_id: 7 }).expect("json");
        assert_eq!(v, json!({ "role": "student", "studentId": 7 }));
    }
}
