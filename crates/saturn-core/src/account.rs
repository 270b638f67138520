//! Orgs, users, memberships and sessions.
//!
//! Sessions are opaque bearer tokens. Only the SHA-256 of a token is
//! stored, so a leaked database does not leak live sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, SaturnError};
use crate::store::{Reader, Table, WriteTx};
use crate::token::{generate_token, hash_token, SESSION_PREFIX};

pub const NAME_MAX_CHARS: usize = 100;
pub const ONBOARDING_DONE: &str = "DONE";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    pub id: String,
    pub name: String,
    pub monitor_limit: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default)]
    pub onboarding_step: Option<String>,
    #[serde(default)]
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub org_id: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

fn membership_key(org_id: &str, user_id: &str) -> String {
    format!("{org_id}/{user_id}")
}

/// Names are checked as given: 1 to 100 characters, no trimming.
pub fn validate_name(field: &str, name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 {
        return Err(SaturnError::invalid(
            field,
            "String must contain at least 1 character(s)",
        ));
    }
    if len > NAME_MAX_CHARS {
        return Err(SaturnError::invalid(
            field,
            format!("String must contain at most {NAME_MAX_CHARS} character(s)"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Orgs
// ---------------------------------------------------------------------------

pub fn create_org(tx: &WriteTx, name: &str, monitor_limit: u32, now: DateTime<Utc>) -> Result<Org> {
    validate_name("name", name)?;
    let org = Org {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        monitor_limit,
        created_at: now,
    };
    tx.put(Table::Orgs, &org.id, &org)?;
    Ok(org)
}

pub fn get_org(tx: &impl Reader, id: &str) -> Result<Org> {
    tx.get(Table::Orgs, id)?
        .ok_or_else(|| SaturnError::OrgNotFound(id.to_string()))
}

pub fn list_orgs(tx: &impl Reader) -> Result<Vec<Org>> {
    tx.scan(Table::Orgs, "")
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub fn create_user(
    tx: &WriteTx,
    email: &str,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<User> {
    let email = email.trim().to_ascii_lowercase();
    if !is_plausible_email(&email) {
        return Err(SaturnError::invalid("email", "Invalid email"));
    }
    if let Some(name) = name {
        validate_name("name", name)?;
    }
    if tx.get::<String>(Table::UserEmails, &email)?.is_some() {
        return Err(SaturnError::EmailExists(email));
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: name.map(str::to_string),
        onboarding_completed: false,
        onboarding_step: None,
        mfa_enabled: false,
        created_at: now,
        updated_at: now,
    };
    tx.put(Table::Users, &user.id, &user)?;
    tx.put(Table::UserEmails, &user.email, &user.id)?;
    Ok(user)
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(' ')
        }
        None => false,
    }
}

pub fn get_user(tx: &impl Reader, id: &str) -> Result<User> {
    tx.get(Table::Users, id)?
        .ok_or_else(|| SaturnError::UserNotFound(id.to_string()))
}

pub fn find_user_by_email(tx: &impl Reader, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_ascii_lowercase();
    match tx.get::<String>(Table::UserEmails, &email)? {
        Some(id) => Ok(Some(get_user(tx, &id)?)),
        None => Ok(None),
    }
}

pub fn update_profile(tx: &WriteTx, user_id: &str, name: &str, now: DateTime<Utc>) -> Result<User> {
    validate_name("name", name)?;
    let mut user = get_user(tx, user_id)?;
    user.name = Some(name.to_string());
    user.updated_at = now;
    tx.put(Table::Users, &user.id, &user)?;
    Ok(user)
}

pub fn complete_onboarding(tx: &WriteTx, user_id: &str, now: DateTime<Utc>) -> Result<User> {
    let mut user = get_user(tx, user_id)?;
    user.onboarding_completed = true;
    user.onboarding_step = Some(ONBOARDING_DONE.to_string());
    user.updated_at = now;
    tx.put(Table::Users, &user.id, &user)?;
    Ok(user)
}

// ---------------------------------------------------------------------------
// Memberships
// ---------------------------------------------------------------------------

pub fn add_member(
    tx: &WriteTx,
    org_id: &str,
    user_id: &str,
    role: Role,
    now: DateTime<Utc>,
) -> Result<Membership> {
    get_org(tx, org_id)?;
    get_user(tx, user_id)?;
    let membership = Membership {
        org_id: org_id.to_string(),
        user_id: user_id.to_string(),
        role,
        created_at: now,
    };
    tx.put(Table::Memberships, &membership_key(org_id, user_id), &membership)?;
    Ok(membership)
}

pub fn require_membership(tx: &impl Reader, user_id: &str, org_id: &str) -> Result<Membership> {
    tx.get(Table::Memberships, &membership_key(org_id, user_id))?
        .ok_or_else(|| SaturnError::Forbidden(format!("not a member of org {org_id}")))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Create a session for `user_id` and return the bearer token.
pub fn issue_session(tx: &WriteTx, user_id: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
    get_user(tx, user_id)?;
    let token = generate_token(SESSION_PREFIX);
    let session = Session {
        user_id: user_id.to_string(),
        created_at: now,
        expires_at: now + ttl,
    };
    tx.put(Table::Sessions, &hash_token(&token), &session)?;
    Ok(token)
}

/// Resolve a bearer token to its user. Unknown or expired tokens are unauthorized.
pub fn authenticate(tx: &impl Reader, token: &str, now: DateTime<Utc>) -> Result<User> {
    let session: Session = tx
        .get(Table::Sessions, &hash_token(token))?
        .ok_or(SaturnError::Unauthorized)?;
    if session.expires_at <= now {
        return Err(SaturnError::Unauthorized);
    }
    match get_user(tx, &session.user_id) {
        Ok(user) => Ok(user),
        Err(SaturnError::UserNotFound(_)) => Err(SaturnError::Unauthorized),
        Err(e) => Err(e),
    }
}

pub fn revoke_session(tx: &WriteTx, token: &str) -> Result<bool> {
    tx.remove(Table::Sessions, &hash_token(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open_in(dir.path()).unwrap();
        (dir, store)
    }

    fn seed(store: &Store) -> (Org, User) {
        let now = Utc::now();
        store
            .write(|tx| {
                let org = create_org(tx, "Acme", 5, now)?;
                let user = create_user(tx, "Ada@Example.com", Some("Ada"), now)?;
                add_member(tx, &org.id, &user.id, Role::Owner, now)?;
                Ok((org, user))
            })
            .unwrap()
    }

    #[test]
    fn email_is_normalized_and_unique() {
        let (_dir, store) = store();
        let (_, user) = seed(&store);
        assert_eq!(user.email, "ada@example.com");
        let err = store
            .write(|tx| create_user(tx, "ADA@example.com", None, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, SaturnError::EmailExists(_)));
        let found = store
            .read(|tx| find_user_by_email(tx, "ada@EXAMPLE.com"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, user.id);
    }

    #[test]
    fn session_round_trip_and_expiry() {
        let (_dir, store) = store();
        let (_, user) = seed(&store);
        let now = Utc::now();
        let token = store
            .write(|tx| issue_session(tx, &user.id, Duration::days(1), now))
            .unwrap();
        assert!(token.starts_with("ss_"));

        let authed = store.read(|tx| authenticate(tx, &token, now)).unwrap();
        assert_eq!(authed.id, user.id);

        let later = now + Duration::days(2);
        let err = store.read(|tx| authenticate(tx, &token, later)).unwrap_err();
        assert!(matches!(err, SaturnError::Unauthorized));

        let err = store.read(|tx| authenticate(tx, "ss_bogus", now)).unwrap_err();
        assert!(matches!(err, SaturnError::Unauthorized));
    }

    #[test]
    fn revoked_session_is_rejected() {
        let (_dir, store) = store();
        let (_, user) = seed(&store);
        let now = Utc::now();
        let token = store
            .write(|tx| issue_session(tx, &user.id, Duration::days(1), now))
            .unwrap();
        assert!(store.write(|tx| revoke_session(tx, &token)).unwrap());
        assert!(store.read(|tx| authenticate(tx, &token, now)).is_err());
    }

    #[test]
    fn profile_name_is_validated_without_trimming() {
        let (_dir, store) = store();
        let (_, user) = seed(&store);
        let now = Utc::now();

        let updated = store
            .write(|tx| update_profile(tx, &user.id, " Ada L ", now))
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some(" Ada L "));

        for bad in ["".to_string(), "x".repeat(101)] {
            let err = store
                .write(|tx| update_profile(tx, &user.id, &bad, now))
                .unwrap_err();
            match err {
                SaturnError::Validation(issues) => assert_eq!(issues[0].field, "name"),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
        let exactly_100 = "y".repeat(100);
        assert!(store
            .write(|tx| update_profile(tx, &user.id, &exactly_100, now))
            .is_ok());
    }

    #[test]
    fn onboarding_completion_sets_done() {
        let (_dir, store) = store();
        let (_, user) = seed(&store);
        let user = store
            .write(|tx| complete_onboarding(tx, &user.id, Utc::now()))
            .unwrap();
        assert!(user.onboarding_completed);
        assert_eq!(user.onboarding_step.as_deref(), Some("DONE"));
    }

    #[test]
    fn membership_is_required() {
        let (_dir, store) = store();
        let (org, user) = seed(&store);
        let m = store
            .read(|tx| require_membership(tx, &user.id, &org.id))
            .unwrap();
        assert_eq!(m.role, Role::Owner);
        let err = store
            .read(|tx| require_membership(tx, &user.id, "other-org"))
            .unwrap_err();
        assert!(matches!(err, SaturnError::Forbidden(_)));
    }
}
