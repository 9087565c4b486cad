use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{Role, User};
use crate::error::{AttendError, AttendResult};
use crate::store::IdentityStore;

/// Hashes a password into an Argon2id PHC string with a fresh salt.
pub fn hash_password(password: &str) -> AttendResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AttendError::Hashing(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AttendError::Hashing(e.to_string()))
}

/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// The signed-in user a request acts as.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
    pub name: String,
    pub index_number: String,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            name: user.name.clone(),
            index_number: user.index_number.clone(),
        }
    }

    pub fn require_staff(&self) -> AttendResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AttendError::forbidden("admin access required"))
        }
    }

    pub fn require_administrator(&self) -> AttendResult<()> {
        if self.role == Role::Administrator {
            Ok(())
        } else {
            Err(AttendError::forbidden("administrator access required"))
        }
    }

    pub fn require_student(&self) -> AttendResult<()> {
        if self.role == Role::Student {
            Ok(())
        } else {
            Err(AttendError::forbidden("student access required"))
        }
    }
}

/// Unknown index numbers and wrong passwords fail the same way.
pub fn authenticate<S: IdentityStore>(
    store: &S,
    index_number: &str,
    password: &str,
) -> AttendResult<Principal> {
    match store.find_user(index_number.trim())? {
        Some(user) if verify_password(password, &user.password_hash) => {
            Ok(Principal::from_user(&user))
        }
        _ => Err(AttendError::InvalidCredentials),
    }
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<String, Principal>,
}

impl SessionTable {
    pub fn open(&mut self, principal: Principal) -> String {
        let token = Uuid::new_v4().to_string();
        self.sessions.insert(token.clone(), principal);
        token
    }

    pub fn resolve(&self, token: &str) -> Option<&Principal> {
        self.sessions.get(token)
    }

    pub fn close(&mut self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    pub fn close_user(&mut self, user_id: i64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, p| p.user_id != user_id);
        before - self.sessions.len()
    }

    pub fn rename_user(&mut self, user_id: i64, name: &str) {
        for p in self.sessions.values_mut().filter(|p| p.user_id == user_id) {
            p.name = name.to_string();
        }
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::store::MemoryStore;

    fn principal(user_id: i64, role: Role) -> Principal {
        Principal {
            user_id,
            role,
            name: "N".to_string(),
            index_number: format!("U{user_id}"),
        }
    }

    #[test]
    fn hash_round_trips_and_salts_differ() {
        let a = hash_password("admin123").expect("hash");
        let b = hash_password("admin123").expect("hash");
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password("admin123", &a));
        assert!(!verify_password("admin124", &a));
        assert!(!verify_password("admin123", "not-a-phc-string"));
    }

    #[test]
    fn authenticate_rejects_unknown_and_wrong_password_alike() {
        let mut store = MemoryStore::new();
        store
            .insert_user(&NewUser {
                index_number: "S1".to_string(),
                password_hash: hash_password("pw").expect("hash"),
                role: Role::Student,
                name: "Ada".to_string(),
            })
            .expect("insert");

        let p = authenticate(&store, "S1", "pw").expect("login");
        assert_eq!(p.role, Role::Student);
        assert_eq!(p.name, "Ada");

        let wrong = authenticate(&store, "S1", "nope").expect_err("wrong pw");
        let unknown = authenticate(&store, "S9", "pw").expect_err("unknown");
        assert_eq!(wrong.code(), "invalid_credentials");
        assert_eq!(unknown.code(), "invalid_credentials");
    }

    #[test]
    fn role_guards() {
        let student = principal(1, Role::Student);
        let admin = principal(2, Role::Admin);
        let root = principal(3, Role::Administrator);

        assert!(student.require_staff().is_err());
        assert!(student.require_student().is_ok());
        assert!(admin.require_staff().is_ok());
        assert_eq!(
            admin.require_administrator().expect_err("admin").code(),
            "forbidden"
        );
        assert!(admin.require_student().is_err());
        assert!(root.require_staff().is_ok());
        assert!(root.require_administrator().is_ok());
    }

    #[test]
    fn sessions_open_resolve_and_close() {
        let mut table = SessionTable::default();
        let t1 = table.open(principal(1, Role::Student));
        let t2 = table.open(principal(1, Role::Student));
        let t3 = table.open(principal(2, Role::Admin));
        assert_ne!(t1, t2);

        table.rename_user(1, "Renamed");
        assert_eq!(table.resolve(&t2).map(|p| p.name.as_str()), Some("Renamed"));

        assert!(table.close(&t3));
        assert!(!table.close(&t3));
        assert_eq!(table.close_user(1), 2);
        assert!(table.resolve(&t1).is_none());
    }
}
