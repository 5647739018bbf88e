//! Users and credential lookup.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
            Role::Guest => f.write_str("guest"),
        }
    }
}

/// An authenticated user, as held by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl User {
    /// Whether this user may act as `role`. Admins satisfy every role.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role || self.role == Role::Admin
    }
}

/// A directory entry: a user plus the password it logs in with.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    #[serde(flatten)]
    pub user: User,
    pub password: String,
}

impl fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserAccount")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Source of users for the login endpoint.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return the user if `email` and `password` match an account.
    async fn authenticate(&self, email: &str, password: &str) -> Option<User>;
}

/// A fixed, in-memory user list.
///
/// Passwords are compared as plain text; this directory exists to seed
/// development and test deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticUserDirectory {
    accounts: Vec<UserAccount>,
}

impl StaticUserDirectory {
    /// Create a directory over the given accounts.
    pub fn new(accounts: Vec<UserAccount>) -> Self {
        Self { accounts }
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether the directory has no accounts.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        let account = self.accounts.iter().find(|a| a.user.email == email);
        match account {
            Some(account) if account.password == password => Some(account.user.clone()),
            Some(_) => {
                debug!(email = %email, "Password mismatch");
                None
            }
            None => {
                debug!(email = %email, "Unknown account");
                None
            }
        }
    }
}

/// The accounts a fresh deployment starts with.
pub fn default_accounts() -> Vec<UserAccount> {
    vec![
        UserAccount {
            user: User {
                id: "1".to_string(),
                email: "admin@example.com".to_string(),
                name: "Admin User".to_string(),
                role: Role::Admin,
            },
            password: "password123".to_string(),
        },
        UserAccount {
            user: User {
                id: "2".to_string(),
                email: "user@example.com".to_string(),
                name: "Regular User".to_string(),
                role: Role::User,
            },
            password: "password123".to_string(),
        },
    ]
}
