//! Session lifecycle: create, lookup, expire, revoke.

pub mod cookie;
mod store;
mod user;

pub use store::{OsTokenGenerator, Session, SessionGrant, SessionStore, TokenGenerator};
pub use user::{default_accounts, Role, StaticUserDirectory, User, UserAccount, UserDirectory};
