use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Stored and serialized under the variant name ('Admin', 'Manager',
/// 'Employee').
#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

/// Full account row, password hash included. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub user_id: i64,
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRead {
    pub user_id: i64,
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}
