use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::api::validate::FieldError;
use crate::db::{Collection, DbError, Document};
use crate::hash::hash_string;

pub const USERS_COLLECTION: &str = "users";

/// Fields a user document exposes over the API.
pub const USER_PUBLIC_FIELDS: &[&str] = &[
    "id",
    "name",
    "email",
    "role",
    "incomes",
    "expenses",
    "goals",
    "balance",
    "currency",
    "totalIncomes",
    "totalExpenses",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User already exists")]
    AlreadyExists,
    #[error(transparent)]
    Db(#[from] DbError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub balance: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub total_incomes: f64,
    #[serde(default)]
    pub total_expenses: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl CreateUser {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > 100 {
            errors.push(FieldError::new("name", "Name must be between 1 and 100 characters"));
        }
        if !is_email(&self.email) {
            errors.push(FieldError::new("email", "Invalid email"));
        }
        if self.password.chars().count() < 8 {
            errors.push(FieldError::new("password", "Password must be at least 8 characters"));
        }
        for (field, value) in [
            ("balance", self.balance),
            ("totalIncomes", self.total_incomes),
            ("totalExpenses", self.total_expenses),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(FieldError::new(field, format!("{field} must be a non-negative number")));
            }
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            errors.push(FieldError::new("currency", "Currency must be a three-letter ISO code"));
        }

        errors
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

/// Store a new user with a hashed password. Emails are unique.
pub async fn create_user(users: &dyn Collection, input: CreateUser) -> Result<Document, UserError> {
    let mut by_email = Document::new();
    by_email.insert("email".to_string(), json!(input.email));
    if users.find_one(&by_email).await?.is_some() {
        return Err(UserError::AlreadyExists);
    }

    let now = Utc::now().to_rfc3339();
    let document: Document = [
        ("name", json!(input.name.trim())),
        ("email", json!(input.email)),
        ("password", json!(hash_string(&input.password))),
        ("accessToken", json!("")),
        ("refreshToken", json!("")),
        ("role", json!(input.role)),
        ("incomes", json!([])),
        ("expenses", json!([])),
        ("goals", json!([])),
        ("balance", json!(input.balance)),
        ("currency", json!(input.currency)),
        ("totalIncomes", json!(input.total_incomes)),
        ("totalExpenses", json!(input.total_expenses)),
        ("createdAt", json!(now)),
        ("updatedAt", json!(now)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    let stored = users.insert_one(document).await?;
    tracing::info!(email = %input.email, "User created");
    Ok(stored)
}

/// Project a stored user onto its public fields, exposing `_id` as `id`.
pub fn public_view(document: &Document) -> Document {
    let mut view = Document::new();
    if let Some(id) = document.get("_id") {
        view.insert("id".to_string(), id.clone());
    }
    for field in USER_PUBLIC_FIELDS {
        if let Some(value) = document.get(*field) {
            view.entry(field.to_string()).or_insert_with(|| value.clone());
        }
    }
    view
}
