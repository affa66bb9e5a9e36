/*
 * Responsibility
 * - login / register / refresh の request/response DTO
 * - validate() で形式チェック (DB を見るチェックは handler 側)
 */
use serde::{Deserialize, Serialize};

use crate::error::FieldError;
use crate::repos::user_repo::User;
use crate::services::password;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.email.is_empty() || self.password.is_empty() {
            return Err("email and password are required");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        if let Err(msg) = validate_name(&self.name) {
            errors.push(FieldError::new("name", msg));
        }
        if let Err(msg) = validate_email(&self.email) {
            errors.push(FieldError::new("email", msg));
        }
        if let Err(msg) = password::check_strength(&self.password) {
            errors.push(FieldError::new("password", msg));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Trimmed name and lower-cased email as stored.
    pub fn normalized(&self) -> (String, String) {
        (
            self.name.trim().to_string(),
            self.email.trim().to_ascii_lowercase(),
        )
    }
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name is required");
    }
    if name.trim().chars().count() < 2 {
        return Err("name must be at least 2 characters long");
    }
    if name.chars().count() > 100 {
        return Err("name must be less than 100 characters");
    }
    Ok(())
}

// local@domain.tld, tld >= 2 letters
fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("email is required");
    }

    let invalid = Err("invalid email format");
    let Some((local, domain)) = email.split_once('@') else {
        return invalid;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return invalid;
    };

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    if local_ok && host_ok && tld_ok {
        Ok(())
    } else {
        invalid
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
