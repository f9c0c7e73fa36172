use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    /// `None` means the account has no usable password (invited or Google-only).
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    /// Full name, or the local part of the email when no name is set.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.email)
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

pub fn display_name(first: &str, last: &str, email: &str) -> String {
    let name = full_name(first, last);
    if !name.is_empty() {
        return name;
    }
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_full_name() {
        assert_eq!(display_name("Ada", "Lovelace", "ada@x.com"), "Ada Lovelace");
        assert_eq!(display_name("Ada", "", "ada@x.com"), "Ada");
    }

    #[test]
    fn display_name_falls_back_to_email_local_part() {
        assert_eq!(display_name("", "  ", "new.staff@x.com"), "new.staff");
    }
}
