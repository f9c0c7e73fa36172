use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenant-side extension of a [`User`](super::User). Exactly one per user.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub role: String,
    pub designation: Option<String>,
    pub is_setup_complete: bool,
    pub phone_number: Option<String>,
    pub permissions: serde_json::Value,
}

impl UserProfile {
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    #[default]
    Staff,
    Student,
}

impl Role {
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            "ORG_ADMIN" => Some(Self::OrgAdmin),
            "STAFF" => Some(Self::Staff),
            "STUDENT" => Some(Self::Student),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER_ADMIN",
            Self::OrgAdmin => "ORG_ADMIN",
            Self::Staff => "STAFF",
            Self::Student => "STUDENT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::OrgAdmin => "Organization Admin",
            Self::Staff => "Staff/Teacher",
            Self::Student => "Student",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::OrgAdmin)
    }
}

/// One row of the staff listing: profile joined with its user and department.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StaffMemberRow {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub last_login: Option<DateTime<Utc>>,
    pub role: String,
    pub permissions: serde_json::Value,
    pub department_name: Option<String>,
}
