use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub org_type: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrganizationType {
    #[default]
    School,
    College,
    University,
    Coaching,
}

impl OrganizationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "School" => Some(Self::School),
            "College" => Some(Self::College),
            "University" => Some(Self::University),
            "Coaching" => Some(Self::Coaching),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::School => "School",
            Self::College => "College",
            Self::University => "University",
            Self::Coaching => "Coaching",
        }
    }
}
