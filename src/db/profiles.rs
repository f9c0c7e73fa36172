use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Role, StaffMemberRow, UserProfile};

/// Returns the user's profile, creating a default one if it is missing.
///
/// Called after every write to `users` so that no account is left without a
/// profile, including accounts inserted by other tools.
pub async fn ensure_for_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "INSERT INTO user_profiles (user_id) VALUES ($1)
         ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING *",
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
}

/// Row-locks the profile for the rest of the transaction.
pub async fn lock_by_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "SELECT * FROM user_profiles WHERE user_id = $1 FOR UPDATE",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn complete_setup<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
    designation: Option<&str>,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "UPDATE user_profiles
         SET organization_id = $2, role = $3, designation = $4, is_setup_complete = true
         WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(Role::OrgAdmin.as_str())
    .bind(designation)
    .fetch_one(executor)
    .await
}

/// Attaches an invited user to an organization with a ready-to-use profile.
pub async fn join_organization<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
    role: Role,
) -> Result<UserProfile, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "UPDATE user_profiles
         SET organization_id = $2, role = $3, is_setup_complete = true
         WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(role.as_str())
    .fetch_one(executor)
    .await
}

/// Replaces the permissions document of a member of `organization_id`.
/// Returns false when no such member exists.
pub async fn update_permissions<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
    permissions: &serde_json::Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_profiles SET permissions = $3
         WHERE user_id = $1 AND organization_id = $2",
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(permissions)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves a member of `organization_id` into a department, or out of any
/// department with `None`. Returns false when no such member exists.
pub async fn assign_department<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    organization_id: Uuid,
    department_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE user_profiles SET department_id = $3
         WHERE user_id = $1 AND organization_id = $2",
    )
    .bind(user_id)
    .bind(organization_id)
    .bind(department_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_staff(
    pool: &PgPool,
    organization_id: Uuid,
) -> Result<Vec<StaffMemberRow>, sqlx::Error> {
    sqlx::query_as::<_, StaffMemberRow>(
        "SELECT u.id AS user_id, u.email, u.first_name, u.last_name, u.last_login,
                p.role, p.permissions, d.name AS department_name
         FROM user_profiles p
         JOIN users u ON u.id = p.user_id
         LEFT JOIN departments d ON d.id = p.department_id
         WHERE p.organization_id = $1
         ORDER BY u.date_joined ASC",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
}
