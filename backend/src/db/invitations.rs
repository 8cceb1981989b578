use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::db::{DbError, DbPool, Role};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
}

/// Invitation to join a tenant. Managed by the invitation flow, read-only here.
#[derive(Clone, Debug, FromRow)]
pub struct Invitation {
    pub id: i64,
    pub email: String,
    pub tenant_id: i64,
    pub role: Role,
    pub status: InvitationStatus,
    pub created_at: NaiveDateTime,
}

pub async fn find_pending_invitation(db: &DbPool, email: &str) -> Result<Option<Invitation>, DbError> {
    let invitation = sqlx::query_as::<_, Invitation>(
        r"
        SELECT id, email, tenant_id, role, status, created_at
        FROM invitations
        WHERE lower(email) = ? AND status = ?
        ORDER BY created_at DESC
        LIMIT 1
        ",
    )
    .bind(email)
    .bind(InvitationStatus::Pending)
    .fetch_optional(db)
    .await?;
    Ok(invitation)
}
