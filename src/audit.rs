use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{domain::Owner, entity::audit_logs::ActiveModel, error::AppResult};

pub async fn log_audit<C>(
    conn: &C,
    actor: Option<&Owner>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.and_then(Owner::user_id)),
        guest_id: Set(actor.and_then(Owner::guest_id).map(str::to_owned)),
        action: Set(action.to_owned()),
        resource: Set(resource.map(str::to_owned)),
        metadata: Set(metadata.map(|m| m.to_string())),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Write an audit row, logging instead of failing the caller.
pub async fn record<C>(
    conn: &C,
    actor: Option<&Owner>,
    action: &str,
    resource: &str,
    metadata: Value,
) where
    C: ConnectionTrait,
{
    if let Err(err) = log_audit(conn, actor, action, Some(resource), Some(metadata)).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
