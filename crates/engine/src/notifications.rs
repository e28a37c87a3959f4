//! Notification records and the sink the engine emits them through.
//!
//! The engine never talks to a delivery channel directly. Alert evaluation
//! produces [`NewNotification`] values and hands them to a
//! [`NotificationSink`]; the default [`DbNotificationSink`] persists them
//! as unread rows, and callers that do not care can plug in [`NullSink`].
//! Sink failures are reported as [`EngineError::Notify`] and the caller
//! decides whether they are fatal; the engine's alert path logs and moves
//! on, because a failed notification must never undo a committed write.

use async_trait::async_trait;
use sea_orm::{ActiveValue, DatabaseConnection, EntityTrait, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// What a notification is about. Stored as its stable string code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    NearLimit,
    Exceeded,
    DuplicateCharge,
}

impl NotificationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NearLimit => "NEAR_LIMIT",
            Self::Exceeded => "EXCEEDED",
            Self::DuplicateCharge => "DUPLICATE_CHARGE",
        }
    }
}

/// A notification about to be emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewNotification {
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Structured context for downstream consumers (category, amounts,
    /// the triggering transaction id).
    pub meta: serde_json::Value,
    /// Grouping key so delivery layers can collapse repeats.
    pub dedupe_key: Option<String>,
}

/// Destination for engine-produced notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: NewNotification) -> ResultEngine<()>;
}

/// Sink that drops every notification. Useful for callers that evaluate
/// alerts elsewhere and for tests that do not assert on them.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn create(&self, _notification: NewNotification) -> ResultEngine<()> {
        Ok(())
    }
}

/// Sink that persists notifications as unread rows.
#[derive(Clone, Debug)]
pub struct DbNotificationSink {
    database: DatabaseConnection,
}

impl DbNotificationSink {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

#[async_trait]
impl NotificationSink for DbNotificationSink {
    async fn create(&self, notification: NewNotification) -> ResultEngine<()> {
        let row = ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            user_id: ActiveValue::Set(notification.user_id),
            kind: ActiveValue::Set(notification.kind.as_str().to_string()),
            title: ActiveValue::Set(notification.title),
            message: ActiveValue::Set(notification.message),
            meta: ActiveValue::Set(notification.meta),
            dedupe_key: ActiveValue::Set(notification.dedupe_key),
            read: ActiveValue::Set(false),
            created_at: ActiveValue::Set(chrono::Utc::now()),
        };
        Entity::insert(row)
            .exec(&self.database)
            .await
            .map_err(|err| EngineError::Notify(err.to_string()))?;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub meta: Json,
    pub dedupe_key: Option<String>,
    pub read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
