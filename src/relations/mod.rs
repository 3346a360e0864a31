/// Relation toggle engine
///
/// Likes and subscriptions are `(subject, target, kind)` rows whose existence
/// is the boolean state. Flips never read before writing: a conditional
/// delete either removes the row or falls through to an insert that the
/// primary key makes idempotent.

pub mod watch_history;

pub use watch_history::WatchHistory;

use crate::{
    db::models::{ChannelSummary, Video},
    error::{ApiError, ApiResult},
    ownership::validate_identifier,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

/// Relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    VideoLike,
    CommentLike,
    TweetLike,
    Subscription,
}

impl ToggleKind {
    /// Value stored in the `kind` column
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleKind::VideoLike => "video-like",
            ToggleKind::CommentLike => "comment-like",
            ToggleKind::TweetLike => "tweet-like",
            ToggleKind::Subscription => "subscription",
        }
    }

    fn target_table(&self) -> &'static str {
        match self {
            ToggleKind::VideoLike => "video",
            ToggleKind::CommentLike => "comment",
            ToggleKind::TweetLike => "tweet",
            ToggleKind::Subscription => "principal",
        }
    }

    fn target_label(&self) -> &'static str {
        match self {
            ToggleKind::VideoLike => "Video",
            ToggleKind::CommentLike => "Comment",
            ToggleKind::TweetLike => "Tweet",
            ToggleKind::Subscription => "Channel",
        }
    }

    fn target_name(&self) -> &'static str {
        match self {
            ToggleKind::VideoLike => "video",
            ToggleKind::CommentLike => "comment",
            ToggleKind::TweetLike => "tweet",
            ToggleKind::Subscription => "channel",
        }
    }
}

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Created,
    Deleted,
}

pub struct RelationEngine {
    db: SqlitePool,
}

impl RelationEngine {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Flip the relation between `subject_id` and `target_id`
    pub async fn toggle(
        &self,
        subject_id: &str,
        target_id: &str,
        kind: ToggleKind,
    ) -> ApiResult<ToggleOutcome> {
        validate_identifier(target_id, kind.target_name())?;

        if kind == ToggleKind::Subscription && subject_id == target_id {
            return Err(ApiError::SelfReferenceDenied);
        }

        if !self.target_exists(target_id, kind).await? {
            return Err(ApiError::NotFound(format!("{} not found", kind.target_label())));
        }

        let deleted = sqlx::query(
            "DELETE FROM toggle_relation WHERE subject_id = ?1 AND target_id = ?2 AND kind = ?3",
        )
        .bind(subject_id)
        .bind(target_id)
        .bind(kind.as_str())
        .execute(&self.db)
        .await?;

        if deleted.rows_affected() > 0 {
            tracing::debug!(subject_id, target_id, kind = kind.as_str(), "Relation deleted");
            return Ok(ToggleOutcome::Deleted);
        }

        let inserted = sqlx::query(
            "INSERT INTO toggle_relation (subject_id, target_id, kind, created_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (subject_id, target_id, kind) DO NOTHING",
        )
        .bind(subject_id)
        .bind(target_id)
        .bind(kind.as_str())
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        if inserted.rows_affected() == 0 {
            tracing::debug!(subject_id, target_id, kind = kind.as_str(), "Relation already present");
        } else {
            tracing::debug!(subject_id, target_id, kind = kind.as_str(), "Relation created");
        }

        Ok(ToggleOutcome::Created)
    }

    async fn target_exists(&self, target_id: &str, kind: ToggleKind) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE id = ?1",
            kind.target_table()
        ))
        .bind(target_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    /// Whether the relation currently exists
    pub async fn exists(&self, subject_id: &str, target_id: &str, kind: ToggleKind) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM toggle_relation WHERE subject_id = ?1 AND target_id = ?2 AND kind = ?3",
        )
        .bind(subject_id)
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(count > 0)
    }

    /// Number of subjects related to `target_id`
    pub async fn count_for_target(&self, target_id: &str, kind: ToggleKind) -> ApiResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM toggle_relation WHERE target_id = ?1 AND kind = ?2",
        )
        .bind(target_id)
        .bind(kind.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Number of targets `subject_id` is related to
    pub async fn count_for_subject(&self, subject_id: &str, kind: ToggleKind) -> ApiResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM toggle_relation WHERE subject_id = ?1 AND kind = ?2",
        )
        .bind(subject_id)
        .bind(kind.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Videos liked by `subject_id`, most recently liked first
    pub async fn liked_videos(&self, subject_id: &str) -> ApiResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT v.id, v.owner_id, v.title, v.description, v.video_file, v.thumbnail, v.duration,
                    v.views, v.is_published, v.created_at, v.updated_at
             FROM toggle_relation r
             JOIN video v ON v.id = r.target_id
             WHERE r.subject_id = ?1 AND r.kind = ?2
             ORDER BY r.created_at DESC, r.rowid DESC",
        )
        .bind(subject_id)
        .bind(ToggleKind::VideoLike.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    /// Principals subscribed to `channel_id`
    pub async fn subscribers(&self, channel_id: &str) -> ApiResult<Vec<ChannelSummary>> {
        validate_identifier(channel_id, "channel")?;

        let subscribers = sqlx::query_as::<_, ChannelSummary>(
            "SELECT p.id, p.username, p.full_name
             FROM toggle_relation r
             JOIN principal p ON p.id = r.subject_id
             WHERE r.target_id = ?1 AND r.kind = ?2
             ORDER BY r.created_at DESC, r.rowid DESC",
        )
        .bind(channel_id)
        .bind(ToggleKind::Subscription.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(subscribers)
    }

    /// Channels `subscriber_id` is subscribed to
    pub async fn subscribed_channels(&self, subscriber_id: &str) -> ApiResult<Vec<ChannelSummary>> {
        validate_identifier(subscriber_id, "subscriber")?;

        let channels = sqlx::query_as::<_, ChannelSummary>(
            "SELECT p.id, p.username, p.full_name
             FROM toggle_relation r
             JOIN principal p ON p.id = r.target_id
             WHERE r.subject_id = ?1 AND r.kind = ?2
             ORDER BY r.created_at DESC, r.rowid DESC",
        )
        .bind(subscriber_id)
        .bind(ToggleKind::Subscription.as_str())
        .fetch_all(&self.db)
        .await?;

        Ok(channels)
    }
}
