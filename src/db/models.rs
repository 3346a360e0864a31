/// Database models for principals, owned resources and relations
use crate::ownership::{HasOwner, ResourceKind, Resource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Principal record in the database.
///
/// Holds the password hash and the single live refresh token, so it is never
/// serialized; responses use [`PrincipalView`].
#[derive(Debug, Clone, FromRow)]
pub struct PrincipalRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PrincipalRecord> for PrincipalView {
    fn from(record: &PrincipalRecord) -> Self {
        Self {
            id: record.id.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            full_name: record.full_name.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Video document. Media fields hold object store handles.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Playlist document with its ordered video ids
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub name: String,
    pub description: String,
    #[sqlx(skip)]
    pub videos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tweet document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment document
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_id: String,
    #[serde(rename = "video")]
    pub video_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Watch history entry joined to its video and the video's owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    pub watched_at: DateTime<Utc>,
    pub video: Video,
    pub owner: ChannelSummary,
}

/// Totals for a channel's dashboard, counted from stored rows
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_subscribers: i64,
    /// Likes received on the channel's videos
    pub total_likes: i64,
}

/// Summary of a principal as shown in subscriber / channel lists
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
}

impl HasOwner for Video {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
}

impl Resource for Video {
    const KIND: ResourceKind = ResourceKind::Video;
}

impl HasOwner for Playlist {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
}

impl Resource for Playlist {
    const KIND: ResourceKind = ResourceKind::Playlist;
}

impl HasOwner for Tweet {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
}

impl Resource for Tweet {
    const KIND: ResourceKind = ResourceKind::Tweet;
}

impl HasOwner for Comment {
    fn owner_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
}

impl Resource for Comment {
    const KIND: ResourceKind = ResourceKind::Comment;
}
