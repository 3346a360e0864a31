/// Owned resource storage
///
/// Videos, playlists, tweets and comments. Every record carries the id of
/// its owning principal, set at creation and never rewritten. Mutations here
/// assume the caller already passed the ownership guard.
use crate::{
    db::models::{ChannelStats, Comment, Playlist, Tweet, Video},
    error::{ApiError, ApiResult},
    ownership::ResourceLookup,
    relations::ToggleKind,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, owner_id, title, description, video_file, thumbnail, duration, views, is_published, created_at, updated_at";
const PLAYLIST_COLUMNS: &str = "id, owner_id, name, description, created_at, updated_at";
const TWEET_COLUMNS: &str = "id, owner_id, content, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, owner_id, video_id, content, created_at, updated_at";

/// Fields supplied when publishing a video
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
}

/// Sortable video columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSort {
    #[default]
    CreatedAt,
    Title,
    Views,
    Duration,
}

impl VideoSort {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "createdAt" => Some(Self::CreatedAt),
            "title" => Some(Self::Title),
            "views" => Some(Self::Views),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::Title => "title",
            Self::Views => "views",
            Self::Duration => "duration",
        }
    }
}

/// One page of a channel's videos
#[derive(Debug, Clone)]
pub struct VideoQuery {
    /// 1-based
    pub page: u32,
    pub limit: u32,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub sort_by: VideoSort,
    pub descending: bool,
    pub include_unpublished: bool,
}

impl Default for VideoQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            title_contains: None,
            sort_by: VideoSort::CreatedAt,
            descending: true,
            include_unpublished: false,
        }
    }
}

fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_error) if db_error.is_unique_violation())
}

/// Resource store backed by SQLite
#[derive(Clone)]
pub struct ResourceStore {
    db: SqlitePool,
}

impl ResourceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ========== Videos ==========

    pub async fn create_video(&self, owner_id: &str, new: NewVideo) -> ApiResult<Video> {
        let now = Utc::now();
        let video = Video {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: new.title,
            description: new.description,
            video_file: new.video_file,
            thumbnail: new.thumbnail,
            duration: new.duration,
            views: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO video (id, owner_id, title, description, video_file, thumbnail, duration, views, is_published, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&video.id)
        .bind(&video.owner_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_file)
        .bind(&video.thumbnail)
        .bind(video.duration)
        .bind(video.views)
        .bind(video.is_published)
        .bind(video.created_at)
        .bind(video.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(video_id = %video.id, owner_id, "Created video");
        Ok(video)
    }

    pub async fn find_video(&self, id: &str) -> ApiResult<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM video WHERE id = ?1",
            VIDEO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(video)
    }

    pub async fn update_video_details(
        &self,
        id: &str,
        title: &str,
        description: &str,
    ) -> ApiResult<Video> {
        sqlx::query("UPDATE video SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(title)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        self.find_video(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
    }

    /// Flip the published flag and return the updated video
    pub async fn toggle_publish(&self, id: &str) -> ApiResult<Video> {
        sqlx::query(
            "UPDATE video SET is_published = NOT is_published, updated_at = ?1 WHERE id = ?2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        self.find_video(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
    }

    /// Delete a video with its comments, playlist entries, watch history
    /// entries and every relation targeting it or its comments
    pub async fn delete_video(&self, id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            "DELETE FROM toggle_relation
             WHERE target_id IN (SELECT id FROM comment WHERE video_id = ?1) AND kind = 'comment-like'",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        delete_relations_targeting(&mut tx, id).await?;

        sqlx::query("DELETE FROM watch_history WHERE video_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // comments and playlist entries cascade
        sqlx::query("DELETE FROM video WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(video_id = id, "Deleted video");
        Ok(())
    }

    /// Page through an owner's videos, filtered by title and sorted on a
    /// whitelisted column
    pub async fn list_videos(&self, owner_id: &str, query: &VideoQuery) -> ApiResult<Vec<Video>> {
        let mut sql = format!("SELECT {} FROM video WHERE owner_id = ?1", VIDEO_COLUMNS);
        if !query.include_unpublished {
            sql.push_str(" AND is_published = 1");
        }
        if query.title_contains.is_some() {
            sql.push_str(" AND title LIKE ?4 ESCAPE '\\'");
        }
        let direction = if query.descending { "DESC" } else { "ASC" };
        sql.push_str(&format!(
            " ORDER BY {col} {dir}, id {dir} LIMIT ?2 OFFSET ?3",
            col = query.sort_by.column(),
            dir = direction
        ));

        let limit = i64::from(query.limit.max(1));
        let offset = i64::from(query.page.max(1) - 1) * limit;

        let mut statement = sqlx::query_as::<_, Video>(&sql)
            .bind(owner_id)
            .bind(limit)
            .bind(offset);
        if let Some(needle) = &query.title_contains {
            statement = statement.bind(like_pattern(needle));
        }

        Ok(statement.fetch_all(&self.db).await?)
    }

    /// Every video of an owner, published or not, newest first
    pub async fn list_videos_by_owner(&self, owner_id: &str) -> ApiResult<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(&format!(
            "SELECT {} FROM video WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC",
            VIDEO_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(videos)
    }

    /// Dashboard totals for a channel
    pub async fn channel_stats(&self, owner_id: &str) -> ApiResult<ChannelStats> {
        let (total_videos, total_views): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(views), 0) FROM video WHERE owner_id = ?1",
        )
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        let total_subscribers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM toggle_relation WHERE target_id = ?1 AND kind = ?2",
        )
        .bind(owner_id)
        .bind(ToggleKind::Subscription.as_str())
        .fetch_one(&self.db)
        .await?;

        let total_likes: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM toggle_relation r
             JOIN video v ON v.id = r.target_id
             WHERE v.owner_id = ?1 AND r.kind = ?2",
        )
        .bind(owner_id)
        .bind(ToggleKind::VideoLike.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(ChannelStats {
            total_videos,
            total_views,
            total_subscribers,
            total_likes,
        })
    }

    // ========== Playlists ==========

    pub async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        description: &str,
    ) -> ApiResult<Playlist> {
        let now = Utc::now();
        let playlist = Playlist {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            videos: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO playlist (id, owner_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&playlist.id)
        .bind(&playlist.owner_id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.db)
        .await
        .map_err(playlist_name_conflict)?;

        tracing::info!(playlist_id = %playlist.id, owner_id, "Created playlist");
        Ok(playlist)
    }

    pub async fn find_playlist(&self, id: &str) -> ApiResult<Option<Playlist>> {
        let playlist = sqlx::query_as::<_, Playlist>(&format!(
            "SELECT {} FROM playlist WHERE id = ?1",
            PLAYLIST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        match playlist {
            Some(mut playlist) => {
                playlist.videos = self.playlist_video_ids(&playlist.id).await?;
                Ok(Some(playlist))
            }
            None => Ok(None),
        }
    }

    pub async fn list_playlists_by_owner(&self, owner_id: &str) -> ApiResult<Vec<Playlist>> {
        let mut playlists = sqlx::query_as::<_, Playlist>(&format!(
            "SELECT {} FROM playlist WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            PLAYLIST_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        for playlist in playlists.iter_mut() {
            playlist.videos = self.playlist_video_ids(&playlist.id).await?;
        }

        Ok(playlists)
    }

    async fn playlist_video_ids(&self, playlist_id: &str) -> ApiResult<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT video_id FROM playlist_video WHERE playlist_id = ?1 ORDER BY position",
        )
        .bind(playlist_id)
        .fetch_all(&self.db)
        .await?;

        Ok(ids)
    }

    pub async fn update_playlist(
        &self,
        id: &str,
        name: &str,
        description: &str,
    ) -> ApiResult<Playlist> {
        sqlx::query("UPDATE playlist SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(name)
            .bind(description)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(playlist_name_conflict)?;

        self.find_playlist(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))
    }

    pub async fn delete_playlist(&self, id: &str) -> ApiResult<()> {
        sqlx::query("DELETE FROM playlist WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(playlist_id = id, "Deleted playlist");
        Ok(())
    }

    /// Append a video; adding one that is already present is a no-op
    pub async fn add_video_to_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> ApiResult<Playlist> {
        sqlx::query(
            "INSERT INTO playlist_video (playlist_id, video_id) VALUES (?1, ?2)
             ON CONFLICT (playlist_id, video_id) DO NOTHING",
        )
        .bind(playlist_id)
        .bind(video_id)
        .execute(&self.db)
        .await?;

        self.find_playlist(playlist_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))
    }

    pub async fn remove_video_from_playlist(
        &self,
        playlist_id: &str,
        video_id: &str,
    ) -> ApiResult<Playlist> {
        sqlx::query("DELETE FROM playlist_video WHERE playlist_id = ?1 AND video_id = ?2")
            .bind(playlist_id)
            .bind(video_id)
            .execute(&self.db)
            .await?;

        self.find_playlist(playlist_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))
    }

    // ========== Tweets ==========

    pub async fn create_tweet(&self, owner_id: &str, content: &str) -> ApiResult<Tweet> {
        let now = Utc::now();
        let tweet = Tweet {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO tweet (id, owner_id, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&tweet.id)
        .bind(&tweet.owner_id)
        .bind(&tweet.content)
        .bind(tweet.created_at)
        .bind(tweet.updated_at)
        .execute(&self.db)
        .await?;

        Ok(tweet)
    }

    pub async fn find_tweet(&self, id: &str) -> ApiResult<Option<Tweet>> {
        let tweet = sqlx::query_as::<_, Tweet>(&format!(
            "SELECT {} FROM tweet WHERE id = ?1",
            TWEET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(tweet)
    }

    pub async fn list_tweets_by_owner(&self, owner_id: &str) -> ApiResult<Vec<Tweet>> {
        let tweets = sqlx::query_as::<_, Tweet>(&format!(
            "SELECT {} FROM tweet WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            TWEET_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(tweets)
    }

    pub async fn update_tweet(&self, id: &str, content: &str) -> ApiResult<Tweet> {
        sqlx::query("UPDATE tweet SET content = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        self.find_tweet(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Tweet not found".to_string()))
    }

    pub async fn delete_tweet(&self, id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        delete_relations_targeting(&mut tx, id).await?;
        sqlx::query("DELETE FROM tweet WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ========== Comments ==========

    pub async fn create_comment(
        &self,
        owner_id: &str,
        video_id: &str,
        content: &str,
    ) -> ApiResult<Comment> {
        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            video_id: video_id.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO comment (id, owner_id, video_id, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&comment.id)
        .bind(&comment.owner_id)
        .bind(&comment.video_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .execute(&self.db)
        .await?;

        Ok(comment)
    }

    pub async fn find_comment(&self, id: &str) -> ApiResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comment WHERE id = ?1",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(comment)
    }

    pub async fn list_comments_for_video(&self, video_id: &str) -> ApiResult<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {} FROM comment WHERE video_id = ?1 ORDER BY created_at DESC, rowid DESC",
            COMMENT_COLUMNS
        ))
        .bind(video_id)
        .fetch_all(&self.db)
        .await?;

        Ok(comments)
    }

    pub async fn update_comment(&self, id: &str, content: &str) -> ApiResult<Comment> {
        sqlx::query("UPDATE comment SET content = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(content)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await?;

        self.find_comment(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
    }

    pub async fn delete_comment(&self, id: &str) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        delete_relations_targeting(&mut tx, id).await?;
        sqlx::query("DELETE FROM comment WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn delete_relations_targeting(
    tx: &mut Transaction<'_, Sqlite>,
    target_id: &str,
) -> ApiResult<()> {
    sqlx::query("DELETE FROM toggle_relation WHERE target_id = ?1")
        .bind(target_id)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

fn playlist_name_conflict(error: sqlx::Error) -> ApiError {
    if is_unique_violation(&error) {
        ApiError::Conflict("Playlist with this name already exists".to_string())
    } else {
        ApiError::Database(error)
    }
}

#[async_trait]
impl ResourceLookup<Video> for ResourceStore {
    async fn find_by_id(&self, id: &str) -> ApiResult<Option<Video>> {
        self.find_video(id).await
    }
}

#[async_trait]
impl ResourceLookup<Playlist> for ResourceStore {
    async fn find_by_id(&self, id: &str) -> ApiResult<Option<Playlist>> {
        self.find_playlist(id).await
    }
}

#[async_trait]
impl ResourceLookup<Tweet> for ResourceStore {
    async fn find_by_id(&self, id: &str) -> ApiResult<Option<Tweet>> {
        self.find_tweet(id).await
    }
}

#[async_trait]
impl ResourceLookup<Comment> for ResourceStore {
    async fn find_by_id(&self, id: &str) -> ApiResult<Option<Comment>> {
        self.find_comment(id).await
    }
}

#[cfg(test)]
pub(crate) fn sample_video(title: &str) -> NewVideo {
    NewVideo {
        title: title.to_string(),
        description: format!("{} description", title),
        video_file: "ab/abcdef-video".to_string(),
        thumbnail: "cd/cdefab-thumb".to_string(),
        duration: 12.5,
    }
}
