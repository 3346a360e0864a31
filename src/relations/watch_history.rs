/// Watch history
///
/// Per-principal list of watched videos, most recent first, one entry per
/// video, capped at [`WATCH_HISTORY_LIMIT`].
use crate::{
    db::models::{ChannelSummary, Video, WatchedVideo},
    error::{ApiError, ApiResult},
    ownership::validate_identifier,
};
use chrono::Utc;
use sqlx::{FromRow, Row, SqlitePool};

pub const WATCH_HISTORY_LIMIT: i64 = 50;

pub struct WatchHistory {
    db: SqlitePool,
}

impl WatchHistory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Move `video_id` to the front of the principal's history, evicting the
    /// oldest entries beyond the limit
    pub async fn record(&self, principal_id: &str, video_id: &str) -> ApiResult<()> {
        validate_identifier(video_id, "video")?;

        let mut tx = self.db.begin().await?;

        let video_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM video WHERE id = ?1")
            .bind(video_id)
            .fetch_one(&mut *tx)
            .await?;
        if video_exists == 0 {
            return Err(ApiError::NotFound("Video not found".to_string()));
        }

        sqlx::query("DELETE FROM watch_history WHERE principal_id = ?1 AND video_id = ?2")
            .bind(principal_id)
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO watch_history (principal_id, video_id, watched_at) VALUES (?1, ?2, ?3)",
        )
        .bind(principal_id)
        .bind(video_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM watch_history WHERE principal_id = ?1 AND seq NOT IN (
                SELECT seq FROM watch_history WHERE principal_id = ?1 ORDER BY seq DESC LIMIT ?2
             )",
        )
        .bind(principal_id)
        .bind(WATCH_HISTORY_LIMIT)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(principal_id, video_id, "Recorded watch");
        Ok(())
    }

    /// History entries with their videos and owners, most recent first
    pub async fn list(&self, principal_id: &str) -> ApiResult<Vec<WatchedVideo>> {
        let rows = sqlx::query(
            "SELECT w.watched_at,
                    v.id, v.owner_id, v.title, v.description, v.video_file, v.thumbnail,
                    v.duration, v.views, v.is_published, v.created_at, v.updated_at,
                    p.username AS owner_username, p.full_name AS owner_full_name
             FROM watch_history w
             JOIN video v ON v.id = w.video_id
             JOIN principal p ON p.id = v.owner_id
             WHERE w.principal_id = ?1
             ORDER BY w.seq DESC",
        )
        .bind(principal_id)
        .fetch_all(&self.db)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let video = Video::from_row(&row)?;
            let owner = ChannelSummary {
                id: video.owner_id.clone(),
                username: row.try_get("owner_username")?,
                full_name: row.try_get("owner_full_name")?,
            };
            entries.push(WatchedVideo {
                watched_at: row.try_get("watched_at")?,
                video,
                owner,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        self, principals,
        resources::{sample_video, ResourceStore},
    };
    use uuid::Uuid;

    async fn video_ids(history: &WatchHistory, principal_id: &str) -> Vec<String> {
        history
            .list(principal_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.video.id)
            .collect()
    }

    #[tokio::test]
    async fn test_rewatch_moves_to_front() {
        let pool = db::test_pool().await;
        let store = ResourceStore::new(pool.clone());
        let history = WatchHistory::new(pool.clone());
        let alice = principals::insert_test_principal(&pool, "alice").await;

        let a = store.create_video(&alice.id, sample_video("A")).await.unwrap();
        let b = store.create_video(&alice.id, sample_video("B")).await.unwrap();

        history.record(&alice.id, &a.id).await.unwrap();
        history.record(&alice.id, &b.id).await.unwrap();
        assert_eq!(video_ids(&history, &alice.id).await, vec![b.id.clone(), a.id.clone()]);

        history.record(&alice.id, &a.id).await.unwrap();
        assert_eq!(video_ids(&history, &alice.id).await, vec![a.id.clone(), b.id.clone()]);
    }

    #[tokio::test]
    async fn test_history_is_capped_with_oldest_evicted() {
        let pool = db::test_pool().await;
        let store = ResourceStore::new(pool.clone());
        let history = WatchHistory::new(pool.clone());
        let alice = principals::insert_test_principal(&pool, "alice").await;

        let mut watched = Vec::new();
        for i in 0..(WATCH_HISTORY_LIMIT + 5) {
            let video = store
                .create_video(&alice.id, sample_video(&format!("Video {}", i)))
                .await
                .unwrap();
            history.record(&alice.id, &video.id).await.unwrap();
            watched.push(video.id);
        }

        let ids = video_ids(&history, &alice.id).await;
        assert_eq!(ids.len() as i64, WATCH_HISTORY_LIMIT);
        assert_eq!(ids[0], *watched.last().unwrap());
        // the five oldest were evicted
        for evicted in &watched[..5] {
            assert!(!ids.contains(evicted));
        }
        assert_eq!(*ids.last().unwrap(), watched[5]);
    }

    #[tokio::test]
    async fn test_list_joins_video_and_owner() {
        let pool = db::test_pool().await;
        let store = ResourceStore::new(pool.clone());
        let history = WatchHistory::new(pool.clone());
        let alice = principals::insert_test_principal(&pool, "alice").await;
        let bob = principals::insert_test_principal(&pool, "bob").await;
        let video = store.create_video(&alice.id, sample_video("Tour")).await.unwrap();

        history.record(&bob.id, &video.id).await.unwrap();

        let entries = history.list(&bob.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video.id, video.id);
        assert_eq!(entries[0].video.title, "Tour");
        assert_eq!(entries[0].owner.id, alice.id);
        assert_eq!(entries[0].owner.username, "alice");
        assert_eq!(entries[0].owner.full_name, alice.full_name);
    }

    #[tokio::test]
    async fn test_histories_are_per_principal() {
        let pool = db::test_pool().await;
        let store = ResourceStore::new(pool.clone());
        let history = WatchHistory::new(pool.clone());
        let alice = principals::insert_test_principal(&pool, "alice").await;
        let bob = principals::insert_test_principal(&pool, "bob").await;
        let video = store.create_video(&alice.id, sample_video("A")).await.unwrap();

        history.record(&alice.id, &video.id).await.unwrap();

        assert_eq!(video_ids(&history, &alice.id).await.len(), 1);
        assert!(video_ids(&history, &bob.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_or_malformed_video() {
        let pool = db::test_pool().await;
        let history = WatchHistory::new(pool.clone());
        let alice = principals::insert_test_principal(&pool, "alice").await;

        let missing = Uuid::new_v4().to_string();
        assert!(matches!(
            history.record(&alice.id, &missing).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            history.record(&alice.id, "nope").await,
            Err(ApiError::InvalidIdentifier(_))
        ));
        assert!(history.list(&alice.id).await.unwrap().is_empty());
    }
}
