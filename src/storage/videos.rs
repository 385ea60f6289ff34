use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{decode_timestamp, encode_timestamp, now, Database, NewVideo, StoreError, Video};

const VIDEO_COLUMNS: &str = "id, youtube_id, title, channel, duration_seconds, created_at, updated_at";

fn video_from_row(row: &SqliteRow) -> Result<Video, StoreError> {
    Ok(Video {
        id: row.try_get("id")?,
        youtube_id: row.try_get("youtube_id")?,
        title: row.try_get("title")?,
        channel: row.try_get("channel")?,
        duration_seconds: row.try_get("duration_seconds")?,
        created_at: decode_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: decode_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

impl Database {
    /// Insert the video or refresh title, channel and duration of the existing
    /// row with the same platform id. Returns the stored row.
    pub async fn upsert_video(&self, video: &NewVideo) -> Result<Video, StoreError> {
        let timestamp = encode_timestamp(&now());

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO videos (id, youtube_id, title, channel, duration_seconds, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (youtube_id) DO UPDATE SET
                title = excluded.title,
                channel = excluded.channel,
                duration_seconds = excluded.duration_seconds,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            VIDEO_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&video.youtube_id)
        .bind(&video.title)
        .bind(&video.channel)
        .bind(video.duration_seconds)
        .bind(&timestamp)
        .bind(&timestamp)
        .fetch_one(&self.pool)
        .await?;

        video_from_row(&row)
    }

    pub async fn get_video(&self, id: &str) -> Result<Video, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM videos WHERE id = ?", VIDEO_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        video_from_row(&row)
    }

    pub async fn get_video_by_youtube_id(&self, youtube_id: &str) -> Result<Video, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM videos WHERE youtube_id = ?", VIDEO_COLUMNS))
            .bind(youtube_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        video_from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_video(title: &str, duration: i64) -> NewVideo {
        NewVideo {
            youtube_id: "dQw4w9WgXcQ".to_string(),
            title: title.to_string(),
            channel: "Rick Astley".to_string(),
            duration_seconds: duration,
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates_in_place() {
        let db = Database::in_memory().await.unwrap();

        let first = db.upsert_video(&new_video("Original", 212)).await.unwrap();
        let second = db.upsert_video(&new_video("Remastered", 213)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.title, "Remastered");
        assert_eq!(second.duration_seconds, 213);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM videos")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_lookups() {
        let db = Database::in_memory().await.unwrap();
        let stored = db.upsert_video(&new_video("Original", 212)).await.unwrap();

        assert_eq!(db.get_video(&stored.id).await.unwrap(), stored);
        assert_eq!(db.get_video_by_youtube_id("dQw4w9WgXcQ").await.unwrap(), stored);
        assert_eq!(db.get_video("missing").await.unwrap_err(), StoreError::NotFound);
        assert_eq!(
            db.get_video_by_youtube_id("aaaaaaaaaaa").await.unwrap_err(),
            StoreError::NotFound
        );
    }
}
