use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{decode_timestamp, encode_timestamp, now, Database, NewTranscript, StoreError, Transcript};

const TRANSCRIPT_COLUMNS: &str = "id, video_id, language, content, created_at";

fn transcript_from_row(row: &SqliteRow) -> Result<Transcript, StoreError> {
    let content: String = row.try_get("content")?;

    Ok(Transcript {
        id: row.try_get("id")?,
        video_id: row.try_get("video_id")?,
        language: row.try_get("language")?,
        segments: serde_json::from_str(&content)?,
        created_at: decode_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

impl Database {
    /// Store a new transcript. Every call creates a row, even for a video and
    /// language that already have one.
    pub async fn insert_transcript(&self, transcript: &NewTranscript) -> Result<Transcript, StoreError> {
        let stored = Transcript {
            id: Uuid::new_v4().to_string(),
            video_id: transcript.video_id.clone(),
            language: transcript.language.clone(),
            segments: transcript.segments.clone(),
            created_at: now(),
        };

        sqlx::query(
            r#"
            INSERT INTO transcripts (id, video_id, language, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.video_id)
        .bind(&stored.language)
        .bind(serde_json::to_string(&stored.segments)?)
        .bind(encode_timestamp(&stored.created_at))
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            "Stored transcript {} ({} segments) for video {}",
            stored.id,
            stored.segments.len(),
            stored.video_id
        );

        Ok(stored)
    }

    pub async fn get_transcript(&self, id: &str) -> Result<Transcript, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM transcripts WHERE id = ?", TRANSCRIPT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        transcript_from_row(&row)
    }

    /// All transcripts of a video, oldest first
    pub async fn list_transcripts_for_video(&self, video_id: &str) -> Result<Vec<Transcript>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transcripts WHERE video_id = ? ORDER BY created_at ASC, rowid ASC",
            TRANSCRIPT_COLUMNS
        ))
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transcript_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewVideo, TranscriptSegment};

    async fn seeded() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let video = db
            .upsert_video(&NewVideo {
                youtube_id: "dQw4w9WgXcQ".to_string(),
                title: "t".to_string(),
                channel: "c".to_string(),
                duration_seconds: 10,
            })
            .await
            .unwrap();
        (db, video.id)
    }

    fn segments() -> Vec<TranscriptSegment> {
        vec![
            TranscriptSegment {
                start_ms: 0,
                duration_ms: 1000,
                text: "Hello".to_string(),
            },
            TranscriptSegment {
                start_ms: 1000,
                duration_ms: 1500,
                text: "World".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_insert_and_get_preserves_segments() {
        let (db, video_id) = seeded().await;

        let stored = db
            .insert_transcript(&NewTranscript {
                video_id: video_id.clone(),
                language: "en".to_string(),
                segments: segments(),
            })
            .await
            .unwrap();

        let loaded = db.get_transcript(&stored.id).await.unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.segments, segments());
    }

    #[tokio::test]
    async fn test_repeated_inserts_create_new_rows_in_order() {
        let (db, video_id) = seeded().await;
        let new = NewTranscript {
            video_id: video_id.clone(),
            language: "en".to_string(),
            segments: segments(),
        };

        let first = db.insert_transcript(&new).await.unwrap();
        let second = db.insert_transcript(&new).await.unwrap();
        assert_ne!(first.id, second.id);

        let listed = db.list_transcripts_for_video(&video_id).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_missing_transcript_is_not_found() {
        let (db, _) = seeded().await;
        assert_eq!(db.get_transcript("nope").await.unwrap_err(), StoreError::NotFound);
    }

    #[tokio::test]
    async fn test_transcript_requires_existing_video() {
        let (db, _) = seeded().await;
        let err = db
            .insert_transcript(&NewTranscript {
                video_id: "no-such-video".to_string(),
                language: "en".to_string(),
                segments: segments(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
    }
}
