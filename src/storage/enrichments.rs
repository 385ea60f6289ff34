use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{
    decode_timestamp, encode_timestamp, now, AiExtraction, AiSummary, Database, NewExtraction, NewSummary,
    StoreError,
};
use crate::ai::{ExtractionKind, SummaryKind};

const SUMMARY_COLUMNS: &str =
    "id, transcript_id, summary_type, content, model, tokens_used, created_at, updated_at";
const EXTRACTION_COLUMNS: &str = "id, transcript_id, extraction_type, content, model, tokens_used, created_at";

fn summary_from_row(row: &SqliteRow) -> Result<AiSummary, StoreError> {
    let kind: String = row.try_get("summary_type")?;
    let content: String = row.try_get("content")?;

    Ok(AiSummary {
        id: row.try_get("id")?,
        transcript_id: row.try_get("transcript_id")?,
        kind: SummaryKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown summary type {:?}", kind)))?,
        content: serde_json::from_str(&content)?,
        model: row.try_get("model")?,
        tokens_used: row.try_get("tokens_used")?,
        created_at: decode_timestamp(&row.try_get::<String, _>("created_at")?)?,
        updated_at: decode_timestamp(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn extraction_from_row(row: &SqliteRow) -> Result<AiExtraction, StoreError> {
    let kind: String = row.try_get("extraction_type")?;
    let content: String = row.try_get("content")?;

    Ok(AiExtraction {
        id: row.try_get("id")?,
        transcript_id: row.try_get("transcript_id")?,
        kind: ExtractionKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown extraction type {:?}", kind)))?,
        content: serde_json::from_str(&content)?,
        model: row.try_get("model")?,
        tokens_used: row.try_get("tokens_used")?,
        created_at: decode_timestamp(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

impl Database {
    pub async fn get_summary(&self, transcript_id: &str, kind: SummaryKind) -> Result<AiSummary, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_summaries WHERE transcript_id = ? AND summary_type = ?",
            SUMMARY_COLUMNS
        ))
        .bind(transcript_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        summary_from_row(&row)
    }

    /// Insert a summary, or return the one already stored for the same
    /// transcript and kind. The first writer wins; a later writer gets the
    /// stored row back instead of its own content.
    pub async fn create_summary(&self, summary: &NewSummary) -> Result<AiSummary, StoreError> {
        let timestamp = now();
        let stored = AiSummary {
            id: Uuid::new_v4().to_string(),
            transcript_id: summary.transcript_id.clone(),
            kind: summary.kind,
            content: summary.content.clone(),
            model: summary.model.clone(),
            tokens_used: summary.tokens_used,
            created_at: timestamp,
            updated_at: timestamp,
        };

        let result = sqlx::query(
            r#"
            INSERT INTO ai_summaries
                (id, transcript_id, summary_type, content, model, tokens_used, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.transcript_id)
        .bind(stored.kind.as_str())
        .bind(serde_json::to_string(&stored.content)?)
        .bind(&stored.model)
        .bind(stored.tokens_used)
        .bind(encode_timestamp(&stored.created_at))
        .bind(encode_timestamp(&stored.updated_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(stored),
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(
                    "Summary {} for transcript {} already exists, returning stored copy",
                    summary.kind,
                    summary.transcript_id
                );
                self.get_summary(&summary.transcript_id, summary.kind).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Summaries of a transcript, newest first
    pub async fn list_summaries(&self, transcript_id: &str) -> Result<Vec<AiSummary>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ai_summaries WHERE transcript_id = ? ORDER BY created_at DESC, rowid DESC",
            SUMMARY_COLUMNS
        ))
        .bind(transcript_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(summary_from_row).collect()
    }

    pub async fn delete_summary(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM ai_summaries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn get_extraction(
        &self,
        transcript_id: &str,
        kind: ExtractionKind,
    ) -> Result<AiExtraction, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_extractions WHERE transcript_id = ? AND extraction_type = ?",
            EXTRACTION_COLUMNS
        ))
        .bind(transcript_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;

        extraction_from_row(&row)
    }

    /// Insert an extraction, or return the one already stored for the same
    /// transcript and kind
    pub async fn create_extraction(&self, extraction: &NewExtraction) -> Result<AiExtraction, StoreError> {
        let stored = AiExtraction {
            id: Uuid::new_v4().to_string(),
            transcript_id: extraction.transcript_id.clone(),
            kind: extraction.kind,
            content: extraction.content.clone(),
            model: extraction.model.clone(),
            tokens_used: extraction.tokens_used,
            created_at: now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO ai_extractions
                (id, transcript_id, extraction_type, content, model, tokens_used, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&stored.id)
        .bind(&stored.transcript_id)
        .bind(stored.kind.as_str())
        .bind(serde_json::to_string(&stored.content)?)
        .bind(&stored.model)
        .bind(stored.tokens_used)
        .bind(encode_timestamp(&stored.created_at))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(stored),
            Err(err) if is_unique_violation(&err) => {
                tracing::warn!(
                    "Extraction {} for transcript {} already exists, returning stored copy",
                    extraction.kind,
                    extraction.transcript_id
                );
                self.get_extraction(&extraction.transcript_id, extraction.kind).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Extractions of a transcript, newest first
    pub async fn list_extractions(&self, transcript_id: &str) -> Result<Vec<AiExtraction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ai_extractions WHERE transcript_id = ? ORDER BY created_at DESC, rowid DESC",
            EXTRACTION_COLUMNS
        ))
        .bind(transcript_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(extraction_from_row).collect()
    }
}
