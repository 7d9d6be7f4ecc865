//! SQLite-Implementierung des RoomStore

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use triqui_core::RoomCode;

use crate::error::DbError;
use crate::models::RoomRecord;
use crate::repository::{DbResult, RoomStore};
use crate::sqlite::pool::SqliteDb;

impl SqliteDb {
    /// Aeltester noch gueltiger `updated_at`-Wert in Millisekunden
    fn ablauf_grenze_ms(&self) -> DbResult<i64> {
        let ttl = chrono::Duration::from_std(self.raum_ttl)
            .map_err(|e| DbError::intern(format!("Ungueltige Raum-TTL: {e}")))?;
        Ok((Utc::now() - ttl).timestamp_millis())
    }
}

#[async_trait]
impl RoomStore for SqliteDb {
    async fn find_by_code(&self, code: &RoomCode) -> DbResult<Option<RoomRecord>> {
        let grenze = self.ablauf_grenze_ms()?;

        let row = sqlx::query(
            "SELECT code, document, created_at, updated_at
             FROM rooms WHERE code = ? AND updated_at >= ?",
        )
        .bind(code.as_str())
        .bind(grenze)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_room(&r)).transpose()
    }

    async fn save(&self, record: &RoomRecord) -> DbResult<()> {
        let document = serde_json::to_string(&record.document)?;

        sqlx::query(
            "INSERT INTO rooms (code, document, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                document = excluded.document,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
        )
        .bind(record.code.as_str())
        .bind(&document)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_expired(&self, vor: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM rooms WHERE updated_at < ?")
            .bind(vor.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count(&self) -> DbResult<i64> {
        let (anzahl,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rooms")
            .fetch_one(&self.pool)
            .await?;
        Ok(anzahl)
    }
}

pub(crate) fn row_to_room(row: &sqlx::sqlite::SqliteRow) -> DbResult<RoomRecord> {
    use sqlx::Row as _;

    let code: String = row.try_get("code")?;
    let document_str: String = row.try_get("document")?;
    let document = serde_json::from_str(&document_str)?;

    let created_at_str: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| DbError::intern(format!("Ungueltige created_at '{created_at_str}': {e}")))?
        .with_timezone(&Utc);

    let updated_at_ms: i64 = row.try_get("updated_at")?;
    let updated_at = DateTime::from_timestamp_millis(updated_at_ms)
        .ok_or_else(|| DbError::intern(format!("Ungueltige updated_at {updated_at_ms}")))?;

    Ok(RoomRecord {
        code: RoomCode::neu(code),
        document,
        created_at,
        updated_at,
    })
}
