//! Durable artifact store on Message DB
//!
//! Each artifact is written as a single `ArtifactGenerated` message to the
//! stream `generationArtifact-{operation_id}`. The message id is the
//! operation id, so writing the same artifact twice is idempotent.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::{json, Value};
use std::{future::Future, time::Duration};
use tracing::debug;

use crate::artifact::GenerationArtifact;
use crate::progress::types::OperationId;

use super::connection::StoreConfig;
use super::error::{Result, StoreError};
use super::ArtifactStore;

pub const ARTIFACT_MESSAGE_TYPE: &str = "ArtifactGenerated";
pub const ARTIFACT_CATEGORY: &str = "generationArtifact";

/// Stream holding the artifact of one operation
pub fn artifact_stream_name(operation_id: OperationId) -> String {
    format!("{}-{}", ARTIFACT_CATEGORY, operation_id)
}

#[derive(Clone)]
pub struct MessageDbArtifactStore {
    pool: Pool,
    schema_name: String,
    command_timeout: Duration,
}

impl MessageDbArtifactStore {
    /// Build the pool and check that the database answers
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let store = Self {
            pool: config.build_pool()?,
            schema_name: config.schema_name.clone(),
            command_timeout: config.command_timeout,
        };

        // Test the connection
        store
            .with_timeout(async {
                let conn = store.pool.get().await?;
                conn.simple_query("SELECT 1").await?;
                Ok::<(), StoreError>(())
            })
            .await?;

        Ok(store)
    }

    async fn with_timeout<T, F>(&self, command: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.command_timeout, command)
            .await
            .map_err(|_| StoreError::Timeout(self.command_timeout))?
    }

    async fn write_artifact(&self, artifact: &GenerationArtifact) -> Result<i64> {
        let conn = self.pool.get().await?;

        let sql = format!(
            "SELECT {}.write_message($1, $2, $3, $4, $5, $6)",
            self.schema_name
        );

        let id = artifact.operation_id.to_string();
        let stream_name = artifact_stream_name(artifact.operation_id);
        let data = serde_json::to_value(artifact)?;
        let metadata = json!({ "schemaVersion": 1 });
        let expected_version: Option<i64> = None;

        let result = conn
            .query_one(
                &sql,
                &[
                    &id,
                    &stream_name,
                    &ARTIFACT_MESSAGE_TYPE,
                    &data,
                    &metadata,
                    &expected_version,
                ],
            )
            .await;

        match result {
            Ok(row) => Ok(row.get(0)),
            Err(e) => {
                // A repeated write of the same operation is already durable
                let duplicate = e
                    .as_db_error()
                    .is_some_and(|db| db.message().contains("duplicate key"));
                if duplicate {
                    debug!(operation_id = %artifact.operation_id, "artifact already persisted");
                    return Ok(-1);
                }
                Err(e.into())
            }
        }
    }

    async fn read_artifact(&self, operation_id: OperationId) -> Result<Option<GenerationArtifact>> {
        let conn = self.pool.get().await?;

        let sql = format!(
            "SELECT data FROM {}.get_last_stream_message($1, $2)",
            self.schema_name
        );
        let stream_name = artifact_stream_name(operation_id);
        let message_type = Some(ARTIFACT_MESSAGE_TYPE);

        let rows = conn.query(&sql, &[&stream_name, &message_type]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        // Message DB returns data as text, not JSONB
        let data: String = row.get("data");
        let value: Value = serde_json::from_str(&data)?;
        Ok(Some(serde_json::from_value(value)?))
    }
}

#[async_trait]
impl ArtifactStore for MessageDbArtifactStore {
    async fn save(&self, artifact: &GenerationArtifact) -> Result<()> {
        let position = self.with_timeout(self.write_artifact(artifact)).await?;
        debug!(operation_id = %artifact.operation_id, position, "artifact written");
        Ok(())
    }

    async fn load(&self, operation_id: OperationId) -> Result<Option<GenerationArtifact>> {
        self.with_timeout(self.read_artifact(operation_id)).await
    }

    fn name(&self) -> &str {
        "message_db"
    }
}
