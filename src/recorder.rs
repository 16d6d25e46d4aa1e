use crate::config::FirestoreConfig;
use crate::labels::{AgeBracket, Gender};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{FirestoreDb, FirestoreDbOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CLIENTS_COLLECTION: &str = "clients";
const SIGHTINGS_COLLECTION: &str = "sightings";

/// One demographic observation, stored under `clients/{client_id}/sightings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sighting {
    pub gender: String,
    pub age_range: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("firestore request failed: {0}")]
    Firestore(#[from] firestore::errors::FirestoreError),
}

/// Append-only sink for per-client demographic observations.
///
/// Callers treat recording as best-effort; a failed write never changes a
/// response that has already been computed.
#[async_trait]
pub trait SightingRecorder: Send + Sync + 'static {
    async fn record(
        &self,
        gender: Gender,
        age: AgeBracket,
        client_id: &str,
    ) -> Result<(), RecorderError>;
}

pub struct FirestoreRecorder {
    db: FirestoreDb,
}

impl FirestoreRecorder {
    pub async fn new(firestore_config: &FirestoreConfig) -> Result<Self, RecorderError> {
        let db = FirestoreDb::with_options_service_account_key_file(
            FirestoreDbOptions::new(firestore_config.project_id.clone()),
            firestore_config.credentials_file.clone(),
        )
        .await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl SightingRecorder for FirestoreRecorder {
    async fn record(
        &self,
        gender: Gender,
        age: AgeBracket,
        client_id: &str,
    ) -> Result<(), RecorderError> {
        let sighting = Sighting {
            gender: gender.as_str().to_string(),
            age_range: age.as_str().to_string(),
            timestamp: Utc::now(),
        };

        let parent_path = self.db.parent_path(CLIENTS_COLLECTION, client_id)?;
        self.db
            .fluent()
            .insert()
            .into(SIGHTINGS_COLLECTION)
            .generate_document_id()
            .parent(&parent_path)
            .object(&sighting)
            .execute::<Sighting>()
            .await?;

        tracing::info!(
            client_id,
            gender = sighting.gender,
            age_range = sighting.age_range,
            "Sighting recorded"
        );
        Ok(())
    }
}
