use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, StoreError};
use crate::scrape_client::ScrapeClient;
use crate::types::ClientError;
use outreach_logging::{orch_info, orch_warn};

/// Well-known location of the materialized result file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    filename: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename: filename.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.output_dir.join(&self.filename)
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("result fetch failed: {0}")]
    Client(#[from] ClientError),
    #[error("inline payload could not be decoded: {0}")]
    Decode(String),
    #[error("could not persist artifact: {0}")]
    Persist(#[from] StoreError),
    #[error("result could not be obtained by any method")]
    Unavailable,
}

/// Materialize the completed job's result at the well-known location.
///
/// Order of attempts: an already-present artifact wins; otherwise the
/// service is asked to materialize it, with an inline base64 payload as
/// the fallback transport; a final existence re-check covers a server
/// that wrote the file despite reporting an error.
pub async fn materialize_results(
    client: &ScrapeClient,
    store: &ArtifactStore,
) -> Result<PathBuf, ArtifactError> {
    if store.exists() {
        orch_info!("Result artifact already present at {:?}", store.path());
        return Ok(store.path());
    }

    match client.fetch_result().await {
        Ok(dto) => {
            if dto.success && dto.content.is_none() {
                // The service saved the file into the shared output
                // location itself.
                return Ok(store.path());
            }
            if let Some(content) = dto.content {
                let bytes = decode_inline_payload(&content)
                    .map_err(|e| ArtifactError::Decode(e.to_string()))?;
                let filename = dto.filename.as_deref().unwrap_or(&store.filename);
                let writer = AtomicFileWriter::new(store.output_dir.clone());
                let path = writer.write(filename, &bytes)?;
                orch_info!("Decoded inline result payload into {path:?}");
                return Ok(path);
            }
            recheck(store)
        }
        Err(err) => {
            orch_warn!("Result fetch failed ({err}); re-checking for the artifact");
            recheck(store)
        }
    }
}

/// The server may have written the artifact despite a reported error.
fn recheck(store: &ArtifactStore) -> Result<PathBuf, ArtifactError> {
    if store.exists() {
        orch_info!("Result artifact found after fetch error");
        Ok(store.path())
    } else {
        Err(ArtifactError::Unavailable)
    }
}

fn decode_inline_payload(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    // Services have been seen to drop padding; restore it.
    while compact.len() % 4 != 0 {
        compact.push('=');
    }
    STANDARD.decode(compact.as_bytes())
}
