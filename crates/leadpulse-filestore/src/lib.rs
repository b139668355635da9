//! Append-only session storage on the local filesystem.
//!
//! Every accepted session becomes one file named
//! `analytics_{siteId}_{arrivalMillis}.json` under a single root directory.
//! Files are never rewritten; a site's sessions are found by parsing file
//! names, not by prefix matching, so `joes` never sees `joes_plumbing`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use leadpulse_core::session::ValidatedSession;
use leadpulse_core::store::{SessionRecord, SessionStore};
use leadpulse_core::validate::is_valid_site_id;

const RECORD_PREFIX: &str = "analytics_";
const RECORD_SUFFIX: &str = ".json";
/// Name collisions are resolved by bumping the arrival millisecond.
const MAX_NAME_ATTEMPTS: i64 = 64;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("site id {0:?} cannot be used as a storage key")]
    InvalidSiteId(String),
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no free record name for site {site_id} after {attempts} attempts")]
    Collision { site_id: String, attempts: i64 },
}

pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Open (creating if needed) the directory that holds session files.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Session store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn write_record(
        &self,
        site_id: &str,
        body: &str,
    ) -> Result<String, FileStoreError> {
        check_site_id(site_id)?;
        let mut arrived_at = Utc::now().timestamp_millis();

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = record_name(site_id, arrived_at);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.root.join(&name))
                .await;

            match opened {
                Ok(mut file) => {
                    file.write_all(body.as_bytes()).await?;
                    file.write_all(b"\n").await?;
                    file.flush().await?;
                    return Ok(name);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(record = %name, "Record name taken, retrying");
                    arrived_at += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(FileStoreError::Collision {
            site_id: site_id.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    async fn read_records(&self, site_id: &str) -> Result<Vec<SessionRecord>, FileStoreError> {
        check_site_id(site_id)?;
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(arrived_at) = parse_record_name(name, site_id) else {
                continue;
            };
            match tokio::fs::read_to_string(entry.path()).await {
                Ok(body) => records.push(SessionRecord {
                    name: name.to_string(),
                    arrived_at,
                    body,
                }),
                Err(e) => {
                    warn!(record = %name, error = %e, "Skipping unreadable session file");
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn append(&self, site_id: &str, session: &ValidatedSession) -> anyhow::Result<String> {
        let body = serde_json::to_string(&session.raw)?;
        let name = self.write_record(site_id, &body).await?;
        debug!(site_id, record = %name, "Session persisted");
        Ok(name)
    }

    async fn scan(&self, site_id: &str) -> anyhow::Result<Vec<SessionRecord>> {
        Ok(self.read_records(site_id).await?)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        let meta = tokio::fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            anyhow::bail!("{} is not a directory", self.root.display());
        }
        Ok(())
    }
}

fn check_site_id(site_id: &str) -> Result<(), FileStoreError> {
    if !is_valid_site_id(site_id) {
        return Err(FileStoreError::InvalidSiteId(site_id.to_string()));
    }
    Ok(())
}

fn record_name(site_id: &str, arrived_at: i64) -> String {
    format!("{RECORD_PREFIX}{site_id}_{arrived_at}{RECORD_SUFFIX}")
}

/// Arrival millis of `name` if it is a record of exactly `site_id`.
fn parse_record_name(name: &str, site_id: &str) -> Option<i64> {
    let stem = name
        .strip_prefix(RECORD_PREFIX)?
        .strip_suffix(RECORD_SUFFIX)?;
    let (site, millis) = stem.rsplit_once('_')?;
    if site != site_id || millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    millis.parse().ok()
}
