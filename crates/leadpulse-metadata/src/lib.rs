use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CRM lead progress, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    WebsiteCreated,
    WebsiteSent,
    WebsiteViewed,
    LeadContacted,
    FollowUp,
    NotInterested,
}

#[derive(Debug, Error)]
#[error("unknown pipeline stage: {0}")]
pub struct UnknownStage(pub String);

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::WebsiteCreated,
        PipelineStage::WebsiteSent,
        PipelineStage::WebsiteViewed,
        PipelineStage::LeadContacted,
        PipelineStage::FollowUp,
        PipelineStage::NotInterested,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::WebsiteCreated => "website_created",
            PipelineStage::WebsiteSent => "website_sent",
            PipelineStage::WebsiteViewed => "website_viewed",
            PipelineStage::LeadContacted => "lead_contacted",
            PipelineStage::FollowUp => "follow_up",
            PipelineStage::NotInterested => "not_interested",
        }
    }

    /// Stage after a visit is recorded: leads that have not yet seen their
    /// site move to `WebsiteViewed`; every later stage is left alone.
    pub fn after_visit(self) -> Self {
        match self {
            PipelineStage::WebsiteCreated | PipelineStage::WebsiteSent => {
                PipelineStage::WebsiteViewed
            }
            other => other,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: i64,
    pub site_id: String,
    pub name: String,
    pub place_id: String,
    pub region: String,
    pub rating: Option<f64>,
    pub total_reviews: Option<i64>,
    pub has_website: Option<bool>,
    pub has_facebook: Option<bool>,
    pub city: Option<String>,
    pub pipeline_stage: PipelineStage,
    pub last_viewed: Option<DateTime<Utc>>,
    pub total_views: i64,
    pub notes: Option<String>,
    pub owner_name: Option<String>,
    pub introduction: Option<String>,
    pub phone: Option<String>,
    pub review_link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBusiness {
    pub site_id: String,
    pub name: String,
    pub place_id: String,
    pub region: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<i64>,
    #[serde(default)]
    pub has_website: Option<bool>,
    #[serde(default)]
    pub has_facebook: Option<bool>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub review_link: Option<String>,
}

/// A short visit-duration record, written independently of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    /// Per-store sequence number; `0` for visits that were not stored.
    pub id: i64,
    pub site_id: String,
    pub timestamp: DateTime<Utc>,
    /// Whole seconds.
    pub duration: i64,
    pub source: String,
    /// `startTime` of the session recorded at the same unload, if known.
    pub session_start_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVisit {
    pub site_id: String,
    pub duration: i64,
    pub source: String,
    pub session_start_time: Option<i64>,
}

/// Business and visit storage consumed by the analytics endpoints.
#[async_trait]
pub trait MetadataStore: Send + Sync + 'static {
    async fn ping(&self) -> anyhow::Result<()>;

    async fn list_businesses(&self) -> anyhow::Result<Vec<Business>>;
    async fn get_business(&self, site_id: &str) -> anyhow::Result<Option<Business>>;
    async fn business_exists(&self, site_id: &str) -> anyhow::Result<bool>;
    /// Returns `None` when `site_id` is already taken.
    async fn create_business(&self, params: NewBusiness) -> anyhow::Result<Option<Business>>;
    async fn update_stage(
        &self,
        site_id: &str,
        stage: PipelineStage,
    ) -> anyhow::Result<Option<Business>>;
    async fn update_notes(&self, site_id: &str, notes: &str) -> anyhow::Result<Option<Business>>;

    /// Record a visit and bump the owning business. Returns `None` when the
    /// business does not exist.
    async fn record_visit(&self, visit: NewVisit) -> anyhow::Result<Option<Visit>>;
    async fn list_visits(&self, site_id: &str) -> anyhow::Result<Vec<Visit>>;
    async fn get_visit(&self, site_id: &str, id: i64) -> anyhow::Result<Option<Visit>>;
}
