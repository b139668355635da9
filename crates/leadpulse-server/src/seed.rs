//! One-shot business import from a metadata file at startup.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use leadpulse_core::validate::is_valid_site_id;
use leadpulse_metadata::{MetadataStore, NewBusiness};

const DEFAULT_REGION: &str = "unknown";

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub region: Option<String>,
    pub businesses: BTreeMap<String, SeedBusiness>,
}

#[derive(Debug, Deserialize)]
pub struct SeedBusiness {
    pub name: String,
    pub place_id: String,
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

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
    /// Entries whose site id cannot be used as a storage key.
    pub rejected: usize,
}

impl SeedFile {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid seed file")
    }

    fn into_new_businesses(self) -> impl Iterator<Item = NewBusiness> {
        let region = self
            .region
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        self.businesses
            .into_iter()
            .map(move |(site_id, b)| NewBusiness {
                site_id,
                name: b.name,
                place_id: b.place_id,
                region: region.clone(),
                rating: b.rating,
                total_reviews: b.total_reviews,
                has_website: b.has_website,
                has_facebook: b.has_facebook,
                city: b.city,
                owner_name: b.owner_name,
                introduction: b.introduction,
                phone: b.phone,
                review_link: b.review_link,
            })
    }
}

/// Insert every business of `seed` whose site id is valid and not
/// registered yet.
pub async fn apply_seed(store: &dyn MetadataStore, seed: SeedFile) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for params in seed.into_new_businesses() {
        let site_id = params.site_id.clone();
        if !is_valid_site_id(&site_id) {
            report.rejected += 1;
            warn!(site_id = ?site_id, "Seed business has an unusable site id, skipping");
            continue;
        }
        match store.create_business(params).await? {
            Some(_) => report.inserted += 1,
            None => {
                report.skipped += 1;
                tracing::debug!(site_id = %site_id, "Seed business already present");
            }
        }
    }
    Ok(report)
}

/// Load the seed file at `path` into `store`. Failures are logged, never
/// fatal.
pub async fn seed_from_file(store: &dyn MetadataStore, path: &Path) {
    let result = async {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        apply_seed(store, SeedFile::parse(&json)?).await
    }
    .await;

    match result {
        Ok(report) => info!(
            path = %path.display(),
            inserted = report.inserted,
            skipped = report.skipped,
            rejected = report.rejected,
            "Business seed applied"
        ),
        Err(e) => warn!(path = %path.display(), error = %format!("{e:#}"), "Business seed failed"),
    }
}

/// Apply each seed file in order, so one region's file cannot shadow another.
pub async fn seed_from_files(store: &dyn MetadataStore, paths: &[String]) {
    for path in paths {
        seed_from_file(store, Path::new(path)).await;
    }
}
