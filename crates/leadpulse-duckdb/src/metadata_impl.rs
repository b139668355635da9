use async_trait::async_trait;

use leadpulse_metadata::{Business, MetadataStore, NewBusiness, NewVisit, PipelineStage, Visit};

use crate::DuckDbBackend;

#[async_trait]
impl MetadataStore for DuckDbBackend {
    async fn ping(&self) -> anyhow::Result<()> {
        DuckDbBackend::ping(self).await
    }

    async fn list_businesses(&self) -> anyhow::Result<Vec<Business>> {
        DuckDbBackend::list_businesses(self).await
    }

    async fn get_business(&self, site_id: &str) -> anyhow::Result<Option<Business>> {
        DuckDbBackend::get_business(self, site_id).await
    }

    async fn business_exists(&self, site_id: &str) -> anyhow::Result<bool> {
        DuckDbBackend::business_exists(self, site_id).await
    }

    async fn create_business(&self, params: NewBusiness) -> anyhow::Result<Option<Business>> {
        DuckDbBackend::create_business(self, params).await
    }

    async fn update_stage(
        &self,
        site_id: &str,
        stage: PipelineStage,
    ) -> anyhow::Result<Option<Business>> {
        DuckDbBackend::update_stage(self, site_id, stage).await
    }

    async fn update_notes(&self, site_id: &str, notes: &str) -> anyhow::Result<Option<Business>> {
        DuckDbBackend::update_notes(self, site_id, notes).await
    }

    async fn record_visit(&self, visit: NewVisit) -> anyhow::Result<Option<Visit>> {
        DuckDbBackend::record_visit(self, visit).await
    }

    async fn list_visits(&self, site_id: &str) -> anyhow::Result<Vec<Visit>> {
        DuckDbBackend::list_visits(self, site_id).await
    }

    async fn get_visit(&self, site_id: &str, id: i64) -> anyhow::Result<Option<Visit>> {
        DuckDbBackend::get_visit(self, site_id, id).await
    }
}
