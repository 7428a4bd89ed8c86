// Affiliate link store client
// Cloud-backed in production, in-memory when cloud sync is disabled

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    models::{
        affiliate_link::{AffiliateLink, AffiliateLinkUpdate, NewAffiliateLink},
        click_event::ClickEvent,
    },
    services::cloud_client::{CloudClient, StoreError},
};

/// Read/write access to affiliate link records.
///
/// `lookup_by_slug` answers `Ok(None)` for unknown and inactive slugs and
/// reserves `Err` for a backend that could not answer.
#[async_trait]
pub trait LinkStore: Send + Sync {
    async fn lookup_by_slug(&self, slug: &str) -> Result<Option<AffiliateLink>, StoreError>;

    async fn increment_click_count(&self, link_id: &str) -> Result<(), StoreError>;

    async fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError>;

    async fn list_all(&self) -> Result<Vec<AffiliateLink>, StoreError>;

    async fn create(&self, link: NewAffiliateLink) -> Result<AffiliateLink, StoreError>;

    async fn update(
        &self,
        id: &str,
        update: AffiliateLinkUpdate,
    ) -> Result<AffiliateLink, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn health(&self) -> Result<(), StoreError>;
}

// =============================================================================
// CLOUD STORE
// =============================================================================

pub struct CloudLinkStore {
    client: CloudClient,
}

impl CloudLinkStore {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LinkStore for CloudLinkStore {
    #[instrument(skip(self))]
    async fn lookup_by_slug(&self, slug: &str) -> Result<Option<AffiliateLink>, StoreError> {
        let link: Option<AffiliateLink> = self
            .client
            .get(&["affiliate-links", "slug", slug])
            .await?;

        match link {
            Some(link) if !link.is_active => {
                debug!("Affiliate link {} is inactive", slug);
                Ok(None)
            },
            other => Ok(other),
        }
    }

    #[instrument(skip(self))]
    async fn increment_click_count(&self, link_id: &str) -> Result<(), StoreError> {
        self.client
            .send_unit::<()>(
                Method::PATCH,
                &["affiliate-links", link_id, "increment-clicks"],
                None,
            )
            .await
    }

    #[instrument(skip(self, event), fields(link_id = %event.link_id))]
    async fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError> {
        self.client
            .send_unit(Method::POST, &["click-analytics"], Some(event))
            .await
    }

    async fn list_all(&self) -> Result<Vec<AffiliateLink>, StoreError> {
        Ok(self
            .client
            .get(&["affiliate-links"])
            .await?
            .unwrap_or_default())
    }

    #[instrument(skip(self, link), fields(slug = %link.slug))]
    async fn create(&self, link: NewAffiliateLink) -> Result<AffiliateLink, StoreError> {
        self.client
            .send(Method::POST, &["affiliate-links"], Some(&link))
            .await
    }

    #[instrument(skip(self, update))]
    async fn update(
        &self,
        id: &str,
        update: AffiliateLinkUpdate,
    ) -> Result<AffiliateLink, StoreError> {
        self.client
            .send(Method::PUT, &["affiliate-links", id], Some(&update))
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.client
            .send_unit::<()>(Method::DELETE, &["affiliate-links", id], None)
            .await
    }

    async fn health(&self) -> Result<(), StoreError> {
        self.client.health().await
    }
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

/// Local store used when cloud sync is disabled
#[derive(Default)]
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<String, AffiliateLink>>,
    clicks: RwLock<Vec<ClickEvent>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records as-is (ids included)
    pub fn with_links(links: impl IntoIterator<Item = AffiliateLink>) -> Self {
        let map = links
            .into_iter()
            .map(|link| (link.id.clone(), link))
            .collect();

        Self {
            links: RwLock::new(map),
            clicks: RwLock::new(Vec::new()),
        }
    }

    /// Click events recorded so far
    pub async fn clicks(&self) -> Vec<ClickEvent> {
        self.clicks.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<AffiliateLink> {
        self.links.read().await.get(id).cloned()
    }

    fn slug_taken(links: &HashMap<String, AffiliateLink>, slug: &str, except_id: &str) -> bool {
        links
            .values()
            .any(|link| link.slug == slug && link.id != except_id)
    }
}

#[async_trait]
impl LinkStore for InMemoryLinkStore {
    async fn lookup_by_slug(&self, slug: &str) -> Result<Option<AffiliateLink>, StoreError> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .find(|link| link.slug == slug && link.is_active)
            .cloned())
    }

    async fn increment_click_count(&self, link_id: &str) -> Result<(), StoreError> {
        let mut links = self.links.write().await;
        let link = links.get_mut(link_id).ok_or(StoreError::NotFound)?;
        link.click_count += 1;
        Ok(())
    }

    async fn record_click(&self, event: &ClickEvent) -> Result<(), StoreError> {
        self.clicks.write().await.push(event.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AffiliateLink>, StoreError> {
        let mut links: Vec<_> = self.links.read().await.values().cloned().collect();
        links.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(links)
    }

    async fn create(&self, link: NewAffiliateLink) -> Result<AffiliateLink, StoreError> {
        let mut links = self.links.write().await;
        if Self::slug_taken(&links, &link.slug, "") {
            return Err(StoreError::SlugConflict(link.slug));
        }

        let id = Uuid::new_v4().to_string();
        let record = link.into_link(id.clone(), Utc::now());
        info!("Created affiliate link {} ({})", record.slug, id);
        links.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        update: AffiliateLinkUpdate,
    ) -> Result<AffiliateLink, StoreError> {
        let mut links = self.links.write().await;

        if let Some(slug) = update.slug.as_deref() {
            if Self::slug_taken(&links, slug.trim(), id) {
                return Err(StoreError::SlugConflict(slug.trim().to_string()));
            }
        }

        let link = links.get_mut(id).ok_or(StoreError::NotFound)?;
        update.apply_to(link, Utc::now());
        Ok(link.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.links.write().await.remove(id) {
            Some(link) => {
                info!("Deleted affiliate link {} ({})", link.slug, id);
                Ok(())
            },
            None => Err(StoreError::NotFound),
        }
    }

    async fn health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
