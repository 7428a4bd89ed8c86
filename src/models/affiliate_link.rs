// Affiliate link model
// Records live in the cloud key-value backend; this side reads them on every visit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::url_validator::SLUG_REGEX;

// =============================================================================
// REDIRECT TYPE
// =============================================================================

/// How a visit to the slug reaches the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectType {
    /// Same-tab navigation, countdown settings are ignored
    #[default]
    Direct,
    /// Interstitial product page, optionally auto-redirecting
    Landing,
}

// =============================================================================
// STORED RECORD
// =============================================================================

/// Affiliate link as returned by the backing store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateLink {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub destination_url: String,
    #[serde(default)]
    pub redirect_type: RedirectType,
    /// Only meaningful for landing links
    #[serde(default)]
    pub auto_redirect: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub click_count: u64,

    // Presentation only
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trust_badges: Vec<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl AffiliateLink {
    /// Title to show on the interstitial, falling back to the slug
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.slug
        } else {
            &self.title
        }
    }
}

// =============================================================================
// ADMIN REQUESTS
// =============================================================================

/// Payload for creating a link through the admin API
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAffiliateLink {
    #[validate(length(min = 1, max = 120, message = "Slug must be 1-120 characters"))]
    #[validate(regex(
        path = "SLUG_REGEX",
        message = "Slug may only contain letters, numbers, hyphens and underscores"
    ))]
    pub slug: String,

    #[validate(length(min = 1, max = 2048, message = "Destination URL is required"))]
    pub destination_url: String,

    #[serde(default)]
    pub redirect_type: RedirectType,
    #[serde(default)]
    pub auto_redirect: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,

    #[validate(length(max = 200, message = "Title must be less than 200 characters"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL format"))]
    pub image_url: Option<String>,
    pub price: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub trust_badges: Vec<String>,
}

impl NewAffiliateLink {
    /// Trim free-text fields before validation
    pub fn sanitize(&mut self) {
        self.slug = self.slug.trim().to_string();
        self.destination_url = self.destination_url.trim().to_string();
        self.title = self.title.trim().to_string();
        self.description = self
            .description
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }

    /// Build the stored record; the store assigns the id
    pub fn into_link(self, id: String, now: DateTime<Utc>) -> AffiliateLink {
        AffiliateLink {
            id,
            slug: self.slug,
            destination_url: self.destination_url,
            redirect_type: self.redirect_type,
            auto_redirect: self.auto_redirect,
            is_active: self.is_active,
            click_count: 0,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            price: self.price,
            tags: self.tags,
            trust_badges: self.trust_badges,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateLinkUpdate {
    #[validate(length(min = 1, max = 120, message = "Slug must be 1-120 characters"))]
    #[validate(regex(
        path = "SLUG_REGEX",
        message = "Slug may only contain letters, numbers, hyphens and underscores"
    ))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[validate(length(min = 1, max = 2048, message = "Destination URL cannot be empty"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_type: Option<RedirectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,

    #[validate(length(max = 200, message = "Title must be less than 200 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[validate(url(message = "Invalid image URL format"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_badges: Option<Vec<String>>,
}

impl AffiliateLinkUpdate {
    /// Apply the update to a stored record (used by the in-memory store)
    pub fn apply_to(self, link: &mut AffiliateLink, now: DateTime<Utc>) {
        if let Some(slug) = self.slug {
            link.slug = slug.trim().to_string();
        }
        if let Some(url) = self.destination_url {
            link.destination_url = url.trim().to_string();
        }
        if let Some(redirect_type) = self.redirect_type {
            link.redirect_type = redirect_type;
        }
        if let Some(auto) = self.auto_redirect {
            link.auto_redirect = auto;
        }
        if let Some(active) = self.is_active {
            link.is_active = active;
        }
        if let Some(title) = self.title {
            link.title = title;
        }
        if let Some(description) = self.description {
            link.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(image_url) = self.image_url {
            link.image_url = Some(image_url);
        }
        if let Some(price) = self.price {
            link.price = Some(price);
        }
        if let Some(tags) = self.tags {
            link.tags = tags;
        }
        if let Some(badges) = self.trust_badges {
            link.trust_badges = badges;
        }
        link.updated_at = Some(now);
    }
}
