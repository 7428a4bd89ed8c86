// HTML pages served on the public slug routes
// Templates are compiled into the binary and rendered with HTML escaping on

use handlebars::Handlebars;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use crate::{
    app_config::AppConfig,
    models::{affiliate_link::AffiliateLink, article::Article},
    services::redirect::{RedirectPlan, DEFAULT_COUNTDOWN_SECONDS},
};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Template registration failed: {0}")]
    Template(String),

    #[error("Render failed: {0}")]
    Render(String),
}

/// Site-wide values every page needs
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub site_name: String,
    pub site_url: String,
    pub countdown_seconds: u32,
    pub popup_fallback_delay_ms: u64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "Affiliate Gateway".to_string(),
            site_url: "/".to_string(),
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            popup_fallback_delay_ms: 100,
        }
    }
}

impl SiteSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            site_name: config.site.name.clone(),
            site_url: config.site.url.clone(),
            countdown_seconds: config.redirect.countdown_seconds,
            popup_fallback_delay_ms: config.redirect.popup_fallback_delay_ms,
        }
    }
}

#[derive(Clone)]
pub struct PageRenderer {
    templates: Arc<Handlebars<'static>>,
    site: SiteSettings,
}

impl PageRenderer {
    pub fn new(site: SiteSettings) -> Result<Self, PageError> {
        let mut templates = Handlebars::new();
        Self::register_templates(&mut templates)?;

        Ok(Self {
            templates: Arc::new(templates),
            site,
        })
    }

    fn register_templates(templates: &mut Handlebars) -> Result<(), PageError> {
        let pages = [
            (
                "interstitial",
                include_str!("../../templates/pages/interstitial.hbs"),
            ),
            ("article", include_str!("../../templates/pages/article.hbs")),
            (
                "not_found",
                include_str!("../../templates/pages/not_found.hbs"),
            ),
        ];

        for (name, source) in pages {
            templates
                .register_template_string(name, source)
                .map_err(|e| PageError::Template(format!("{}: {}", name, e)))?;
        }

        Ok(())
    }

    /// Landing page for an affiliate link. The call-to-action points at
    /// `/{slug}/go`, which records the click before leaving the site.
    #[instrument(skip(self, link, plan), fields(slug = %link.slug))]
    pub fn interstitial(&self, link: &AffiliateLink, plan: &RedirectPlan) -> Result<String, PageError> {
        let auto_redirect = matches!(
            plan,
            RedirectPlan::Landing {
                auto_redirect: true,
                ..
            }
        );

        let data = json!({
            "site_name": self.site.site_name,
            "site_url": self.site.site_url,
            "title": link.display_title(),
            "description": link.description,
            "image_url": link.image_url,
            "price": link.price,
            "tags": link.tags,
            "trust_badges": link.trust_badges,
            "go_url": format!("/{}/go", link.slug),
            "auto_redirect": auto_redirect,
            "countdown_seconds": self.site.countdown_seconds,
            "popup_fallback_delay_ms": self.site.popup_fallback_delay_ms,
        });

        self.render("interstitial", &data)
    }

    pub fn article(&self, article: &Article) -> Result<String, PageError> {
        let data = json!({
            "site_name": self.site.site_name,
            "site_url": self.site.site_url,
            "canonical_url": format!("{}/{}", self.site.site_url.trim_end_matches('/'), article.slug),
            "title": article.title,
            "summary": article.summary,
            "paragraphs": article.paragraphs(),
            "published": article.published_at.map(|t| t.to_rfc3339()),
            "published_label": article.published_at.map(|t| t.format("%B %-d, %Y").to_string()),
        });

        self.render("article", &data)
    }

    pub fn not_found(&self, slug: &str) -> Result<String, PageError> {
        let data = json!({
            "site_name": self.site.site_name,
            "site_url": self.site.site_url,
            "slug": slug,
        });

        self.render("not_found", &data)
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> Result<String, PageError> {
        self.templates
            .render(name, data)
            .map_err(|e| PageError::Render(format!("{}: {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::affiliate_link::RedirectType;
    use chrono::{TimeZone, Utc};

    fn renderer() -> PageRenderer {
        PageRenderer::new(SiteSettings {
            site_name: "Healthy Habits".to_string(),
            site_url: "https://healthy.example.com".to_string(),
            countdown_seconds: 5,
            popup_fallback_delay_ms: 100,
        })
        .unwrap()
    }

    fn landing_link(auto: bool) -> AffiliateLink {
        serde_json::from_value(json!({
            "id": "lnk_y",
            "slug": "promo-y",
            "destinationUrl": "https://shop.example.com/y",
            "redirectType": "landing",
            "autoRedirect": auto,
            "title": "Insulated <Bottle>",
            "price": "$24.99",
            "trustBadges": ["Free shipping"]
        }))
        .unwrap()
    }

    fn plan(auto: bool) -> RedirectPlan {
        RedirectPlan::Landing {
            destination: "https://shop.example.com/y".to_string(),
            auto_redirect: auto,
        }
    }

    #[test]
    fn test_interstitial_with_countdown() {
        let link = landing_link(true);
        assert_eq!(link.redirect_type, RedirectType::Landing);

        let html = renderer().interstitial(&link, &plan(true)).unwrap();
        assert!(html.contains("id=\"countdown\">5</strong>"));
        assert!(html.contains("data-auto=\"true\""));
        assert!(html.contains("/promo-y/go"));
        assert!(html.contains("$24.99"));
        assert!(html.contains("Free shipping"));
        assert!(html.contains("Return to Healthy Habits"));
    }

    #[test]
    fn test_interstitial_manual_has_no_countdown() {
        let html = renderer().interstitial(&landing_link(false), &plan(false)).unwrap();
        assert!(!html.contains("id=\"countdown\""));
        assert!(html.contains("data-auto=\"false\""));
        assert!(html.contains("View Deal"));
    }

    #[test]
    fn test_interstitial_opens_one_tab_without_falling_back() {
        let html = renderer().interstitial(&landing_link(true), &plan(true)).unwrap();

        // noopener in the feature string would make window.open return null
        // and send the current tab to /go as well
        assert!(html.contains("window.open(goUrl, '_blank');"));
        assert!(!html.contains("'noopener')"));
        assert!(html.contains("opened.opener = null;"));
        assert!(html.contains("rel=\"noopener nofollow sponsored\""));
    }

    #[test]
    fn test_interstitial_escapes_store_content() {
        let html = renderer().interstitial(&landing_link(false), &plan(false)).unwrap();
        assert!(html.contains("Insulated &lt;Bottle&gt;"));
        assert!(!html.contains("<Bottle>"));
    }

    #[test]
    fn test_article_page() {
        let article = Article {
            slug: "hydration".to_string(),
            title: "How much water?".to_string(),
            summary: Some("A short guide".to_string()),
            body: "First paragraph.\n\nSecond paragraph.".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
        };

        let html = renderer().article(&article).unwrap();
        assert!(html.contains("<h1>How much water?</h1>"));
        assert!(html.contains("<p>Second paragraph.</p>"));
        assert!(html.contains("March 5, 2024"));
    }

    #[test]
    fn test_not_found_page() {
        let html = renderer().not_found("nothing-here").unwrap();
        assert!(html.contains("/nothing-here"));
        assert!(html.contains("Go to Healthy Habits"));
    }
}
