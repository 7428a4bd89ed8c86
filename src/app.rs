// Application state shared across handlers
use std::sync::Arc;

use crate::{
    app_config::AppConfig,
    services::{
        article_store::ArticleStore,
        click_recorder::ClickRecorder,
        link_store::LinkStore,
        pages::PageRenderer,
        redirect::{RedirectResolver, SessionSettings},
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub link_store: Arc<dyn LinkStore>,
    pub article_store: Arc<dyn ArticleStore>,
    pub resolver: RedirectResolver,
    pub click_recorder: ClickRecorder,
    pub pages: PageRenderer,
    pub session_settings: SessionSettings,
}

impl AppState {
    /// Wire the services around a pair of stores
    pub fn new(
        config: AppConfig,
        link_store: Arc<dyn LinkStore>,
        article_store: Arc<dyn ArticleStore>,
        pages: PageRenderer,
    ) -> Self {
        let resolver = RedirectResolver::new(
            link_store.clone(),
            article_store.clone(),
            std::time::Duration::from_millis(config.redirect.lookup_timeout_ms),
        );
        let click_recorder = ClickRecorder::new(link_store.clone());
        // The browser runs the countdown; server sessions only decide and record
        let session_settings = SessionSettings::from_config(&config).without_timers();

        Self {
            config: Arc::new(config),
            link_store,
            article_store,
            resolver,
            click_recorder,
            pages,
            session_settings,
        }
    }
}
