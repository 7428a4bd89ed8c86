// Affiliate redirect resolution and the per-visit redirect state machine
//
//   Idle -> Resolving -> { NotFound, DirectRedirecting, LandingDisplayed } -> Redirected
//
// A session navigates at most once and records at most one click. Every
// transition is checked and applied under the session lock, and every timer
// callback re-checks the liveness flag before touching state or navigating.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    app_config::AppConfig,
    models::{
        affiliate_link::{AffiliateLink, RedirectType},
        article::Article,
    },
    services::{
        article_store::ArticleStore,
        click_recorder::{ClickTracker, VisitContext},
        cloud_client::StoreError,
        link_store::LinkStore,
    },
    utils::url_validator::{normalize_destination, UrlValidationError},
};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Countdown shown on auto-redirecting landing pages
pub const DEFAULT_COUNTDOWN_SECONDS: u32 = 5;

/// Delay before the same-tab fallback when a new tab is blocked
pub const DEFAULT_POPUP_FALLBACK_DELAY: Duration = Duration::from_millis(100);

/// Upper bound on a single slug lookup
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RedirectError {
    #[error("Invalid destination for {slug}: {reason}")]
    InvalidDestination {
        slug: String,
        reason: UrlValidationError,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Opening a new tab was blocked")]
    PopupBlocked,

    #[error("Navigation failed: {0}")]
    Failed(String),
}

// =============================================================================
// REDIRECT PLAN
// =============================================================================

/// What a resolved link asks the visitor's browser to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectPlan {
    /// Same tab, history replaced
    Direct { destination: String },
    /// Interstitial first, then a new tab
    Landing {
        destination: String,
        auto_redirect: bool,
    },
}

impl RedirectPlan {
    pub fn destination(&self) -> &str {
        match self {
            RedirectPlan::Direct { destination } => destination,
            RedirectPlan::Landing { destination, .. } => destination,
        }
    }
}

/// Decide the redirect mode for a link. The destination is normalized here,
/// so an empty or unusable URL never reaches a navigator.
pub fn plan_for(link: &AffiliateLink) -> Result<RedirectPlan, RedirectError> {
    let destination = normalize_destination(&link.destination_url).map_err(|reason| {
        RedirectError::InvalidDestination {
            slug: link.slug.clone(),
            reason,
        }
    })?;

    Ok(match link.redirect_type {
        RedirectType::Direct => RedirectPlan::Direct { destination },
        RedirectType::Landing => RedirectPlan::Landing {
            destination,
            auto_redirect: link.auto_redirect,
        },
    })
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Result of resolving a slug across both namespaces
#[derive(Debug, Clone)]
pub enum Resolution {
    Affiliate {
        link: AffiliateLink,
        plan: RedirectPlan,
    },
    Article(Article),
    NotFound,
}

/// Resolves a slug: affiliate links take precedence over articles.
/// A link with an unusable destination is skipped as if it did not exist.
#[derive(Clone)]
pub struct RedirectResolver {
    links: Arc<dyn LinkStore>,
    articles: Arc<dyn ArticleStore>,
    lookup_timeout: Duration,
}

impl RedirectResolver {
    pub fn new(
        links: Arc<dyn LinkStore>,
        articles: Arc<dyn ArticleStore>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            links,
            articles,
            lookup_timeout,
        }
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, slug: &str) -> Resolution {
        if let Some(link) = self.lookup_link(slug).await {
            match plan_for(&link) {
                Ok(plan) => return Resolution::Affiliate { link, plan },
                Err(e) => warn!("Skipping affiliate link: {}", e),
            }
        }

        match self.lookup_article(slug).await {
            Some(article) => Resolution::Article(article),
            None => Resolution::NotFound,
        }
    }

    async fn lookup_link(&self, slug: &str) -> Option<AffiliateLink> {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.links.lookup_by_slug(slug));

        match lookup.await {
            Ok(Ok(Some(link))) => Some(link),
            Ok(Ok(None)) => {
                debug!("No affiliate link for slug {}", slug);
                None
            },
            // Both are treated as a miss; a down backend may be hiding a real link
            Ok(Err(e)) if e.is_unavailable() => {
                error!(
                    "Link store backend unavailable for slug {}, treating as not found: {}",
                    slug, e
                );
                None
            },
            Ok(Err(e)) => {
                warn!("Link lookup for slug {} failed: {}", slug, e);
                None
            },
            Err(_) => {
                let e = StoreError::Timeout(self.lookup_timeout.as_millis() as u64);
                error!("Link store backend unavailable for slug {}: {}", slug, e);
                None
            },
        }
    }

    async fn lookup_article(&self, slug: &str) -> Option<Article> {
        let lookup = tokio::time::timeout(self.lookup_timeout, self.articles.get_by_slug(slug));

        match lookup.await {
            Ok(Ok(article)) => article,
            Ok(Err(e)) => {
                warn!("Article store unavailable for slug {}: {}", slug, e);
                None
            },
            Err(_) => {
                warn!(
                    "Article lookup for slug {} timed out after {:?}",
                    slug, self.lookup_timeout
                );
                None
            },
        }
    }
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// Same tab, replacing the current history entry
    Replace,
    /// Same tab, plain assignment
    Assign,
    NewTab,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub mode: NavigationMode,
    pub url: String,
}

/// Where navigation calls end up: a browser window, or an HTTP response
pub trait Navigator: Send + Sync {
    fn replace(&self, url: &str) -> Result<(), NavigationError>;

    fn assign(&self, url: &str) -> Result<(), NavigationError>;

    fn open_new_tab(&self, url: &str) -> Result<(), NavigationError>;
}

/// Navigator that records every call; the HTTP layer turns the last one into a response
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    navigations: Mutex<Vec<Navigation>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<Navigation> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.lock().last().cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Navigation>> {
        self.navigations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, mode: NavigationMode, url: &str) -> Result<(), NavigationError> {
        self.lock().push(Navigation {
            mode,
            url: url.to_string(),
        });
        Ok(())
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, url: &str) -> Result<(), NavigationError> {
        self.push(NavigationMode::Replace, url)
    }

    fn assign(&self, url: &str) -> Result<(), NavigationError> {
        self.push(NavigationMode::Assign, url)
    }

    fn open_new_tab(&self, url: &str) -> Result<(), NavigationError> {
        self.push(NavigationMode::NewTab, url)
    }
}

// =============================================================================
// SESSION STATE MACHINE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectState {
    Idle,
    Resolving,
    NotFound,
    DirectRedirecting,
    /// `remaining` is `Some` while an automatic countdown is pending
    LandingDisplayed { remaining: Option<u32> },
    Redirected,
}

/// What `start` ended with
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// A direct link navigated to `destination`
    Redirected {
        link: AffiliateLink,
        destination: String,
    },
    /// A direct link whose navigation failed both ways
    NavigationFailed { link: AffiliateLink, plan: RedirectPlan },
    /// Interstitial is showing
    Landing { link: AffiliateLink, plan: RedirectPlan },
    Article(Article),
    NotFound,
    /// Torn down before the lookup came back
    Cancelled,
    /// `start` already ran for this session
    AlreadyStarted,
}

/// Timing knobs for a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub countdown_seconds: u32,
    pub tick: Duration,
    pub popup_fallback_delay: Duration,
    /// Server-side sessions leave the countdown to the rendered page
    pub run_timers: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            tick: Duration::from_secs(1),
            popup_fallback_delay: DEFAULT_POPUP_FALLBACK_DELAY,
            run_timers: true,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            countdown_seconds: config.redirect.countdown_seconds,
            popup_fallback_delay: Duration::from_millis(config.redirect.popup_fallback_delay_ms),
            ..Self::default()
        }
    }

    pub fn without_timers(mut self) -> Self {
        self.run_timers = false;
        self
    }
}

#[derive(Debug, Clone)]
struct Target {
    link_id: String,
    destination: String,
}

struct Core {
    state: RedirectState,
    mounted: bool,
    target: Option<Target>,
    countdown: Option<JoinHandle<()>>,
    fallback: Option<JoinHandle<()>>,
}

struct Shared {
    slug: String,
    core: Mutex<Core>,
    navigator: Arc<dyn Navigator>,
    clicks: Arc<dyn ClickTracker>,
    visit: VisitContext,
    settings: SessionSettings,
}

/// One visit to one slug. Dropping the session tears it down.
pub struct RedirectSession {
    shared: Arc<Shared>,
}

impl RedirectSession {
    pub fn new(
        slug: impl Into<String>,
        navigator: Arc<dyn Navigator>,
        clicks: Arc<dyn ClickTracker>,
        visit: VisitContext,
        settings: SessionSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                slug: slug.into(),
                core: Mutex::new(Core {
                    state: RedirectState::Idle,
                    mounted: true,
                    target: None,
                    countdown: None,
                    fallback: None,
                }),
                navigator,
                clicks,
                visit,
                settings,
            }),
        }
    }

    pub fn slug(&self) -> &str {
        &self.shared.slug
    }

    pub fn state(&self) -> RedirectState {
        self.shared.lock().state.clone()
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        match self.shared.lock().state {
            RedirectState::LandingDisplayed { remaining } => remaining,
            _ => None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.lock().mounted
    }

    /// Resolve the slug and act on it. Only the first call does anything.
    pub async fn start(&self, resolver: &RedirectResolver) -> SessionOutcome {
        {
            let mut core = self.shared.lock();
            if !core.mounted {
                return SessionOutcome::Cancelled;
            }
            if core.state != RedirectState::Idle {
                debug!("Session for {} already started", self.shared.slug);
                return SessionOutcome::AlreadyStarted;
            }
            core.state = RedirectState::Resolving;
        }

        let resolution = resolver.resolve(&self.shared.slug).await;
        self.shared.apply(resolution)
    }

    /// Primary action on the interstitial (button or finished countdown).
    /// Returns true if this call navigated.
    pub fn trigger(&self) -> bool {
        self.shared.trigger()
    }

    /// Tear down: pending timers are cancelled and late callbacks become no-ops
    pub fn unmount(&self) {
        let mut core = self.shared.lock();
        if !core.mounted {
            return;
        }
        core.mounted = false;

        if let Some(countdown) = core.countdown.take() {
            countdown.abort();
        }
        if let Some(fallback) = core.fallback.take() {
            fallback.abort();
        }
        debug!("Session for {} unmounted", self.shared.slug);
    }
}

impl Drop for RedirectSession {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(self: &Arc<Self>, resolution: Resolution) -> SessionOutcome {
        match resolution {
            Resolution::Affiliate {
                link,
                plan: RedirectPlan::Direct { destination },
            } => {
                {
                    let mut core = self.lock();
                    if !core.mounted {
                        return SessionOutcome::Cancelled;
                    }
                    core.state = RedirectState::DirectRedirecting;
                }

                self.clicks.track(&link.id, &self.visit);
                self.lock().state = RedirectState::Redirected;
                let navigated = self.navigate_same_tab(&destination);

                if navigated {
                    info!("Redirecting {} to {}", self.slug, destination);
                    SessionOutcome::Redirected { link, destination }
                } else {
                    SessionOutcome::NavigationFailed {
                        link,
                        plan: RedirectPlan::Direct { destination },
                    }
                }
            },
            Resolution::Affiliate {
                link,
                plan:
                    RedirectPlan::Landing {
                        destination,
                        auto_redirect,
                    },
            } => {
                let mut core = self.lock();
                if !core.mounted {
                    return SessionOutcome::Cancelled;
                }

                let remaining = auto_redirect.then_some(self.settings.countdown_seconds);
                core.state = RedirectState::LandingDisplayed { remaining };
                core.target = Some(Target {
                    link_id: link.id.clone(),
                    destination: destination.clone(),
                });

                if auto_redirect && self.settings.run_timers {
                    let weak = Arc::downgrade(self);
                    let tick = self.settings.tick;
                    core.countdown = Some(tokio::spawn(run_countdown(weak, tick)));
                }
                drop(core);

                debug!("Showing landing page for {}", self.slug);
                SessionOutcome::Landing {
                    link,
                    plan: RedirectPlan::Landing {
                        destination,
                        auto_redirect,
                    },
                }
            },
            Resolution::Article(article) => {
                if !self.settle_not_found() {
                    return SessionOutcome::Cancelled;
                }
                SessionOutcome::Article(article)
            },
            Resolution::NotFound => {
                if !self.settle_not_found() {
                    return SessionOutcome::Cancelled;
                }
                warn!("Slug not found: {}", self.slug);
                SessionOutcome::NotFound
            },
        }
    }

    fn settle_not_found(&self) -> bool {
        let mut core = self.lock();
        if !core.mounted {
            return false;
        }
        core.state = RedirectState::NotFound;
        true
    }

    fn trigger(self: &Arc<Self>) -> bool {
        let target = {
            let mut core = self.lock();
            if !core.mounted {
                debug!("Ignoring redirect for unmounted session {}", self.slug);
                return false;
            }
            if !matches!(core.state, RedirectState::LandingDisplayed { .. }) {
                debug!("Ignoring redirect for {} in state {:?}", self.slug, core.state);
                return false;
            }
            let Some(target) = core.target.clone() else {
                return false;
            };

            // Guard is set in the same critical section as the check
            core.state = RedirectState::Redirected;
            if let Some(countdown) = core.countdown.take() {
                countdown.abort();
            }
            target
        };

        self.clicks.track(&target.link_id, &self.visit);
        info!("Opening {} for {}", target.destination, self.slug);

        match self.navigator.open_new_tab(&target.destination) {
            Ok(()) => true,
            Err(NavigationError::PopupBlocked) => {
                warn!("New tab blocked for {}, falling back to same tab", self.slug);
                self.schedule_fallback(target.destination);
                true
            },
            Err(e) => {
                warn!("New tab failed for {}: {}", self.slug, e);
                self.assign_or_log(&target.destination)
            },
        }
    }

    fn schedule_fallback(self: &Arc<Self>, url: String) {
        if !self.settings.run_timers {
            self.assign_or_log(&url);
            return;
        }

        let weak = Arc::downgrade(self);
        let delay = self.settings.popup_fallback_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mounted = shared.lock().mounted;
            if mounted {
                shared.assign_or_log(&url);
            }
        });

        let mut core = self.lock();
        if core.mounted {
            core.fallback = Some(handle);
        } else {
            handle.abort();
        }
    }

    /// Replace the current page, falling back to plain assignment
    fn navigate_same_tab(&self, url: &str) -> bool {
        match self.navigator.replace(url) {
            Ok(()) => true,
            Err(e) => {
                warn!("Replace navigation failed for {}: {}", self.slug, e);
                self.assign_or_log(url)
            },
        }
    }

    fn assign_or_log(&self, url: &str) -> bool {
        match self.navigator.assign(url) {
            Ok(()) => true,
            Err(e) => {
                error!("Could not navigate {} to {}: {}", self.slug, url, e);
                false
            },
        }
    }
}

async fn run_countdown(shared: Weak<Shared>, tick: Duration) {
    loop {
        let fire = {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let core = shared.lock();
            if !core.mounted {
                return;
            }
            match core.state {
                RedirectState::LandingDisplayed {
                    remaining: Some(remaining),
                } => remaining == 0,
                // Someone already redirected
                _ => return,
            }
        };

        if fire {
            if let Some(shared) = shared.upgrade() {
                shared.trigger();
            }
            return;
        }

        tokio::time::sleep(tick).await;

        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut core = shared.lock();
        if !core.mounted {
            return;
        }
        if let RedirectState::LandingDisplayed {
            remaining: Some(remaining),
        } = &mut core.state
        {
            *remaining = remaining.saturating_sub(1);
        }
    }
}
