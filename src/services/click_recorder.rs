// Click recorder for affiliate redirects
// Fire-and-forget: the redirect never waits on analytics and never sees its failures

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::{models::click_event::ClickEvent, services::link_store::LinkStore};

/// Visitor details captured when the slug was requested
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitContext {
    pub user_agent: String,
    pub referrer: String,
}

impl VisitContext {
    pub fn new(user_agent: Option<&str>, referrer: Option<&str>) -> Self {
        Self {
            user_agent: user_agent.unwrap_or("Unknown").to_string(),
            referrer: referrer.unwrap_or("").to_string(),
        }
    }
}

/// Sink for click events. Implementations must return immediately.
pub trait ClickTracker: Send + Sync {
    fn track(&self, link_id: &str, visit: &VisitContext);
}

/// Posts click analytics and bumps the link counter in the background
#[derive(Clone)]
pub struct ClickRecorder {
    store: Arc<dyn LinkStore>,
}

impl ClickRecorder {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self { store }
    }

    /// Schedule the click write. The handle is only useful to tests;
    /// callers on the redirect path drop it.
    pub fn record(&self, link_id: &str, visit: &VisitContext) -> JoinHandle<()> {
        let event = ClickEvent::new(link_id, &visit.user_agent, &visit.referrer);
        let store = self.store.clone();

        tokio::spawn(async move {
            // The two writes are independent, one failing does not skip the other
            if let Err(e) = store.record_click(&event).await {
                error!("Failed to record click event for {}: {}", event.link_id, e);
            }

            match store.increment_click_count(&event.link_id).await {
                Ok(()) => debug!("Click recorded for {}", event.link_id),
                Err(e) => error!("Failed to increment clicks for {}: {}", event.link_id, e),
            }
        })
    }
}

impl ClickTracker for ClickRecorder {
    fn track(&self, link_id: &str, visit: &VisitContext) {
        drop(self.record(link_id, visit));
    }
}
