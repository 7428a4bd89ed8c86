// Services module for the affiliate gateway
// Business logic layer for the application

pub mod article_store;
pub mod click_recorder;
pub mod cloud_client;
pub mod link_store;
pub mod pages;
pub mod redirect;

// Re-export commonly used services
pub use article_store::ArticleStore;
pub use click_recorder::{ClickRecorder, ClickTracker, VisitContext};
pub use cloud_client::{CloudClient, StoreError};
pub use link_store::LinkStore;
pub use pages::PageRenderer;
pub use redirect::{RedirectResolver, RedirectSession, Resolution, SessionOutcome};
