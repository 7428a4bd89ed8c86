pub mod affiliate_link;
pub mod article;
pub mod click_event;

// Re-export common types
pub use affiliate_link::{AffiliateLink, AffiliateLinkUpdate, NewAffiliateLink, RedirectType};
pub use article::Article;
pub use click_event::{ClickEvent, DeviceType};
