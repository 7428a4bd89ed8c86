// Click event model
// Append-only analytics record, one per redirect action

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse device class derived from the user agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    /// Classify a user agent by substring match.
    /// Tablet markers win over mobile ones ("iPad; ... Mobile/15E148").
    pub fn classify(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();

        if ua.contains("tablet") || ua.contains("ipad") {
            DeviceType::Tablet
        } else if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
            DeviceType::Mobile
        } else {
            DeviceType::Desktop
        }
    }
}

/// Click event posted to the analytics endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub link_id: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub referrer: String,
    pub device_type: DeviceType,
    /// No conversion pipeline exists, always false at creation
    pub converted: bool,
}

impl ClickEvent {
    pub fn new(link_id: &str, user_agent: &str, referrer: &str) -> Self {
        Self {
            link_id: link_id.to_string(),
            timestamp: Utc::now(),
            user_agent: user_agent.to_string(),
            referrer: referrer.to_string(),
            device_type: DeviceType::classify(user_agent),
            converted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_classification() {
        let ipad = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148";
        let iphone = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
        let android = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120.0";
        let android_tablet = "Mozilla/5.0 (Linux; Android 13; SM-X700) Tablet Safari/537.36";
        let desktop = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0";

        assert_eq!(DeviceType::classify(ipad), DeviceType::Tablet);
        assert_eq!(DeviceType::classify(android_tablet), DeviceType::Tablet);
        assert_eq!(DeviceType::classify(iphone), DeviceType::Mobile);
        assert_eq!(DeviceType::classify(android), DeviceType::Mobile);
        assert_eq!(DeviceType::classify(desktop), DeviceType::Desktop);
        assert_eq!(DeviceType::classify(""), DeviceType::Desktop);
    }

    #[test]
    fn test_event_wire_format() {
        let event = ClickEvent::new("lnk_1", "Mozilla/5.0 (iPhone)", "https://blog.example.com/");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["linkId"], "lnk_1");
        assert_eq!(value["deviceType"], "mobile");
        assert_eq!(value["referrer"], "https://blog.example.com/");
        assert_eq!(value["converted"], false);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }
}
