//! Lightweight user-agent classification
//!
//! Only what the redirect decision and the analytics event need: browser and
//! OS names with versions, a coarse device type, and bot detection.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
    Bot,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentInfo {
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub device_type: DeviceType,
    pub is_bot: bool,
}

const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "facebookexternalhit",
    "embedly",
    "whatsapp",
    "telegram",
    "preview",
    "curl/",
    "wget/",
    "python-requests",
    "headlesschrome",
];

// Order matters: Edge and Opera also advertise Chrome and Safari.
const BROWSERS: &[(&str, &str)] = &[
    ("edg/", "Edge"),
    ("edga/", "Edge"),
    ("edgios/", "Edge"),
    ("opr/", "Opera"),
    ("samsungbrowser/", "Samsung Internet"),
    ("fxios/", "Firefox"),
    ("firefox/", "Firefox"),
    ("crios/", "Chrome"),
    ("chrome/", "Chrome"),
];

pub fn parse(user_agent: &str) -> UserAgentInfo {
    let ua = user_agent.to_lowercase();
    let is_bot = BOT_MARKERS.iter().any(|marker| ua.contains(marker));

    let (browser, browser_version) = detect_browser(&ua);
    let (os, os_version) = detect_os(&ua);

    let device_type = if is_bot {
        DeviceType::Bot
    } else if ua.contains("ipad") || ua.contains("tablet") || (ua.contains("android") && !ua.contains("mobile")) {
        DeviceType::Tablet
    } else if ua.contains("mobi") || ua.contains("iphone") || ua.contains("ipod") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    };

    UserAgentInfo {
        browser,
        browser_version,
        os,
        os_version,
        device_type,
        is_bot,
    }
}

fn detect_browser(ua: &str) -> (Option<String>, Option<String>) {
    for (marker, name) in BROWSERS {
        if ua.contains(marker) {
            return (Some(name.to_string()), version_after(ua, marker));
        }
    }

    if ua.contains("safari/") {
        let name = if ua.contains("mobile") {
            "Mobile Safari"
        } else {
            "Safari"
        };
        return (Some(name.to_string()), version_after(ua, "version/"));
    }

    (None, None)
}

fn detect_os(ua: &str) -> (Option<String>, Option<String>) {
    if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
        let version = version_after(ua, "iphone os ").or_else(|| version_after(ua, "cpu os "));
        return (Some("iOS".to_string()), version);
    }
    if ua.contains("android") {
        return (Some("Android".to_string()), version_after(ua, "android "));
    }
    if ua.contains("windows nt") {
        return (Some("Windows".to_string()), version_after(ua, "windows nt "));
    }
    if ua.contains("mac os x") {
        return (Some("Mac OS".to_string()), version_after(ua, "mac os x "));
    }
    if ua.contains("cros ") {
        return (Some("Chrome OS".to_string()), None);
    }
    if ua.contains("linux") {
        return (Some("Linux".to_string()), None);
    }

    (None, None)
}

/// The dotted version immediately following `marker`; `_` separators are
/// normalized to `.`.
fn version_after(ua: &str, marker: &str) -> Option<String> {
    let start = ua.find(marker)? + marker.len();
    let version: String = ua[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .map(|c| if c == '_' { '.' } else { c })
        .collect();

    let version = version.trim_end_matches('.');
    (!version.is_empty()).then(|| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_SAFARI: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";
    const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.144 Mobile Safari/537.36";
    const WINDOWS_EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_iphone_safari() {
        let info = parse(IPHONE_SAFARI);
        assert_eq!(info.browser.as_deref(), Some("Mobile Safari"));
        assert_eq!(info.browser_version.as_deref(), Some("17.2"));
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.os_version.as_deref(), Some("17.2"));
        assert_eq!(info.device_type, DeviceType::Mobile);
        assert!(!info.is_bot);
    }

    #[test]
    fn test_android_chrome() {
        let info = parse(ANDROID_CHROME);
        assert_eq!(info.browser.as_deref(), Some("Chrome"));
        assert_eq!(info.browser_version.as_deref(), Some("120.0.6099.144"));
        assert_eq!(info.os.as_deref(), Some("Android"));
        assert_eq!(info.os_version.as_deref(), Some("14"));
        assert_eq!(info.device_type, DeviceType::Mobile);
    }

    #[test]
    fn test_windows_edge() {
        let info = parse(WINDOWS_EDGE);
        assert_eq!(info.browser.as_deref(), Some("Edge"));
        assert_eq!(info.os.as_deref(), Some("Windows"));
        assert_eq!(info.os_version.as_deref(), Some("10.0"));
        assert_eq!(info.device_type, DeviceType::Desktop);
    }

    #[test]
    fn test_bot() {
        let info = parse(GOOGLEBOT);
        assert!(info.is_bot);
        assert_eq!(info.device_type, DeviceType::Bot);
    }

    #[test]
    fn test_empty_user_agent() {
        assert_eq!(parse(""), UserAgentInfo::default());
    }
}
