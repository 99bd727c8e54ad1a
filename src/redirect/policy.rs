//! Redirect decision
//!
//! `RedirectPolicy::route` decides from the visitor context alone whether a
//! lookup is needed; `RedirectPolicy::outcome` folds in the resolution result.
//! Both are pure.

use reqwest::Url;

use crate::config::{MobileRedirectMode, RedirectConfig};
use crate::models::LinkRecord;
use crate::storage::LinkKey;
use crate::visitor::{Platform, VisitorContext};

/// Marker Android intent URIs carry when they embed their own browser fallback
const ANDROID_BROWSER_FALLBACK: &str = "browser_fallback_url";

/// What to do before touching the data layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteIntent {
    /// No handle and no path, or a reserved path: leave the request alone
    PassThrough,
    /// Handle on the bare root: send the visitor to the landing page
    Landing,
    /// A path without a handle can never resolve
    NotFound,
    /// Look the key up
    Lookup(LinkKey),
}

/// The final response decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    PassThrough,
    Landing(String),
    NotFound,
    Destination(String),
}

impl RedirectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RedirectOutcome::PassThrough => "pass-through",
            RedirectOutcome::Landing(_) => "landing",
            RedirectOutcome::NotFound => "not-found",
            RedirectOutcome::Destination(_) => "redirect",
        }
    }
}

/// How a resolved link is turned into a redirect target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileRedirect {
    /// Always the flat destination URL
    FlatRedirect,
    /// Open the native app through its scheme when possible, otherwise the URL
    AppSchemeWithFallback { open_app_url: String },
}

impl MobileRedirect {
    /// The redirect target for a resolved link, or `None` if it has no usable URL.
    pub fn destination(&self, link: &LinkRecord, ctx: &VisitorContext) -> Option<String> {
        let url = link.usable_url()?;

        let open_app_url = match self {
            MobileRedirect::FlatRedirect => return Some(url.to_string()),
            MobileRedirect::AppSchemeWithFallback { open_app_url } => open_app_url,
        };

        if ctx.is_bot {
            return Some(url.to_string());
        }

        let scheme = match ctx.platform {
            Platform::Android => link.android_scheme.as_deref(),
            Platform::Ios => link.apple_scheme.as_deref(),
            Platform::Web => None,
        }
        .filter(|scheme| !scheme.trim().is_empty());

        let Some(scheme) = scheme else {
            return Some(url.to_string());
        };

        if ctx.platform == Platform::Android && scheme.contains(ANDROID_BROWSER_FALLBACK) {
            return Some(scheme.to_string());
        }

        let title = ctx.keys.handle.as_deref().unwrap_or(&link.handle);
        Some(
            open_app_page_url(open_app_url, &ctx.origin, scheme, url, title)
                .unwrap_or_else(|| url.to_string()),
        )
    }
}

/// Build the intermediate page URL carrying scheme, fallback and title.
fn open_app_page_url(
    open_app_url: &str,
    origin: &str,
    scheme: &str,
    fallback: &str,
    title: &str,
) -> Option<String> {
    let mut page = Url::parse(open_app_url)
        .or_else(|_| Url::parse(origin).and_then(|base| base.join(open_app_url)))
        .ok()?;

    page.query_pairs_mut()
        .append_pair("scheme", scheme)
        .append_pair("fallback", fallback)
        .append_pair("title", title);

    Some(page.into())
}

#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    landing_url: String,
    reserved_prefixes: Vec<String>,
    mobile: MobileRedirect,
}

impl RedirectPolicy {
    pub fn new(
        landing_url: impl Into<String>,
        reserved_prefixes: Vec<String>,
        mobile: MobileRedirect,
    ) -> Self {
        Self {
            landing_url: landing_url.into(),
            reserved_prefixes,
            mobile,
        }
    }

    pub fn from_config(config: &RedirectConfig) -> Self {
        let mobile = match config.mobile_redirect {
            MobileRedirectMode::Flat => MobileRedirect::FlatRedirect,
            MobileRedirectMode::AppScheme => MobileRedirect::AppSchemeWithFallback {
                open_app_url: config.open_app_url.clone(),
            },
        };
        Self::new(
            config.landing_url.clone(),
            config.reserved_prefixes.clone(),
            mobile,
        )
    }

    fn is_reserved(&self, ctx: &VisitorContext) -> bool {
        ctx.first_segment().is_some_and(|segment| {
            self.reserved_prefixes
                .iter()
                .any(|prefix| prefix.eq_ignore_ascii_case(segment))
        })
    }

    pub fn route(&self, ctx: &VisitorContext) -> RouteIntent {
        if self.is_reserved(ctx) {
            return RouteIntent::PassThrough;
        }

        match (ctx.has_handle(), ctx.has_path()) {
            (false, false) => RouteIntent::PassThrough,
            (true, false) => RouteIntent::Landing,
            (false, true) => RouteIntent::NotFound,
            (true, true) => match ctx.keys.link_key() {
                Some(key) => RouteIntent::Lookup(key),
                None => RouteIntent::NotFound,
            },
        }
    }

    /// Combine the route with the lookup result. `resolution` is ignored for
    /// routes that never look anything up.
    pub fn outcome(&self, ctx: &VisitorContext, resolution: Option<&LinkRecord>) -> RedirectOutcome {
        match self.route(ctx) {
            RouteIntent::PassThrough => RedirectOutcome::PassThrough,
            RouteIntent::Landing => RedirectOutcome::Landing(self.landing_url.clone()),
            RouteIntent::NotFound => RedirectOutcome::NotFound,
            RouteIntent::Lookup(_) => resolution
                .and_then(|link| self.mobile.destination(link, ctx))
                .map(RedirectOutcome::Destination)
                .unwrap_or(RedirectOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::RoutingKeys;

    const LANDING: &str = "https://example.com";

    fn policy(mobile: MobileRedirect) -> RedirectPolicy {
        RedirectPolicy::new(LANDING, vec!["api".to_string(), "_open".to_string()], mobile)
    }

    fn ctx(handle: &str, path: &str) -> VisitorContext {
        VisitorContext {
            keys: RoutingKeys {
                handle: (!handle.is_empty()).then(|| handle.to_string()),
                slug: (path != "/").then(|| path.to_string()),
                ..Default::default()
            },
            origin: "https://acme.example.com".to_string(),
            pathname: path.to_string(),
            ..Default::default()
        }
    }

    fn link(url: &str) -> LinkRecord {
        LinkRecord {
            id: "link-1".to_string(),
            handle: "acme".to_string(),
            slug: Some("/x".to_string()),
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_handle_root_passes_through() {
        let policy = policy(MobileRedirect::FlatRedirect);
        assert_eq!(policy.outcome(&ctx("", "/"), None), RedirectOutcome::PassThrough);
    }

    #[test]
    fn test_handle_root_goes_to_landing() {
        let policy = policy(MobileRedirect::FlatRedirect);
        assert_eq!(
            policy.outcome(&ctx("acme", "/"), None),
            RedirectOutcome::Landing(LANDING.to_string())
        );
    }

    #[test]
    fn test_no_handle_with_path_is_not_found() {
        let policy = policy(MobileRedirect::FlatRedirect);
        let dest = link("https://dest.example");
        assert_eq!(policy.route(&ctx("", "/x")), RouteIntent::NotFound);
        assert_eq!(
            policy.outcome(&ctx("", "/x"), Some(&dest)),
            RedirectOutcome::NotFound
        );
    }

    #[test]
    fn test_unresolved_is_not_found() {
        let policy = policy(MobileRedirect::FlatRedirect);
        assert!(matches!(
            policy.route(&ctx("acme", "/x")),
            RouteIntent::Lookup(_)
        ));
        assert_eq!(policy.outcome(&ctx("acme", "/x"), None), RedirectOutcome::NotFound);
        assert_eq!(
            policy.outcome(&ctx("acme", "/x"), Some(&link(""))),
            RedirectOutcome::NotFound
        );
    }

    #[test]
    fn test_resolved_redirects_to_url() {
        let policy = policy(MobileRedirect::FlatRedirect);
        assert_eq!(
            policy.outcome(&ctx("acme", "/x"), Some(&link("https://dest.example"))),
            RedirectOutcome::Destination("https://dest.example".to_string())
        );
    }

    #[test]
    fn test_reserved_prefix_passes_through() {
        let policy = policy(MobileRedirect::FlatRedirect);
        assert_eq!(policy.route(&ctx("acme", "/api/links")), RouteIntent::PassThrough);
        assert_eq!(policy.route(&ctx("", "/API")), RouteIntent::PassThrough);
    }

    #[test]
    fn test_flat_redirect_ignores_platform() {
        let mut visitor = ctx("acme", "/x");
        visitor.platform = Platform::Ios;
        let dest = LinkRecord {
            apple_scheme: Some("acme://promo".to_string()),
            ..link("https://dest.example")
        };

        assert_eq!(
            MobileRedirect::FlatRedirect.destination(&dest, &visitor),
            Some("https://dest.example".to_string())
        );
    }

    #[test]
    fn test_app_scheme_android_intent_with_fallback() {
        let strategy = MobileRedirect::AppSchemeWithFallback {
            open_app_url: "/_open".to_string(),
        };
        let intent = "intent://promo#Intent;scheme=acme;S.browser_fallback_url=https%3A%2F%2Fdest.example;end";
        let dest = LinkRecord {
            android_scheme: Some(intent.to_string()),
            ..link("https://dest.example")
        };
        let mut visitor = ctx("acme", "/x");
        visitor.platform = Platform::Android;

        assert_eq!(strategy.destination(&dest, &visitor), Some(intent.to_string()));
    }

    #[test]
    fn test_app_scheme_web_and_missing_scheme_use_url() {
        let strategy = MobileRedirect::AppSchemeWithFallback {
            open_app_url: "/_open".to_string(),
        };
        let dest = LinkRecord {
            apple_scheme: Some("acme://promo".to_string()),
            ..link("https://dest.example")
        };

        let web = ctx("acme", "/x");
        assert_eq!(
            strategy.destination(&dest, &web),
            Some("https://dest.example".to_string())
        );

        let mut android = ctx("acme", "/x");
        android.platform = Platform::Android;
        assert_eq!(
            strategy.destination(&dest, &android),
            Some("https://dest.example".to_string())
        );

        let mut bot = ctx("acme", "/x");
        bot.platform = Platform::Ios;
        bot.is_bot = true;
        assert_eq!(
            strategy.destination(&dest, &bot),
            Some("https://dest.example".to_string())
        );
    }

    #[test]
    fn test_app_scheme_ios_goes_through_open_page() {
        let strategy = MobileRedirect::AppSchemeWithFallback {
            open_app_url: "/_open".to_string(),
        };
        let dest = LinkRecord {
            apple_scheme: Some("acme://promo?id=1".to_string()),
            ..link("https://dest.example/a b")
        };
        let mut visitor = ctx("acme", "/x");
        visitor.platform = Platform::Ios;

        let target = strategy.destination(&dest, &visitor).unwrap();
        let parsed = Url::parse(&target).unwrap();
        assert_eq!(parsed.path(), "/_open");
        assert_eq!(parsed.host_str(), Some("acme.example.com"));

        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("scheme".to_string(), "acme://promo?id=1".to_string()),
                ("fallback".to_string(), "https://dest.example/a b".to_string()),
                ("title".to_string(), "acme".to_string()),
            ]
        );
    }
}
