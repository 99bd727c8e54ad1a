use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::middleware::RequestStart;
use super::policy::{RedirectOutcome, RedirectPolicy, RouteIntent};
use crate::analytics::AnalyticsReporter;
use crate::config::RedirectConfig;
use crate::region::RegionRegistry;
use crate::resolver::LinkResolver;
use crate::visitor::VisitorContextExtractor;

const DEFAULT_NOT_FOUND_PAGE: &str = "<!DOCTYPE html><html><head><title>Link not found</title></head><body><h1>404</h1><p>This link does not exist.</p></body></html>";

static OUTCOME_HEADER: HeaderName = HeaderName::from_static("x-linkedge-outcome");
static REGION_HEADER: HeaderName = HeaderName::from_static("x-linkedge-region");
static TIMING_TOTAL_HEADER: HeaderName = HeaderName::from_static("x-linkedge-timing-total-ms");
static TIMING_LOOKUP_HEADER: HeaderName = HeaderName::from_static("x-linkedge-timing-lookup-ms");

pub struct RedirectState {
    pub regions: Arc<RegionRegistry>,
    pub resolver: LinkResolver,
    pub extractor: VisitorContextExtractor,
    pub policy: RedirectPolicy,
    pub reporter: AnalyticsReporter,
    pub redirect_status: StatusCode,
    pub not_found_page: String,
}

impl RedirectState {
    pub fn new(
        regions: Arc<RegionRegistry>,
        config: &RedirectConfig,
        extractor: VisitorContextExtractor,
        reporter: AnalyticsReporter,
    ) -> anyhow::Result<Self> {
        let redirect_status = StatusCode::from_u16(config.redirect_status)?;
        if !redirect_status.is_redirection() {
            anyhow::bail!("redirect status {redirect_status} is not a 3xx status");
        }

        let not_found_page = match &config.not_found_page {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("failed to read not-found page '{path}': {e}")
            })?,
            None => DEFAULT_NOT_FOUND_PAGE.to_string(),
        };

        Ok(Self {
            regions,
            resolver: LinkResolver::new(Duration::from_millis(config.lookup_timeout_ms)),
            extractor,
            policy: RedirectPolicy::from_config(config),
            reporter,
            redirect_status,
            not_found_page,
        })
    }
}

/// Resolve the requested short link and redirect the visitor
pub async fn resolve_link(
    State(state): State<Arc<RedirectState>>,
    Extension(RequestStart(request_start)): Extension<RequestStart>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let ctx = state.extractor.parse(&uri, &headers, addr.ip());

    let key = match state.policy.route(&ctx) {
        RouteIntent::Lookup(key) => key,
        intent => {
            debug!(path = %ctx.pathname, handle = ?ctx.keys.handle, ?intent, "no lookup needed");
            let outcome = deliverable(state.policy.outcome(&ctx, None));
            return respond(&state, outcome, None);
        }
    };

    let endpoint = state.regions.route(ctx.geo.point(), ctx.is_local);
    let lookup_start = Instant::now();

    let resolution = match state.resolver.resolve(endpoint, &key).await {
        Ok(Some(link)) => Some(link),
        Ok(None) => {
            debug!(region = %endpoint.name, %key, "no usable link for key");
            None
        }
        Err(err) => {
            warn!(
                region = err.region(),
                kind = err.kind(),
                error = %err,
                %key,
                "link lookup failed, serving not found"
            );
            None
        }
    };
    let lookup_time = lookup_start.elapsed();

    let outcome = deliverable(state.policy.outcome(&ctx, resolution.as_ref()));

    if let (RedirectOutcome::Destination(_), Some(link)) = (&outcome, &resolution) {
        state.reporter.report_visit(link, &ctx);
    }

    let mut response = respond(&state, outcome, Some(&endpoint.name));
    let response_headers = response.headers_mut();
    response_headers.insert(
        TIMING_LOOKUP_HEADER.clone(),
        HeaderValue::from(lookup_time.as_millis() as u64),
    );
    response_headers.insert(
        TIMING_TOTAL_HEADER.clone(),
        HeaderValue::from(request_start.elapsed().as_millis() as u64),
    );
    response
}

/// Downgrade a redirect whose target cannot be sent as a `Location` header.
fn deliverable(outcome: RedirectOutcome) -> RedirectOutcome {
    match outcome {
        RedirectOutcome::Landing(ref url) | RedirectOutcome::Destination(ref url)
            if HeaderValue::try_from(url.as_str()).is_err() =>
        {
            warn!(%url, "redirect target is not a valid Location header, serving not found");
            RedirectOutcome::NotFound
        }
        outcome => outcome,
    }
}

fn respond(state: &RedirectState, outcome: RedirectOutcome, region: Option<&str>) -> Response {
    let label = outcome.label();

    let mut response = match outcome {
        RedirectOutcome::PassThrough => StatusCode::OK.into_response(),
        RedirectOutcome::NotFound => not_found(state),
        RedirectOutcome::Landing(url) | RedirectOutcome::Destination(url) => {
            match HeaderValue::try_from(url) {
                Ok(location) => (state.redirect_status, [(header::LOCATION, location)]).into_response(),
                Err(_) => not_found(state),
            }
        }
    };

    let response_headers = response.headers_mut();
    response_headers.insert(OUTCOME_HEADER.clone(), HeaderValue::from_static(label));
    if let Some(value) = region.and_then(|r| HeaderValue::from_str(r).ok()) {
        response_headers.insert(REGION_HEADER.clone(), value);
    }

    response
}

fn not_found(state: &RedirectState) -> Response {
    (StatusCode::NOT_FOUND, Html(state.not_found_page.clone())).into_response()
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<RedirectState>>) -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
        regions: Vec<String>,
        default_region: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
        regions: state.regions.iter().map(|r| r.name.clone()).collect(),
        default_region: state.regions.default_region().name.clone(),
    })
}
