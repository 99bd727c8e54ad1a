//! Shared fixtures for the redirect integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::Request;
use linkedge::analytics::{AnalyticsEvent, AnalyticsReporter, EventSink, SinkError};
use linkedge::config::{RedirectConfig, VisitorConfig};
use linkedge::models::LinkRecord;
use linkedge::redirect::{self, middleware::RequestStart, RedirectState};
use linkedge::region::RegionRegistry;
use linkedge::storage::{LinkKey, LinkStore, SqliteStorage, StorageResult};
use linkedge::visitor::VisitorContextExtractor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tower::Layer;

/// Helper to create an initialized in-memory store
pub async fn create_test_store() -> Arc<SqliteStorage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

pub fn flat_link(id: &str, handle: &str, slug: &str, url: &str) -> LinkRecord {
    LinkRecord {
        id: id.to_string(),
        handle: handle.to_string(),
        slug: Some(slug.to_string()),
        url: Some(url.to_string()),
        ..Default::default()
    }
}

/// Build the redirect router over `regions`
pub fn create_app(
    regions: RegionRegistry,
    redirect_config: RedirectConfig,
    reporter: AnalyticsReporter,
) -> axum::Router {
    let extractor = VisitorContextExtractor::new(VisitorConfig::default(), None);
    let state =
        RedirectState::new(Arc::new(regions), &redirect_config, extractor, reporter).unwrap();
    redirect::create_redirect_router(Arc::new(state)).layer(TestConnectInfoLayer)
}

pub fn get(host: &str, path: &str) -> axum::http::request::Builder {
    Request::builder().uri(path).header("host", host)
}

/// Sink that forwards every event to a channel
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<AnalyticsEvent>,
}

impl RecordingSink {
    pub fn reporter() -> (AnalyticsReporter, mpsc::UnboundedReceiver<AnalyticsEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter =
            AnalyticsReporter::new(Arc::new(RecordingSink { tx }), Duration::from_secs(1), false);
        (reporter, rx)
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn send(&self, event: &AnalyticsEvent) -> Result<(), SinkError> {
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

/// Sink whose ingestion endpoint never answers
pub struct HangingSink;

#[async_trait]
impl EventSink for HangingSink {
    async fn send(&self, _event: &AnalyticsEvent) -> Result<(), SinkError> {
        std::future::pending().await
    }
}

/// Store whose lookups never complete
pub struct HangingStore;

#[async_trait]
impl LinkStore for HangingStore {
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn find_link(&self, _key: &LinkKey) -> anyhow::Result<Option<LinkRecord>> {
        std::future::pending().await
    }

    async fn insert(&self, _link: &LinkRecord) -> StorageResult<()> {
        Ok(())
    }
}

/// Helper layer to inject ConnectInfo for tests
#[derive(Clone)]
pub struct TestConnectInfoLayer;

impl<S> Layer<S> for TestConnectInfoLayer {
    type Service = TestConnectInfoMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TestConnectInfoMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct TestConnectInfoMiddleware<S> {
    inner: S,
}

impl<S, B> tower::Service<Request<B>> for TestConnectInfoMiddleware<S>
where
    S: tower::Service<Request<B>> + Clone,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let addr = SocketAddr::from(([203, 0, 113, 7], 12345));
        req.extensions_mut()
            .insert(axum::extract::connect_info::ConnectInfo(addr));
        req.extensions_mut().insert(RequestStart(Instant::now()));

        self.inner.call(req)
    }
}
