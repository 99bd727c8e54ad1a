//! Data models for analytics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::LinkRecord;
use crate::visitor::{anonymize_ip, DeviceType, Platform, VisitorContext};

#[derive(Debug, Error, PartialEq)]
pub enum EventValidationError {
    /// Field names that failed, sorted
    #[error("invalid analytics event fields: {}", .0.join(", "))]
    InvalidFields(Vec<String>),
}

impl From<ValidationErrors> for EventValidationError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, _)| field.to_string())
            .collect();
        fields.sort();
        EventValidationError::InvalidFields(fields)
    }
}

fn http_scheme(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::new("http_scheme"))
    }
}

/// One visit to a resolved link, as sent to the ingestion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[validate(length(min = 1))]
    pub link_id: String,
    pub team_id: Option<String>,
    /// Full request URL, including query string
    #[validate(url, length(max = 2048), custom(function = "http_scheme"))]
    pub url: String,
    pub handle: Option<String>,
    pub timestamp: DateTime<Utc>,

    pub ip: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(length(max = 2048))]
    pub city: Option<String>,
    #[validate(length(max = 2048))]
    pub region: Option<String>,
    pub country: Option<String>,

    #[validate(length(max = 2048))]
    pub user_agent: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub device: DeviceType,
    pub platform: Platform,
    pub is_bot: bool,
}

impl AnalyticsEvent {
    pub fn from_visit(link: &LinkRecord, ctx: &VisitorContext, anonymize: bool) -> Self {
        let ip = ctx
            .ip
            .map(|ip| if anonymize { anonymize_ip(ip) } else { ip })
            .map(|ip| ip.to_string());

        Self {
            link_id: link.id.clone(),
            team_id: link.team_id.clone(),
            url: ctx.request_url.clone(),
            handle: ctx.keys.handle.clone(),
            timestamp: Utc::now(),
            ip,
            latitude: ctx.geo.latitude,
            longitude: ctx.geo.longitude,
            city: ctx.geo.city.clone(),
            region: ctx.geo.region.clone(),
            country: ctx.geo.country.clone(),
            user_agent: ctx.user_agent.clone(),
            browser: ctx.agent.browser.clone(),
            browser_version: ctx.agent.browser_version.clone(),
            os: ctx.agent.os.clone(),
            os_version: ctx.agent.os_version.clone(),
            device: ctx.agent.device_type,
            platform: ctx.platform,
            is_bot: ctx.is_bot,
        }
    }

    /// Check the payload against the ingestion schema before it leaves the process.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        Validate::validate(self).map_err(EventValidationError::from)
    }
}
