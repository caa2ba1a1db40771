//! WMS GetMap renderer.
//!
//! Renders an entity by asking a WMS server (typically the GeoServer that
//! publishes the catalog) for a PNG of the requested bounding box.

use futures::future::BoxFuture;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::r#trait::{RenderError, RenderRequest, Renderer};

/// Default User-Agent string for GetMap requests.
const DEFAULT_USER_AGENT: &str = concat!("layerthumb/", env!("CARGO_PKG_VERSION"));

/// SRS sent when a bounding box carries no CRS.
pub const DEFAULT_SRS: &str = "EPSG:4326";

/// Renderer backed by a WMS 1.1.1 endpoint.
#[derive(Clone)]
pub struct WmsRenderer {
    client: reqwest::Client,
    endpoint: Url,
    default_srs: String,
}

impl WmsRenderer {
    /// Create a renderer for the given WMS endpoint (e.g.
    /// `http://localhost:8080/geoserver/wms`).
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, RenderError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| RenderError::HttpError(format!("Invalid WMS URL '{}': {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                RenderError::HttpError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint,
            default_srs: DEFAULT_SRS.to_string(),
        })
    }

    /// Set the SRS used for bounding boxes without a CRS.
    pub fn with_default_srs(mut self, srs: impl Into<String>) -> Self {
        self.default_srs = srs.into();
        self
    }

    /// Build the GetMap URL for a request.
    ///
    /// Layers and layer groups are both addressed by their qualified name;
    /// the WMS server expands groups into their member layers and styles.
    pub fn getmap_url(&self, request: &RenderRequest) -> Result<Url, RenderError> {
        if request.entity.name.is_empty() {
            return Err(RenderError::UnsupportedEntity(format!(
                "{} {} has no name to render",
                request.entity.kind, request.entity.id
            )));
        }

        let bbox = &request.bbox;
        let srs = if bbox.crs.is_empty() {
            self.default_srs.clone()
        } else {
            bbox.crs.clone()
        };
        let params = [
            ("SERVICE", "WMS".to_string()),
            ("VERSION", "1.1.1".to_string()),
            ("REQUEST", "GetMap".to_string()),
            ("LAYERS", request.entity.qualified_name()),
            ("STYLES", String::new()),
            ("FORMAT", "image/png".to_string()),
            ("TRANSPARENT", "true".to_string()),
            ("SRS", srs),
            (
                "BBOX",
                format!("{},{},{},{}", bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y),
            ),
            ("WIDTH", request.width.to_string()),
            ("HEIGHT", request.height.to_string()),
        ];

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(params.iter());
        Ok(url)
    }
}

impl Renderer for WmsRenderer {
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> BoxFuture<'a, Result<Vec<u8>, RenderError>> {
        Box::pin(async move {
            let url = self.getmap_url(request)?;
            trace!(url = %url, "GetMap request starting");

            let response = self.client.get(url.clone()).send().await.map_err(|e| {
                warn!(
                    url = %url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "GetMap request failed"
                );
                RenderError::HttpError(format!("Request failed: {}", e))
            })?;

            let status = response.status();
            if !status.is_success() {
                warn!(url = %url, status = status.as_u16(), "GetMap error status");
                return Err(RenderError::HttpError(format!("HTTP {} from {}", status, url)));
            }

            // A WMS server reports errors as an XML service exception with 200 OK.
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !content_type.starts_with("image/") {
                let body = response.text().await.unwrap_or_default();
                return Err(RenderError::InvalidResponse(format!(
                    "expected an image, got '{}': {}",
                    content_type,
                    body.chars().take(200).collect::<String>()
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| RenderError::HttpError(format!("Failed to read response: {}", e)))?;

            debug!(
                entity = %request.entity.id,
                width = request.width,
                height = request.height,
                bytes = bytes.len(),
                "GetMap rendered"
            );
            Ok(bytes.to_vec())
        })
    }

    fn name(&self) -> &str {
        "wms"
    }
}
