//! Cheap pre-filter deciding whether a job goes through the media relay
//!
//! This is a substring heuristic, not a parse. False positives are harmless
//! because the relay validates the payload itself and falls back to the
//! original body.

const MEDIA_MARKERS: [&str; 4] = ["\"image\"", "\"video\"", "\"audio\"", "\"document\""];

#[derive(Debug, Clone)]
pub struct MediaPolicy {
    host_marker: String,
}

impl MediaPolicy {
    pub fn new(host_marker: impl Into<String>) -> Self {
        Self {
            host_marker: host_marker.into(),
        }
    }

    pub fn host_marker(&self) -> &str {
        &self.host_marker
    }

    /// True when the URL targets the provider and the body mentions a media type.
    pub fn should_relay(&self, url: &str, body: Option<&str>) -> bool {
        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return false;
        };

        url.contains(&self.host_marker) && MEDIA_MARKERS.iter().any(|m| body.contains(m))
    }
}
