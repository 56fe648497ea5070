use crate::assets::decode::RasterImage;
use crate::assets::resolver::{ImageRequest, ImageResolver, ImageUnavailable};
use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::waypoint::Waypoint;

/// Street View Static API endpoint.
pub const STREET_VIEW_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview";

/// Environment variable holding the Maps API key.
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Fetches panorama crops from the Street View Static API.
///
/// One GET per waypoint, no retry. Requires the `streetview` feature; without it every fetch
/// reports the image as unavailable.
#[derive(Clone)]
pub struct StreetViewResolver {
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for StreetViewResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreetViewResolver")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl StreetViewResolver {
    /// Create a resolver using `api_key`.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: STREET_VIEW_ENDPOINT.to_owned(),
        }
    }

    /// Read the key from [`API_KEY_ENV`].
    pub fn from_env() -> ReelResult<Self> {
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(ReelError::validation(format!(
                "{API_KEY_ENV} must be set to fetch Street View imagery"
            ))),
        }
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Query parameters for `request`, key last.
    pub fn query(&self, request: &ImageRequest) -> Vec<(&'static str, String)> {
        vec![
            ("size", format!("{}x{}", request.width, request.height)),
            ("location", format!("{},{}", request.lat, request.lng)),
            ("heading", request.heading.to_string()),
            ("pitch", request.pitch.to_string()),
            ("fov", request.fov.to_string()),
            // 404 instead of a grey "no imagery" placeholder.
            ("return_error_code", "true".to_owned()),
            ("key", self.api_key.clone()),
        ]
    }
}

#[cfg(feature = "streetview")]
impl ImageResolver for StreetViewResolver {
    fn fetch(
        &self,
        request: &ImageRequest,
        waypoint: &Waypoint,
    ) -> Result<RasterImage, ImageUnavailable> {
        let mut req = ureq::get(&self.endpoint);
        for (k, v) in self.query(request) {
            req = req.query(k, v);
        }
        let mut resp = req.call().map_err(|e| {
            ImageUnavailable::new(format!(
                "street view request for waypoint '{}' failed: {e}",
                waypoint.id
            ))
        })?;
        let bytes = resp.body_mut().read_to_vec().map_err(|e| {
            ImageUnavailable::new(format!("street view body read failed: {e}"))
        })?;
        crate::assets::decode::decode_image(&bytes)
            .map_err(|e| ImageUnavailable::new(format!("street view image decode failed: {e}")))
    }
}

#[cfg(not(feature = "streetview"))]
impl ImageResolver for StreetViewResolver {
    fn fetch(
        &self,
        _request: &ImageRequest,
        waypoint: &Waypoint,
    ) -> Result<RasterImage, ImageUnavailable> {
        Err(ImageUnavailable::new(format!(
            "cannot fetch waypoint '{}': built without the 'streetview' feature",
            waypoint.id
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/streetview.rs"]
mod tests;
