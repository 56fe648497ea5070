use std::path::{Path, PathBuf};

use crate::assets::decode::{RasterImage, decode_image};
use crate::foundation::core::Canvas;
use crate::timeline::waypoint::Waypoint;

/// Horizontal field of view at zoom 1, in degrees.
pub const BASE_FOV_DEG: f64 = 90.0;

/// Parameters of one panorama crop request.
///
/// Heading and pitch select the crop; zoom narrows the field of view. The raster size matches the
/// synthesizer canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRequest {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
    /// Camera heading in degrees.
    pub heading: f64,
    /// Camera pitch in degrees.
    pub pitch: f64,
    /// Zoom factor the field of view was derived from.
    pub zoom: f64,
    /// Field of view in degrees, `BASE_FOV_DEG / zoom`.
    pub fov: f64,
    /// Requested raster width.
    pub width: u32,
    /// Requested raster height.
    pub height: u32,
}

impl ImageRequest {
    /// Build the request for `waypoint` at `canvas` size.
    pub fn for_waypoint(waypoint: &Waypoint, canvas: Canvas) -> Self {
        Self {
            lat: waypoint.location.lat,
            lng: waypoint.location.lng,
            heading: waypoint.heading,
            pitch: waypoint.pitch,
            zoom: waypoint.zoom,
            fov: BASE_FOV_DEG / waypoint.zoom,
            width: canvas.width,
            height: canvas.height,
        }
    }
}

/// The resolver could not produce a raster.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ImageUnavailable {
    /// Human-readable cause.
    pub reason: String,
}

impl ImageUnavailable {
    /// Build from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Produces a still image for a waypoint.
///
/// Called once per waypoint per pass, synchronously. Implementations must not retry: a failure
/// is final for the current render or playback session.
pub trait ImageResolver: Send + Sync {
    /// Fetch and decode the raster for `waypoint`.
    fn fetch(
        &self,
        request: &ImageRequest,
        waypoint: &Waypoint,
    ) -> Result<RasterImage, ImageUnavailable>;
}

impl<F> ImageResolver for F
where
    F: Fn(&ImageRequest, &Waypoint) -> Result<RasterImage, ImageUnavailable> + Send + Sync,
{
    fn fetch(
        &self,
        request: &ImageRequest,
        waypoint: &Waypoint,
    ) -> Result<RasterImage, ImageUnavailable> {
        self(request, waypoint)
    }
}

/// Resolves `<root>/<waypoint id>.<ext>` from a local directory.
///
/// Useful for offline renders of pre-fetched crops. Extensions are tried in order.
#[derive(Clone, Debug)]
pub struct DirImageResolver {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirImageResolver {
    /// Look up images under `root` with the default extensions (`png`, `jpg`, `jpeg`, `webp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: ["png", "jpg", "jpeg", "webp"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn candidates(&self, id: &str) -> Result<Vec<PathBuf>, ImageUnavailable> {
        if id.is_empty()
            || id == "."
            || id == ".."
            || id.contains(['/', '\\'])
            || Path::new(id).is_absolute()
        {
            return Err(ImageUnavailable::new(format!(
                "waypoint id '{id}' cannot be used as a file name"
            )));
        }
        Ok(self
            .extensions
            .iter()
            .map(|ext| self.root.join(format!("{id}.{ext}")))
            .collect())
    }
}

impl ImageResolver for DirImageResolver {
    fn fetch(
        &self,
        _request: &ImageRequest,
        waypoint: &Waypoint,
    ) -> Result<RasterImage, ImageUnavailable> {
        for path in self.candidates(waypoint.id.as_str())? {
            if !path.is_file() {
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|e| {
                ImageUnavailable::new(format!("failed to read '{}': {e}", path.display()))
            })?;
            return decode_image(&bytes).map_err(|e| {
                ImageUnavailable::new(format!("failed to decode '{}': {e}", path.display()))
            });
        }
        Err(ImageUnavailable::new(format!(
            "no image for waypoint '{}' under '{}'",
            waypoint.id,
            self.root.display()
        )))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/resolver.rs"]
mod tests;
