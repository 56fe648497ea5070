//! Raster images and the image resolver boundary.

/// Image decoding into premultiplied RGBA8.
pub mod decode;
/// The [`resolver::ImageResolver`] contract and built-in resolvers.
pub mod resolver;
/// Street View Static API resolver.
pub mod streetview;
