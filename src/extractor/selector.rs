//! Rendition selection

use crate::extractor::models::{Quality, RenditionDescriptor, VideoInfo};
use crate::utils::error::LensError;

/// Usable renditions in canonical high-to-low order
pub fn candidates(info: &VideoInfo) -> Vec<&RenditionDescriptor> {
    Quality::ALL
        .iter()
        .filter_map(|quality| info.renditions.get(quality))
        .filter(|rendition| rendition.is_usable())
        .collect()
}

/// Pick the requested quality, or the best one available.
///
/// The returned descriptor always comes from `info`; nothing is synthesized.
pub fn select(info: &VideoInfo, requested: Quality) -> Result<&RenditionDescriptor, LensError> {
    let candidates = candidates(info);

    if let Some(exact) = candidates.iter().find(|r| r.quality == requested) {
        return Ok(*exact);
    }

    Quality::ALL
        .iter()
        .find_map(|quality| candidates.iter().find(|r| r.quality == *quality))
        .or_else(|| candidates.first())
        .copied()
        .ok_or(LensError::NoPlayableRendition)
}
