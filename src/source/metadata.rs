//! Storage for decode metadata.
//!
//! These fields are filled in by the codec layer after it opens the resolved
//! file. The image source only carries them between the codec and the tile
//! cache; nothing here is computed by this crate.

use std::collections::HashMap;

/// Pixel sample representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleType {
    /// Integer samples
    #[default]
    Fixed,

    /// IEEE floating point samples
    Float,
}

/// Colour space of the decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColourSpace {
    #[default]
    None,
    Greyscale,
    Srgb,
    Cielab,
    Binary,
}

/// Codec-supplied description of an image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeMetadata {
    /// Width of each resolution level, largest first
    pub image_widths: Vec<u32>,

    /// Height of each resolution level, largest first
    pub image_heights: Vec<u32>,

    pub tile_width: u32,
    pub tile_height: u32,

    /// Number of resolution levels
    pub num_resolutions: u32,

    /// Bits per channel
    pub bpc: u32,

    /// Channels per pixel
    pub channels: u32,

    pub sample_type: SampleType,

    /// JPEG2000 quality layers; zero for other codecs
    pub quality_layers: u32,

    pub colour_space: ColourSpace,

    /// Per-channel minimum sample value
    pub min: Vec<f32>,

    /// Per-channel maximum sample value
    pub max: Vec<f32>,

    /// Free-form metadata (copyright, title, scanner properties...)
    pub properties: HashMap<String, String>,
}

impl DecodeMetadata {
    /// True once a codec has recorded at least one resolution level.
    pub fn is_set(&self) -> bool {
        !self.image_widths.is_empty()
    }

    /// Dimensions of one resolution level.
    pub fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        Some((*self.image_widths.get(level)?, *self.image_heights.get(level)?))
    }
}
