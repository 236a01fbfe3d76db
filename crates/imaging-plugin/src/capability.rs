//! Capability interfaces
//!
//! A module implements exactly one of these traits and hands a boxed instance to the host
//! through its [`crate::PluginDeclaration`]. Implementations must be `Send + Sync` so that an
//! active registry can be shared between threads.

use imaging_image::ImageBuffer;

use crate::descriptor::Parameters;
use crate::error::ProcessError;

/// Denoising filters for still images and frame pairs.
pub trait Filtering: Send + Sync {
    /// Label of the host context menu entry.
    fn context_menu_label(&self) -> String;

    /// Filter one image, gray or color.
    fn process(&self, input: &ImageBuffer) -> Result<ImageBuffer, ProcessError>;

    /// Filter a pair of co-located frames, e.g. two consecutive video frames.
    fn process_pair(
        &self,
        first: &ImageBuffer,
        second: &ImageBuffer,
    ) -> Result<ImageBuffer, ProcessError>;
}

/// Noise generators.
pub trait Noise: Send + Sync {
    /// Label of the host context menu entry.
    fn context_menu_label(&self) -> String;

    /// Corrupt `density` of the pixels, with `density` in `[0, 1]`.
    fn process(&self, input: &ImageBuffer, density: f32) -> Result<ImageBuffer, ProcessError>;
}

/// Contrast and color enhancement methods selected by name.
pub trait ColorEnhancement: Send + Sync {
    /// Label of the host context menu entry.
    fn context_menu_label(&self) -> String;

    /// Enhance the image with the named method.
    fn process(&self, input: &ImageBuffer, method: &str) -> Result<ImageBuffer, ProcessError>;
}

/// Self-describing instruments with a parameter map.
pub trait Instrument: Send + Sync {
    /// Label of the host context menu entry.
    fn context_menu_label(&self) -> String;

    /// Display name.
    fn name(&self) -> String;

    /// Instrument version.
    fn version(&self) -> String;

    /// Host version the instrument was written for. The host does not interpret it.
    fn compatible_app_version(&self) -> String;

    /// Parameters used when the caller does not provide any.
    fn default_parameters(&self) -> Parameters;

    /// Process the image.
    fn process(
        &self,
        input: &ImageBuffer,
        parameters: &Parameters,
    ) -> Result<ImageBuffer, ProcessError>;
}

/// Kind of capability a module provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CapabilityKind {
    /// [`Filtering`]
    Filtering,
    /// [`Noise`]
    Noise,
    /// [`ColorEnhancement`]
    ColorEnhancement,
    /// [`Instrument`]
    Instrument,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CapabilityKind::Filtering => "filtering",
            CapabilityKind::Noise => "noise",
            CapabilityKind::ColorEnhancement => "color enhancement",
            CapabilityKind::Instrument => "instrument",
        };
        write!(f, "{name}")
    }
}

/// The boxed implementation registered by a module.
pub enum Capability {
    /// A [`Filtering`] implementation.
    Filtering(Box<dyn Filtering>),
    /// A [`Noise`] implementation.
    Noise(Box<dyn Noise>),
    /// A [`ColorEnhancement`] implementation.
    ColorEnhancement(Box<dyn ColorEnhancement>),
    /// An [`Instrument`] implementation.
    Instrument(Box<dyn Instrument>),
}

impl Capability {
    /// The kind of this capability.
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Filtering(_) => CapabilityKind::Filtering,
            Capability::Noise(_) => CapabilityKind::Noise,
            Capability::ColorEnhancement(_) => CapabilityKind::ColorEnhancement,
            Capability::Instrument(_) => CapabilityKind::Instrument,
        }
    }

    /// Label of the host context menu entry.
    pub fn context_menu_label(&self) -> String {
        match self {
            Capability::Filtering(c) => c.context_menu_label(),
            Capability::Noise(c) => c.context_menu_label(),
            Capability::ColorEnhancement(c) => c.context_menu_label(),
            Capability::Instrument(c) => c.context_menu_label(),
        }
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Capability").field(&self.kind()).finish()
    }
}
