#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// histogram equalization and CLAHE of 8-bit images.
pub mod equalize;

/// error type of the enhancement operators.
pub mod error;
pub use error::EnhanceError;

/// RGB and HSV color space conversions.
pub mod hsv;

use imaging_image::{ops, Image, ImageBuffer};
use imaging_plugin::{Capability, ColorEnhancement, PluginRegistrar, ProcessError};

use crate::equalize::{clahe, equalize_hist, ClaheParams};

/// Enhancement methods, selected by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EnhancementMethod {
    /// Global histogram equalization, named `histEq`.
    HistEq,
    /// Adaptive histogram equalization, named `histAdaptive`.
    HistAdaptive,
    /// Contrast limited adaptive histogram equalization, named `clahe`.
    Clahe,
}

impl EnhancementMethod {
    /// Name of the method as passed by the host.
    pub fn name(&self) -> &'static str {
        match self {
            EnhancementMethod::HistEq => "histEq",
            EnhancementMethod::HistAdaptive => "histAdaptive",
            EnhancementMethod::Clahe => "clahe",
        }
    }
}

impl std::str::FromStr for EnhancementMethod {
    type Err = EnhanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "histEq" => Ok(EnhancementMethod::HistEq),
            "histAdaptive" => Ok(EnhancementMethod::HistAdaptive),
            "clahe" => Ok(EnhancementMethod::Clahe),
            other => Err(EnhanceError::UnknownMethod(other.to_string())),
        }
    }
}

/// Enhance an 8-bit intensity channel.
///
/// Both adaptive methods run CLAHE with `params`.
pub fn enhance_channel(
    src: &Image<u8, 1>,
    method: EnhancementMethod,
    params: &ClaheParams,
) -> Result<Image<u8, 1>, EnhanceError> {
    let mut dst = Image::from_size_val(src.size(), 0u8)?;
    match method {
        EnhancementMethod::HistEq => equalize_hist(src, &mut dst)?,
        EnhancementMethod::HistAdaptive | EnhancementMethod::Clahe => {
            clahe(src, &mut dst, params)?
        }
    }
    Ok(dst)
}

/// Enhance the value channel of an RGB image with channels in `[0, 255]`.
///
/// Hue and saturation are kept, the value channel is quantized to 8 bits, enhanced and put
/// back.
pub fn enhance_rgb(
    src: &Image<f32, 3>,
    method: EnhancementMethod,
    params: &ClaheParams,
) -> Result<Image<f32, 3>, EnhanceError> {
    let mut hsv = Image::from_size_val(src.size(), 0.0)?;
    hsv::hsv_from_rgb(src, &mut hsv)?;

    let value = ops::from_f32::<u8, 1>(&hsv.channel(2)?, 1.0)?;
    let value = enhance_channel(&value, method, params)?;

    for (pixel, &v) in hsv.as_slice_mut().chunks_exact_mut(3).zip(value.as_slice()) {
        pixel[2] = v as f32;
    }

    let mut rgb = Image::from_size_val(src.size(), 0.0)?;
    hsv::rgb_from_hsv(&hsv, &mut rgb)?;
    Ok(rgb)
}

/// Enhance an image buffer of any layout.
///
/// Gray buffers are enhanced directly, color buffers through their HSV value channel. Float
/// buffers are expected in `[0, 1]`. The output has the layout of the input.
pub fn enhance_buffer(
    input: &ImageBuffer,
    method: EnhancementMethod,
    params: &ClaheParams,
) -> Result<ImageBuffer, EnhanceError> {
    input.ensure_not_empty()?;

    let out = match input {
        ImageBuffer::GrayU8(img) => ImageBuffer::GrayU8(enhance_channel(img, method, params)?),
        ImageBuffer::GrayF32(img) => {
            let quantized = ops::from_f32::<u8, 1>(img, 255.0)?;
            let enhanced = enhance_channel(&quantized, method, params)?;
            ImageBuffer::GrayF32(ops::to_f32(&enhanced, 1.0 / 255.0)?)
        }
        ImageBuffer::RgbU8(img) => {
            let rgb = enhance_rgb(&ops::to_f32(img, 1.0)?, method, params)?;
            ImageBuffer::RgbU8(ops::from_f32(&rgb, 1.0)?)
        }
        ImageBuffer::RgbF32(img) => {
            let rgb = enhance_rgb(&ops::to_f32(img, 255.0)?, method, params)?;
            ImageBuffer::RgbF32(ops::to_f32(&rgb, 1.0 / 255.0)?)
        }
    };
    Ok(out)
}

/// Color enhancement capability.
#[derive(Debug, Clone, Default)]
pub struct ColorEnhancer {
    params: ClaheParams,
}

impl ColorEnhancer {
    /// An enhancer with custom CLAHE parameters.
    pub fn new(params: ClaheParams) -> Self {
        Self { params }
    }
}

impl ColorEnhancement for ColorEnhancer {
    fn context_menu_label(&self) -> String {
        "Color Enhancement".to_string()
    }

    fn process(&self, input: &ImageBuffer, method: &str) -> Result<ImageBuffer, ProcessError> {
        let method = method.parse::<EnhancementMethod>()?;
        Ok(enhance_buffer(input, method, &self.params)?)
    }
}

fn register(registrar: &mut dyn PluginRegistrar) {
    registrar.register(Capability::ColorEnhancement(Box::new(ColorEnhancer::default())));
}

imaging_plugin::export_plugin!("color-enhancement", env!("CARGO_PKG_VERSION"), register);
