use crate::{ops, Image, ImageError, ImageSize};

/// Sample type of the pixels held by an [`ImageBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SampleType {
    /// 8-bit unsigned samples.
    U8,
    /// 32-bit floating point samples.
    F32,
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleType::U8 => write!(f, "u8"),
            SampleType::F32 => write!(f, "f32"),
        }
    }
}

/// A dense row-major pixel grid with a runtime channel count and sample type.
///
/// This is the type exchanged with collaborators that do not know the pixel layout at
/// compile time, e.g. dynamically loaded plugins. Channel order is whatever the caller
/// put in; the engine never reorders channels.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageBuffer {
    /// Single channel, 8-bit.
    GrayU8(Image<u8, 1>),
    /// Three channels, 8-bit.
    RgbU8(Image<u8, 3>),
    /// Single channel, float.
    GrayF32(Image<f32, 1>),
    /// Three channels, float.
    RgbF32(Image<f32, 3>),
}

impl ImageBuffer {
    /// Build a buffer from raw 8-bit samples.
    ///
    /// # Errors
    ///
    /// Returns an error if `channels` is not 1 or 3, or if the data length does not match.
    pub fn from_u8(size: ImageSize, channels: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        match channels {
            1 => Ok(Self::GrayU8(Image::new(size, data)?)),
            3 => Ok(Self::RgbU8(Image::new(size, data)?)),
            c => Err(ImageError::UnsupportedChannels(c)),
        }
    }

    /// Build a buffer from raw float samples.
    ///
    /// # Errors
    ///
    /// Returns an error if `channels` is not 1 or 3, or if the data length does not match.
    pub fn from_f32(size: ImageSize, channels: usize, data: Vec<f32>) -> Result<Self, ImageError> {
        match channels {
            1 => Ok(Self::GrayF32(Image::new(size, data)?)),
            3 => Ok(Self::RgbF32(Image::new(size, data)?)),
            c => Err(ImageError::UnsupportedChannels(c)),
        }
    }

    /// Size of the buffer in pixels.
    pub fn size(&self) -> ImageSize {
        match self {
            Self::GrayU8(img) => img.size(),
            Self::RgbU8(img) => img.size(),
            Self::GrayF32(img) => img.size(),
            Self::RgbF32(img) => img.size(),
        }
    }

    /// Number of channels, 1 or 3.
    pub fn channels(&self) -> usize {
        match self {
            Self::GrayU8(_) | Self::GrayF32(_) => 1,
            Self::RgbU8(_) | Self::RgbF32(_) => 3,
        }
    }

    /// Sample type of the buffer.
    pub fn sample_type(&self) -> SampleType {
        match self {
            Self::GrayU8(_) | Self::RgbU8(_) => SampleType::U8,
            Self::GrayF32(_) | Self::RgbF32(_) => SampleType::F32,
        }
    }

    /// Returns true if the buffer holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.size().area() == 0
    }

    /// Reject empty buffers before they reach an engine.
    pub fn ensure_not_empty(&self) -> Result<(), ImageError> {
        if self.is_empty() {
            let size = self.size();
            return Err(ImageError::EmptyImage(size.width, size.height));
        }
        Ok(())
    }

    /// Promote to float samples without rescaling (`u8` 200 becomes `200.0`).
    pub fn into_f32(self) -> Result<Self, ImageError> {
        Ok(match self {
            Self::GrayU8(img) => Self::GrayF32(ops::to_f32(&img, 1.0)?),
            Self::RgbU8(img) => Self::RgbF32(ops::to_f32(&img, 1.0)?),
            other => other,
        })
    }

    /// Demote to 8-bit samples without rescaling, rounding and saturating to `[0, 255]`.
    pub fn into_u8(self) -> Result<Self, ImageError> {
        Ok(match self {
            Self::GrayF32(img) => Self::GrayU8(ops::from_f32(&img, 1.0)?),
            Self::RgbF32(img) => Self::RgbU8(ops::from_f32(&img, 1.0)?),
            other => other,
        })
    }

    /// Convert to the requested sample type without rescaling.
    pub fn into_sample_type(self, sample_type: SampleType) -> Result<Self, ImageError> {
        match sample_type {
            SampleType::U8 => self.into_u8(),
            SampleType::F32 => self.into_f32(),
        }
    }
}

impl From<Image<u8, 1>> for ImageBuffer {
    fn from(img: Image<u8, 1>) -> Self {
        Self::GrayU8(img)
    }
}

impl From<Image<u8, 3>> for ImageBuffer {
    fn from(img: Image<u8, 3>) -> Self {
        Self::RgbU8(img)
    }
}

impl From<Image<f32, 1>> for ImageBuffer {
    fn from(img: Image<f32, 1>) -> Self {
        Self::GrayF32(img)
    }
}

impl From<Image<f32, 3>> for ImageBuffer {
    fn from(img: Image<f32, 3>) -> Self {
        Self::RgbF32(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_from_raw() -> Result<(), ImageError> {
        let buf = ImageBuffer::from_u8([2, 1].into(), 3, vec![1, 2, 3, 4, 5, 6])?;
        assert_eq!(buf.channels(), 3);
        assert_eq!(buf.sample_type(), SampleType::U8);
        assert_eq!(buf.size(), ImageSize { width: 2, height: 1 });

        assert_eq!(
            ImageBuffer::from_u8([1, 1].into(), 4, vec![0; 4]),
            Err(ImageError::UnsupportedChannels(4))
        );
        Ok(())
    }

    #[test]
    fn buffer_empty_is_rejected() -> Result<(), ImageError> {
        let buf = ImageBuffer::from_f32([0, 0].into(), 1, vec![])?;
        assert!(buf.is_empty());
        assert_eq!(buf.ensure_not_empty(), Err(ImageError::EmptyImage(0, 0)));
        Ok(())
    }

    #[test]
    fn buffer_promote_demote() -> Result<(), ImageError> {
        let buf = ImageBuffer::from_u8([3, 1].into(), 1, vec![0, 200, 255])?;
        let promoted = buf.clone().into_f32()?;
        match &promoted {
            ImageBuffer::GrayF32(img) => assert_eq!(img.as_slice(), &[0.0, 200.0, 255.0]),
            other => panic!("unexpected buffer {other:?}"),
        }
        assert_eq!(promoted.into_u8()?, buf);
        Ok(())
    }
}
