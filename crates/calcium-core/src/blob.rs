//! Array columns are stored as bincode-encoded blobs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single-plane image in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub height: usize,
    pub width: usize,
    pub pixels: Vec<f32>,
}

impl Image {
    pub fn new(height: usize, width: usize, pixels: Vec<f32>) -> Result<Self, Error> {
        let expected = height.checked_mul(width).ok_or_else(|| {
            Error::Invalid(format!("image of {}x{} is too large", height, width))
        })?;
        if pixels.len() != expected {
            return Err(Error::Invalid(format!(
                "image of {}x{} needs {} pixels, got {}",
                height,
                width,
                expected,
                pixels.len()
            )));
        }
        Ok(Self {
            height,
            width,
            pixels,
        })
    }

    pub fn get(&self, y: usize, x: usize) -> Option<f32> {
        if y >= self.height || x >= self.width {
            return None;
        }
        let idx = y.checked_mul(self.width)?.checked_add(x)?;
        self.pixels.get(idx).copied()
    }
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    Ok(bincode::deserialize(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_rejects_wrong_pixel_count() {
        assert!(Image::new(2, 3, vec![0.0; 5]).is_err());
        let img = Image::new(2, 3, (0..6).map(|v| v as f32).collect()).unwrap();
        assert_eq!(img.get(1, 2), Some(5.0));
        assert_eq!(img.get(2, 0), None);
    }

    #[test]
    fn test_image_dimensions_overflow() {
        assert!(matches!(
            Image::new(usize::MAX, 2, Vec::new()),
            Err(Error::Invalid(_))
        ));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result: Result<Vec<f32>, Error> = decode(&[0xFF]);
        assert!(matches!(result, Err(Error::Blob(_))));
    }
}
