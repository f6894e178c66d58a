use std::sync::Arc;
use std::time::SystemTime;

use image::RgbaImage;
use uuid::Uuid;

use crate::error::{Error, Result};

/// An edited photo: the immutable original plus at most one processed version.
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: Uuid,
    original: Arc<RgbaImage>,
    processed: Option<Arc<RgbaImage>>,
    pub created_at: SystemTime,
    pub last_modified: SystemTime,
}

impl Photo {
    pub fn new(image: RgbaImage) -> Result<Self> {
        Self::from_shared(Arc::new(image))
    }

    pub fn from_shared(image: Arc<RgbaImage>) -> Result<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!("{width}x{height} photo")));
        }

        let now = SystemTime::now();
        Ok(Self {
            id: Uuid::new_v4(),
            original: image,
            processed: None,
            created_at: now,
            last_modified: now,
        })
    }

    pub fn original_image(&self) -> &Arc<RgbaImage> {
        &self.original
    }

    pub fn processed_image(&self) -> Option<&Arc<RgbaImage>> {
        self.processed.as_ref()
    }

    /// The processed image if there is one, else the original.
    pub fn current_image(&self) -> &Arc<RgbaImage> {
        self.processed.as_ref().unwrap_or(&self.original)
    }

    /// Replace the processed image wholesale.
    pub fn update_processed_image(&mut self, image: RgbaImage) {
        self.processed = Some(Arc::new(image));
        self.last_modified = SystemTime::now();
    }

    /// Drop the processed image, returning to the original.
    pub fn revert(&mut self) {
        self.processed = None;
        self.last_modified = SystemTime::now();
    }
}
