//! Detector interfaces and the orchestrator that decides which to run.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use image::RgbaImage;

use crate::error::Result;
use crate::filter::{FilterCategory, FilterConfiguration};
use crate::landmarks::FaceTrackingResult;
use crate::mask::HairSegmentationResult;
use crate::segmentation::SegmentationWorker;

/// Face landmark detector. Implementations report faces in the detector's
/// lower-left normalized convention.
pub trait FaceLandmarkDetector: Send + Sync {
    fn detect_faces(
        &self,
        image: Arc<RgbaImage>,
    ) -> impl Future<Output = Result<FaceTrackingResult>> + Send;
}

pub trait HairSegmenter: Send + Sync {
    fn segment_hair(
        &self,
        image: Arc<RgbaImage>,
    ) -> impl Future<Output = Result<HairSegmentationResult>> + Send;
}

impl HairSegmenter for SegmentationWorker {
    fn segment_hair(
        &self,
        image: Arc<RgbaImage>,
    ) -> impl Future<Output = Result<HairSegmentationResult>> + Send {
        self.segment(image)
    }
}

/// Detection results attached to a filter application.
#[derive(Debug, Clone)]
pub enum DetectionData {
    FaceLandmarks(Arc<FaceTrackingResult>),
    HairSegmentation(Arc<HairSegmentationResult>),
    Combined {
        faces: Arc<FaceTrackingResult>,
        hair: Arc<HairSegmentationResult>,
    },
}

impl DetectionData {
    /// Filter categories this data can drive.
    pub fn categories(&self) -> Vec<FilterCategory> {
        match self {
            DetectionData::FaceLandmarks(_) => vec![FilterCategory::Sizes],
            DetectionData::HairSegmentation(_) => vec![FilterCategory::Hair],
            DetectionData::Combined { .. } => vec![FilterCategory::Sizes, FilterCategory::Hair],
        }
    }

    pub fn face_tracking_result(&self) -> Option<&FaceTrackingResult> {
        match self {
            DetectionData::FaceLandmarks(faces) | DetectionData::Combined { faces, .. } => {
                Some(faces.as_ref())
            }
            DetectionData::HairSegmentation(_) => None,
        }
    }

    pub fn hair_segmentation_result(&self) -> Option<&HairSegmentationResult> {
        match self {
            DetectionData::HairSegmentation(hair) | DetectionData::Combined { hair, .. } => {
                Some(hair.as_ref())
            }
            DetectionData::FaceLandmarks(_) => None,
        }
    }

    /// Merge two partial results. Later components replace earlier ones.
    pub fn merge(self, other: DetectionData) -> DetectionData {
        let faces = other.face_arc().or_else(|| self.face_arc());
        let hair = other.hair_arc().or_else(|| self.hair_arc());

        match (faces, hair) {
            (Some(faces), Some(hair)) => DetectionData::Combined { faces, hair },
            (Some(faces), None) => DetectionData::FaceLandmarks(faces),
            // Neither side has faces, so both are hair-only.
            _ => other,
        }
    }

    fn face_arc(&self) -> Option<Arc<FaceTrackingResult>> {
        match self {
            DetectionData::FaceLandmarks(faces) | DetectionData::Combined { faces, .. } => {
                Some(faces.clone())
            }
            DetectionData::HairSegmentation(_) => None,
        }
    }

    fn hair_arc(&self) -> Option<Arc<HairSegmentationResult>> {
        match self {
            DetectionData::HairSegmentation(hair) | DetectionData::Combined { hair, .. } => {
                Some(hair.clone())
            }
            DetectionData::FaceLandmarks(_) => None,
        }
    }
}

/// Runs the detectors a set of filter categories needs.
pub struct DetectionOrchestrator<F, H> {
    faces: F,
    hair: H,
}

impl<F, H> DetectionOrchestrator<F, H>
where
    F: FaceLandmarkDetector,
    H: HairSegmenter,
{
    pub fn new(faces: F, hair: H) -> Self {
        Self { faces, hair }
    }

    pub async fn detect(&self, image: Arc<RgbaImage>, category: FilterCategory) -> Result<DetectionData> {
        match category {
            FilterCategory::Sizes => {
                log::debug!("[detection] running face landmark detection");
                let faces = self.faces.detect_faces(image).await?;
                Ok(DetectionData::FaceLandmarks(Arc::new(faces)))
            }
            FilterCategory::Hair => {
                log::debug!("[detection] running hair segmentation");
                let hair = self.hair.segment_hair(image).await?;
                Ok(DetectionData::HairSegmentation(Arc::new(hair)))
            }
        }
    }

    /// Run both detectors concurrently.
    pub async fn detect_all(&self, image: Arc<RgbaImage>) -> Result<DetectionData> {
        log::debug!("[detection] running face and hair detection");
        let (faces, hair) = futures::try_join!(
            self.faces.detect_faces(image.clone()),
            self.hair.segment_hair(image)
        )?;
        Ok(DetectionData::Combined {
            faces: Arc::new(faces),
            hair: Arc::new(hair),
        })
    }

    /// Run whatever the given filters need: one detector, or both concurrently.
    /// Returns `None` for an empty filter list.
    pub async fn detect_for(
        &self,
        image: Arc<RgbaImage>,
        filters: &[FilterConfiguration],
    ) -> Result<Option<DetectionData>> {
        let categories: BTreeSet<FilterCategory> = filters.iter().map(|f| f.category()).collect();
        let mut categories = categories.into_iter();

        let data = match (categories.next(), categories.next()) {
            (None, _) => return Ok(None),
            (Some(category), None) => self.detect(image, category).await?,
            (Some(_), Some(_)) => self.detect_all(image).await?,
        };
        Ok(Some(data))
    }

    pub fn face_detector(&self) -> &F {
        &self.faces
    }

    pub fn hair_segmenter(&self) -> &H {
        &self.hair
    }
}
