//! Single-photo edit session.
//!
//! A session owns one [`Photo`], accumulates detection results across filter
//! categories, and always re-runs filters from the original image. Each
//! request takes a generation number; only the newest request may replace
//! the processed image, so rapid intensity changes never apply out of order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tokio::sync::Mutex;

use crate::detection::{DetectionData, DetectionOrchestrator, FaceLandmarkDetector, HairSegmenter};
use crate::engine::FilterEngine;
use crate::error::Result;
use crate::filter::{FilterCategory, FilterConfiguration};
use crate::photo::Photo;

#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The request produced the current processed image.
    Applied(Arc<RgbaImage>),
    /// A newer request started before this one finished; its result was dropped.
    Superseded,
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }
}

pub struct EditSession<F, H> {
    engine: FilterEngine,
    orchestrator: DetectionOrchestrator<F, H>,
    photo: Mutex<Photo>,
    detections: Mutex<Option<DetectionData>>,
    generation: AtomicU64,
}

impl<F, H> EditSession<F, H>
where
    F: FaceLandmarkDetector,
    H: HairSegmenter,
{
    pub fn new(photo: Photo, engine: FilterEngine, orchestrator: DetectionOrchestrator<F, H>) -> Self {
        Self {
            engine,
            orchestrator,
            photo: Mutex::new(photo),
            detections: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn orchestrator(&self) -> &DetectionOrchestrator<F, H> {
        &self.orchestrator
    }

    /// Snapshot of the photo.
    pub async fn photo(&self) -> Photo {
        self.photo.lock().await.clone()
    }

    /// Seed the cache with detection data obtained elsewhere. Categories the
    /// data covers replace cached ones; others are kept.
    pub async fn set_detection(&self, data: DetectionData) {
        let mut cache = self.detections.lock().await;
        *cache = Some(match cache.take() {
            Some(cached) => cached.merge(data),
            None => data,
        });
    }

    /// Everything detected so far.
    pub async fn detections(&self) -> Option<DetectionData> {
        self.detections.lock().await.clone()
    }

    pub async fn clear_detections(&self) {
        *self.detections.lock().await = None;
    }

    /// Apply a filter to the original image, detecting on demand.
    pub async fn apply(&self, configuration: FilterConfiguration) -> Result<ApplyOutcome> {
        self.apply_with(configuration, None).await
    }

    /// Apply a filter with caller-provided detection data, or cached/fresh
    /// detection when `detection` is `None`.
    pub async fn apply_with(
        &self,
        configuration: FilterConfiguration,
        detection: Option<DetectionData>,
    ) -> Result<ApplyOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let original = self.photo.lock().await.original_image().clone();

        let detection = match detection {
            Some(data) => data,
            None => self.detection_for(original.clone(), configuration.category()).await?,
        };

        if self.is_stale(generation) {
            log::debug!("[session] request {generation} superseded before filtering");
            return Ok(ApplyOutcome::Superseded);
        }

        let processed = self.engine.apply_filter(&original, &configuration, Some(&detection))?;

        let mut photo = self.photo.lock().await;
        if self.is_stale(generation) {
            log::debug!("[session] request {generation} superseded before commit");
            return Ok(ApplyOutcome::Superseded);
        }
        photo.update_processed_image(processed);
        Ok(ApplyOutcome::Applied(photo.current_image().clone()))
    }

    /// Discard the processed image. Counts as a new request.
    pub async fn revert(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.photo.lock().await.revert();
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    async fn detection_for(&self, image: Arc<RgbaImage>, category: FilterCategory) -> Result<DetectionData> {
        if let Some(cached) = self.detections.lock().await.as_ref() {
            if cached.categories().contains(&category) {
                return Ok(cached.clone());
            }
        }

        let data = self.orchestrator.detect(image, category).await?;
        self.set_detection(data.clone()).await;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterType;
    use crate::landmarks::FaceTrackingResult;
    use crate::mask::HairSegmentationResult;
    use crate::types::Size;
    use image::{GrayImage, Luma, Rgba};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::oneshot;

    /// Blocks its first call until released.
    struct GatedFaces {
        gate: std::sync::Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    impl FaceLandmarkDetector for GatedFaces {
        async fn detect_faces(&self, image: Arc<RgbaImage>) -> Result<FaceTrackingResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(FaceTrackingResult::new(Vec::new(), Size::from_dimensions(image.dimensions())))
        }
    }

    struct OpaqueHair {
        calls: AtomicUsize,
    }

    impl HairSegmenter for OpaqueHair {
        async fn segment_hair(&self, image: Arc<RgbaImage>) -> Result<HairSegmentationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (w, h) = image.dimensions();
            Ok(HairSegmentationResult::new(
                GrayImage::from_pixel(w, h, Luma([255])),
                GrayImage::from_pixel(w, h, Luma([255])),
            ))
        }
    }

    fn session(gate: Option<oneshot::Receiver<()>>) -> EditSession<GatedFaces, OpaqueHair> {
        let photo = Photo::new(RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([(x * 12) as u8, (y * 12) as u8, 80, 255])
        }))
        .unwrap();
        let orchestrator = DetectionOrchestrator::new(
            GatedFaces {
                gate: std::sync::Mutex::new(gate),
                calls: AtomicUsize::new(0),
            },
            OpaqueHair {
                calls: AtomicUsize::new(0),
            },
        );
        EditSession::new(photo, FilterEngine::cpu().unwrap(), orchestrator)
    }

    #[tokio::test]
    async fn detection_is_cached_per_category() {
        let s = session(None);
        for intensity in [0.2, 0.4, 0.6] {
            let outcome = s
                .apply(FilterConfiguration::new(FilterType::Warmth, intensity))
                .await
                .unwrap();
            assert!(outcome.is_applied());
        }
        assert_eq!(s.orchestrator().hair_segmenter().calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.orchestrator().face_detector().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn detections_accumulate_across_categories() {
        let s = session(None);
        s.apply(FilterConfiguration::new(FilterType::Warmth, 0.5)).await.unwrap();
        s.apply(FilterConfiguration::new(FilterType::HeadSize, 0.5)).await.unwrap();

        let cached = s.detections().await.unwrap();
        assert_eq!(cached.categories(), vec![FilterCategory::Sizes, FilterCategory::Hair]);

        s.apply(FilterConfiguration::new(FilterType::Hue, 0.5)).await.unwrap();
        s.apply(FilterConfiguration::new(FilterType::HeadSize, -0.5)).await.unwrap();
        assert_eq!(s.orchestrator().hair_segmenter().calls.load(Ordering::SeqCst), 1);
        assert_eq!(s.orchestrator().face_detector().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn filters_rerun_from_original() {
        let s = session(None);
        let config = FilterConfiguration::new(FilterType::Intensity, 0.8);

        let first = match s.apply(config).await.unwrap() {
            ApplyOutcome::Applied(image) => image,
            ApplyOutcome::Superseded => panic!("not superseded"),
        };
        let second = match s.apply(config).await.unwrap() {
            ApplyOutcome::Applied(image) => image,
            ApplyOutcome::Superseded => panic!("not superseded"),
        };
        assert_eq!(*first, *second);

        s.revert().await;
        let photo = s.photo().await;
        assert!(photo.processed_image().is_none());
    }

    #[tokio::test]
    async fn provided_detection_skips_detectors() {
        let s = session(None);
        let data = DetectionData::HairSegmentation(Arc::new(HairSegmentationResult::new(
            GrayImage::new(16, 16),
            GrayImage::new(16, 16),
        )));

        let outcome = s
            .apply_with(FilterConfiguration::new(FilterType::Hue, 1.0), Some(data.clone()))
            .await
            .unwrap();
        assert!(outcome.is_applied());
        assert_eq!(s.orchestrator().hair_segmenter().calls.load(Ordering::SeqCst), 0);

        // Seeded data is served from the cache too.
        s.set_detection(data).await;
        s.apply(FilterConfiguration::new(FilterType::Hue, 0.5)).await.unwrap();
        assert_eq!(s.orchestrator().hair_segmenter().calls.load(Ordering::SeqCst), 0);

        s.clear_detections().await;
        s.apply(FilterConfiguration::new(FilterType::Hue, 0.5)).await.unwrap();
        assert_eq!(s.orchestrator().hair_segmenter().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn newer_request_supersedes_older() {
        let (release, gate) = oneshot::channel();
        let s = Arc::new(session(Some(gate)));

        let slow = tokio::spawn({
            let s = s.clone();
            async move { s.apply(FilterConfiguration::new(FilterType::HeadSize, 0.3)).await }
        });
        while s.orchestrator().face_detector().calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fast = s
            .apply(FilterConfiguration::new(FilterType::HeadSize, 0.9))
            .await
            .unwrap();
        assert!(fast.is_applied());

        release.send(()).unwrap();
        let slow = slow.await.unwrap().unwrap();
        assert!(matches!(slow, ApplyOutcome::Superseded));
        assert!(s.photo().await.processed_image().is_some());
    }
}
