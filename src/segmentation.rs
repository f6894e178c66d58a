//! Segmentation model interface and the worker that owns it.
//!
//! Inference state is not shareable, so a [`SegmentationWorker`] moves the
//! model onto a dedicated thread and serves requests over a bounded channel.
//! Callers hold cheap cloneable handles.

use std::sync::Arc;
use std::thread;

use image::{DynamicImage, RgbImage, RgbaImage};
use ndarray::ArrayD;
use tokio::sync::{mpsc, oneshot};

use crate::backend::{CpuBackend, ImageBackend};
use crate::error::{Error, Result};
use crate::mask::{extract_hair_mask, HairSegmentationResult};

/// Input size of the reference face-parsing model.
pub const DEFAULT_MODEL_INPUT_SIZE: (u32, u32) = (512, 512);

/// A per-pixel classifier.
pub trait SegmentationModel: Send + 'static {
    /// (width, height) the model expects its input scaled to.
    fn input_size(&self) -> (u32, u32) {
        DEFAULT_MODEL_INPUT_SIZE
    }

    /// Classify every cell of `input`. The output must reduce to a
    /// (height, width) grid of class labels after dropping leading
    /// singleton axes.
    fn predict(&mut self, input: &RgbImage) -> Result<ArrayD<i32>>;
}

/// Scale an image to the model input size, X and Y independently, and drop alpha.
pub fn prepare_model_input(
    image: &RgbaImage,
    input_size: (u32, u32),
    backend: &dyn ImageBackend,
) -> Result<RgbImage> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage(format!("{width}x{height} image")));
    }

    let (target_w, target_h) = input_size;
    if target_w == 0 || target_h == 0 {
        return Err(Error::BufferAllocationFailed(format!(
            "cannot allocate a {target_w}x{target_h} model input"
        )));
    }

    let scaled = backend.scale(image, target_w, target_h);
    Ok(DynamicImage::ImageRgba8(scaled).into_rgb8())
}

/// Run one full segmentation: prepare, predict, extract.
pub fn segment_with<M: SegmentationModel + ?Sized>(
    model: &mut M,
    image: &RgbaImage,
    backend: &dyn ImageBackend,
) -> Result<HairSegmentationResult> {
    let input = prepare_model_input(image, model.input_size(), backend)?;
    let labels = model.predict(&input)?;
    extract_hair_mask(labels, image.dimensions(), backend)
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub queue_size: usize,
    pub thread_name: String,
    /// Backend the worker scales inputs and masks on.
    pub backend: Arc<dyn ImageBackend>,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("queue_size", &self.queue_size)
            .field("thread_name", &self.thread_name)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_size: 8,
            thread_name: "hair-segmentation".to_string(),
            backend: Arc::new(CpuBackend::new()),
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_size(mut self, queue_size: usize) -> Self {
        self.queue_size = queue_size;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ImageBackend>) -> Self {
        self.backend = backend;
        self
    }
}

struct SegmentationRequest {
    image: Arc<RgbaImage>,
    reply: oneshot::Sender<Result<HairSegmentationResult>>,
}

/// Handle to a model running on its own thread.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone)]
pub struct SegmentationWorker {
    tx: mpsc::Sender<SegmentationRequest>,
}

impl SegmentationWorker {
    pub fn spawn<M: SegmentationModel>(model: M, config: WorkerConfig) -> Result<Self> {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));

        let name = config.thread_name.clone();
        let backend = config.backend;
        thread::Builder::new()
            .name(config.thread_name)
            .spawn(move || serve(model, backend, rx))
            .map_err(|e| Error::ModelLoadFailed(format!("failed to start worker {name}: {e}")))?;

        log::debug!("[segmentation] worker {name} started");
        Ok(Self { tx })
    }

    /// Segment hair in `image`.
    ///
    /// Dropping the returned future before it resolves discards the result.
    pub async fn segment(&self, image: Arc<RgbaImage>) -> Result<HairSegmentationResult> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SegmentationRequest { image, reply })
            .await
            .map_err(|_| Error::PredictionFailed("segmentation worker stopped".to_string()))?;

        rx.await
            .map_err(|_| Error::PredictionFailed("segmentation worker dropped the request".to_string()))?
    }
}

fn serve<M: SegmentationModel>(
    mut model: M,
    backend: Arc<dyn ImageBackend>,
    mut rx: mpsc::Receiver<SegmentationRequest>,
) {
    while let Some(request) = rx.blocking_recv() {
        if request.reply.is_closed() {
            log::trace!("[segmentation] skipping cancelled request");
            continue;
        }

        let result = segment_with(&mut model, &request.image, backend.as_ref());
        if let Err(err) = &result {
            log::debug!("[segmentation] request failed: {err}");
        }
        let _ = request.reply.send(result);
    }
    log::debug!("[segmentation] worker stopped");
}
