//! Serial batch processing queue
//!
//! Drives the pipeline processor across an ordered batch, one image at a
//! time, reporting per-image and aggregate state and implementing abort and
//! skip semantics. Images are never processed concurrently: the upscale
//! engine is a shared, stateful resource.

use crate::{
    error::Result,
    processor::PipelineProcessor,
    services::{PipelineState, ProgressReporter, ProgressUpdate},
    types::{BatchStats, ImageItem, ItemStatus, ProcessResult},
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

/// Delay inserted between images so cooperative schedulers regain control
const INTER_IMAGE_DELAY: Duration = Duration::from_millis(100);

/// Callbacks emitted by the queue
///
/// Terminal callbacks are async so observers can persist or forward results;
/// per-image progress is synchronous because it fires from inside a running
/// stage.
#[async_trait]
pub trait QueueObserver: Send + Sync {
    /// An image is about to be processed
    async fn on_image_start(&self, id: &str, index: usize, total: usize) {
        let _ = (id, index, total);
    }

    /// Progress update for the image currently being processed
    fn on_image_progress(&self, id: &str, update: &ProgressUpdate) {
        let _ = (id, update);
    }

    /// An image finished with at least one output
    async fn on_image_complete(&self, id: &str, result: &ProcessResult) {
        let _ = (id, result);
    }

    /// An image finished with an error
    async fn on_image_error(&self, id: &str, error: &str) {
        let _ = (id, error);
    }

    /// The whole batch ran to the end
    async fn on_batch_complete(&self, stats: BatchStats) {
        let _ = stats;
    }

    /// The batch stopped early (user abort or external stop)
    async fn on_batch_abort(&self, stats: BatchStats) {
        let _ = stats;
    }
}

/// Observer that ignores every callback
pub struct NoOpQueueObserver;

#[async_trait]
impl QueueObserver for NoOpQueueObserver {}

/// Bridges the processor's progress reporter onto the queue observer,
/// tagging updates with the id of the image currently in flight
struct QueueProgressBridge {
    observer: Arc<dyn QueueObserver>,
    current_id: Mutex<String>,
    last_progress: AtomicU8,
}

impl QueueProgressBridge {
    fn begin_image(&self, id: &str) {
        let mut current = self
            .current_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        id.clone_into(&mut current);
        self.last_progress.store(0, Ordering::SeqCst);
    }
}

impl ProgressReporter for QueueProgressBridge {
    fn report_progress(&self, update: ProgressUpdate) {
        self.last_progress.store(update.progress, Ordering::SeqCst);
        let id = self
            .current_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        self.observer.on_image_progress(&id, &update);
    }

    fn report_error(&self, state: PipelineState, error: &str) {
        log::debug!("stage error during {}: {error}", state.description());
    }
}

/// Handle for stopping a running queue from outside
#[derive(Clone)]
pub struct QueueStopHandle {
    flag: Arc<AtomicBool>,
}

impl QueueStopHandle {
    /// Request a stop; idempotent, honored at the next image boundary
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Serial driver over an ordered batch of images
pub struct ProcessingQueue {
    items: Vec<ImageItem>,
    processor: PipelineProcessor,
    observer: Arc<dyn QueueObserver>,
    bridge: Arc<QueueProgressBridge>,
    stop_flag: Arc<AtomicBool>,
    running: bool,
    stats: BatchStats,
    inter_image_delay: Duration,
}

impl ProcessingQueue {
    /// Create a queue around a processor and an observer
    #[must_use]
    pub fn new(processor: PipelineProcessor, observer: Arc<dyn QueueObserver>) -> Self {
        let bridge = Arc::new(QueueProgressBridge {
            observer: observer.clone(),
            current_id: Mutex::new(String::new()),
            last_progress: AtomicU8::new(0),
        });
        let processor = processor.with_reporter(bridge.clone());
        Self {
            items: Vec::new(),
            processor,
            observer,
            bridge,
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: false,
            stats: BatchStats::default(),
            inter_image_delay: INTER_IMAGE_DELAY,
        }
    }

    /// Override the inter-image delay (tests use a zero delay)
    #[must_use]
    pub fn with_inter_image_delay(mut self, delay: Duration) -> Self {
        self.inter_image_delay = delay;
        self
    }

    /// Replace the batch and reset the cursor and counters
    pub fn add_images(&mut self, items: Vec<ImageItem>) {
        self.stats = BatchStats {
            total: items.len(),
            ..BatchStats::default()
        };
        self.items = items;
        self.stop_flag.store(false, Ordering::SeqCst);
        log::info!("batch replaced: {} images queued", self.stats.total);
    }

    /// Handle for stopping the queue from another task
    #[must_use]
    pub fn stop_handle(&self) -> QueueStopHandle {
        QueueStopHandle {
            flag: self.stop_flag.clone(),
        }
    }

    /// Items of the current batch
    #[must_use]
    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    /// Continuously tracked batch counters
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Access to the processor (arena inspection, engine teardown)
    pub fn processor_mut(&mut self) -> &mut PipelineProcessor {
        &mut self.processor
    }

    /// Process the batch in order, one image at a time
    ///
    /// A no-op (with a warning) when already running. The stop flag is
    /// polled before each image, never mid-image. A `UserAborted` error
    /// stops the batch immediately through the abort callback; every other
    /// per-image error is recorded and the batch continues.
    ///
    /// # Errors
    ///
    /// Infrastructure failures only; per-image errors never propagate.
    pub async fn start(&mut self) -> Result<BatchStats> {
        if self.running {
            log::warn!("queue already running; ignoring start request");
            return Ok(self.stats);
        }
        self.running = true;
        let total = self.items.len();

        for index in 0..total {
            if self.stop_flag.load(Ordering::SeqCst) {
                log::info!("stop requested; aborting batch before image {index}");
                self.running = false;
                self.observer.on_batch_abort(self.stats).await;
                return Ok(self.stats);
            }

            let id = self.items[index].id.clone();
            self.bridge.begin_image(&id);
            self.items[index].status = ItemStatus::Processing;
            self.observer.on_image_start(&id, index, total).await;

            // Field-level borrow split: the processor never touches the batch
            let (items, processor) = (&mut self.items, &mut self.processor);
            let item = &mut items[index];
            let outcome = processor.process(&item.file, &item.options);

            match outcome {
                Ok(result) => {
                    item.status = ItemStatus::Completed;
                    item.progress = 100;
                    self.stats.completed += 1;
                    self.observer.on_image_complete(&id, &result).await;
                    item.result = Some(result);
                },
                Err(e) if e.is_user_abort() => {
                    let reason = e.to_string();
                    item.status = ItemStatus::Failed;
                    item.error = Some(reason.clone());
                    self.stats.failed += 1;
                    self.observer.on_image_error(&id, &reason).await;

                    log::warn!("user abort during image {id}; stopping batch");
                    self.running = false;
                    self.observer.on_batch_abort(self.stats).await;
                    return Ok(self.stats);
                },
                Err(e) => {
                    let reason = e.to_string();
                    if e.is_skip() {
                        item.status = ItemStatus::Skipped;
                        self.stats.skipped += 1;
                    } else {
                        item.status = ItemStatus::Failed;
                        self.stats.failed += 1;
                    }
                    item.progress = self.bridge.last_progress.load(Ordering::SeqCst);
                    item.error = Some(reason.clone());
                    log::warn!("image {id} failed, batch continues: {reason}");
                    self.observer.on_image_error(&id, &reason).await;
                },
            }

            // Yield between images so stop requests and UI updates land
            if index + 1 < total {
                tokio::time::sleep(self.inter_image_delay).await;
            }
        }

        self.running = false;
        self.observer.on_batch_complete(self.stats).await;
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::test_utils::MockBackendFactory;
    use crate::config::{OutputTarget, ProcessOptions, UpscaleFactor};
    use crate::error::PixeliftError;
    use crate::inference::{BackendFactory, BackendKind, UpscaleBackend};
    use crate::processor::PipelineProcessor;
    use crate::services::BlobArena;
    use crate::upscaler::{DegradationPrompt, UpscaleEngine};
    use crate::vectorize::Vectorizer;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl QueueObserver for RecordingObserver {
        async fn on_image_start(&self, id: &str, _index: usize, _total: usize) {
            self.push(format!("start:{id}"));
        }

        async fn on_image_complete(&self, id: &str, _result: &ProcessResult) {
            self.push(format!("complete:{id}"));
        }

        async fn on_image_error(&self, id: &str, _error: &str) {
            self.push(format!("error:{id}"));
        }

        async fn on_batch_complete(&self, _stats: BatchStats) {
            self.push("batch_complete".into());
        }

        async fn on_batch_abort(&self, _stats: BatchStats) {
            self.push("batch_abort".into());
        }
    }

    struct DecliningPrompt;

    impl DegradationPrompt for DecliningPrompt {
        fn confirm_software_fallback(&self, _reason: &str) -> bool {
            false
        }
    }

    /// Backend that refuses every image as a skip, never as a failure
    struct SkippingBackend {
        loaded_scale: Option<UpscaleFactor>,
    }

    impl UpscaleBackend for SkippingBackend {
        fn initialize(&mut self, scale: UpscaleFactor) -> Result<Option<Duration>> {
            self.loaded_scale = Some(scale);
            Ok(None)
        }

        fn upscale(
            &mut self,
            _input: &RgbaImage,
            _on_progress: &mut dyn FnMut(f32),
        ) -> Result<RgbaImage> {
            Err(PixeliftError::Skipped(
                "source already matches the requested dimensions".into(),
            ))
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Software
        }

        fn loaded_scale(&self) -> Option<UpscaleFactor> {
            self.loaded_scale
        }

        fn is_initialized(&self) -> bool {
            self.loaded_scale.is_some()
        }
    }

    struct SkippingFactory;

    impl BackendFactory for SkippingFactory {
        fn create_backend(&self, _kind: BackendKind) -> Result<Box<dyn UpscaleBackend>> {
            Ok(Box::new(SkippingBackend { loaded_scale: None }))
        }

        fn available_backends(&self) -> Vec<BackendKind> {
            vec![BackendKind::Software]
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 4, Rgba([10, 200, 30, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn raster_options() -> ProcessOptions {
        ProcessOptions::builder()
            .basic_enhancement(true)
            .output_format(OutputTarget::Png)
            .build()
            .unwrap()
    }

    fn test_queue(observer: Arc<RecordingObserver>) -> ProcessingQueue {
        let processor = PipelineProcessor::with_parts(
            UpscaleEngine::with_factory(Box::new(MockBackendFactory::new())),
            Vectorizer::new(),
            Arc::new(BlobArena::new()),
        );
        ProcessingQueue::new(processor, observer)
            .with_inter_image_delay(Duration::from_millis(0))
    }

    #[tokio::test]
    async fn test_batch_continues_past_failed_image() {
        let observer = Arc::new(RecordingObserver::default());
        let mut queue = test_queue(observer.clone());

        queue.add_images(vec![
            ImageItem::new("a", png_bytes(), raster_options()),
            // Undecodable bytes: this image fails, the batch continues
            ImageItem::new("b", vec![0xBA, 0xD0], raster_options()),
            ImageItem::new("c", png_bytes(), raster_options()),
        ]);

        let stats = queue.start().await.unwrap();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);

        let items = queue.items();
        assert_eq!(items[0].status, ItemStatus::Completed);
        assert_eq!(items[1].status, ItemStatus::Failed);
        assert!(items[1].error.is_some());
        assert_eq!(items[2].status, ItemStatus::Completed);

        let events = observer.events();
        assert_eq!(
            events,
            vec![
                "start:a",
                "complete:a",
                "start:b",
                "error:b",
                "start:c",
                "complete:c",
                "batch_complete",
            ]
        );
    }

    #[tokio::test]
    async fn test_skipped_image_is_recorded_and_batch_continues() {
        let observer = Arc::new(RecordingObserver::default());
        let processor = PipelineProcessor::with_parts(
            UpscaleEngine::with_factory(Box::new(SkippingFactory)),
            Vectorizer::new(),
            Arc::new(BlobArena::new()),
        );
        let mut queue = ProcessingQueue::new(processor, observer.clone())
            .with_inter_image_delay(Duration::from_millis(0));

        // The skipping backend only runs for the AI stage
        let skipped_options = ProcessOptions::builder()
            .basic_enhancement(false)
            .ai_upscale(true)
            .output_format(OutputTarget::Png)
            .build()
            .unwrap();

        queue.add_images(vec![
            ImageItem::new("a", png_bytes(), skipped_options),
            ImageItem::new("b", png_bytes(), raster_options()),
        ]);

        let stats = queue.start().await.unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 0);

        let items = queue.items();
        assert_eq!(items[0].status, ItemStatus::Skipped);
        assert!(items[0].error.is_some());
        assert_eq!(items[1].status, ItemStatus::Completed);

        // The batch ran to completion, not to an abort
        let events = observer.events();
        assert_eq!(
            events,
            vec!["start:a", "error:a", "start:b", "complete:b", "batch_complete"]
        );
    }

    #[tokio::test]
    async fn test_user_abort_stops_batch() {
        let observer = Arc::new(RecordingObserver::default());
        let processor = PipelineProcessor::with_parts(
            UpscaleEngine::with_factory(Box::new(MockBackendFactory::with_failing_accelerated(
                usize::MAX,
            )))
            .with_prompt(Box::new(DecliningPrompt)),
            Vectorizer::new(),
            Arc::new(BlobArena::new()),
        );
        let mut queue = ProcessingQueue::new(processor, observer.clone())
            .with_inter_image_delay(Duration::from_millis(0));

        let ai_options = ProcessOptions::builder()
            .basic_enhancement(false)
            .ai_upscale(true)
            .output_format(OutputTarget::Png)
            .build()
            .unwrap();

        queue.add_images(vec![
            ImageItem::new("a", png_bytes(), ai_options.clone()),
            ImageItem::new("b", png_bytes(), ai_options),
        ]);

        let stats = queue.start().await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 0);

        // Image b was never started
        assert_eq!(queue.items()[1].status, ItemStatus::Pending);
        let events = observer.events();
        assert_eq!(events, vec!["start:a", "error:a", "batch_abort"]);
    }

    #[tokio::test]
    async fn test_stop_before_start_aborts_immediately() {
        let observer = Arc::new(RecordingObserver::default());
        let mut queue = test_queue(observer.clone());
        queue.add_images(vec![ImageItem::new("a", png_bytes(), raster_options())]);

        let handle = queue.stop_handle();
        handle.stop();
        handle.stop(); // idempotent

        let stats = queue.start().await.unwrap();
        assert_eq!(stats.completed, 0);
        assert_eq!(observer.events(), vec!["batch_abort"]);
        assert_eq!(queue.items()[0].status, ItemStatus::Pending);
    }

    #[tokio::test]
    async fn test_add_images_replaces_batch_and_resets_counters() {
        let observer = Arc::new(RecordingObserver::default());
        let mut queue = test_queue(observer);

        queue.add_images(vec![ImageItem::new("a", png_bytes(), raster_options())]);
        queue.start().await.unwrap();
        assert_eq!(queue.stats().completed, 1);

        queue.add_images(vec![
            ImageItem::new("x", png_bytes(), raster_options()),
            ImageItem::new("y", png_bytes(), raster_options()),
        ]);
        assert_eq!(queue.stats().completed, 0);
        assert_eq!(queue.stats().total, 2);
        assert_eq!(queue.items().len(), 2);

        let stats = queue.start().await.unwrap();
        assert_eq!(stats.completed, 2);
    }
}
