//! Surface Scheduler: serialized access to a single render-encode surface.
//!
//! The scheduler owns its surface and drives it from one worker task fed by
//! a FIFO queue. Each request is served as:
//!
//! 1. `draw` the request's command
//! 2. wait the settling delay (proportional to canvas size, may be zero)
//! 3. `encode` and resolve the encoded byte length
//! 4. wait the optional cooldown before serving the next request
//!
//! At most one request is in flight at any time and requests are served in
//! submission order. Failures are reported to the submitter and never
//! retried here.
//!
//! # Cancellation
//!
//! Dropping a `submit` future abandons its result only. The worker still
//! finishes the in-flight draw/encode and its settling delay before the
//! next queued request touches the surface. There is no abort primitive.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::geometry::Size;
use crate::surface::{EncodeRequest, EncodeResult, RenderSurface, SurfaceError};

/// Why a submission did not produce a result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The surface reported a draw or encode failure.
    #[error("Surface fault: {0}")]
    Fault(#[from] SurfaceError),

    /// The worker task has stopped; no further requests can be served.
    #[error("Surface scheduler is closed")]
    Closed,
}

/// Settling delay applied between a draw and its read-back.
///
/// The delay grows with the canvas pixel count and is clamped to
/// `[min_ms, max_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlePolicy {
    pub min_ms: u64,
    pub max_ms: u64,
    pub per_megapixel_ms: u64,
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self {
            min_ms: 50,
            max_ms: 500,
            per_megapixel_ms: 50,
        }
    }
}

impl SettlePolicy {
    /// No settling delay at all.
    pub fn none() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
            per_megapixel_ms: 0,
        }
    }

    /// Delay for drawing onto a canvas of `canvas` size.
    pub fn delay_for(&self, canvas: Size) -> Duration {
        let megapixels = canvas.area() as f64 / 1_000_000.0;
        let estimate = (megapixels * self.per_megapixel_ms as f64).round() as u64;
        let upper = self.max_ms.max(self.min_ms);
        Duration::from_millis(estimate.clamp(self.min_ms, upper))
    }
}

/// Scheduler tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub settle: SettlePolicy,
    /// Pause after a read-back before the next request is served.
    pub cooldown_ms: u64,
    /// Requests that may wait in the queue before `submit` itself waits.
    pub queue_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            settle: SettlePolicy::default(),
            cooldown_ms: 0,
            queue_depth: 16,
        }
    }
}

impl SchedulerConfig {
    /// All delays disabled, for surfaces that complete deterministically.
    pub fn immediate() -> Self {
        Self {
            settle: SettlePolicy::none(),
            ..Self::default()
        }
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

struct Job {
    ticket: u64,
    request: EncodeRequest,
    reply: oneshot::Sender<Result<EncodeResult, SurfaceError>>,
}

/// Handle to a scheduler worker. Cheap to clone; every clone feeds the same
/// queue, so sharing one scheduler between pipelines stays serialized.
#[derive(Debug, Clone)]
pub struct SurfaceScheduler {
    queue: mpsc::Sender<Job>,
    tickets: Arc<AtomicU64>,
}

impl SurfaceScheduler {
    /// Start a worker task that takes sole ownership of `surface`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn<S>(surface: S, config: SchedulerConfig) -> Self
    where
        S: RenderSurface + 'static,
    {
        let (queue, jobs) = mpsc::channel(config.queue_depth.max(1));
        tokio::spawn(run_worker(surface, jobs, config));
        Self {
            queue,
            tickets: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue a request and wait for its result.
    pub async fn submit(&self, request: EncodeRequest) -> Result<EncodeResult, SubmitError> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);
        let (reply, response) = oneshot::channel();

        debug!(
            ticket,
            width = request.canvas.width,
            height = request.canvas.height,
            quality = request.quality,
            "scheduler.submit"
        );

        self.queue
            .send(Job {
                ticket,
                request,
                reply,
            })
            .await
            .map_err(|_| SubmitError::Closed)?;

        match response.await {
            Ok(result) => result.map_err(SubmitError::Fault),
            Err(_) => Err(SubmitError::Closed),
        }
    }

    /// Number of requests submitted so far.
    pub fn submitted(&self) -> u64 {
        self.tickets.load(Ordering::SeqCst)
    }

    /// Whether the worker task has stopped.
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

async fn run_worker<S: RenderSurface>(
    mut surface: S,
    mut jobs: mpsc::Receiver<Job>,
    config: SchedulerConfig,
) {
    while let Some(job) = jobs.recv().await {
        let outcome = serve(&mut surface, &job.request, &config).await;

        if let Err(e) = &outcome {
            warn!(ticket = job.ticket, error = %e, "scheduler.fault");
        }
        if job.reply.send(outcome).is_err() {
            debug!(ticket = job.ticket, "scheduler.abandoned");
        }

        let cooldown = config.cooldown();
        if !cooldown.is_zero() {
            sleep(cooldown).await;
        }
    }
    debug!("scheduler.stopped");
}

async fn serve<S: RenderSurface>(
    surface: &mut S,
    request: &EncodeRequest,
    config: &SchedulerConfig,
) -> Result<EncodeResult, SurfaceError> {
    surface.draw(&request.draw_command()).await?;

    let settle = config.settle.delay_for(request.canvas);
    if !settle.is_zero() {
        sleep(settle).await;
    }

    let buffer = surface.encode(request.quality, request.kind).await?;
    let byte_len = match buffer.resolve_len() {
        Ok(len) => Some(len),
        Err(e) => {
            warn!(error = %e, "scheduler.measure_failed");
            None
        }
    };

    Ok(EncodeResult {
        buffer,
        byte_len,
        size: request.canvas,
        quality: request.quality,
        kind: request.kind,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{ScriptedSurface, Step};
    use super::*;
    use crate::encode::OutputKind;
    use crate::source::RasterHandle;

    fn request(width: u32, height: u32, quality: f32) -> EncodeRequest {
        EncodeRequest::scaled(
            &RasterHandle::from_path("in.jpg"),
            Size::new(width, height),
            Size::new(width, height),
            quality,
            OutputKind::Photographic,
        )
    }

    #[test]
    fn test_settle_delay_proportional_and_clamped() {
        let policy = SettlePolicy::default();
        assert_eq!(policy.delay_for(Size::new(100, 100)), Duration::from_millis(50));
        assert_eq!(policy.delay_for(Size::new(4000, 3000)), Duration::from_millis(500));
        assert_eq!(policy.delay_for(Size::new(4000, 2500)), Duration::from_millis(500));
        assert_eq!(policy.delay_for(Size::new(2000, 2000)), Duration::from_millis(200));
        assert_eq!(SettlePolicy::none().delay_for(Size::new(9000, 9000)), Duration::ZERO);
    }

    #[test]
    fn test_settle_policy_inverted_bounds() {
        let policy = SettlePolicy {
            min_ms: 100,
            max_ms: 10,
            per_megapixel_ms: 1,
        };
        assert_eq!(policy.delay_for(Size::new(10, 10)), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_measured_result() {
        let surface = ScriptedSurface::constant(1234);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let result = scheduler.submit(request(300, 200, 0.7)).await.unwrap();
        assert_eq!(result.byte_len, Some(1234));
        assert_eq!(result.size, Size::new(300, 200));
        assert!((result.quality - 0.7).abs() < f32::EPSILON);
        assert_eq!(scheduler.submitted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_precedes_readback() {
        let surface = ScriptedSurface::constant(10);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        scheduler.submit(request(100, 100, 0.8)).await.unwrap();

        let call = &surface.calls()[0];
        let waited = call.encoded_at.unwrap() - call.drawn_at;
        assert!(waited >= Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_served_fifo_without_overlap() {
        let surface = ScriptedSurface::constant(10);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let (a, b, c) = tokio::join!(
            scheduler.submit(request(10, 10, 0.9)),
            scheduler.submit(request(10, 10, 0.5)),
            scheduler.submit(request(10, 10, 0.2)),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let calls = surface.calls();
        assert_eq!(surface.qualities(), vec![0.9, 0.5, 0.2]);
        for pair in calls.windows(2) {
            // The next draw never starts before the previous read-back
            assert!(pair[1].drawn_at >= pair[0].encoded_at.unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fault_is_reported_not_retried() {
        let surface = ScriptedSurface::new(vec![Step::FailEncode], 10);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let err = scheduler.submit(request(10, 10, 0.8)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Fault(SurfaceError::Encode(_))));
        assert_eq!(surface.calls().len(), 1);

        // The worker keeps serving after a fault
        assert!(scheduler.submit(request(10, 10, 0.8)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_draw_fault_skips_encode() {
        let surface = ScriptedSurface::new(vec![Step::FailDraw], 10);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        let err = scheduler.submit(request(10, 10, 0.8)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Fault(SurfaceError::Draw(_))));
        assert!(surface.calls()[0].encoded_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmeasurable_buffer_has_no_len() {
        let surface = ScriptedSurface::new(vec![Step::Unmeasurable], 10);
        let scheduler = SurfaceScheduler::spawn(surface, SchedulerConfig::immediate());

        let result = scheduler.submit(request(10, 10, 0.8)).await.unwrap();
        assert_eq!(result.byte_len, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_still_settles() {
        let surface = ScriptedSurface::constant(10);
        let scheduler = SurfaceScheduler::spawn(surface.clone(), SchedulerConfig::default());

        // Give up on the first request while it is settling
        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            scheduler.submit(request(100, 100, 0.9)),
        )
        .await;
        assert!(abandoned.is_err());

        scheduler.submit(request(100, 100, 0.4)).await.unwrap();

        let calls = surface.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].encoded_at.is_some());
        assert!(calls[1].drawn_at >= calls[0].encoded_at.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_worker_closes_scheduler() {
        let surface = ScriptedSurface::new(vec![Step::Crash], 10);
        let scheduler = SurfaceScheduler::spawn(surface, SchedulerConfig::default());

        let err = scheduler.submit(request(10, 10, 0.8)).await.unwrap_err();
        assert_eq!(err, SubmitError::Closed);
        assert!(scheduler.is_closed());
        assert_eq!(
            scheduler.submit(request(10, 10, 0.8)).await.unwrap_err(),
            SubmitError::Closed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spaces_requests() {
        let surface = ScriptedSurface::constant(10);
        let config = SchedulerConfig {
            settle: SettlePolicy::none(),
            cooldown_ms: 150,
            ..SchedulerConfig::default()
        };
        let scheduler = SurfaceScheduler::spawn(surface.clone(), config);

        let (a, b) = tokio::join!(
            scheduler.submit(request(10, 10, 0.9)),
            scheduler.submit(request(10, 10, 0.8)),
        );
        assert!(a.is_ok() && b.is_ok());

        let calls = surface.calls();
        let gap = calls[1].drawn_at - calls[0].encoded_at.unwrap();
        assert!(gap >= Duration::from_millis(150));
    }
}
