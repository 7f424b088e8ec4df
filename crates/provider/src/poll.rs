//! Bounded polling state machine for provider jobs.
//!
//! One [`poll_job`] invocation owns a job from submission to a terminal
//! state: Complete, Failed, NotFound, or TimedOut when the attempt budget
//! runs out. Terminal states are monotonic; re-entering with a terminal job
//! returns immediately without touching the provider.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use fable_core::types::{Job, JobResult, JobState};

use crate::api::ProviderApiError;

/// One observation of a job's provider-side status.
#[derive(Debug, Clone)]
pub struct PollStatus {
    /// Mapped job state. Unknown provider statuses arrive as `Processing`.
    pub state: JobState,
    /// First generated image URL, when the provider has one.
    pub image_url: Option<String>,
}

impl PollStatus {
    /// A still-in-progress observation.
    pub fn processing() -> Self {
        Self {
            state: JobState::Processing,
            image_url: None,
        }
    }
}

/// Source of job status observations, one fetch per poll attempt.
///
/// Implemented over the provider REST API in [`crate::submit`]; tests
/// substitute scripted sources.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<PollStatus, ProviderApiError>;
}

/// Timing and budget knobs for one polling loop.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wait before the very first status fetch. Providers rarely have
    /// anything to report immediately after submission.
    pub initial_delay: Duration,
    /// Wait between subsequent fetches.
    pub interval: Duration,
    /// Total fetch budget. Must be >= 1.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::generation()
    }
}

impl PollConfig {
    /// Tuning for image generation jobs: 10 s head start, then every 5 s,
    /// up to 36 fetches (about three minutes).
    pub fn generation() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(5),
            max_attempts: 36,
        }
    }

    /// Tuning for element training jobs, which run for many minutes:
    /// every 10 s, up to 90 fetches (about fifteen minutes).
    pub fn training() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(10),
            max_attempts: 90,
        }
    }
}

/// Terminal failure of a polling loop.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    /// The provider reported the job as failed or gone.
    #[error("job {job_id} ended in state {}", state.as_str())]
    Failed {
        job_id: String,
        /// `Failed` or `NotFound`.
        state: JobState,
    },

    /// The attempt budget ran out while the job was still in progress.
    /// The job may yet complete provider-side; callers surface this as
    /// "still processing, check back later" rather than a hard failure.
    #[error("job {job_id} still processing after {attempts} polls")]
    TimedOut { job_id: String, attempts: u32 },

    /// The loop was cancelled before reaching a terminal state.
    #[error("polling for job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

/// Sleep that loses a race against cancellation. Returns `false` when
/// cancelled.
async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

/// Drive `job` to a terminal state by polling `source`.
///
/// Fetch errors are logged and consume an attempt; the loop keeps going
/// because the next fetch may well succeed. A generation job that reports
/// `COMPLETE` without any image is treated as failed.
///
/// The final state is written back into `job` before returning, so the
/// caller's record and the return value never disagree.
pub async fn poll_job(
    source: &dyn StatusSource,
    job: &mut Job,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<JobResult, PollError> {
    // Terminal states are final. Never poll a settled job again.
    if job.state.is_terminal() {
        return settled(job, config.max_attempts);
    }

    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let delay = if attempt == 1 {
            config.initial_delay
        } else {
            config.interval
        };
        if !wait(delay, cancel).await {
            tracing::info!(job_id = %job.id, attempt, "Polling cancelled");
            return Err(PollError::Cancelled {
                job_id: job.id.clone(),
            });
        }

        let status = match source.fetch_status(&job.id).await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(
                    job_id = %job.id,
                    attempt,
                    max_attempts,
                    error = %error,
                    "Status fetch failed; will retry on the next attempt",
                );
                continue;
            }
        };

        tracing::debug!(
            job_id = %job.id,
            attempt,
            state = status.state.as_str(),
            "Polled job status",
        );

        match status.state {
            JobState::Complete => {
                if job.kind.needs_image() && status.image_url.is_none() {
                    tracing::error!(job_id = %job.id, "Job completed without an image");
                    job.state = JobState::Failed;
                    return Err(PollError::Failed {
                        job_id: job.id.clone(),
                        state: JobState::Failed,
                    });
                }
                job.state = JobState::Complete;
                let result = JobResult {
                    image_url: status.image_url,
                };
                job.result = Some(result.clone());
                tracing::info!(job_id = %job.id, attempt, "Job complete");
                return Ok(result);
            }
            JobState::Failed | JobState::NotFound => {
                job.state = status.state;
                tracing::error!(job_id = %job.id, state = status.state.as_str(), "Job failed");
                return Err(PollError::Failed {
                    job_id: job.id.clone(),
                    state: status.state,
                });
            }
            _ => {
                job.state = JobState::Processing;
            }
        }
    }

    job.state = JobState::TimedOut;
    tracing::warn!(job_id = %job.id, attempts = max_attempts, "Polling budget exhausted");
    Err(PollError::TimedOut {
        job_id: job.id.clone(),
        attempts: max_attempts,
    })
}

/// Outcome for a job that is already terminal.
fn settled(job: &Job, attempts: u32) -> Result<JobResult, PollError> {
    match job.state {
        JobState::Complete => Ok(job.result.clone().unwrap_or(JobResult { image_url: None })),
        JobState::TimedOut => Err(PollError::TimedOut {
            job_id: job.id.clone(),
            attempts,
        }),
        _ => Err(PollError::Failed {
            job_id: job.id.clone(),
            state: job.state,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use fable_core::types::JobKind;

    use super::*;

    /// Plays back a fixed script of observations, then repeats the last one.
    struct ScriptedSource {
        script: Mutex<Vec<Result<PollStatus, ProviderApiError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<PollStatus, ProviderApiError>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _job_id: &str) -> Result<PollStatus, ProviderApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Ok(PollStatus::processing()))
        }
    }

    fn complete_with(url: &str) -> PollStatus {
        PollStatus {
            state: JobState::Complete,
            image_url: Some(url.to_string()),
        }
    }

    fn failed() -> PollStatus {
        PollStatus {
            state: JobState::Failed,
            image_url: None,
        }
    }

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_secs(10),
            interval: Duration::from_secs(5),
            max_attempts,
        }
    }

    fn transient() -> ProviderApiError {
        ProviderApiError::Api {
            status: 503,
            body: "unavailable".into(),
        }
    }

    // -- Happy path --

    #[tokio::test(start_paused = true)]
    async fn resolves_after_processing_then_complete() {
        let source = ScriptedSource::new(vec![
            Ok(PollStatus::processing()),
            Ok(complete_with("https://cdn.example/gen-123.png")),
        ]);
        let mut job = Job::submitted("gen-123", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://cdn.example/gen-123.png"));
        assert_eq!(job.state, JobState::Complete);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_wait_is_longer_than_the_rest() {
        let start = tokio::time::Instant::now();
        let source = ScriptedSource::new(vec![
            Ok(PollStatus::processing()),
            Ok(PollStatus::processing()),
            Ok(complete_with("https://cdn.example/a.png")),
        ]);
        let mut job = Job::submitted("gen-1", JobKind::ImageGeneration);

        poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new())
            .await
            .unwrap();

        // 10s head start, then two 5s intervals.
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    // -- Terminal states --

    #[tokio::test(start_paused = true)]
    async fn failed_status_ends_the_loop() {
        let source = ScriptedSource::new(vec![Ok(failed())]);
        let mut job = Job::submitted("gen-2", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::Failed { state: JobState::Failed, .. }));
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_terminal() {
        let source = ScriptedSource::new(vec![Ok(PollStatus {
            state: JobState::NotFound,
            image_url: None,
        })]);
        let mut job = Job::submitted("el-9", JobKind::Training);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::Failed { state: JobState::NotFound, .. }));
        assert_eq!(job.state, JobState::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_without_image_fails_a_generation_job() {
        let source = ScriptedSource::new(vec![Ok(PollStatus {
            state: JobState::Complete,
            image_url: None,
        })]);
        let mut job = Job::submitted("gen-3", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::Failed { .. }));
        assert_eq!(job.state, JobState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn training_jobs_complete_without_an_image() {
        let source = ScriptedSource::new(vec![Ok(PollStatus {
            state: JobState::Complete,
            image_url: None,
        })]);
        let mut job = Job::submitted("el-1", JobKind::Training);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.image_url.is_none());
        assert_eq!(job.state, JobState::Complete);
    }

    // -- Budget and errors --

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_times_out() {
        let source = ScriptedSource::new(vec![]);
        let mut job = Job::submitted("gen-4", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(5), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::TimedOut { attempts: 5, .. }));
        assert_eq!(job.state, JobState::TimedOut);
        assert_eq!(source.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_errors_consume_attempts_but_do_not_abort() {
        let source = ScriptedSource::new(vec![
            Err(transient()),
            Err(transient()),
            Ok(complete_with("https://cdn.example/b.png")),
        ]);
        let mut job = Job::submitted("gen-5", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://cdn.example/b.png"));
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_on_every_attempt_time_out() {
        let source = ScriptedSource::new(vec![
            Err(transient()),
            Err(transient()),
            Err(transient()),
        ]);
        let mut job = Job::submitted("gen-6", JobKind::ImageGeneration);

        let result = poll_job(&source, &mut job, &fast_config(3), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::TimedOut { attempts: 3, .. }));
        assert_eq!(job.state, JobState::TimedOut);
    }

    // -- Monotonicity and cancellation --

    #[tokio::test(start_paused = true)]
    async fn terminal_jobs_are_never_polled_again() {
        let source = ScriptedSource::new(vec![Ok(failed())]);
        let mut job = Job::submitted("gen-7", JobKind::ImageGeneration);
        job.state = JobState::Complete;
        job.result = Some(JobResult {
            image_url: Some("https://cdn.example/done.png".into()),
        });

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.image_url.as_deref(), Some("https://cdn.example/done.png"));
        assert_eq!(job.state, JobState::Complete);
        assert_eq!(source.calls(), 0, "settled jobs must not hit the provider");
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_jobs_stay_timed_out() {
        let source = ScriptedSource::new(vec![Ok(complete_with("https://cdn.example/late.png"))]);
        let mut job = Job::submitted("gen-8", JobKind::ImageGeneration);
        job.state = JobState::TimedOut;

        let result = poll_job(&source, &mut job, &fast_config(36), &CancellationToken::new()).await;

        assert_matches!(result, Err(PollError::TimedOut { .. }));
        assert_eq!(job.state, JobState::TimedOut);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_loop_before_the_next_fetch() {
        let source = ScriptedSource::new(vec![]);
        let mut job = Job::submitted("gen-9", JobKind::ImageGeneration);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poll_job(&source, &mut job, &fast_config(36), &cancel).await;

        assert_matches!(result, Err(PollError::Cancelled { .. }));
        assert_eq!(source.calls(), 0);
        // Cancellation is not a terminal provider state.
        assert_eq!(job.state, JobState::Submitted);
    }
}
