//! Mapping from provider status strings to job states.
//!
//! The provider reports job progress as free-form uppercase strings. Only
//! `COMPLETE` and `FAILED` are terminal; anything else, including statuses
//! introduced after this code was written, is treated as still in progress
//! so the poller keeps waiting instead of reporting a bogus outcome.

use fable_core::types::JobState;

/// Map a raw provider job status to a [`JobState`].
///
/// `None` means the provider has not materialized the job record yet, which
/// is also in-progress.
pub fn map_job_status(raw: Option<&str>) -> JobState {
    match raw.map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("COMPLETE") => JobState::Complete,
        Some("FAILED") => JobState::Failed,
        _ => JobState::Processing,
    }
}
