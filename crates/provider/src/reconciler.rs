//! Keeps the local asset snapshot in sync with provider-side elements.
//!
//! The reconciler fetches the full element list, normalizes it into domain
//! [`Asset`](fable_core::types::Asset)s, and diffs against the previous
//! snapshot. Fetches are idempotent reads and go through the retry wrapper;
//! on a fetch error the caller keeps its previous snapshot untouched.

use std::sync::Arc;

use tokio::sync::OnceCell;

use fable_core::normalize::{normalize_element, RawElement};
use fable_core::reconcile::{diff_snapshots, AssetSnapshot, ReconcileOptions, ReconcileOutcome};

use crate::api::{ProviderApi, ProviderApiError};
use crate::retry::{with_retry, RetryConfig};

/// Reconciles provider element state into asset snapshots.
pub struct AssetReconciler {
    api: Arc<ProviderApi>,
    retry: RetryConfig,
    /// The provider's user id, resolved once and reused for every refresh.
    user_id: OnceCell<String>,
}

impl AssetReconciler {
    pub fn new(api: Arc<ProviderApi>) -> Self {
        Self {
            api,
            retry: RetryConfig::default(),
            user_id: OnceCell::new(),
        }
    }

    /// Replace the retry tuning for the idempotent fetches.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch the current element list and diff it against `previous`.
    ///
    /// Returns the fresh snapshot plus the assets that newly reached
    /// `Complete` (at most once per asset id across successive calls).
    /// On error `previous` is untouched and remains the snapshot of record.
    pub async fn reconcile(
        &self,
        previous: &AssetSnapshot,
        options: ReconcileOptions,
    ) -> Result<ReconcileOutcome, ProviderApiError> {
        let raw = self.fetch_elements().await?;
        let fetched: Vec<_> = raw.into_iter().map(normalize_element).collect();

        let outcome = diff_snapshots(previous, fetched, options);
        tracing::info!(
            total = outcome.snapshot.assets.len(),
            completed = outcome.completed.len(),
            added = outcome.added.len(),
            "Reconciled asset snapshot",
        );
        Ok(outcome)
    }

    /// Fetch and pre-normalize the provider's element list.
    ///
    /// Elements without a thumbnail are enriched with their dataset's image
    /// URLs so normalization can fall back to a training image. Enrichment
    /// failures are logged and skipped; a missing thumbnail must not sink
    /// the whole refresh.
    async fn fetch_elements(&self) -> Result<Vec<RawElement>, ProviderApiError> {
        let user_id = self
            .user_id
            .get_or_try_init(|| with_retry(&self.retry, || self.api.get_user_id()))
            .await?;

        let payloads = with_retry(&self.retry, || self.api.list_user_elements(user_id)).await?;

        let mut elements = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let dataset_id = payload.dataset_id();
            let mut raw = payload.into_raw_element();
            if raw.thumbnail_url.is_none() {
                if let Some(dataset_id) = dataset_id {
                    match with_retry(&self.retry, || self.api.get_dataset_images(&dataset_id)).await
                    {
                        Ok(urls) => raw.dataset_image_urls = urls,
                        Err(error) => {
                            tracing::warn!(
                                element_id = %raw.id,
                                dataset_id = %dataset_id,
                                error = %error,
                                "Could not fetch dataset images for thumbnail fallback",
                            );
                        }
                    }
                }
            }
            elements.push(raw);
        }
        Ok(elements)
    }
}
