//! Asset snapshot diffing for reconciliation.
//!
//! The reconciler fetches the authoritative element list from the provider,
//! normalizes it, and hands the result to [`diff_snapshots`] together with
//! the previous in-memory snapshot. The diff detects assets that newly
//! reached `Complete` so the caller can notify exactly once per asset, and
//! carries client-scoped state (favorites) across refreshes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Asset, AssetStatus};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The last known client-visible view of the account's assets.
///
/// Kept in fetch order; lookups go by provider id. Empty on first run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetSnapshot {
    pub assets: Vec<Asset>,
}

impl AssetSnapshot {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }

    /// Look up an asset by provider id.
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Assets currently usable in generation prompts.
    pub fn completed(&self) -> Vec<Asset> {
        self.assets
            .iter()
            .filter(|a| a.status == AssetStatus::Complete)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Diff options and outcome
// ---------------------------------------------------------------------------

/// Caller knobs for a reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Report assets seen for the first time in `added`. Off by default:
    /// new assets join the snapshot silently.
    pub notify_new_assets: bool,
    /// Drop assets missing from the fresh fetch. Off by default: an asset
    /// absent from one list response is treated as still present.
    pub prune_missing: bool,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The new snapshot; becomes `previous` for the next pass.
    pub snapshot: AssetSnapshot,
    /// Assets that transitioned into `Complete` during this pass. Each asset
    /// id appears here at most once per transition across the snapshot's
    /// lifetime, because the comparison is always against the last applied
    /// snapshot.
    pub completed: Vec<Asset>,
    /// Assets seen for the first time (populated only when
    /// [`ReconcileOptions::notify_new_assets`] is set).
    pub added: Vec<Asset>,
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

/// Merge a freshly fetched asset list with the previous snapshot.
///
/// Rules:
/// - An asset present in both snapshots emits a completion event iff its
///   previous status was not `Complete` and its current status is.
/// - Assets only in the fresh list are added silently (see
///   [`ReconcileOptions::notify_new_assets`]); arriving already-`Complete`
///   does not count as a transition.
/// - Assets missing from the fresh list are retained from the previous
///   snapshot unless pruning is requested.
/// - `is_favorite` is client-scoped and always carried over from the
///   previous snapshot.
///
/// The caller must serialize passes per snapshot: apply this outcome before
/// starting the next reconciliation, otherwise two racing diffs against the
/// same `previous` could both observe the same transition.
pub fn diff_snapshots(
    previous: &AssetSnapshot,
    fetched: Vec<Asset>,
    options: ReconcileOptions,
) -> ReconcileOutcome {
    let mut completed = Vec::new();
    let mut added = Vec::new();
    let mut merged = Vec::with_capacity(fetched.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(fetched.len());

    for mut asset in fetched {
        seen.insert(asset.id.clone());
        match previous.get(&asset.id) {
            Some(prev) => {
                asset.is_favorite = prev.is_favorite;
                if prev.status != AssetStatus::Complete && asset.status == AssetStatus::Complete {
                    tracing::info!(
                        asset_id = %asset.id,
                        asset_name = %asset.name,
                        previous_status = prev.status.as_str(),
                        "Asset training completed",
                    );
                    completed.push(asset.clone());
                }
            }
            None => {
                if options.notify_new_assets {
                    added.push(asset.clone());
                }
            }
        }
        merged.push(asset);
    }

    if !options.prune_missing {
        for prev in &previous.assets {
            if !seen.contains(&prev.id) {
                merged.push(prev.clone());
            }
        }
    }

    ReconcileOutcome {
        snapshot: AssetSnapshot::new(merged),
        completed,
        added,
    }
}
