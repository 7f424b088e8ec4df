//! In-process event types and bus for the fable backend.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};

/// An asset finished training and is now usable in generation prompts.
pub const EVENT_ASSET_TRAINING_COMPLETED: &str = "asset.training_completed";

/// A training job was accepted by the provider.
pub const EVENT_ASSET_TRAINING_STARTED: &str = "asset.training_started";

/// A scene illustration finished generating.
pub const EVENT_GENERATION_COMPLETED: &str = "generation.completed";

/// A scene illustration failed on the provider side.
pub const EVENT_GENERATION_FAILED: &str = "generation.failed";
