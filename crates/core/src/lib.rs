//! Domain logic for the fable story-illustration backend.
//!
//! Pure types and functions with no I/O. The provider and API crates drive
//! these through explicit state passed in and out (snapshots, scene lists),
//! so every piece here is testable without a network or a clock.

pub mod error;
pub mod hashing;
pub mod normalize;
pub mod prompt;
pub mod reconcile;
pub mod scene;
pub mod training;
pub mod types;
