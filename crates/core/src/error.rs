/// Domain-level errors shared across the workspace.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or missing required input. Never retried; surfaced to the
    /// caller immediately.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A lookup by a client-supplied id missed. `entity` names the kind of
    /// record, for the error message and the API's 404 body.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },
}
