//! Public types for the Assay API.

mod message;
mod request;
mod response;

pub use message::{Message, Role, exchange};
pub use request::{AiRequest, CursorPosition, DocumentRef, Language};
pub use response::{AiResponse, ArchitectureReview, DEGRADED_CONFIDENCE, MODEL_CONFIDENCE};
