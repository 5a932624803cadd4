//! Mock implementations for testing

mod render;
mod store;
mod tier;

pub use render::{RecordingOutlet, RecordingRenderer, RenderCall};
pub use store::MockDocumentStore;
pub use tier::{FailingTier, FailureMode};
