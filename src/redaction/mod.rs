//! Redaction canvas
//!
//! Lets the user black out rectangular regions of a case-evidence image
//! before it is attached. Rectangles live only for the editing session;
//! the flattened image is the only thing that survives.

mod composite;
mod editor;
mod error;
mod export;
mod geometry;
mod source;

pub use composite::composite;
pub use editor::{GestureEvent, GestureOutcome, RedactionEditor};
pub use error::{LoadError, RedactionError};
pub use export::{RedactedArtifact, REDACTED_PREFIX};
pub use geometry::{Point, Rect, ViewportScale, MIN_RECT_SIZE};
pub use source::{load, ImageSources, SourceImage};
