//! Image processing for sighting submissions.
//!
//! Two concerns live here: the codec that normalizes raw uploads into
//! full-size + thumbnail JPEG pairs, and the in-process skin-tone
//! heuristic used as the cheap first stage of content moderation.

pub mod codec;
pub mod orientation;
pub mod skin;

pub use codec::{CodecError, ImageCodec};
pub use skin::LocalHeuristicClassifier;
