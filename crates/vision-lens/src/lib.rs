//! Vision Lens: bounded image preprocessing and single-shot vision-model questions.

pub mod client;
pub mod model;
pub mod preprocess;
pub mod types;

pub use client::{VisionClient, DEFAULT_API_BASE, DEFAULT_QUESTION};
pub use model::{is_known_model, resolve_model, select_model, FALLBACK_MODEL, KNOWN_MODELS};
pub use preprocess::{prepare_bytes, prepare_file};
pub use types::*;
