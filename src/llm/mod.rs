pub mod gemini;
pub mod media;

pub use gemini::{generate_architectural_image, ImageGenerationError};
