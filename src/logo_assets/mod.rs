pub mod pipeline;
pub mod transform;

pub use pipeline::{LogoCompletion, LogoPipeline, LogoWriter};
