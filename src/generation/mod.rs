//! Query handling from raw user text to a logged answer.

pub mod acronyms;
pub mod classifier;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod usage;

pub use classifier::QueryIntent;
pub use pipeline::{Generator, GeneratorSettings};
