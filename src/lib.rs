pub mod core;
pub mod generation;
pub mod history;
pub mod llm;
pub mod pdf;
pub mod rag;
pub mod server;
pub mod state;
