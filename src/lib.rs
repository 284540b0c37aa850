pub mod ai;
pub mod anthropic;
pub mod api;
pub mod cli;
pub mod core;
pub mod jobs;
pub mod openai;
