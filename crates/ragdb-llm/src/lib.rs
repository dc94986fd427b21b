//! Generative model clients.

mod openai;

pub use openai::OpenAiCompatibleClient;
