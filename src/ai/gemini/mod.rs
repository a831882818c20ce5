pub mod client;
pub mod completion;
pub mod types;

pub use client::GeminiHttpClient;
pub use completion::GeminiCompletionProvider;
