//! Model provider clients. Currently Groq, via its OpenAI-compatible chat
//! completions endpoint; the rest of the system only sees `ModelProvider`.

pub mod groq;

pub use groq::GroqProvider;
