//! Source collectors.
//!
//! One submodule per data source. Each implements
//! [`Collector`](crate::core::collector::Collector).

pub mod local;
pub mod openai;
pub mod openrouter;
pub mod remote;

pub use local::LocalLogCollector;
pub use openai::OpenAiCollector;
pub use openrouter::OpenRouterCollector;
pub use remote::RemoteCollector;
