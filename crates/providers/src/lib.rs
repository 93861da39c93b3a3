//! Chat completion backends for patchloop.
//!
//! All providers implement the `patchloop_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
