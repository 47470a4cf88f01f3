//! Wire types for both sides of the shim.
//!
//! `gemini` holds the contents-style schema callers speak, `openai` holds the
//! chat-completions schema the upstream endpoint speaks. Nothing here performs
//! IO or translation; see `qwenshim-transform` for that.

pub mod gemini;
pub mod openai;
pub mod sse;
