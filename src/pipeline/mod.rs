//! Pipeline stages between a stored document and a parsed model response.
//!
//! Each submodule implements exactly one step and none of them hold state
//! between calls, so hosts may run them concurrently across documents.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ sanitize ──▶ (prompt) ──▶ llm ──▶ repair
//! (path/bytes) (strategy  (safe text)              (model)  (JSON salvage)
//!               chains)
//! ```
//!
//! 1. [`input`]: resolve a stored location against the upload base, or
//!    materialise inline bytes to a temp file that is always removed
//! 2. [`extract`]: per-format strategy chains; never fails, an unreadable
//!    document becomes an [`crate::ExtractionFailure`]
//! 3. [`sanitize`]: strip what a model API rejects
//! 4. [`llm`]: the synchronous model-caller seam
//! 5. [`repair`]: recover a JSON object from a truncated or sloppy response

pub mod extract;
pub mod input;
pub mod llm;
pub mod repair;
pub mod sanitize;
