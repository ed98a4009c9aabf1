//! The audit workflow: fetch issues, bound and fetch commits, cross-reference.

pub mod fetch;
pub mod matching;
pub mod pipeline;
pub mod window;

pub use pipeline::{AuditPipeline, AuditRequest};
