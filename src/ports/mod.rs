//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the audit core and an external
//! system (time, issue tracker, source-control host, credentials, LLM).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod credentials;
pub mod issues;
pub mod llm;
pub mod scm;

use std::future::Future;
use std::pin::Pin;

use crate::error::PortError;

pub use clock::Clock;
pub use credentials::CredentialProvider;
pub use issues::{IssuePage, IssueSource, NamedRef, RawIssue, RawIssueFields};
pub use llm::{CompletionFuture, CompletionRequest, CompletionResponse, LlmClient};
pub use scm::{CommitPage, CommitSource, RawAuthor, RawCommit};

/// Boxed future returned by async port methods, keeping the traits dyn-compatible.
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;
