//! Credential port for authorizing outbound requests.

use super::PortFuture;

/// Supplies the `Authorization` header value for a remote host.
///
/// Called before every request so that providers backed by an expiring
/// token can refresh it transparently.
pub trait CredentialProvider: Send + Sync {
    /// Returns the header value, or `None` for anonymous access.
    ///
    /// # Errors
    ///
    /// Returns an error if a credential is configured but cannot be produced.
    fn authorization(&self) -> PortFuture<'_, Option<String>>;
}
