//! Diagnostics for repository misses.
//!
//! Repositories receive their logger through the constructor, so every concrete
//! entity repository can label its own output. The only event a repository
//! reports is a filter that matched nothing.

use std::fmt::Debug;

use crate::query::Expr;

/// Message attached to every not-found warning.
pub const NOT_FOUND_MESSAGE: &str = "document not found for filter";

/// Sink for the repository's warnings.
pub trait RepositoryLogger: Send + Sync + Debug {
    /// Reports a warning together with the filter that produced it.
    fn warn(&self, message: &str, filter: &Expr);
}

/// Default logger, forwarding to [`tracing`] at `WARN` level.
///
/// Each event carries the repository context and the rendered filter as
/// structured fields:
///
/// ```text
/// WARN docrepo: document not found for filter repository="UsersRepository" filter={ "name": "b" }
/// ```
#[derive(Debug, Clone)]
pub struct TracingLogger {
    context: String,
}

impl TracingLogger {
    /// Creates a logger labelled with the owning repository's name.
    pub fn new(context: impl Into<String>) -> Self {
        Self { context: context.into() }
    }

    pub fn context(&self) -> &str {
        &self.context
    }
}

impl RepositoryLogger for TracingLogger {
    fn warn(&self, message: &str, filter: &Expr) {
        tracing::warn!(
            target: "docrepo",
            repository = %self.context,
            filter = %filter,
            "{}",
            message,
        );
    }
}
