//! Request handlers, one submodule per resource.
//!
//! Handlers stay thin: extract, call the domain service with the caller's
//! `SecurityContext`, map errors to problems carrying the request path.

use axum::http::Uri;

use super::error::domain_error_to_problem;
use super::problem::Problem;
use crate::domain::error::DomainError;

pub(crate) mod complaints;
pub(crate) mod machines;
pub(crate) mod maintenance;
pub(crate) mod parties;
pub(crate) mod references;

/// Error mapper for handlers serving `uri`.
pub(crate) fn problem_at(uri: &Uri) -> impl Fn(DomainError) -> Problem + '_ {
    move |e| domain_error_to_problem(&e, uri.path())
}
