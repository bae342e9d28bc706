use axum::http::StatusCode;

use super::problem::Problem;
use crate::domain::error::DomainError;

/// Map a domain error to an RFC 9457 problem.
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    // Extract trace ID from current tracing span if available
    let trace_id = tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string());

    let problem = match e {
        DomainError::NotFound { entity, id } => Problem::new(
            StatusCode::NOT_FOUND,
            "Not Found",
            format!("{entity} {id} was not found"),
        ),
        DomainError::AlreadyExists { .. } | DomainError::InUse { .. } => {
            Problem::new(StatusCode::CONFLICT, "Conflict", e.to_string())
        }
        DomainError::Validation { field, message } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Validation Failed",
            format!("{field}: {message}"),
        )
        .with_field(field.clone()),
        DomainError::Unauthenticated => Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication required",
        ),
        DomainError::Forbidden => Problem::new(
            StatusCode::FORBIDDEN,
            "Forbidden",
            "insufficient permission",
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = %e, "Database error occurred");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "An internal database error occurred",
            )
        }
    };

    problem.with_instance(instance).with_trace_id(trace_id)
}

/// Implement Into<Problem> for `DomainError` so `?` works in handlers
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(&e, "/")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        let cases = [
            (DomainError::not_found("machine", "x"), StatusCode::NOT_FOUND),
            (DomainError::already_exists("machine", "0017"), StatusCode::CONFLICT),
            (DomainError::in_use("party", "p"), StatusCode::CONFLICT),
            (DomainError::validation("serial", "must not be empty"), StatusCode::BAD_REQUEST),
            (DomainError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (DomainError::Forbidden, StatusCode::FORBIDDEN),
            (DomainError::database("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_problem(&err, "/x").status_code(), status);
        }
    }

    #[test]
    fn forbidden_carries_no_detail_about_the_target() {
        let problem = domain_error_to_problem(&DomainError::Forbidden, "/fleet-register/v1/complaints");
        assert_eq!(problem.detail, "insufficient permission");
    }

    #[test]
    fn validation_names_the_field_and_database_errors_stay_opaque() {
        let problem = domain_error_to_problem(&DomainError::validation("recovery_date", "bad"), "/");
        assert_eq!(problem.field.as_deref(), Some("recovery_date"));

        let problem = domain_error_to_problem(&DomainError::database("disk I/O error"), "/");
        assert!(!problem.detail.contains("disk"));
    }
}
