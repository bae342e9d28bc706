//! Entity-level invariants enforced on every save, whoever performs it.

use time::Date;
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Days between failure and recovery; `0` while the machine is not recovered.
///
/// # Errors
/// Returns `DomainError::Validation` when `recovery` precedes `failure`.
pub fn compute_downtime(failure: Date, recovery: Option<Date>) -> Result<u32, DomainError> {
    let Some(recovery) = recovery else {
        return Ok(0);
    };
    if recovery < failure {
        return Err(DomainError::validation(
            "recovery_date",
            "must not precede failure_date",
        ));
    }
    u32::try_from((recovery - failure).whole_days())
        .map_err(|_| DomainError::validation("recovery_date", "downtime out of range"))
}

/// The responsible service company of a child record: the explicit one, or
/// the machine's.
#[must_use]
pub fn service_company_or_machines(explicit: Option<Uuid>, machine_service_company: Uuid) -> Uuid {
    explicit.unwrap_or(machine_service_company)
}

/// Trim a required text field.
///
/// # Errors
/// Returns `DomainError::Validation` naming `field` when the value is blank.
pub fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn downtime_counts_days_to_recovery() {
        assert_eq!(
            compute_downtime(date!(2024 - 01 - 10), Some(date!(2024 - 01 - 15))).unwrap(),
            5
        );
    }

    #[test]
    fn downtime_is_zero_without_recovery() {
        assert_eq!(compute_downtime(date!(2024 - 01 - 10), None).unwrap(), 0);
    }

    #[test]
    fn same_day_recovery_is_zero() {
        assert_eq!(
            compute_downtime(date!(2024 - 01 - 10), Some(date!(2024 - 01 - 10))).unwrap(),
            0
        );
    }

    #[test]
    fn recovery_before_failure_is_rejected() {
        let err = compute_downtime(date!(2024 - 01 - 10), Some(date!(2024 - 01 - 05))).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "recovery_date"));
    }

    #[test]
    fn explicit_service_company_wins() {
        let machine_sc = Uuid::now_v7();
        let explicit = Uuid::now_v7();
        assert_eq!(service_company_or_machines(None, machine_sc), machine_sc);
        assert_eq!(service_company_or_machines(Some(explicit), machine_sc), explicit);
    }

    #[test]
    fn blank_text_is_rejected() {
        assert_eq!(required_text("serial_number", "  A-1 ").unwrap(), "A-1");
        assert!(required_text("serial_number", "   ").is_err());
    }
}
