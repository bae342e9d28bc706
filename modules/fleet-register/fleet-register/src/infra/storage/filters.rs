//! Shared pieces of list filters.

use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};

use crate::infra::storage::entity::machine;

/// `LIKE` escape character. Not a backslash, so the rendered `ESCAPE` clause
/// reads the same in every backend's string quoting.
const LIKE_ESCAPE: char = '!';

/// Escape `LIKE` metacharacters so `needle` only ever matches literally.
pub(crate) fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_') || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Machines whose serial number contains `serial` as a literal substring.
pub(crate) fn serial_contains(serial: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(serial));
    Expr::col((machine::Entity, machine::Column::SerialNumber))
        .like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn metacharacters_are_escaped() {
        assert_eq!(escape_like("0017"), "0017");
        assert_eq!(escape_like("10%_off!"), "10!%!_off!!");
    }
}
