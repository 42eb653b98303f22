//! Scalar SQL functions registered on every registrar connection.

use super::DbResult;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;

/// `contains_ci(haystack, needle)`: Unicode case-insensitive substring test.
/// `NULL` on either side yields `0`.
pub const CONTAINS_CI: &str = "contains_ci";

pub(crate) fn register_text_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        CONTAINS_CI,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack = ctx.get::<Option<String>>(0)?;
            let needle = ctx.get::<Option<String>>(1)?;
            Ok(match (haystack, needle) {
                (Some(haystack), Some(needle)) => contains_ignoring_case(&haystack, &needle),
                _ => false,
            })
        },
    )?;
    Ok(())
}

fn contains_ignoring_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{contains_ignoring_case, register_text_functions};
    use rusqlite::Connection;

    #[test]
    fn folds_non_ascii_case() {
        assert!(contains_ignoring_case("Élodie Martin", "élodie"));
        assert!(contains_ignoring_case("STRASSE", "strasse"));
        assert!(!contains_ignoring_case("Ada", "bob"));
    }

    #[test]
    fn registered_function_handles_null() {
        let conn = Connection::open_in_memory().unwrap();
        register_text_functions(&conn).unwrap();
        let matched: bool = conn
            .query_row("SELECT contains_ci('Ünïcode Basics', 'ÜNÏ');", [], |row| row.get(0))
            .unwrap();
        assert!(matched);
        let null_side: bool = conn
            .query_row("SELECT contains_ci(NULL, 'x');", [], |row| row.get(0))
            .unwrap();
        assert!(!null_side);
    }
}
