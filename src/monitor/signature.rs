//! Canonical snapshot signatures.

use crate::replica::ReplicaRow;

const FIELD_DELIMITER: char = ',';
const ROW_TERMINATOR: char = ';';

/// Serialize a poll result into its order-preserving comparable form: the
/// five fields of each row joined with `,`, rows terminated with `;`.
/// The string carries no meaning beyond equality between polls.
pub fn build_signature(rows: &[ReplicaRow]) -> String {
    let mut signature = String::new();
    for row in rows {
        for field in [
            &row.host,
            &row.database,
            &row.cube_name,
            &row.role_tag,
            &row.last_schema_change,
        ] {
            signature.push_str(field);
            signature.push(FIELD_DELIMITER);
        }
        signature.push(ROW_TERMINATOR);
    }
    signature
}

/// Case-insensitive signature equality, so casing drift in source strings
/// never produces a spurious change event.
pub fn same_signature(a: &str, b: &str) -> bool {
    a.to_uppercase() == b.to_uppercase()
}
