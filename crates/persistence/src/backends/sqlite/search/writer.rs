//! Index table writer.
//!
//! Replaces the index rows of one resource with the rows for its current
//! [`IndexFields`]. Callers run this inside the write transaction.

use rusqlite::{Connection, params};

use crate::error::StorageResult;
use crate::types::{IndexFields, ObservationValue, ReferenceValue};

fn reference_id(reference: &Option<ReferenceValue>) -> Option<&str> {
    reference.as_ref().map(ReferenceValue::id)
}

/// Writes the index rows for a resource, replacing any previous rows.
pub fn write_index(conn: &Connection, id: &str, fields: &IndexFields) -> StorageResult<()> {
    let table = fields.resource_type().index_table();
    conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;

    match fields {
        IndexFields::Patient(idx) => {
            conn.execute(
                "INSERT INTO patient_index (id, family, given, identifier, birth_date, gender)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    idx.family.as_deref().map(str::to_lowercase),
                    idx.given.as_deref().map(str::to_lowercase),
                    idx.identifier,
                    idx.birth_date,
                    idx.gender
                ],
            )?;
        }
        IndexFields::Observation(idx) => {
            let (quantity, unit, code) = match &idx.value {
                Some(ObservationValue::Quantity { value, unit }) => {
                    (Some(*value), unit.as_deref(), None)
                }
                Some(ObservationValue::Coded(code)) => (None, None, Some(code.as_str())),
                None => (None, None, None),
            };
            conn.execute(
                "INSERT INTO observation_index (
                    id, code, code_display, status, category, effective,
                    value_quantity, value_unit, value_code, subject
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    idx.code,
                    idx.code_display,
                    idx.status,
                    idx.category,
                    idx.effective,
                    quantity,
                    unit,
                    code,
                    reference_id(&idx.subject)
                ],
            )?;
        }
        IndexFields::DiagnosticReport(idx) => {
            conn.execute(
                "INSERT INTO diagnostic_report_index (
                    id, code, code_display, status, category, effective, issued, conclusion, subject
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    idx.code,
                    idx.code_display,
                    idx.status,
                    idx.category,
                    idx.effective,
                    idx.issued,
                    idx.conclusion,
                    reference_id(&idx.subject)
                ],
            )?;

            conn.execute(
                "DELETE FROM diagnostic_report_result WHERE report_id = ?1",
                [id],
            )?;
            let mut stmt = conn.prepare_cached(
                "INSERT INTO diagnostic_report_result (report_id, position, observation_id)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (position, result) in idx.results.iter().enumerate() {
                stmt.execute(params![id, position as i64, result.id()])?;
            }
        }
        IndexFields::ServiceRequest(idx) => {
            conn.execute(
                "INSERT INTO service_request_index (
                    id, code, status, intent, category, priority, authored, occurrence,
                    requester, performer, subject
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id,
                    idx.code,
                    idx.status,
                    idx.intent,
                    idx.category,
                    idx.priority,
                    idx.authored,
                    idx.occurrence,
                    reference_id(&idx.requester),
                    reference_id(&idx.performer),
                    reference_id(&idx.subject)
                ],
            )?;
        }
    }

    Ok(())
}
