//! Round-robin supervisor assignment.
//!
//! Each supervisor role has a persisted cursor in `assignment_counters`,
//! bumped atomically inside the transaction that creates the student. The
//! observable distribution is the classic round-robin (N supervisors, N*k
//! serialized creations give every supervisor exactly k students) without the
//! count-then-assign read that would race under concurrent creations.

use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use crate::authz::Role;
use crate::errors::AppError;

/// Pick the next supervisor of the given role, or `None` when no active
/// supervisor of that role exists. Must run inside the student-creation
/// transaction so the cursor moves atomically with the profile insert.
pub async fn next_supervisor(
    tx: &mut Transaction<'_, Sqlite>,
    role: Role,
) -> Result<Option<Uuid>, AppError> {
    debug_assert!(matches!(
        role,
        Role::AcademicSupervisor | Role::IndustrialSupervisor
    ));

    let supervisors: Vec<String> =
        sqlx::query_scalar("SELECT id FROM users WHERE role = ? AND is_active = 1 ORDER BY id")
            .bind(role.as_str())
            .fetch_all(&mut **tx)
            .await?;

    if supervisors.is_empty() {
        return Ok(None);
    }

    let cursor: i64 = sqlx::query_scalar(
        "INSERT INTO assignment_counters (role, next_index) VALUES (?, 1) \
         ON CONFLICT(role) DO UPDATE SET next_index = next_index + 1 \
         RETURNING next_index",
    )
    .bind(role.as_str())
    .fetch_one(&mut **tx)
    .await?;

    let index = ((cursor - 1) as usize) % supervisors.len();
    let id = Uuid::parse_str(&supervisors[index]).map_err(|err| {
        AppError::internal(format!("malformed supervisor id {}: {err}", supervisors[index]))
    })?;

    Ok(Some(id))
}
