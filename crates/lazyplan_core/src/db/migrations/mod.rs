//! Plan schema migrations.
//!
//! Each step is an embedded SQL batch tagged with the `user_version` it
//! leaves behind. Steps run in one `BEGIN IMMEDIATE` transaction so two
//! processes opening the same fresh file cannot both run step 1.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "plans",
        sql: include_str!("0001_plans.sql"),
    },
    SchemaStep {
        version: 2,
        name: "plan_revision",
        sql: include_str!("0002_plan_revision.sql"),
    },
];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to [`latest_version`].
///
/// An up-to-date file is left untouched, so opening never takes the
/// writer lock in the common case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    if check_version(conn)? == latest_version() {
        return Ok(());
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    // Another connection may have migrated while we waited for the lock.
    let from = check_version(&tx)?;
    let pending = SCHEMA_STEPS.iter().filter(|step| step.version > from);
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(())
}

fn check_version(conn: &Connection) -> DbResult<u32> {
    let found: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let latest = latest_version();
    if found > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: found,
            latest_supported: latest,
        });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, SCHEMA_STEPS};
    use rusqlite::Connection;

    #[test]
    fn steps_are_strictly_increasing() {
        assert!(SCHEMA_STEPS
            .windows(2)
            .all(|pair| pair[0].version < pair[1].version));
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn partial_schema_resumes_from_recorded_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_STEPS[0].sql).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        apply_migrations(&mut conn).unwrap();
        let revision: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('plans') WHERE name = 'revision';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(revision, 1);
    }
}
