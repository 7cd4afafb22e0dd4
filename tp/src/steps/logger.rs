//! StepLogger - append-only step persistence
//!
//! Every pipeline stage appends exactly one row per turn. Step numbers
//! are assigned inside the logger under its connection lock, so numbering
//! stays contiguous even when turns for different sessions interleave.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::debug;

use super::types::{Step, StepDraft, StepType, TurnRecord, TurnStatus};
use super::StepLogError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS turns (
    turn_id     TEXT PRIMARY KEY,
    session_id  TEXT NOT NULL,
    user_text   TEXT NOT NULL,
    domain      TEXT NOT NULL,
    final_text  TEXT,
    status      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    ended_at    TEXT
);

CREATE TABLE IF NOT EXISTS agent_steps (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    turn_id         TEXT NOT NULL,
    step_number     INTEGER NOT NULL,
    step_type       TEXT NOT NULL,
    input_data      TEXT NOT NULL,
    output_data     TEXT,
    rendered_prompt TEXT,
    llm_model       TEXT,
    error           TEXT,
    created_at      TEXT NOT NULL,
    UNIQUE (turn_id, step_number)
);

CREATE INDEX IF NOT EXISTS idx_steps_turn ON agent_steps (turn_id);
CREATE INDEX IF NOT EXISTS idx_turns_session ON turns (session_id);
";

/// Append-only logger for turn and step records
pub struct StepLogger {
    conn: Mutex<Connection>,
}

impl StepLogger {
    /// Open (or create) the step database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StepLogError> {
        debug!(path = ?path.as_ref(), "StepLogger::open: called");
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory step database
    pub fn open_in_memory() -> Result<Self, StepLogError> {
        debug!("StepLogger::open_in_memory: called");
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Record a turn as started
    pub fn begin_turn(
        &self,
        turn_id: &str,
        session_id: &str,
        user_text: &str,
        domain: &str,
    ) -> Result<(), StepLogError> {
        debug!(%turn_id, %session_id, %domain, "StepLogger::begin_turn: called");
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO turns (turn_id, session_id, user_text, domain, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                turn_id,
                session_id,
                user_text,
                domain,
                TurnStatus::InProgress.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Mark a turn completed with its final response text
    pub fn complete_turn(&self, turn_id: &str, final_text: &str) -> Result<(), StepLogError> {
        debug!(%turn_id, "StepLogger::complete_turn: called");
        self.finish_turn(turn_id, TurnStatus::Completed, Some(final_text))
    }

    /// Mark a turn failed
    pub fn fail_turn(&self, turn_id: &str) -> Result<(), StepLogError> {
        debug!(%turn_id, "StepLogger::fail_turn: called");
        self.finish_turn(turn_id, TurnStatus::Failed, None)
    }

    fn finish_turn(&self, turn_id: &str, status: TurnStatus, final_text: Option<&str>) -> Result<(), StepLogError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE turns SET status = ?1, final_text = ?2, ended_at = ?3 WHERE turn_id = ?4",
            params![status.as_str(), final_text, Utc::now().to_rfc3339(), turn_id],
        )?;
        if updated == 0 {
            return Err(StepLogError::TurnNotFound { turn_id: turn_id.to_string() });
        }
        Ok(())
    }

    /// The step number the next `log_step` for this turn will be assigned
    ///
    /// Advisory only: `log_step` recomputes under the same lock it inserts
    /// with, so interleaved writers cannot double-claim a number.
    pub fn next_step_number(&self, turn_id: &str) -> Result<i64, StepLogError> {
        debug!(%turn_id, "StepLogger::next_step_number: called");
        let conn = self.lock()?;
        Self::compute_next_step_number(&conn, turn_id)
    }

    fn compute_next_step_number(conn: &Connection, turn_id: &str) -> Result<i64, StepLogError> {
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(step_number), 0) + 1 FROM agent_steps WHERE turn_id = ?1",
            params![turn_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Append one step to a turn, assigning the next step number
    ///
    /// Numbering is MAX(step_number)+1 computed under the connection lock,
    /// so a turn's steps are always 1..N with no gaps.
    pub fn log_step(&self, turn_id: &str, step_type: StepType, draft: StepDraft) -> Result<Step, StepLogError> {
        debug!(%turn_id, step_type = step_type.as_str(), "StepLogger::log_step: called");
        let conn = self.lock()?;
        let step_number = Self::compute_next_step_number(&conn, turn_id)?;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO agent_steps
                (turn_id, step_number, step_type, input_data, output_data,
                 rendered_prompt, llm_model, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                turn_id,
                step_number,
                step_type.as_str(),
                draft.input_data.to_string(),
                draft.output_data.as_ref().map(Value::to_string),
                draft.rendered_prompt,
                draft.llm_model,
                draft.error,
                created_at.to_rfc3339(),
            ],
        )?;
        Ok(Step {
            turn_id: turn_id.to_string(),
            step_number,
            step_type,
            input_data: draft.input_data,
            output_data: draft.output_data,
            rendered_prompt: draft.rendered_prompt,
            llm_model: draft.llm_model,
            error: draft.error,
            created_at,
        })
    }

    /// Fetch one turn record
    pub fn get_turn(&self, turn_id: &str) -> Result<TurnRecord, StepLogError> {
        debug!(%turn_id, "StepLogger::get_turn: called");
        let conn = self.lock()?;
        conn.query_row(
            "SELECT turn_id, session_id, user_text, domain, final_text, status, started_at, ended_at
             FROM turns WHERE turn_id = ?1",
            params![turn_id],
            turn_from_row,
        )
        .optional()?
        .ok_or_else(|| StepLogError::TurnNotFound { turn_id: turn_id.to_string() })
    }

    /// All turns for a session, oldest first
    pub fn list_turns(&self, session_id: &str) -> Result<Vec<TurnRecord>, StepLogError> {
        debug!(%session_id, "StepLogger::list_turns: called");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT turn_id, session_id, user_text, domain, final_text, status, started_at, ended_at
             FROM turns WHERE session_id = ?1 ORDER BY started_at",
        )?;
        let rows = stmt.query_map(params![session_id], turn_from_row)?;
        let mut turns = Vec::new();
        for row in rows {
            turns.push(row?);
        }
        Ok(turns)
    }

    /// A turn's steps in step-number order
    pub fn list_steps(&self, turn_id: &str) -> Result<Vec<Step>, StepLogError> {
        debug!(%turn_id, "StepLogger::list_steps: called");
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT turn_id, step_number, step_type, input_data, output_data,
                    rendered_prompt, llm_model, error, created_at
             FROM agent_steps WHERE turn_id = ?1 ORDER BY step_number",
        )?;
        let rows = stmt.query_map(params![turn_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut steps = Vec::new();
        for row in rows {
            let (turn_id, step_number, step_type, input, output, prompt, model, error, created) = row?;
            steps.push(Step {
                turn_id,
                step_number,
                step_type: StepType::parse(&step_type)?,
                input_data: serde_json::from_str(&input)?,
                output_data: output.as_deref().map(serde_json::from_str).transpose()?,
                rendered_prompt: prompt,
                llm_model: model,
                error,
                created_at: parse_ts(&created)?,
            });
        }
        Ok(steps)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StepLogError> {
        self.conn.lock().map_err(|_| StepLogError::LockPoisoned)
    }
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<TurnRecord> {
    let status: String = row.get(5)?;
    let started_at: String = row.get(6)?;
    let ended_at: Option<String> = row.get(7)?;
    Ok(TurnRecord {
        turn_id: row.get(0)?,
        session_id: row.get(1)?,
        user_text: row.get(2)?,
        domain: row.get(3)?,
        final_text: row.get(4)?,
        status: TurnStatus::parse(&status)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?,
        started_at: parse_ts(&started_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e)))?,
        ended_at: match ended_at {
            Some(ts) => Some(
                parse_ts(&ts)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e)))?,
            ),
            None => None,
        },
    })
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StepLogError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StepLogError::InvalidTimestamp { value: s.to_string() })
}
