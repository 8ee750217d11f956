use crate::db::traits::{ConfigStore, IdentityStore, ResultStore, StoredIdentity};
use crate::types::{
    AppError, ConfigSnapshot, NewConfigSnapshot, NewTestResult, Result, ResultStatistics, Role,
    TestResult,
};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database, Row};

/// libsql-backed store (local SQLite file or in-memory).
///
/// One connection is opened at construction and shared by every request.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl TursoClient {
    /// In-memory database, schema initialised.
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    /// Local SQLite file, created if missing, schema initialised.
    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Database(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Result<Connection> {
        Ok(self.conn.clone())
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create users table: {}", e)))?;

        // Append-only; rows are never updated or deleted.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                total_questions INTEGER NOT NULL,
                duration_seconds INTEGER NOT NULL,
                max_incorrect_answers INTEGER,
                min_questions_per_minute INTEGER,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create questions table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS test_results (
                id TEXT PRIMARY KEY,
                participant_name TEXT NOT NULL,
                participant_email TEXT NOT NULL,
                participant_education TEXT,
                participant_phone TEXT,
                total_questions INTEGER NOT NULL,
                correct_answers INTEGER NOT NULL,
                score REAL NOT NULL,
                is_passed INTEGER NOT NULL,
                total_time INTEGER NOT NULL,
                answers TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create test_results table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_email ON test_results(participant_email)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create index: {}", e)))?;

        Ok(())
    }
}

fn snapshot_from_row(row: &Row) -> Result<ConfigSnapshot> {
    Ok(ConfigSnapshot {
        id: row.get(0).map_err(db_err)?,
        total_questions: row.get(1).map_err(db_err)?,
        duration_seconds: row.get(2).map_err(db_err)?,
        max_incorrect_answers: row.get(3).map_err(db_err)?,
        min_questions_per_minute: row.get(4).map_err(db_err)?,
        created_at: row.get(5).map_err(db_err)?,
    })
}

const SNAPSHOT_COLUMNS: &str = "id, total_questions, duration_seconds, max_incorrect_answers, \
                                min_questions_per_minute, created_at";

fn result_from_row(row: &Row) -> Result<TestResult> {
    let id: String = row.get(0).map_err(db_err)?;
    let answers: String = row.get(10).map_err(db_err)?;
    let is_passed: i64 = row.get(8).map_err(db_err)?;

    let answers = serde_json::from_str(&answers).unwrap_or_else(|e| {
        tracing::warn!(result_id = %id, error = %e, "stored answers are not valid JSON");
        serde_json::Value::Null
    });

    Ok(TestResult {
        id,
        participant_name: row.get(1).map_err(db_err)?,
        participant_email: row.get(2).map_err(db_err)?,
        participant_education: row.get(3).map_err(db_err)?,
        participant_phone: row.get(4).map_err(db_err)?,
        total_questions: row.get(5).map_err(db_err)?,
        correct_answers: row.get(6).map_err(db_err)?,
        score: row.get(7).map_err(db_err)?,
        is_passed: is_passed != 0,
        total_time: row.get(9).map_err(db_err)?,
        answers,
        created_at: row.get(11).map_err(db_err)?,
    })
}

const RESULT_COLUMNS: &str = "id, participant_name, participant_email, participant_education, \
                              participant_phone, total_questions, correct_answers, score, \
                              is_passed, total_time, answers, created_at";

impl TursoClient {
    async fn collect_results(&self, mut rows: libsql::Rows) -> Result<Vec<TestResult>> {
        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(result_from_row(&row)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl IdentityStore for TursoClient {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<StoredIdentity>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT id, email, password_hash, role, created_at
                 FROM users WHERE email = ?",
                [email],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query user: {}", e)))?;

        if let Some(row) = rows.next().await.map_err(db_err)? {
            let role: String = row.get(3).map_err(db_err)?;
            Ok(Some(StoredIdentity {
                id: row.get(0).map_err(db_err)?,
                email: row.get(1).map_err(db_err)?,
                password_hash: row.get(2).map_err(db_err)?,
                // Unrecognised roles get the least privilege.
                role: role.parse().unwrap_or(Role::User),
                created_at: row.get(4).map_err(db_err)?,
            }))
        } else {
            Ok(None)
        }
    }

    async fn upsert_identity(&self, email: &str, password_hash: &str, role: Role) -> Result<()> {
        let conn = self.connection()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();

        conn.execute(
            "INSERT INTO users (id, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(email) DO UPDATE SET password_hash = excluded.password_hash,
                                              role = excluded.role",
            (id, email, password_hash, role.as_str(), now),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to upsert user: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl ConfigStore for TursoClient {
    async fn find_latest_config_snapshot(&self) -> Result<Option<ConfigSnapshot>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM questions
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query config: {}", e)))?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(snapshot_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_config_snapshot(&self, fields: NewConfigSnapshot) -> Result<ConfigSnapshot> {
        let conn = self.connection()?;
        let snapshot = ConfigSnapshot {
            id: uuid::Uuid::new_v4().to_string(),
            total_questions: fields.total_questions,
            duration_seconds: fields.duration_seconds,
            max_incorrect_answers: Some(fields.max_incorrect_answers),
            min_questions_per_minute: Some(fields.min_questions_per_minute),
            created_at: Utc::now().timestamp_millis(),
        };

        conn.execute(
            &format!("INSERT INTO questions ({SNAPSHOT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)"),
            (
                snapshot.id.as_str(),
                snapshot.total_questions,
                snapshot.duration_seconds,
                fields.max_incorrect_answers,
                fields.min_questions_per_minute,
                snapshot.created_at,
            ),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create config snapshot: {}", e)))?;

        Ok(snapshot)
    }

    async fn list_config_snapshots(&self, limit: u32) -> Result<Vec<ConfigSnapshot>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM questions
                     ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ),
                [limit as i64],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query config history: {}", e)))?;

        let mut snapshots = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            snapshots.push(snapshot_from_row(&row)?);
        }

        Ok(snapshots)
    }
}

#[async_trait]
impl ResultStore for TursoClient {
    async fn create_test_result(&self, result: &NewTestResult) -> Result<TestResult> {
        let conn = self.connection()?;
        let stored = TestResult {
            id: uuid::Uuid::new_v4().to_string(),
            participant_name: result.participant_name.trim().to_string(),
            participant_email: result.participant_email.trim().to_string(),
            participant_education: result.participant_education.clone(),
            participant_phone: result.participant_phone.clone(),
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            score: result.score,
            is_passed: result.is_passed,
            total_time: result.total_time,
            answers: result.answers.clone(),
            created_at: Utc::now().timestamp_millis(),
        };

        conn.execute(
            &format!(
                "INSERT INTO test_results ({RESULT_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                stored.id.clone(),
                stored.participant_name.clone(),
                stored.participant_email.clone(),
                stored.participant_education.clone(),
                stored.participant_phone.clone(),
                stored.total_questions,
                stored.correct_answers,
                stored.score,
                stored.is_passed as i64,
                stored.total_time,
                stored.answers.to_string(),
                stored.created_at,
            ],
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to store test result: {}", e)))?;

        Ok(stored)
    }

    async fn list_test_results(&self, limit: u32) -> Result<Vec<TestResult>> {
        let conn = self.connection()?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM test_results
                     ORDER BY created_at DESC, rowid DESC LIMIT ?"
                ),
                [limit as i64],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query test results: {}", e)))?;

        self.collect_results(rows).await
    }

    async fn get_test_result(&self, id: &str) -> Result<Option<TestResult>> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                &format!("SELECT {RESULT_COLUMNS} FROM test_results WHERE id = ?"),
                [id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query test result: {}", e)))?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(result_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_test_results_by_email(&self, email: &str) -> Result<Vec<TestResult>> {
        let conn = self.connection()?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM test_results WHERE participant_email = ?
                     ORDER BY created_at DESC, rowid DESC"
                ),
                [email],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to query test results: {}", e)))?;

        self.collect_results(rows).await
    }

    async fn delete_test_result(&self, id: &str) -> Result<bool> {
        let conn = self.connection()?;

        let affected = conn
            .execute("DELETE FROM test_results WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete test result: {}", e)))?;

        Ok(affected > 0)
    }

    async fn result_statistics(&self) -> Result<ResultStatistics> {
        let conn = self.connection()?;

        let mut rows = conn
            .query(
                "SELECT COUNT(id), AVG(score), AVG(total_time), MAX(score), MIN(score)
                 FROM test_results",
                (),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to aggregate results: {}", e)))?;

        let Some(row) = rows.next().await.map_err(db_err)? else {
            return Ok(ResultStatistics::default());
        };

        let total_tests: i64 = row.get(0).map_err(db_err)?;
        let average_score: Option<f64> = row.get(1).map_err(db_err)?;
        let average_time: Option<f64> = row.get(2).map_err(db_err)?;
        let highest_score: Option<f64> = row.get(3).map_err(db_err)?;
        let lowest_score: Option<f64> = row.get(4).map_err(db_err)?;

        Ok(ResultStatistics {
            total_tests,
            average_score: average_score
                .map(|avg| (avg * 100.0).round() / 100.0)
                .unwrap_or(0.0),
            average_time: average_time.map(|avg| avg.round() as i64).unwrap_or(0),
            highest_score: highest_score.unwrap_or(0.0),
            lowest_score: lowest_score.unwrap_or(0.0),
        })
    }
}
