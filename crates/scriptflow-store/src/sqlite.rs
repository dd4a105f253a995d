use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{Error, NodeRun, ScriptRun, Store, WorkflowRun};

/// SQLite-based store implementation.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait]
impl Store for SqliteStore {
  async fn create_script_run(&self, run: &ScriptRun) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO script_runs (run_id, script_id, status, parameters, output, error, log_path, exit_code, created_at, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.run_id)
        .bind(&run.script_id)
        .bind(run.status)
        .bind(&run.parameters)
        .bind(&run.output)
        .bind(&run.error)
        .bind(&run.log_path)
        .bind(run.exit_code)
        .bind(run.created_at)
        .bind(run.started_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_script_run(&self, run_id: &str) -> Result<ScriptRun, Error> {
    sqlx::query_as(
            r#"
            SELECT run_id, script_id, status, parameters, output, error, log_path, exit_code, created_at, started_at, finished_at
            FROM script_runs
            WHERE run_id = ?
            "#,
        )
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn update_script_run(&self, run: &ScriptRun) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE script_runs
            SET status = ?, output = ?, error = ?, log_path = ?, exit_code = ?, started_at = ?, finished_at = ?
            WHERE run_id = ? AND status IN ('pending', 'running')
            "#,
    )
    .bind(run.status)
    .bind(&run.output)
    .bind(&run.error)
    .bind(&run.log_path)
    .bind(run.exit_code)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(&run.run_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn delete_script_run(&self, run_id: &str) -> Result<(), Error> {
    sqlx::query("DELETE FROM script_runs WHERE run_id = ?")
      .bind(run_id)
      .execute(&self.pool)
      .await?;

    Ok(())
  }

  async fn create_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO workflow_runs (run_id, workflow_id, status, parameters, error, created_at, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.run_id)
        .bind(&run.workflow_id)
        .bind(run.status)
        .bind(&run.parameters)
        .bind(&run.error)
        .bind(run.created_at)
        .bind(run.started_at)
        .bind(run.finished_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_workflow_run(&self, run_id: &str) -> Result<WorkflowRun, Error> {
    sqlx::query_as(
      r#"
            SELECT run_id, workflow_id, status, parameters, error, created_at, started_at, finished_at
            FROM workflow_runs
            WHERE run_id = ?
            "#,
    )
    .bind(run_id)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| Error::NotFound(run_id.to_string()))
  }

  async fn update_workflow_run(&self, run: &WorkflowRun) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE workflow_runs
            SET status = ?, error = ?, started_at = ?, finished_at = ?
            WHERE run_id = ? AND status IN ('pending', 'running')
            "#,
    )
    .bind(run.status)
    .bind(&run.error)
    .bind(run.started_at)
    .bind(run.finished_at)
    .bind(&run.run_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn create_node_run(&self, node_run: &NodeRun) -> Result<(), Error> {
    sqlx::query(
            r#"
            INSERT INTO node_runs (node_run_id, workflow_run_id, node_id, status, script_run_id, output, error, started_at, finished_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node_run.node_run_id)
        .bind(&node_run.workflow_run_id)
        .bind(&node_run.node_id)
        .bind(node_run.status)
        .bind(&node_run.script_run_id)
        .bind(&node_run.output)
        .bind(&node_run.error)
        .bind(node_run.started_at)
        .bind(node_run.finished_at)
        .execute(&self.pool)
        .await?;

    Ok(())
  }

  async fn get_node_run(&self, node_run_id: &str) -> Result<NodeRun, Error> {
    sqlx::query_as(
            r#"
            SELECT node_run_id, workflow_run_id, node_id, status, script_run_id, output, error, started_at, finished_at
            FROM node_runs
            WHERE node_run_id = ?
            "#,
        )
        .bind(node_run_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(node_run_id.to_string()))
  }

  async fn update_node_run(&self, node_run: &NodeRun) -> Result<(), Error> {
    sqlx::query(
      r#"
            UPDATE node_runs
            SET status = ?, script_run_id = ?, output = ?, error = ?, finished_at = ?
            WHERE node_run_id = ? AND status IN ('pending', 'running')
            "#,
    )
    .bind(node_run.status)
    .bind(&node_run.script_run_id)
    .bind(&node_run.output)
    .bind(&node_run.error)
    .bind(node_run.finished_at)
    .bind(&node_run.node_run_id)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn list_node_runs(&self, workflow_run_id: &str) -> Result<Vec<NodeRun>, Error> {
    sqlx::query_as(
            r#"
            SELECT node_run_id, workflow_run_id, node_id, status, script_run_id, output, error, started_at, finished_at
            FROM node_runs
            WHERE workflow_run_id = ?
            ORDER BY started_at ASC
            "#,
        )
        .bind(workflow_run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)
  }
}
