/// Task model and database operations
///
/// Tasks belong to exactly one project and move through a Kanban-style
/// workflow (`todo`, `in_progress`, `done`). Transitions are deliberately
/// unordered: any status can be set from any other status.
///
/// Tasks carry provenance: whether they were entered directly by a user or
/// seeded from an AI suggestion. For AI-sourced tasks the originally
/// suggested priority and effort are retained so later edits can be detected.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
/// CREATE TYPE task_origin AS ENUM ('ai', 'user');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     position BIGSERIAL NOT NULL,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     priority task_priority NOT NULL DEFAULT 'medium',
///     status task_status NOT NULL DEFAULT 'todo',
///     effort_estimate INTEGER CHECK (effort_estimate >= 0),
///     ai_generated BOOLEAN NOT NULL DEFAULT FALSE,
///     ai_priority_suggestion task_priority,
///     ai_effort_suggestion INTEGER,
///     created_by task_origin NOT NULL DEFAULT 'user',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Task priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Converts priority to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// Task workflow status
///
/// No transition ordering is enforced; a task may move between any two
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

/// Task provenance: who created the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_origin", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskOrigin {
    Ai,
    User,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID (UUID v4)
    pub id: Uuid,

    /// Owning project ID
    pub project_id: Uuid,

    /// Global insertion counter, drives listing order
    ///
    /// `created_at` cannot order tasks inside a bulk batch: `NOW()` is the
    /// transaction timestamp, identical for every row of the batch.
    pub position: i64,

    /// Task title (1-200 characters)
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Priority level
    pub priority: TaskPriority,

    /// Workflow status
    pub status: TaskStatus,

    /// Estimated hours to complete (non-negative)
    pub effort_estimate: Option<i32>,

    /// Whether the task was seeded from an AI suggestion
    pub ai_generated: bool,

    /// The priority the AI originally suggested, kept for audit
    pub ai_priority_suggestion: Option<TaskPriority>,

    /// The effort the AI originally suggested, kept for audit
    pub ai_effort_suggestion: Option<i32>,

    /// Provenance flag
    pub created_by: TaskOrigin,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Priority (defaults to medium)
    pub priority: TaskPriority,

    /// Status (defaults to todo)
    pub status: TaskStatus,

    /// Estimated hours, if known
    pub effort_estimate: Option<i32>,

    /// Whether the task came from the AI adapter
    pub ai_generated: bool,

    /// Original AI priority suggestion, if AI-sourced
    pub ai_priority_suggestion: Option<TaskPriority>,

    /// Original AI effort suggestion, if AI-sourced
    pub ai_effort_suggestion: Option<i32>,

    /// Provenance flag
    pub created_by: TaskOrigin,
}

/// Input for updating an existing task
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New priority
    pub priority: Option<TaskPriority>,

    /// New status
    pub status: Option<TaskStatus>,

    /// New effort estimate
    pub effort_estimate: Option<i32>,
}

impl UpdateTask {
    /// Returns true if no fields would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.effort_estimate.is_none()
    }
}

impl Task {
    /// Creates a new task in a project
    pub async fn create(
        pool: &PgPool,
        project_id: Uuid,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(INSERT_TASK_SQL)
            .bind(project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.effort_estimate)
            .bind(data.ai_generated)
            .bind(data.ai_priority_suggestion)
            .bind(data.ai_effort_suggestion)
            .bind(data.created_by)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    /// Creates a batch of tasks atomically, preserving the supplied order
    ///
    /// All inserts run in a single transaction: either every task is
    /// persisted or none are. Callers validate the whole batch before
    /// calling so a mid-batch constraint failure is the only rollback path.
    pub async fn create_bulk(
        pool: &PgPool,
        project_id: Uuid,
        batch: Vec<CreateTask>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut tx: Transaction<'_, Postgres> = pool.begin().await?;
        let mut created = Vec::with_capacity(batch.len());

        for data in batch {
            let task = sqlx::query_as::<_, Task>(INSERT_TASK_SQL)
                .bind(project_id)
                .bind(data.title)
                .bind(data.description)
                .bind(data.priority)
                .bind(data.status)
                .bind(data.effort_estimate)
                .bind(data.ai_generated)
                .bind(data.ai_priority_suggestion)
                .bind(data.ai_effort_suggestion)
                .bind(data.created_by)
                .fetch_one(&mut *tx)
                .await?;
            created.push(task);
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, position, title, description, priority, status,
                   effort_estimate, ai_generated, ai_priority_suggestion,
                   ai_effort_suggestion, created_by, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists all tasks of a project, in creation order
    pub async fn list_by_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, position, title, description, priority, status,
                   effort_estimate, ai_generated, ai_priority_suggestion,
                   ai_effort_suggestion, created_by, created_at, updated_at
            FROM tasks
            WHERE project_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates a task
    ///
    /// Only non-None fields are updated; `updated_at` is always refreshed.
    /// Returns the updated task if found, None otherwise.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                status = COALESCE($5, status),
                effort_estimate = COALESCE($6, effort_estimate),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, project_id, position, title, description, priority, status,
                      effort_estimate, ai_generated, ai_priority_suggestion,
                      ai_effort_suggestion, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority)
        .bind(data.status)
        .bind(data.effort_estimate)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task
    ///
    /// Returns true if the task was deleted, false if it didn't exist.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether an AI-sourced task no longer matches its original suggestion
    ///
    /// Always false for user-created tasks.
    pub fn was_modified(&self) -> bool {
        if !self.ai_generated {
            return false;
        }
        self.ai_priority_suggestion != Some(self.priority)
            || self.ai_effort_suggestion != self.effort_estimate
    }
}

const INSERT_TASK_SQL: &str = r#"
    INSERT INTO tasks (project_id, title, description, priority, status,
                       effort_estimate, ai_generated, ai_priority_suggestion,
                       ai_effort_suggestion, created_by)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING id, project_id, position, title, description, priority, status,
              effort_estimate, ai_generated, ai_priority_suggestion,
              ai_effort_suggestion, created_by, created_at, updated_at
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_task() -> Task {
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            position: 1,
            title: "Write docs".to_string(),
            description: None,
            priority: TaskPriority::Medium,
            status: TaskStatus::Todo,
            effort_estimate: Some(4),
            ai_generated: false,
            ai_priority_suggestion: None,
            ai_effort_suggestion: None,
            created_by: TaskOrigin::User,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(TaskStatus::Todo.as_str(), "todo");
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(TaskStatus::Done.as_str(), "done");
    }

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let status: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        assert_eq!(status, TaskStatus::Done);
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());

        let update = UpdateTask {
            status: Some(TaskStatus::Done),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_was_modified_user_task() {
        let task = sample_task();
        assert!(!task.was_modified());
    }

    #[test]
    fn test_was_modified_ai_task_untouched() {
        let mut task = sample_task();
        task.ai_generated = true;
        task.created_by = TaskOrigin::Ai;
        task.ai_priority_suggestion = Some(TaskPriority::Medium);
        task.ai_effort_suggestion = Some(4);
        assert!(!task.was_modified());
    }

    #[test]
    fn test_was_modified_ai_task_edited() {
        let mut task = sample_task();
        task.ai_generated = true;
        task.created_by = TaskOrigin::Ai;
        task.ai_priority_suggestion = Some(TaskPriority::High);
        task.ai_effort_suggestion = Some(4);
        // priority was downgraded from the AI's suggestion
        assert!(task.was_modified());
    }

    // Integration tests for database operations require a running database
}
