/// Read-only analytics endpoints
///
/// All aggregates are scoped to the authenticated user: they cover every
/// task in every project the user belongs to, regardless of role. A failed
/// aggregate degrades to zero values rather than failing the request, so
/// dashboards always render.
///
/// # Endpoints
///
/// - `GET /v1/analytics/kpis` - Headline numbers
/// - `GET /v1/analytics/task-trends` - Daily created/completed counts (30 days)
/// - `GET /v1/analytics/priority-distribution` - Task counts per priority
/// - `GET /v1/analytics/status-distribution` - Task counts per status

use crate::{app::AppState, error::ApiResult};
use adept_shared::auth::middleware::AuthContext;
use axum::{extract::State, Extension, Json};
use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Number of days covered by the task-trends endpoint
const TREND_WINDOW_DAYS: i64 = 30;

/// Headline metrics for the dashboard
#[derive(Debug, Serialize)]
pub struct KpiResponse {
    /// Projects the user belongs to
    pub total_projects: i64,

    /// Tasks across all those projects
    pub total_tasks: i64,

    /// Tasks with status `done`
    pub completed_tasks: i64,

    /// Tasks with status `in_progress`
    pub in_progress_tasks: i64,

    /// Percentage of tasks completed, rounded to one decimal
    pub completion_rate: f64,

    /// Mean days from creation to completion, `null` when nothing is done
    pub avg_completion_time: Option<f64>,
}

/// One day of task activity
#[derive(Debug, Serialize)]
pub struct TrendPoint {
    /// Calendar date (UTC)
    pub date: NaiveDate,

    /// Tasks created on this date
    pub created: i64,

    /// Tasks completed on this date
    pub completed: i64,
}

/// Count of tasks in one bucket
#[derive(Debug, Serialize)]
pub struct DistributionBucket {
    /// Bucket name (priority or status value)
    pub name: String,

    /// Number of tasks in the bucket
    pub count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DateCount {
    date: NaiveDate,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct BucketCount {
    name: String,
    count: i64,
}

/// Headline KPIs for the authenticated user
pub async fn get_kpis(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<KpiResponse>> {
    let total_projects = count_or_zero(
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM project_members WHERE user_id = $1",
        )
        .bind(auth.user_id)
        .fetch_one(&state.db)
        .await,
        "total_projects",
    );

    if total_projects == 0 {
        return Ok(Json(KpiResponse {
            total_projects: 0,
            total_tasks: 0,
            completed_tasks: 0,
            in_progress_tasks: 0,
            completion_rate: 0.0,
            avg_completion_time: None,
        }));
    }

    let total_tasks = count_or_zero(
        scoped_task_count(&state.db, auth.user_id, None).await,
        "total_tasks",
    );
    let completed_tasks = count_or_zero(
        scoped_task_count(&state.db, auth.user_id, Some("done")).await,
        "completed_tasks",
    );
    let in_progress_tasks = count_or_zero(
        scoped_task_count(&state.db, auth.user_id, Some("in_progress")).await,
        "in_progress_tasks",
    );

    let completion_rate = if total_tasks > 0 {
        let rate = completed_tasks as f64 / total_tasks as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    } else {
        0.0
    };

    // Completion time derives from updated_at: a done task's last write is
    // the transition into done
    let avg_completion_time = sqlx::query_scalar::<_, Option<f64>>(
        r#"
        SELECT AVG(EXTRACT(EPOCH FROM (t.updated_at - t.created_at)) / 86400.0)::double precision
        FROM tasks t
        WHERE t.status = 'done'
          AND t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)
        "#,
    )
    .bind(auth.user_id)
    .fetch_one(&state.db)
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(error = %e, "avg_completion_time aggregate failed, degrading to null");
        None
    })
    .map(|days| (days * 10.0).round() / 10.0);

    Ok(Json(KpiResponse {
        total_projects,
        total_tasks,
        completed_tasks,
        in_progress_tasks,
        completion_rate,
        avg_completion_time,
    }))
}

/// Daily created/completed counts over the last 30 days
///
/// Every date in the window is present, zero-filled where nothing happened.
pub async fn get_task_trends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    let today = Utc::now().date_naive();
    let window_start = today - Duration::days(TREND_WINDOW_DAYS - 1);

    let created = date_counts(
        &state.db,
        auth.user_id,
        window_start,
        "SELECT t.created_at::date AS date, COUNT(*) AS count
         FROM tasks t
         WHERE t.created_at::date >= $2
           AND t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)
         GROUP BY t.created_at::date",
        "created trend",
    )
    .await;

    let completed = date_counts(
        &state.db,
        auth.user_id,
        window_start,
        "SELECT t.updated_at::date AS date, COUNT(*) AS count
         FROM tasks t
         WHERE t.status = 'done'
           AND t.updated_at::date >= $2
           AND t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)
         GROUP BY t.updated_at::date",
        "completed trend",
    )
    .await;

    let points = fill_trend_window(window_start, today, &created, &completed);
    Ok(Json(points))
}

/// Task counts per priority bucket
///
/// Always returns all three buckets (low, medium, high), zero-filled.
pub async fn get_priority_distribution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<DistributionBucket>>> {
    let counts = bucket_counts(
        &state.db,
        auth.user_id,
        "SELECT t.priority::text AS name, COUNT(*) AS count
         FROM tasks t
         WHERE t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)
         GROUP BY t.priority",
        "priority distribution",
    )
    .await;

    Ok(Json(fill_buckets(&["low", "medium", "high"], &counts)))
}

/// Task counts per status bucket
///
/// Always returns all three buckets (todo, in_progress, done), zero-filled.
pub async fn get_status_distribution(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<DistributionBucket>>> {
    let counts = bucket_counts(
        &state.db,
        auth.user_id,
        "SELECT t.status::text AS name, COUNT(*) AS count
         FROM tasks t
         WHERE t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)
         GROUP BY t.status",
        "status distribution",
    )
    .await;

    Ok(Json(fill_buckets(&["todo", "in_progress", "done"], &counts)))
}

/// Counts tasks across the user's projects, optionally filtered by status
async fn scoped_task_count(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<&str>,
) -> Result<i64, sqlx::Error> {
    match status {
        Some(status) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM tasks t
                 WHERE t.status = $2::task_status
                   AND t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)",
            )
            .bind(user_id)
            .bind(status)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM tasks t
                 WHERE t.project_id IN (SELECT project_id FROM project_members WHERE user_id = $1)",
            )
            .bind(user_id)
            .fetch_one(pool)
            .await
        }
    }
}

async fn date_counts(
    pool: &PgPool,
    user_id: Uuid,
    window_start: NaiveDate,
    query: &str,
    label: &str,
) -> Vec<DateCount> {
    sqlx::query_as::<_, DateCount>(query)
        .bind(user_id)
        .bind(window_start)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "{} aggregate failed, degrading to zeros", label);
            Vec::new()
        })
}

async fn bucket_counts(pool: &PgPool, user_id: Uuid, query: &str, label: &str) -> Vec<BucketCount> {
    sqlx::query_as::<_, BucketCount>(query)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "{} aggregate failed, degrading to zeros", label);
            Vec::new()
        })
}

fn count_or_zero(result: Result<i64, sqlx::Error>, label: &str) -> i64 {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "{} aggregate failed, degrading to zero", label);
        0
    })
}

/// Expands sparse per-date counts into a dense, ordered window
fn fill_trend_window(
    start: NaiveDate,
    end: NaiveDate,
    created: &[DateCount],
    completed: &[DateCount],
) -> Vec<TrendPoint> {
    let mut points = Vec::with_capacity(TREND_WINDOW_DAYS as usize);
    let mut date = start;
    while date <= end {
        let created_count = created
            .iter()
            .find(|c| c.date == date)
            .map(|c| c.count)
            .unwrap_or(0);
        let completed_count = completed
            .iter()
            .find(|c| c.date == date)
            .map(|c| c.count)
            .unwrap_or(0);
        points.push(TrendPoint {
            date,
            created: created_count,
            completed: completed_count,
        });
        date += Duration::days(1);
    }
    points
}

/// Expands sparse bucket counts into the fixed bucket order, zero-filled
fn fill_buckets(order: &[&str], counts: &[BucketCount]) -> Vec<DistributionBucket> {
    order
        .iter()
        .map(|name| DistributionBucket {
            name: (*name).to_string(),
            count: counts
                .iter()
                .find(|c| c.name == *name)
                .map(|c| c.count)
                .unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_buckets_all_present_in_order() {
        let counts = vec![
            BucketCount {
                name: "high".to_string(),
                count: 2,
            },
            BucketCount {
                name: "low".to_string(),
                count: 5,
            },
        ];

        let buckets = fill_buckets(&["low", "medium", "high"], &counts);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].name, "low");
        assert_eq!(buckets[0].count, 5);
        assert_eq!(buckets[1].name, "medium");
        assert_eq!(buckets[1].count, 0);
        assert_eq!(buckets[2].name, "high");
        assert_eq!(buckets[2].count, 2);
    }

    #[test]
    fn test_fill_trend_window_is_dense_and_ordered() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let created = vec![DateCount {
            date: NaiveDate::from_ymd_opt(2025, 1, 3).unwrap(),
            count: 4,
        }];

        let points = fill_trend_window(start, end, &created, &[]);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].date, start);
        assert_eq!(points[4].date, end);
        assert_eq!(points[2].created, 4);
        assert_eq!(points[2].completed, 0);
        assert!(points.iter().all(|p| p.completed == 0));
    }

    #[test]
    fn test_empty_counts_fill_with_zeros() {
        let buckets = fill_buckets(&["todo", "in_progress", "done"], &[]);
        assert!(buckets.iter().all(|b| b.count == 0));
        assert_eq!(buckets.len(), 3);
    }

    // Integration tests for the SQL aggregates require a running database
}
