use crate::models::{JobLogRecord, StoredJobLog};
use sqlx::PgConnection;
use tracing::Instrument;
use uuid::Uuid;

/// Append one row to `job_logs`. The store assigns id and timestamp.
#[tracing::instrument(name = "Insert job log into database", skip(connection))]
pub async fn insert(connection: &mut PgConnection, record: &JobLogRecord) -> Result<(), String> {
    let query_span = tracing::info_span!("Saving job log to database");
    sqlx::query(
        r#"
        INSERT INTO job_logs (job_id, level, message)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(record.job_id)
    .bind(record.level.as_str())
    .bind(&record.message)
    .execute(connection)
    .instrument(query_span)
    .await
    .map(|_| {
        tracing::info!("Job log for {} has been saved to the database", record.job_id);
    })
    .map_err(|err| {
        tracing::error!("Failed to insert job log: {:?}", err);
        format!("Failed to insert job log: {}", err)
    })
}

/// Rows for one job, oldest first.
pub async fn list_for_job(
    connection: &mut PgConnection,
    job_id: Uuid,
) -> Result<Vec<StoredJobLog>, String> {
    let query_span = tracing::info_span!("Fetching job logs by job ID");
    sqlx::query_as::<_, StoredJobLog>(
        r#"
        SELECT id, job_id, timestamp, level, message
        FROM job_logs
        WHERE job_id = $1
        ORDER BY timestamp ASC, id ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(connection)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch job logs: {:?}", err);
        format!("Failed to fetch job logs: {}", err)
    })
}
