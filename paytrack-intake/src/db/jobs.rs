//! Payroll job persistence
//!
//! Each save is a single upsert of the whole job snapshot, so a reader sees
//! either the previous or the new state, never a mix. Rows whose status is
//! terminal are never overwritten.

use paytrack_common::api::{JobStatus, Severity};
use paytrack_common::{Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::timestamp;
use crate::models::PayrollJob;

fn status_value(status: JobStatus) -> Result<String> {
    Ok(serde_json::to_string(&status)?)
}

/// Save a job on an open connection.
///
/// Returns `false` when the stored row is already terminal and was left
/// untouched.
pub async fn save_job_in(conn: &mut SqliteConnection, job: &PayrollJob) -> Result<bool> {
    let status = job.status();
    let snapshot = serde_json::to_string(job)?;
    let result = job.result();
    let net_salary = result.map(|r| r.salary_breakdown.net_salary);
    let high_anomaly_count = result
        .map(|r| {
            r.anomaly_report
                .anomalies
                .iter()
                .filter(|a| a.severity == Severity::High)
                .count() as i64
        })
        .unwrap_or(0);
    let compliance_issue_count = result
        .map(|r| r.compliance_status.compliance_issues.len() as i64)
        .unwrap_or(0);

    let written = sqlx::query(
        r#"
        INSERT INTO payroll_jobs (
            request_id, employee_id, status, snapshot, net_salary,
            high_anomaly_count, compliance_issue_count, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(request_id) DO UPDATE SET
            status = excluded.status,
            snapshot = excluded.snapshot,
            net_salary = excluded.net_salary,
            high_anomaly_count = excluded.high_anomaly_count,
            compliance_issue_count = excluded.compliance_issue_count,
            updated_at = excluded.updated_at
        WHERE payroll_jobs.status NOT IN ('"COMPLETED"', '"FAILED"')
        "#,
    )
    .bind(job.request_id().to_string())
    .bind(job.employee_id())
    .bind(status_value(status)?)
    .bind(&snapshot)
    .bind(net_salary)
    .bind(high_anomaly_count)
    .bind(compliance_issue_count)
    .bind(timestamp(job.created_at()))
    .bind(timestamp(job.updated_at()))
    .execute(&mut *conn)
    .await?
    .rows_affected()
        > 0;

    // Alerts are recorded once, with the write that makes the job COMPLETED
    if written && status == JobStatus::Completed {
        if let Some(result) = result {
            for anomaly in &result.anomaly_report.anomalies {
                let severity = serde_json::to_value(anomaly.severity)?;
                sqlx::query(
                    r#"
                    INSERT INTO anomaly_alerts (
                        request_id, employee_id, category, severity, description, detected_at
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(job.request_id().to_string())
                .bind(job.employee_id())
                .bind(&anomaly.category)
                .bind(severity.as_str().unwrap_or_default())
                .bind(&anomaly.description)
                .bind(timestamp(job.updated_at()))
                .execute(&mut *conn)
                .await?;
            }
        }
    }

    Ok(written)
}

/// Save a job in its own transaction
pub async fn save_job(pool: &SqlitePool, job: &PayrollJob) -> Result<bool> {
    let mut tx = pool.begin().await?;
    let written = save_job_in(&mut tx, job).await?;
    tx.commit().await?;
    Ok(written)
}

fn decode_snapshot(snapshot: &str) -> Result<PayrollJob> {
    serde_json::from_str(snapshot)
        .map_err(|e| Error::Internal(format!("Failed to deserialize job snapshot: {}", e)))
}

/// Load a job
pub async fn load_job(pool: &SqlitePool, request_id: Uuid) -> Result<Option<PayrollJob>> {
    let row = sqlx::query("SELECT snapshot FROM payroll_jobs WHERE request_id = ?")
        .bind(request_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| decode_snapshot(row.get::<&str, _>("snapshot")))
        .transpose()
}

/// All jobs for an employee, newest first
pub async fn jobs_for_employee(pool: &SqlitePool, employee_id: &str) -> Result<Vec<PayrollJob>> {
    let rows = sqlx::query(
        "SELECT snapshot FROM payroll_jobs WHERE employee_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| decode_snapshot(row.get::<&str, _>("snapshot")))
        .collect()
}

/// Newest jobs across all employees
pub async fn recent_jobs(pool: &SqlitePool, limit: i64) -> Result<Vec<PayrollJob>> {
    let rows = sqlx::query(
        "SELECT snapshot FROM payroll_jobs ORDER BY created_at DESC, rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| decode_snapshot(row.get::<&str, _>("snapshot")))
        .collect()
}

/// Jobs that never reached a terminal state (left behind by a shutdown)
pub async fn unfinished_jobs(pool: &SqlitePool) -> Result<Vec<PayrollJob>> {
    let rows = sqlx::query(
        r#"SELECT snapshot FROM payroll_jobs WHERE status NOT IN ('"COMPLETED"', '"FAILED"')"#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| decode_snapshot(row.get::<&str, _>("snapshot")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::contracts::{insert_contract, tests::sample_contract};
    use crate::db::test_pool;
    use paytrack_common::api::Stage;

    async fn job_with_contract(pool: &SqlitePool, employee_id: &str) -> PayrollJob {
        let contract = sample_contract(employee_id);
        let mut conn = pool.acquire().await.unwrap();
        insert_contract(&mut conn, &contract, None).await.unwrap();
        PayrollJob::new(contract.request_id, employee_id.to_string())
    }

    #[tokio::test]
    async fn test_save_and_load_job() {
        let pool = test_pool().await;
        let mut job = job_with_contract(&pool, "E-1").await;

        assert!(save_job(&pool, &job).await.unwrap());
        job.start_stage(Stage::ContractReader, "Reading").unwrap();
        assert!(save_job(&pool, &job).await.unwrap());

        let loaded = load_job(&pool, job.request_id()).await.unwrap().unwrap();
        assert_eq!(loaded, job);
        assert_eq!(loaded.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn test_unknown_job_is_none() {
        let pool = test_pool().await;
        assert!(load_job(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_row_is_never_overwritten() {
        let pool = test_pool().await;
        let mut job = job_with_contract(&pool, "E-2").await;
        job.start_stage(Stage::ContractReader, "Reading").unwrap();
        job.fail_stage(Stage::ContractReader, "boom").unwrap();
        assert!(save_job(&pool, &job).await.unwrap());

        // A stale in-memory copy tries to write a non-terminal state
        let stale = PayrollJob::new(job.request_id(), "E-2".to_string());
        assert!(!save_job(&pool, &stale).await.unwrap());

        let loaded = load_job(&pool, job.request_id()).await.unwrap().unwrap();
        assert_eq!(loaded.status(), JobStatus::Failed);
        assert!(unfinished_jobs(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jobs_for_employee_newest_first() {
        let pool = test_pool().await;
        let first = job_with_contract(&pool, "E-3").await;
        save_job(&pool, &first).await.unwrap();
        let second = job_with_contract(&pool, "E-3").await;
        save_job(&pool, &second).await.unwrap();
        let other = job_with_contract(&pool, "E-4").await;
        save_job(&pool, &other).await.unwrap();

        let jobs = jobs_for_employee(&pool, "E-3").await.unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].request_id(), second.request_id());
        assert_eq!(recent_jobs(&pool, 5).await.unwrap().len(), 3);
        assert_eq!(unfinished_jobs(&pool).await.unwrap().len(), 3);
    }
}
