//! Dashboard aggregates

use paytrack_common::api::{
    AnomalyAlert, DashboardKpis, DashboardSummary, PayrollRunSummary, Severity,
};
use paytrack_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{employees::count_employees, jobs::recent_jobs, parse_timestamp};

/// Rows shown in the recent runs and alert lists
pub const RECENT_LIMIT: i64 = 5;

/// Share of `total` not counted in `flagged`, as a percentage rounded to two
/// decimals; 0 when there are no runs
pub fn clean_percentage(total: i64, flagged: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let pct = (total - flagged) as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

async fn high_severity_alerts(pool: &SqlitePool) -> Result<Vec<AnomalyAlert>> {
    let rows = sqlx::query(
        r#"
        SELECT request_id, employee_id, category, severity, description, detected_at
        FROM anomaly_alerts
        WHERE severity = 'high'
        ORDER BY detected_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(RECENT_LIMIT)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let request_id: String = row.get("request_id");
            let detected_at: String = row.get("detected_at");
            Ok(AnomalyAlert {
                request_id: Uuid::parse_str(&request_id)
                    .map_err(|e| Error::Internal(format!("Invalid stored request id: {}", e)))?,
                employee_id: row.get("employee_id"),
                category: row.get("category"),
                severity: Severity::High,
                description: row.get("description"),
                detected_at: parse_timestamp(&detected_at)?,
            })
        })
        .collect()
}

/// Build the dashboard summary
pub async fn summary(pool: &SqlitePool) -> Result<DashboardSummary> {
    let total_employees = count_employees(pool).await?;

    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total_runs,
            COALESCE(SUM(CASE WHEN high_anomaly_count > 0 THEN 1 ELSE 0 END), 0) AS high_anomaly_runs,
            COALESCE(SUM(CASE WHEN compliance_issue_count > 0 THEN 1 ELSE 0 END), 0) AS non_compliant_runs,
            CAST(COALESCE(SUM(CASE WHEN status = '"COMPLETED"' THEN net_salary ELSE 0 END), 0) AS REAL) AS total_disbursed
        FROM payroll_jobs
        "#,
    )
    .fetch_one(pool)
    .await?;

    let total_runs: i64 = row.get("total_runs");
    let high_anomaly_runs: i64 = row.get("high_anomaly_runs");
    let non_compliant_runs: i64 = row.get("non_compliant_runs");
    let total_disbursed: f64 = row.get("total_disbursed");

    let recent_payroll_runs = recent_jobs(pool, RECENT_LIMIT)
        .await?
        .iter()
        .map(|job| PayrollRunSummary {
            request_id: job.request_id(),
            employee_id: job.employee_id().to_string(),
            status: job.status(),
            net_salary: job.result().map(|r| r.salary_breakdown.net_salary),
            created_at: job.created_at(),
        })
        .collect();

    Ok(DashboardSummary {
        kpis: DashboardKpis {
            total_employees,
            payroll_accuracy: clean_percentage(total_runs, high_anomaly_runs),
            compliance_status: clean_percentage(total_runs, non_compliant_runs),
            total_disbursed: (total_disbursed * 100.0).round() / 100.0,
        },
        recent_payroll_runs,
        anomaly_alerts: high_severity_alerts(pool).await?,
    })
}
