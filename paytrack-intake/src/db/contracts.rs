//! Contract record persistence. Records are write-once.

use paytrack_common::api::ContractRecord;
use paytrack_common::{Error, Result};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::timestamp;

/// Insert a contract record on an open connection (usually a transaction)
pub async fn insert_contract(
    conn: &mut SqliteConnection,
    contract: &ContractRecord,
    stored_path: Option<&str>,
) -> Result<()> {
    let record = serde_json::to_string(contract)?;

    sqlx::query(
        r#"
        INSERT INTO contracts (request_id, employee_id, file_name, stored_path, record, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(contract.request_id.to_string())
    .bind(&contract.employee_id)
    .bind(&contract.file_name)
    .bind(stored_path)
    .bind(&record)
    .bind(timestamp(contract.uploaded_at))
    .execute(conn)
    .await?;

    Ok(())
}

/// Load a contract record
pub async fn load_contract(pool: &SqlitePool, request_id: Uuid) -> Result<Option<ContractRecord>> {
    let row = sqlx::query("SELECT record FROM contracts WHERE request_id = ?")
        .bind(request_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let record: String = row.get("record");
        serde_json::from_str(&record)
            .map_err(|e| Error::Internal(format!("Failed to deserialize contract: {}", e)))
    })
    .transpose()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Utc;
    use paytrack_common::api::SalaryComponents;

    pub(crate) fn sample_contract(employee_id: &str) -> ContractRecord {
        ContractRecord {
            request_id: Uuid::new_v4(),
            employee_id: employee_id.to_string(),
            employee_name: "Asha Rao".to_string(),
            employee_email: Some(format!("{}@example.com", employee_id.to_lowercase())),
            employee_phone: None,
            designation: "Analyst".to_string(),
            department: "Finance".to_string(),
            join_date: None,
            salary_components: SalaryComponents {
                basic_salary: 50_000.0,
                hra: 20_000.0,
                ..Default::default()
            },
            statutory_obligations: vec!["PF".to_string(), "TDS".to_string()],
            region: "IN".to_string(),
            currency: "INR".to_string(),
            file_name: "contract.txt".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_contract() {
        let pool = test_pool().await;
        let contract = sample_contract("E-100");

        let mut conn = pool.acquire().await.unwrap();
        insert_contract(&mut conn, &contract, Some("/tmp/x.txt")).await.unwrap();
        drop(conn);

        let loaded = load_contract(&pool, contract.request_id).await.unwrap();
        assert_eq!(loaded, Some(contract));
        assert!(load_contract(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_contract_is_write_once() {
        let pool = test_pool().await;
        let contract = sample_contract("E-101");

        let mut conn = pool.acquire().await.unwrap();
        insert_contract(&mut conn, &contract, None).await.unwrap();
        assert!(insert_contract(&mut conn, &contract, None).await.is_err());
    }
}
