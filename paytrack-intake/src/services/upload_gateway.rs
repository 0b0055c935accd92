//! Upload gateway
//!
//! Validates an uploaded document, runs the contract reader stage (parse and
//! build the contract record), then persists contract, employee registration
//! and job in one transaction. Validation failures never reach the parser;
//! parse failures never reach the store.

use chrono::Utc;
use paytrack_common::api::{ContractRecord, Stage};
use paytrack_common::events::{EventBus, PayrollEvent};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::parser::ContractParser;
use super::workflow_orchestrator::stage_event;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::contract::{build_contract_record, DocumentKind};
use crate::models::{ContractDefaults, PayrollJob, UploadedDocument};

/// Upload acceptance limits
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

impl UploadLimits {
    /// Reject a declared or observed size above the ceiling
    pub fn check_size(&self, size: usize) -> ApiResult<()> {
        if size > self.max_bytes {
            return Err(ApiError::InvalidInput(format!(
                "File exceeds the maximum upload size of {} bytes",
                self.max_bytes
            )));
        }
        Ok(())
    }
}

/// Classify an upload, rejecting disallowed types and empty files
pub fn classify_upload(
    file_name: &str,
    content_type: Option<&str>,
    size: usize,
    limits: &UploadLimits,
) -> ApiResult<DocumentKind> {
    limits.check_size(size)?;

    let kind = DocumentKind::detect(file_name, content_type).ok_or_else(|| {
        ApiError::InvalidInput(format!(
            "Unsupported file type for {} ({}); allowed: PDF, DOCX, TXT",
            file_name,
            content_type.unwrap_or("unknown content type")
        ))
    })?;

    if size == 0 {
        return Err(ApiError::InvalidInput(format!("File {} is empty", file_name)));
    }
    Ok(kind)
}

/// File name safe to join onto the uploads directory
fn stored_file_name(request_id: Uuid, file_name: &str) -> String {
    let base = std::path::Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", request_id.simple(), safe)
}

#[derive(Clone)]
pub struct UploadGateway {
    db: SqlitePool,
    event_bus: EventBus,
    parser: Arc<dyn ContractParser>,
    uploads_dir: PathBuf,
    defaults: ContractDefaults,
}

impl UploadGateway {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        parser: Arc<dyn ContractParser>,
        uploads_dir: PathBuf,
        defaults: ContractDefaults,
    ) -> Self {
        Self {
            db,
            event_bus,
            parser,
            uploads_dir,
            defaults,
        }
    }

    /// Parse and persist a validated document.
    ///
    /// On success the job exists in the store with CONTRACT_READER completed
    /// and the remaining stages PENDING.
    pub async fn accept(&self, document: UploadedDocument) -> ApiResult<(ContractRecord, PayrollJob)> {
        let fields = self.parser.parse(&document).await.map_err(|e| {
            tracing::warn!(
                file_name = %document.file_name,
                parser = self.parser.name(),
                error = %e,
                "Contract parsing failed"
            );
            ApiError::from(e)
        })?;

        let request_id = Uuid::new_v4();
        let contract = build_contract_record(
            request_id,
            fields,
            &document.file_name,
            &self.defaults,
            Utc::now(),
        );

        let mut job = PayrollJob::new(request_id, contract.employee_id.clone());
        job.start_stage(Stage::ContractReader, "Reading contract")?;
        job.complete_stage(
            Stage::ContractReader,
            &format!("Contract parsed for {}", contract.employee_name),
        )?;

        // The file is kept only once parsing succeeded
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let stored_path = self
            .uploads_dir
            .join(stored_file_name(request_id, &document.file_name));
        tokio::fs::write(&stored_path, &document.bytes).await?;

        if let Err(e) = self.persist(&contract, &job, &stored_path).await {
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                tracing::warn!(path = %stored_path.display(), error = %rm, "Failed to remove orphaned upload");
            }
            return Err(e);
        }

        tracing::info!(
            request_id = %request_id,
            employee_id = %contract.employee_id,
            file_name = %document.file_name,
            "Contract accepted"
        );

        self.event_bus.emit_lossy(PayrollEvent::JobStarted {
            request_id,
            employee_id: contract.employee_id.clone(),
            file_name: document.file_name.clone(),
            timestamp: Utc::now(),
        });
        self.event_bus
            .emit_lossy(stage_event(&job, Stage::ContractReader));

        Ok((contract, job))
    }

    async fn persist(
        &self,
        contract: &ContractRecord,
        job: &PayrollJob,
        stored_path: &std::path::Path,
    ) -> ApiResult<()> {
        let persistence = |e: paytrack_common::Error| ApiError::PersistenceFailure(e.to_string());

        let mut tx = self.db.begin().await?;
        db::contracts::insert_contract(&mut tx, contract, stored_path.to_str())
            .await
            .map_err(persistence)?;
        let registered = db::employees::register_from_contract(&mut tx, contract)
            .await
            .map_err(persistence)?;
        db::jobs::save_job_in(&mut tx, job).await.map_err(persistence)?;
        tx.commit().await?;

        if registered {
            tracing::info!(employee_id = %contract.employee_id, "Employee registered from contract");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::parser::{LocalContractParser, ParseError};
    use async_trait::async_trait;
    use paytrack_common::api::{ContractFields, JobStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingParser {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContractParser for CountingParser {
        async fn parse(&self, _: &UploadedDocument) -> Result<ContractFields, ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ParseError::NoRecognizedFields)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn defaults() -> ContractDefaults {
        ContractDefaults {
            region: "IN".to_string(),
            currency: "INR".to_string(),
        }
    }

    fn text_doc(text: &str) -> UploadedDocument {
        UploadedDocument {
            file_name: "offer letter.txt".to_string(),
            kind: DocumentKind::PlainText,
            bytes: text.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_classify_rejects_oversize_and_type() {
        let limits = UploadLimits { max_bytes: 10 };
        assert!(matches!(
            classify_upload("a.txt", Some("text/plain"), 11, &limits),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            classify_upload("a.png", Some("image/png"), 5, &limits),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            classify_upload("a.txt", Some("text/plain"), 0, &limits),
            Err(ApiError::InvalidInput(_))
        ));
        assert_eq!(
            classify_upload("a.pdf", None, 5, &limits).unwrap(),
            DocumentKind::Pdf
        );
    }

    #[test]
    fn test_stored_file_name_is_flat() {
        let id = Uuid::nil();
        assert_eq!(
            stored_file_name(id, "../../etc/pass wd.txt"),
            format!("{}_pass_wd.txt", id.simple())
        );
    }

    #[tokio::test]
    async fn test_accept_persists_contract_job_and_employee() {
        let pool = db::test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let gateway = UploadGateway::new(
            pool.clone(),
            EventBus::new(16),
            Arc::new(LocalContractParser::new()),
            dir.path().join("uploads"),
            defaults(),
        );

        let (contract, job) = gateway
            .accept(text_doc("Employee ID: E-77\nName: Ravi Kumar\nBasic Salary: 30,000\n"))
            .await
            .unwrap();

        assert_eq!(contract.employee_id, "E-77");
        assert_eq!(contract.currency, "INR");
        assert_eq!(job.status(), JobStatus::Running);
        assert_eq!(job.stage(Stage::ContractReader).status, JobStatus::Completed);

        let stored = db::jobs::load_job(&pool, contract.request_id).await.unwrap().unwrap();
        assert_eq!(stored, job);
        assert!(db::contracts::load_contract(&pool, contract.request_id).await.unwrap().is_some());
        assert!(db::employees::get_employee(&pool, "E-77").await.unwrap().is_some());
        assert_eq!(std::fs::read_dir(dir.path().join("uploads")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_leaves_no_state() {
        let pool = db::test_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let parser = Arc::new(CountingParser {
            calls: AtomicUsize::new(0),
        });
        let gateway = UploadGateway::new(
            pool.clone(),
            EventBus::new(16),
            parser.clone(),
            dir.path().join("uploads"),
            defaults(),
        );

        let err = gateway.accept(text_doc("anything")).await.unwrap_err();
        assert!(matches!(err, ApiError::ParseFailure(_)));
        assert_eq!(parser.calls.load(Ordering::SeqCst), 1);

        let jobs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payroll_jobs")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(jobs, 0);
        assert!(!dir.path().join("uploads").exists());
    }
}
