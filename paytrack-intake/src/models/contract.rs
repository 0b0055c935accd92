//! Uploaded documents and contract record construction

use chrono::{DateTime, Utc};
use paytrack_common::api::{ContractFields, ContractRecord};
use uuid::Uuid;

/// Accepted document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentKind {
    pub const PDF_MIME: &'static str = "application/pdf";
    pub const DOCX_MIME: &'static str =
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
    pub const TEXT_MIME: &'static str = "text/plain";

    /// Classify by declared content type, falling back to the file extension
    /// when the type is missing or generic
    pub fn detect(file_name: &str, content_type: Option<&str>) -> Option<Self> {
        let by_mime = content_type.and_then(|ct| {
            // Ignore parameters such as "; charset=utf-8"
            let essence = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            match essence.as_str() {
                Self::PDF_MIME => Some(DocumentKind::Pdf),
                Self::DOCX_MIME => Some(DocumentKind::Docx),
                Self::TEXT_MIME => Some(DocumentKind::PlainText),
                _ => None,
            }
        });
        if by_mime.is_some() {
            return by_mime;
        }

        let generic = content_type
            .map(|ct| ct.trim().is_empty() || ct.starts_with("application/octet-stream"))
            .unwrap_or(true);
        if !generic {
            return None;
        }

        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::PlainText),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => Self::PDF_MIME,
            DocumentKind::Docx => Self::DOCX_MIME,
            DocumentKind::PlainText => Self::TEXT_MIME,
        }
    }
}

/// A validated upload, ready for parsing
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
}

/// Fallback values for fields a contract does not state
#[derive(Debug, Clone)]
pub struct ContractDefaults {
    pub region: String,
    pub currency: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Build the persisted record from parsed fields.
///
/// Salary components keep their parsed values (absent ones are already zero);
/// identifiers that the contract omits get placeholders.
pub fn build_contract_record(
    request_id: Uuid,
    fields: ContractFields,
    file_name: &str,
    defaults: &ContractDefaults,
    uploaded_at: DateTime<Utc>,
) -> ContractRecord {
    let short_id = request_id.simple().to_string()[..8].to_uppercase();

    ContractRecord {
        request_id,
        employee_id: non_empty(fields.employee_id).unwrap_or_else(|| format!("EMP-{}", short_id)),
        employee_name: non_empty(fields.employee_name)
            .unwrap_or_else(|| "Unknown Employee".to_string()),
        employee_email: non_empty(fields.employee_email),
        employee_phone: non_empty(fields.employee_phone),
        designation: non_empty(fields.designation).unwrap_or_else(|| "Employee".to_string()),
        department: non_empty(fields.department).unwrap_or_else(|| "General".to_string()),
        join_date: fields.join_date,
        salary_components: fields.salary_components,
        statutory_obligations: fields.statutory_obligations,
        region: non_empty(fields.region).unwrap_or_else(|| defaults.region.clone()),
        currency: non_empty(fields.currency).unwrap_or_else(|| defaults.currency.clone()),
        file_name: file_name.to_string(),
        uploaded_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ContractDefaults {
        ContractDefaults {
            region: "IN".to_string(),
            currency: "INR".to_string(),
        }
    }

    #[test]
    fn test_detect_by_mime() {
        assert_eq!(
            DocumentKind::detect("x.bin", Some("application/pdf")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect("x", Some("text/plain; charset=utf-8")),
            Some(DocumentKind::PlainText)
        );
    }

    #[test]
    fn test_detect_falls_back_to_extension_for_generic_type() {
        assert_eq!(
            DocumentKind::detect("offer.DOCX", Some("application/octet-stream")),
            Some(DocumentKind::Docx)
        );
        assert_eq!(DocumentKind::detect("offer.txt", None), Some(DocumentKind::PlainText));
    }

    #[test]
    fn test_detect_rejects_other_types() {
        assert_eq!(DocumentKind::detect("photo.png", Some("image/png")), None);
        // A specific but disallowed type is not rescued by the extension
        assert_eq!(DocumentKind::detect("contract.pdf", Some("image/png")), None);
        assert_eq!(DocumentKind::detect("sheet.xlsx", None), None);
    }

    #[test]
    fn test_record_defaults() {
        let id = Uuid::new_v4();
        let record = build_contract_record(id, ContractFields::default(), "c.txt", &defaults(), Utc::now());

        assert!(record.employee_id.starts_with("EMP-"));
        assert_eq!(record.employee_name, "Unknown Employee");
        assert_eq!(record.designation, "Employee");
        assert_eq!(record.department, "General");
        assert_eq!(record.region, "IN");
        assert_eq!(record.currency, "INR");
        assert_eq!(record.salary_components.total(), 0.0);
    }

    #[test]
    fn test_record_keeps_parsed_values() {
        let fields = ContractFields {
            employee_id: Some(" E-7 ".to_string()),
            currency: Some("AED".to_string()),
            ..Default::default()
        };
        let record = build_contract_record(Uuid::new_v4(), fields, "c.txt", &defaults(), Utc::now());
        assert_eq!(record.employee_id, "E-7");
        assert_eq!(record.currency, "AED");
    }
}
