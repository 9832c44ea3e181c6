use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Uploading,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Processing, DocumentStatus::Uploading)
                | (DocumentStatus::Uploading, DocumentStatus::Completed)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
                | (DocumentStatus::Uploading, DocumentStatus::Failed)
        )
    }

    pub fn sources_of(next: DocumentStatus) -> &'static [DocumentStatus] {
        match next {
            DocumentStatus::Processing => &[],
            DocumentStatus::Uploading => &[DocumentStatus::Processing],
            DocumentStatus::Completed => &[DocumentStatus::Uploading],
            DocumentStatus::Failed => &[DocumentStatus::Processing, DocumentStatus::Uploading],
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "uploading" => Ok(DocumentStatus::Uploading),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub file_id: Uuid,
    pub original_name: String,
    pub status: DocumentStatus,
    pub converted_url: Option<String>,
    pub password_protected: bool,
    /// Argon2 PHC string; the raw password is never stored.
    pub password_verifier: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl DocumentRecord {
    pub fn new(original_name: &str, password_verifier: Option<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            file_id: Uuid::new_v4(),
            original_name: original_name.to_string(),
            status: DocumentStatus::Processing,
            converted_url: None,
            password_protected: password_verifier.is_some(),
            password_verifier,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct DocumentRow {
    pub file_id: Uuid,
    pub original_name: String,
    pub status: String,
    pub converted_url: Option<String>,
    pub password_protected: bool,
    pub password_verifier: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = String;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            file_id: row.file_id,
            original_name: row.original_name,
            status: row.status.parse()?,
            converted_url: row.converted_url,
            password_protected: row.password_protected,
            password_verifier: row.password_verifier,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StoredArtifact {
    pub artifact_key: String,
    pub file_id: Uuid,
    pub size_bytes: i64,
    pub password_protected: bool,
    pub download_count: i64,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use DocumentStatus::*;

    const ALL: [DocumentStatus; 4] = [Processing, Uploading, Completed, Failed];

    #[test]
    fn happy_path_transitions() {
        assert!(Processing.can_transition_to(Uploading));
        assert!(Uploading.can_transition_to(Completed));
    }

    #[test]
    fn failure_edge_from_non_terminal_states_only() {
        assert!(Processing.can_transition_to(Failed));
        assert!(Uploading.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn terminal_states_never_move() {
        for from in [Completed, Failed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn no_skipping_or_going_back() {
        assert!(!Processing.can_transition_to(Completed));
        assert!(!Uploading.can_transition_to(Processing));
        assert!(!Processing.can_transition_to(Processing));
    }

    #[test]
    fn sources_agree_with_transition_table() {
        for to in ALL {
            for from in ALL {
                assert_eq!(
                    DocumentStatus::sources_of(to).contains(&from),
                    from.can_transition_to(to),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn status_text_round_trips_through_storage_form() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<DocumentStatus>().unwrap(), status);
        }
        assert!("done".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn new_record_starts_processing() {
        let record = DocumentRecord::new("report.docx", None);
        assert_eq!(record.status, Processing);
        assert!(record.converted_url.is_none());
        assert!(!record.password_protected);
    }
}
