use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::store::StoredDocument;
use crate::core::errors::ApiError;

/// One question/answer pair and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
    pub source: String,
}

impl FaqEntry {
    /// Stored form: the question is embedded, answer and source ride along
    /// as metadata. Ids depend only on the row position.
    pub fn to_document(&self, row: usize) -> StoredDocument {
        StoredDocument {
            id: format!("id_{}", row),
            document: self.question.clone(),
            metadata: json!({ "answer": self.answer, "source": self.source }),
        }
    }

    pub fn from_document(document: &StoredDocument) -> Self {
        let field = |key: &str| {
            document
                .metadata
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            question: document.document.clone(),
            answer: field("answer"),
            source: field("source"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FaqRow {
    question: String,
    answer: String,
}

/// Read `question,answer` rows from a CSV file, labelling each with `source`.
pub fn read_faq_csv(path: &Path, source: &str) -> Result<Vec<FaqEntry>, ApiError> {
    if !path.exists() {
        return Err(ApiError::NotFound(format!(
            "FAQ source not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ApiError::BadRequest(format!("Cannot open {}: {}", path.display(), e)))?;

    let mut entries = Vec::new();
    for (index, record) in reader.deserialize::<FaqRow>().enumerate() {
        let row = record.map_err(|e| {
            ApiError::BadRequest(format!(
                "Invalid FAQ row {} in {}: {}",
                index + 1,
                path.display(),
                e
            ))
        })?;
        if row.question.is_empty() {
            tracing::warn!("Skipping FAQ row {} with empty question", index + 1);
            continue;
        }
        entries.push(FaqEntry {
            question: row.question,
            answer: row.answer,
            source: source.to_string(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_quoted_rows_and_skips_blank_questions() {
        let file = write_csv(
            "question,answer\n\
             \"What is the return policy?\",\"30 days, no questions asked\"\n\
             ,orphan answer\n\
             Do you accept cash on delivery?,Yes\n",
        );

        let entries = read_faq_csv(file.path(), "Policy 2024").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].answer, "30 days, no questions asked");
        assert_eq!(entries[1].question, "Do you accept cash on delivery?");
        assert!(entries.iter().all(|e| e.source == "Policy 2024"));
    }

    #[test]
    fn missing_columns_are_reported() {
        let file = write_csv("prompt,reply\nhi,there\n");
        let err = read_faq_csv(file.path(), "x").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_faq_csv(Path::new("/nonexistent/faq.csv"), "x").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn document_round_trip_keeps_metadata() {
        let entry = FaqEntry {
            question: "Q".to_string(),
            answer: "A".to_string(),
            source: "S".to_string(),
        };
        let document = entry.to_document(7);
        assert_eq!(document.id, "id_7");
        assert_eq!(FaqEntry::from_document(&document), entry);
    }
}
