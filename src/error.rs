use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure to recover text from an uploaded file.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),

    #[error("could not read Word document: {0}")]
    Docx(String),

    #[error("text file is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("document parser crashed on this file")]
    ParserPanicked,
}

/// Failure of the text-generation backend.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request to the generation backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from the generation backend: {0}")]
    MalformedResponse(String),
}

/// PDF export was handed a character the built-in fonts cannot encode.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("character {ch:?} at position {position} cannot be encoded as Latin-1")]
pub struct EncodingError {
    pub ch: char,
    pub position: usize,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("failed to write PDF: {0}")]
    Pdf(String),

    #[error("failed to write Word document: {0}")]
    Word(String),
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Error extracting text: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Error during content generation: {0}")]
    Generation(#[from] GenerationError),

    #[error("Error exporting document: {0}")]
    Export(#[from] ExportError),

    #[error("session not found")]
    SessionNotFound,

    #[error("no document has been uploaded in this session")]
    NoDocument,

    #[error("the session was reset or given a new document while this request was running")]
    DocumentChanged,

    #[error("{0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Generation(_) => StatusCode::BAD_GATEWAY,
            AppError::Export(ExportError::Encoding(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SessionNotFound => StatusCode::NOT_FOUND,
            AppError::DocumentChanged => StatusCode::CONFLICT,
            AppError::NoDocument | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        let body = Json(serde_json::json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::SessionNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NoDocument.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::DocumentChanged.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::from(GenerationError::MalformedResponse("x".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        let encoding = ExportError::from(EncodingError { ch: '€', position: 4 });
        assert_eq!(
            AppError::from(encoding).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn encoding_error_names_the_character() {
        let err = EncodingError { ch: '→', position: 12 };
        assert_eq!(
            err.to_string(),
            "character '→' at position 12 cannot be encoded as Latin-1"
        );
    }
}
