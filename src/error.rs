use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type ClassifyResult<T> = Result<T, ClassifyError>;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Missing or unusable upload; the caller can fix it.
    #[error("{0}")]
    Validation(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error("{0} not found")]
    NotFound(String),
    /// Decode, resize, model or output-contract failure.
    #[error("{0}")]
    Inference(String),
    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    #[error("failed to read upload {name}: {source}")]
    ReadUpload {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClassifyError {
    pub fn inference(err: impl std::fmt::Display) -> Self {
        ClassifyError::Inference(err.to_string())
    }
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        ClassifyError::Inference(format!("cannot decode image: {}", err))
    }
}

impl ResponseError for ClassifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            ClassifyError::Validation(_) => StatusCode::BAD_REQUEST,
            ClassifyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ClassifyError::NotFound(_) => StatusCode::NOT_FOUND,
            ClassifyError::Inference(_)
            | ClassifyError::Storage(_)
            | ClassifyError::ReadUpload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ClassifyError::Validation("No image uploaded".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ClassifyError::PayloadTooLarge { limit: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ClassifyError::NotFound("x.jpg".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ClassifyError::inference("bad tensor").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            ClassifyError::from(io).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_read_failure_names_the_upload() {
        let err = ClassifyError::ReadUpload {
            name: "a.jpg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = err.to_string();
        assert!(message.starts_with("failed to read upload a.jpg"));
        assert!(!message.contains("store"));
    }

    #[actix_web::test]
    async fn test_error_body_is_json() {
        let resp = ClassifyError::Validation("No image uploaded".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({ "error": "No image uploaded" }));
    }
}
