// Domain error taxonomy shared by the ledger, session manager and ballot engine.

use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};

#[derive(Debug)]
pub enum AppError {
    /// Malformed admin or voter input (bad quantity, missing field).
    Validation(String),
    /// Referential-integrity violation: the row is still referenced.
    Conflict(String),
    /// Unknown or already-redeemed voting code.
    InvalidCode,
    /// The selected candidate does not belong to the claimed position.
    InvalidSelection,
    /// The operation requires state that does not exist (e.g. active election).
    NotFound(String),
    /// The atomic ballot-submission unit could not complete; nothing was recorded.
    SubmissionFailed,
    /// Any other storage error.
    Database(diesel::result::Error),
    /// Non-storage internal failure (e.g. report rendering).
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "{}", msg),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::InvalidCode => write!(f, "invalid or already used voting code"),
            AppError::InvalidSelection => {
                write!(f, "candidate does not belong to the selected position")
            }
            AppError::NotFound(msg) => write!(f, "{}", msg),
            AppError::SubmissionFailed => write!(f, "ballot could not be recorded"),
            AppError::Database(err) => write!(f, "database error: {}", err),
            AppError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status(&self) -> Status {
        match self {
            AppError::Validation(_) => Status::BadRequest,
            AppError::Conflict(_) => Status::Conflict,
            AppError::InvalidCode => Status::Unauthorized,
            AppError::InvalidSelection => Status::UnprocessableEntity,
            AppError::NotFound(_) => Status::NotFound,
            AppError::SubmissionFailed | AppError::Database(_) | AppError::Internal(_) => {
                Status::InternalServerError
            }
        }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            // Foreign-key failures are the one low-level code remapped to a
            // domain error: the deleted row is still referenced by dependents.
            Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::Conflict("record is still referenced by existing votes".to_string())
            }
            Error::NotFound => AppError::NotFound("record not found".to_string()),
            other => AppError::Database(other),
        }
    }
}

impl<'r> Responder<'r, 'static> for AppError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let AppError::Database(ref err) = self {
            eprintln!("Database error: {}", err);
        }
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::{DatabaseErrorKind, Error};
    use rocket::http::Status;

    #[test]
    fn foreign_key_violation_maps_to_conflict() {
        let err = Error::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new("fk constraint".to_string()),
        );
        let app_err = AppError::from(err);
        assert!(matches!(app_err, AppError::Conflict(_)));
        assert_eq!(app_err.status(), Status::Conflict);
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let app_err = AppError::from(Error::NotFound);
        assert!(matches!(app_err, AppError::NotFound(_)));
        assert_eq!(app_err.status(), Status::NotFound);
    }

    #[test]
    fn other_database_errors_stay_internal() {
        let app_err = AppError::from(Error::BrokenTransactionManager);
        assert!(matches!(app_err, AppError::Database(_)));
        assert_eq!(app_err.status(), Status::InternalServerError);
    }

    #[test]
    fn voter_facing_statuses() {
        assert_eq!(AppError::InvalidCode.status(), Status::Unauthorized);
        assert_eq!(AppError::InvalidSelection.status(), Status::UnprocessableEntity);
        assert_eq!(AppError::SubmissionFailed.status(), Status::InternalServerError);
    }
}
