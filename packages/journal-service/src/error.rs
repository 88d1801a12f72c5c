pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Version conflict: expected {expected}, current {current}.")]
	Conflict { expected: i64, current: i64 },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<journal_storage::Error> for Error {
	fn from(err: journal_storage::Error) -> Self {
		match err {
			journal_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			journal_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			journal_storage::Error::NotFound(message) => Self::NotFound { message },
			// The row moved between the lock and the write, which the row lock rules out.
			journal_storage::Error::Conflict(message) => Self::Storage { message },
		}
	}
}
