use thiserror::Error;

/// Errors that can occur during sheet operations
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Sheet already exists: {name}")]
    SheetAlreadyExists { name: String },

    #[error("Invalid cell notation: {0}")]
    InvalidCellNotation(String),

    #[error("Workbook error: {0}")]
    Xlsx(String),

    #[error("XML error in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetError {
    pub(crate) fn xml(part: &str, message: impl ToString) -> Self {
        SheetError::Xml {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<calamine::XlsxError> for SheetError {
    fn from(e: calamine::XlsxError) -> Self {
        SheetError::Xlsx(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SheetError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        SheetError::Xlsx(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SheetError>;
