use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetsError {
    #[error("invalid METS XML: {0}")]
    Xml(String),

    #[error("METS document is not valid UTF-8")]
    Encoding,

    #[error("METS document has no physical structMap")]
    MissingPhysicalStructMap,

    #[error("structMap fptr references unknown file id '{0}'")]
    UnknownFileId(String),
}
