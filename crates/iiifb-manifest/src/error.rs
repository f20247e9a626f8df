use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Descriptive metadata has no data element")]
    NoData,

    #[error("Could not turn METS file information into painted resources: no storage map entry for '{0}'")]
    MissingStorageEntry(String),
}
