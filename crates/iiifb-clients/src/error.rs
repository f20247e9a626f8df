use thiserror::Error;

/// Failures from the external collaborators. The coordinator inspects only
/// the discriminant and the rendered message; nothing richer crosses into
/// the job row.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure or unexpected HTTP status. The message stays short
    /// and generic; the detail is logged where the failure happened.
    #[error("{0}")]
    Transport(String),

    /// Malformed JSON, XML or timestamp in a response body.
    #[error("{0}")]
    Parse(String),

    /// The identity service returned zero or multiple matches.
    #[error("{0}")]
    Ambiguous(String),

    /// The IIIF cloud service answered a GET or PUT with a status the
    /// publisher cannot proceed from.
    #[error("{0}")]
    Precondition(String),

    #[error("token acquisition failed: {0}")]
    Token(String),
}
