use thiserror::Error;

/// Errors that can occur while validating or evaluating campaign definitions.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// The promotion config or message flow violates a structural invariant.
    /// Fatal for the campaign, never for the tick.
    #[error("invalid promotion config: {0}")]
    InvalidConfig(String),

    /// An attachment's shape does not match its required fields.
    #[error("malformed attachment: {0}")]
    MalformedAttachment(String),

    /// The campaign roster file could not be read or parsed.
    #[error("roster error: {0}")]
    Roster(String),
}

pub type Result<T> = std::result::Result<T, CampaignError>;
