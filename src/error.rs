//! Error types for the persona roulette core
//!
//! Only connect and configuration failures reach the presentation layer;
//! every other category is absorbed where it happens and logged.

use thiserror::Error;

/// Persona roulette errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouletteError {
    /// Invalid configuration values or an unreadable configuration file
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Persona data that cannot be turned into a session configuration
    #[error("Invalid persona: {0}")]
    InvalidPersona(String),

    /// Navigation was requested against a catalog with no personas
    #[error("Persona catalog is empty")]
    EmptyCatalog,

    /// A jump target outside the catalog bounds
    #[error("Persona index {index} is out of range for a catalog of {len}")]
    InvalidIndex { index: usize, len: usize },

    /// Acquiring a new engine session failed
    #[error("Connect error: {0}")]
    ConnectError(String),

    /// Releasing an engine session failed
    #[error("Disconnect error: {0}")]
    DisconnectError(String),

    /// Microphone acquisition failed
    #[error("Capability error: {0}")]
    CapabilityError(String),

    /// Outbound text could not be delivered
    #[error("Send error: {0}")]
    SendError(String),

    /// The persona directory could not be read or written
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for RouletteError {
    fn from(e: std::io::Error) -> Self {
        RouletteError::IOError(e.to_string())
    }
}

impl RouletteError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the orchestrator usable; the caller may
    /// issue a fresh request. Nothing in the core retries on its own.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Bad configuration needs user intervention
            RouletteError::ConfigError(_) => false,
            RouletteError::InvalidPersona(_) => false,
            RouletteError::EmptyCatalog => false,
            // Rejected input, state untouched
            RouletteError::InvalidIndex { .. } => true,
            // Prior persona retained, user may try again
            RouletteError::ConnectError(_) => true,
            RouletteError::DisconnectError(_) => true,
            RouletteError::CapabilityError(_) => true,
            RouletteError::SendError(_) => true,
            RouletteError::CatalogError(_) => false,
            RouletteError::IOError(_) => false,
        }
    }

    /// Whether the presentation layer should show this failure to the user
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            RouletteError::ConnectError(_)
                | RouletteError::ConfigError(_)
                | RouletteError::InvalidPersona(_)
                | RouletteError::EmptyCatalog
        )
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            RouletteError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            RouletteError::InvalidPersona(_) => {
                "This persona is misconfigured and cannot be started.".to_string()
            }
            RouletteError::EmptyCatalog => {
                "No personas available. Create one to begin.".to_string()
            }
            RouletteError::InvalidIndex { .. } => "That persona does not exist.".to_string(),
            RouletteError::ConnectError(_) => {
                "Could not connect to the persona. Staying with the current one.".to_string()
            }
            RouletteError::DisconnectError(_) => {
                "The previous session did not close cleanly.".to_string()
            }
            RouletteError::CapabilityError(_) => {
                "Microphone unavailable. Please check your audio device.".to_string()
            }
            RouletteError::SendError(_) => "Message could not be sent. Please try again.".to_string(),
            RouletteError::CatalogError(_) => "Failed to load personas.".to_string(),
            RouletteError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

/// Result type alias for persona roulette operations
pub type Result<T> = std::result::Result<T, RouletteError>;
