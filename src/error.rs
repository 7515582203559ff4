use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The detected hardware identity matches no known device. Fatal:
    /// bring-up must not continue with a guessed configuration.
    #[error("unknown device: codename '{codename}' (product id '{product_id}')")]
    UnknownDevice { codename: String, product_id: String },

    /// No identity source produced a usable codename.
    #[error("device identity unavailable: {0}")]
    Identity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
