use thiserror::Error;

/// Errors reported by the reader and writer pipelines.
///
/// Structural errors abort the whole read; nothing is published for the
/// entity being built when one occurs, but entities already reported to a
/// streaming handler remain valid.
#[derive(Debug, Error)]
pub enum GpxError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing attribute '{attribute}' on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("invalid content '{value}' in <{element}>: {reason}")]
    InvalidValue {
        element: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{what} out of range: {value}")]
    OutOfRange { what: &'static str, value: f64 },

    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("unrecognized <{element}> literal '{value}'")]
    BadEnum {
        element: &'static str,
        value: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GpxError>;
