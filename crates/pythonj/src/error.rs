//! Fatal translator errors — failures that prevent translation from even
//! starting. Per-construct diagnostics (unsupported syntax, bad literals,
//! ...) are recoverable and are *not* represented here; see
//! [`crate::diagnostic`] for those.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
