//! Result type alias for grammar generation

use crate::error::OpgenError;

/// Standard Result type for grammar generation
pub type Result<T> = std::result::Result<T, OpgenError>;
