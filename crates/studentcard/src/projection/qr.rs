//! QR symbols for tokens.
//!
//! Tokens are rendered in byte mode (the alphabet has lowercase letters, so
//! alphanumeric mode is out). Capacities are those of a version 40 symbol.

use std::fmt;
use std::str::FromStr;

use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// About 7% recovery. Default of common renderers.
    #[default]
    L,
    /// About 15% recovery.
    M,
    /// About 25% recovery.
    Q,
    /// About 30% recovery.
    H,
}

impl ErrorCorrection {
    /// Largest byte-mode payload a version 40 symbol holds at this level.
    #[must_use]
    pub fn max_bytes(self) -> usize {
        match self {
            Self::L => 2953,
            Self::M => 2331,
            Self::Q => 1663,
            Self::H => 1273,
        }
    }

    /// Whether `payload` fits into a single symbol at this level.
    #[must_use]
    pub fn fits(self, payload: &str) -> bool {
        payload.len() <= self.max_bytes()
    }
}

impl From<ErrorCorrection> for EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => Self::L,
            ErrorCorrection::M => Self::M,
            ErrorCorrection::Q => Self::Q,
            ErrorCorrection::H => Self::H,
        }
    }
}

/// Encode `payload` into the smallest symbol that holds it at `level`.
///
/// # Errors
///
/// Returns [`Error::QrSymbol`] if the payload is too long for one symbol.
pub fn build_symbol(payload: &str, level: ErrorCorrection) -> Result<QrCode> {
    QrCode::with_error_correction_level(payload.as_bytes(), level.into()).map_err(|e| {
        Error::qr_symbol(format!("{} bytes at level {level}: {e}", payload.len()))
    })
}

/// Draw `payload` with half-block characters, two modules per row of text.
///
/// Colors are inverted for light text on a dark terminal.
///
/// # Errors
///
/// Returns [`Error::QrSymbol`] if the payload is too long for one symbol.
pub fn render_terminal(payload: &str, level: ErrorCorrection) -> Result<String> {
    let code = build_symbol(payload, level)?;
    Ok(code
        .render::<Dense1x2>()
        .dark_color(Dense1x2::Light)
        .light_color(Dense1x2::Dark)
        .build())
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::L => write!(f, "L"),
            Self::M => write!(f, "M"),
            Self::Q => write!(f, "Q"),
            Self::H => write!(f, "H"),
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" | "LOW" => Ok(Self::L),
            "M" | "MEDIUM" => Ok(Self::M),
            "Q" | "QUARTILE" => Ok(Self::Q),
            "H" | "HIGH" => Ok(Self::H),
            other => Err(format!("unknown error-correction level '{other}'")),
        }
    }
}
