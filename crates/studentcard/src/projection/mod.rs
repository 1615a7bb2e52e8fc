//! QR payload projection.
//!
//! The QR symbol on a card carries a privacy-minimized view of the record:
//! no photo, and at most [`MAX_QR_ALLERGIES`] allergies. The view is
//! serialized to compact JSON and compressed into a URI-safe token:
//!
//! ```
//! use studentcard::projection::{decode, encode, project};
//! use studentcard::record::{Allergy, StudentRecord};
//!
//! let mut record = StudentRecord::new("Asha Rao", "12B-07");
//! record.set_allergies([Allergy::Peanuts, Allergy::Dairy, Allergy::Dust, Allergy::Gluten]);
//!
//! let token = encode(&record);
//! let scanned = decode(token.as_str()).unwrap();
//! assert_eq!(scanned, project(&record));
//! assert_eq!(scanned.allergies.len(), 3);
//! ```

pub mod lz;
pub mod qr;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::record::{Allergy, BusRoute, ClassDivision, StudentRecord};

pub use qr::ErrorCorrection;

/// Most allergies carried in a QR payload.
pub const MAX_QR_ALLERGIES: usize = 3;

/// The subset of a [`StudentRecord`] carried in the QR payload.
///
/// Field order is the serialization order and must not change: tokens are
/// compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedRecord {
    /// Student name.
    pub name: String,
    /// Roll number.
    #[serde(rename = "roll")]
    pub roll_number: String,
    /// Class division.
    pub class_division: ClassDivision,
    /// Rack number.
    pub rack: String,
    /// Bus route.
    pub bus_route: BusRoute,
    /// The first allergies of the record, in selection order.
    #[serde(default)]
    pub allergies: Vec<Allergy>,
}

/// Derive the QR view of a record.
#[must_use]
pub fn project(record: &StudentRecord) -> ProjectedRecord {
    ProjectedRecord {
        name: record.name.clone(),
        roll_number: record.roll_number.clone(),
        class_division: record.class_division,
        rack: record.rack.clone(),
        bus_route: record.bus_route,
        allergies: record
            .allergies
            .iter()
            .take(MAX_QR_ALLERGIES)
            .copied()
            .collect(),
    }
}

/// A compressed, URI-safe QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in bytes, which is what a byte-mode QR symbol stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the token is empty. Never true for encoder output.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the token fits one QR symbol at `level`.
    #[must_use]
    pub fn fits(&self, level: ErrorCorrection) -> bool {
        level.fits(&self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

/// Serialize a projection to its canonical JSON text.
#[must_use]
pub fn to_canonical_json(projection: &ProjectedRecord) -> String {
    // Plain strings and unit enums only; serialization cannot fail.
    serde_json::to_string(projection).unwrap_or_default()
}

/// Compress an already projected record into a token.
#[must_use]
pub fn encode_projection(projection: &ProjectedRecord) -> Token {
    let json = to_canonical_json(projection);
    let token = lz::compress(&json);
    trace!(
        json_len = json.len(),
        token_len = token.len(),
        "Encoded QR projection"
    );
    Token(token)
}

/// Project a record and compress it into a token.
#[must_use]
pub fn encode(record: &StudentRecord) -> Token {
    encode_projection(&project(record))
}

/// Recover the projection carried by a token.
///
/// # Errors
///
/// Returns an error if the token does not decompress or does not hold a
/// projection.
pub fn decode(token: &str) -> Result<ProjectedRecord> {
    let json = lz::decompress(token)?;
    serde_json::from_str(&json).map_err(|e| Error::token(format!("not a card payload: {e}")))
}
