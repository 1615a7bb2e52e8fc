//! The student record and its field types.
//!
//! The JSON shape of [`StudentRecord`] is the one the browser form wrote to
//! local storage: camelCase keys, `roll` for the roll number, bus routes as
//! the strings `"1"`..`"3"`, and an empty string for a missing photo.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use base64::Engine as _;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Class division of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClassDivision {
    /// Division A.
    #[default]
    A,
    /// Division B.
    B,
    /// Division C.
    C,
}

impl fmt::Display for ClassDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

impl FromStr for ClassDivision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(format!("unknown class division '{other}' (expected A, B or C)")),
        }
    }
}

/// School bus route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BusRoute {
    /// Route 1.
    #[default]
    #[serde(rename = "1")]
    Route1,
    /// Route 2.
    #[serde(rename = "2")]
    Route2,
    /// Route 3.
    #[serde(rename = "3")]
    Route3,
}

impl fmt::Display for BusRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Route1 => write!(f, "1"),
            Self::Route2 => write!(f, "2"),
            Self::Route3 => write!(f, "3"),
        }
    }
}

impl FromStr for BusRoute {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let number = trimmed
            .strip_prefix("route")
            .or_else(|| trimmed.strip_prefix("Route"))
            .unwrap_or(trimmed)
            .trim();
        match number {
            "1" => Ok(Self::Route1),
            "2" => Ok(Self::Route2),
            "3" => Ok(Self::Route3),
            _ => Err(format!("unknown bus route '{trimmed}' (expected 1, 2 or 3)")),
        }
    }
}

/// Allergy tag from the fixed vocabulary offered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allergy {
    /// Peanut allergy.
    Peanuts,
    /// Gluten intolerance.
    Gluten,
    /// Dairy allergy.
    Dairy,
    /// Dust allergy.
    Dust,
}

impl Allergy {
    /// The vocabulary in the order the form lists it.
    pub const ALL: [Self; 4] = [Self::Peanuts, Self::Gluten, Self::Dairy, Self::Dust];
}

impl fmt::Display for Allergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Peanuts => "Peanuts",
            Self::Gluten => "Gluten",
            Self::Dairy => "Dairy",
            Self::Dust => "Dust",
        };
        f.write_str(label)
    }
}

impl FromStr for Allergy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown allergy '{}' (expected Peanuts, Gluten, Dairy or Dust)", s.trim())
            })
    }
}

/// Compiled `data:` URI header pattern.
///
/// # Panics
///
/// Panics if the built-in pattern is invalid.
fn data_uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^data:(?P<mime>[A-Za-z0-9!#$&^_.+-]+/[A-Za-z0-9!#$&^_.+-]+)?(?P<params>(?:;[A-Za-z0-9!#$&^_.+-]+=[^;,]*)*)(?P<base64>;base64)?,",
        )
        .expect("Invalid data URI pattern")
    })
}

/// A self-describing `data:` URI holding an inline payload.
///
/// Only the header is validated; the payload is kept verbatim so that a
/// stored record round-trips byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUri {
    uri: String,
    mime_end: usize,
    payload_start: usize,
    base64: bool,
}

impl DataUri {
    /// Parse and validate a `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the header is malformed.
    pub fn parse(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let caps = data_uri_regex()
            .captures(&uri)
            .ok_or_else(|| Error::data_uri("expected data:[<mime>][;base64],<payload>"))?;

        let mime_end = caps.name("mime").map_or("data:".len(), |m| m.end());
        let payload_start = caps.get(0).map_or(uri.len(), |m| m.end());
        let base64 = caps.name("base64").is_some();

        Ok(Self {
            uri,
            mime_end,
            payload_start,
            base64,
        })
    }

    /// Build a base64 data URI from raw bytes.
    #[must_use]
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        let prefix = format!("data:{mime};base64,");
        let payload_start = prefix.len();
        let uri = prefix + &base64::engine::general_purpose::STANDARD.encode(bytes);
        Self {
            uri,
            mime_end: "data:".len() + mime.len(),
            payload_start,
            base64: true,
        }
    }

    /// The declared media type, defaulting to `text/plain` when absent.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        match &self.uri["data:".len()..self.mime_end] {
            "" => "text/plain",
            mime => mime,
        }
    }

    /// Whether the media type is an image type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type().starts_with("image/")
    }

    /// Parse a `data:` URI that must carry an image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the header is malformed or the
    /// media type is not `image/*`.
    pub fn parse_image(uri: impl Into<String>) -> Result<Self> {
        let uri = Self::parse(uri)?;
        uri.require_image()?;
        Ok(uri)
    }

    /// Fail unless the media type is `image/*`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] naming the actual media type.
    pub fn require_image(&self) -> Result<()> {
        if self.is_image() {
            Ok(())
        } else {
            Err(Error::data_uri(format!(
                "photo must be an image, got {}",
                self.mime_type()
            )))
        }
    }

    /// Whether the payload is base64 encoded.
    #[must_use]
    pub fn is_base64(&self) -> bool {
        self.base64
    }

    /// The raw payload after the comma.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.uri[self.payload_start..]
    }

    /// Decode a base64 payload into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDataUri`] if the URI is not base64 encoded or
    /// the payload is not valid base64.
    pub fn decode_payload(&self) -> Result<Vec<u8>> {
        if !self.base64 {
            return Err(Error::data_uri("payload is not base64 encoded"));
        }
        base64::engine::general_purpose::STANDARD
            .decode(self.payload())
            .map_err(|e| Error::data_uri(format!("bad base64 payload: {e}")))
    }

    /// The full URI text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl TryFrom<String> for DataUri {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<DataUri> for String {
    fn from(value: DataUri) -> Self {
        value.uri
    }
}

/// The canonical student record captured by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentRecord {
    /// Student name. Required for submission.
    pub name: String,
    /// Roll number. Required for submission.
    #[serde(rename = "roll")]
    pub roll_number: String,
    /// Class division.
    pub class_division: ClassDivision,
    /// Allergies in the order they were selected.
    #[serde(deserialize_with = "null_as_empty")]
    pub allergies: Vec<Allergy>,
    /// Photo as a data URI.
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub photo: Option<DataUri>,
    /// Rack number. Empty when not given.
    pub rack: String,
    /// Bus route.
    pub bus_route: BusRoute,
}

impl StudentRecord {
    /// Create a record with the required fields set and everything else at
    /// its default.
    #[must_use]
    pub fn new(name: impl Into<String>, roll_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roll_number: roll_number.into(),
            ..Self::default()
        }
    }

    /// The first required field that is empty, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.name.is_empty() {
            Some("name")
        } else if self.roll_number.is_empty() {
            Some("roll number")
        } else {
            None
        }
    }

    /// Whether both required fields are filled in.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_field().is_none()
    }

    /// Replace the allergy selection, keeping the first occurrence of each
    /// tag in the given order.
    pub fn set_allergies(&mut self, allergies: impl IntoIterator<Item = Allergy>) {
        self.allergies.clear();
        for allergy in allergies {
            if !self.allergies.contains(&allergy) {
                self.allergies.push(allergy);
            }
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Allergy>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Allergy>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<DataUri>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => DataUri::parse_image(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
