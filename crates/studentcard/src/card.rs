//! The rendered ID card.
//!
//! [`CardView`] is everything a renderer needs to draw a card: a template,
//! the photo, the labelled text lines and the QR symbol parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::projection::{self, qr, ErrorCorrection, Token};
use crate::record::{DataUri, StudentRecord};

/// Title printed at the top of every card.
pub const CARD_TITLE: &str = "Student ID";

/// Default QR symbol edge in pixels.
pub const DEFAULT_QR_SIZE: u32 = 128;

/// Card color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTemplate {
    /// Blue card.
    #[default]
    Default,
    /// Green card.
    Alternate,
}

impl CardTemplate {
    /// Background color as RGB.
    #[must_use]
    pub fn fill_rgb(self) -> [u8; 3] {
        match self {
            Self::Default => [0xef, 0xf6, 0xff],
            Self::Alternate => [0xf0, 0xfd, 0xf4],
        }
    }

    /// Border color as RGB.
    #[must_use]
    pub fn border_rgb(self) -> [u8; 3] {
        match self {
            Self::Default => [0x25, 0x63, 0xeb],
            Self::Alternate => [0x16, 0xa3, 0x4a],
        }
    }

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "Blue Template",
            Self::Alternate => "Green Template",
        }
    }
}

impl fmt::Display for CardTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Alternate => write!(f, "alternate"),
        }
    }
}

impl FromStr for CardTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "blue" => Ok(Self::Default),
            "alternate" | "green" => Ok(Self::Alternate),
            other => Err(format!("unknown card template '{other}'")),
        }
    }
}

/// How a card is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardOptions {
    /// Color scheme.
    pub template: CardTemplate,
    /// QR symbol edge in pixels.
    pub qr_size: u32,
    /// QR error-correction level.
    pub error_correction: ErrorCorrection,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            template: CardTemplate::default(),
            qr_size: DEFAULT_QR_SIZE,
            error_correction: ErrorCorrection::default(),
        }
    }
}

/// One labelled line of card text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardLine {
    /// Label, e.g. `Roll No`.
    pub label: &'static str,
    /// Value as printed.
    pub value: String,
}

/// The QR symbol on a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrSymbol {
    /// Payload.
    pub token: Token,
    /// Edge in pixels.
    pub size: u32,
    /// Error-correction level.
    pub level: ErrorCorrection,
}

impl QrSymbol {
    /// Whether the payload fits one symbol at the chosen level.
    #[must_use]
    pub fn fits(&self) -> bool {
        self.token.fits(self.level)
    }

    /// The symbol drawn with half-block characters.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not fit one symbol.
    pub fn render_terminal(&self) -> crate::error::Result<String> {
        qr::render_terminal(self.token.as_str(), self.level)
    }
}

/// A laid-out card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// Color scheme.
    pub template: CardTemplate,
    /// Student name, used for the export file name.
    pub name: String,
    /// Photo, if one was attached.
    pub photo: Option<DataUri>,
    /// Text lines in print order.
    pub lines: Vec<CardLine>,
    /// QR symbol.
    pub qr: QrSymbol,
}

impl CardView {
    /// Lay out `record`.
    ///
    /// The allergies line lists every allergy of the record and is left
    /// out when there are none. The QR payload carries at most three.
    #[must_use]
    pub fn new(record: &StudentRecord, options: &CardOptions) -> Self {
        let mut lines = vec![
            line("Name", &record.name),
            line("Roll No", &record.roll_number),
            line("Class", record.class_division),
            line("Rack", &record.rack),
            line("Bus Route", record.bus_route),
        ];
        if !record.allergies.is_empty() {
            let allergies = record
                .allergies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(line("Allergies", allergies));
        }

        Self {
            template: options.template,
            name: record.name.clone(),
            photo: record.photo.clone(),
            lines,
            qr: QrSymbol {
                token: projection::encode(record),
                size: options.qr_size,
                level: options.error_correction,
            },
        }
    }

    /// The line with `label`, if present.
    #[must_use]
    pub fn line(&self, label: &str) -> Option<&CardLine> {
        self.lines.iter().find(|l| l.label == label)
    }

    /// File name for the exported image: `<name>_id_card.png`.
    ///
    /// Path separators and control characters in the name become `_`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let stem: String = self
            .name
            .chars()
            .map(|c| {
                if matches!(c, '/' | '\\' | ':') || c.is_control() {
                    '_'
                } else {
                    c
                }
            })
            .collect();
        format!("{stem}_id_card.png")
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.lines.iter().map(|l| l.label.len()).max().unwrap_or(0) + 1;

        writeln!(f, "== {CARD_TITLE} ({}) ==", self.template.label())?;
        match &self.photo {
            Some(photo) => writeln!(
                f,
                "{:<width$} {} ({} chars)",
                "Photo:",
                photo.mime_type(),
                photo.as_str().len()
            )?,
            None => writeln!(f, "{:<width$} none", "Photo:")?,
        }
        for l in &self.lines {
            writeln!(f, "{:<width$} {}", format!("{}:", l.label), l.value)?;
        }
        write!(
            f,
            "QR ({}, {}px): {}",
            self.qr.level, self.qr.size, self.qr.token
        )
    }
}

fn line(label: &'static str, value: impl fmt::Display) -> CardLine {
    CardLine {
        label,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Allergy, BusRoute, ClassDivision};

    fn asha() -> StudentRecord {
        let mut record = StudentRecord::new("Asha Rao", "12B-07");
        record.class_division = ClassDivision::B;
        record.set_allergies([Allergy::Peanuts, Allergy::Dairy, Allergy::Dust, Allergy::Gluten]);
        record.rack = "R4".to_string();
        record.bus_route = BusRoute::Route2;
        record
    }

    #[test]
    fn test_lines_in_order() {
        let card = CardView::new(&asha(), &CardOptions::default());
        let labels: Vec<_> = card.lines.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            ["Name", "Roll No", "Class", "Rack", "Bus Route", "Allergies"]
        );
        assert_eq!(card.line("Class").unwrap().value, "B");
        assert_eq!(card.line("Bus Route").unwrap().value, "2");
    }

    #[test]
    fn test_allergies_line_lists_all() {
        let card = CardView::new(&asha(), &CardOptions::default());
        assert_eq!(
            card.line("Allergies").unwrap().value,
            "Peanuts, Dairy, Dust, Gluten"
        );
        let scanned = projection::decode(card.qr.token.as_str()).unwrap();
        assert_eq!(scanned.allergies.len(), 3);
    }

    #[test]
    fn test_no_allergies_line_when_empty() {
        let card = CardView::new(&StudentRecord::new("Ravi", "9"), &CardOptions::default());
        assert!(card.line("Allergies").is_none());
        assert!(!card.to_string().contains("Allergies"));
    }

    #[test]
    fn test_qr_options() {
        let options = CardOptions {
            template: CardTemplate::Alternate,
            qr_size: 256,
            error_correction: ErrorCorrection::H,
        };
        let card = CardView::new(&asha(), &options);
        assert_eq!(card.qr.size, 256);
        assert_eq!(card.qr.level, ErrorCorrection::H);
        assert!(card.qr.fits());
        assert_eq!(card.qr.token, projection::encode(&asha()));
    }

    #[test]
    fn test_file_name() {
        let card = CardView::new(&asha(), &CardOptions::default());
        assert_eq!(card.file_name(), "Asha Rao_id_card.png");

        let odd = CardView::new(&StudentRecord::new("a/b\\c", "1"), &CardOptions::default());
        assert_eq!(odd.file_name(), "a_b_c_id_card.png");

        let empty = CardView::new(&StudentRecord::default(), &CardOptions::default());
        assert_eq!(empty.file_name(), "_id_card.png");
    }

    #[test]
    fn test_display() {
        let mut record = asha();
        record.photo = Some(DataUri::from_bytes("image/jpeg", b"jpeg"));
        let text = CardView::new(&record, &CardOptions::default()).to_string();

        assert!(text.starts_with("== Student ID (Blue Template) =="));
        assert!(text.contains("image/jpeg"));
        assert!(text.contains("Roll No:"));
        assert!(text.contains("12B-07"));
        assert!(text.contains("QR (L, 128px): N4Ig"));
    }

    #[test]
    fn test_template_parse_and_serde() {
        assert_eq!("green".parse::<CardTemplate>().unwrap(), CardTemplate::Alternate);
        assert_eq!("Default".parse::<CardTemplate>().unwrap(), CardTemplate::Default);
        assert!("red".parse::<CardTemplate>().is_err());
        assert_eq!(
            serde_json::to_string(&CardTemplate::Alternate).unwrap(),
            "\"alternate\""
        );
    }

    #[test]
    fn test_template_colors_differ() {
        assert_ne!(
            CardTemplate::Default.border_rgb(),
            CardTemplate::Alternate.border_rgb()
        );
        assert_ne!(
            CardTemplate::Default.fill_rgb(),
            CardTemplate::Default.border_rgb()
        );
    }

    #[test]
    fn test_qr_symbol_renders_for_terminal() {
        let card = CardView::new(&asha(), &CardOptions::default());
        let symbol = card.qr.render_terminal().unwrap();
        assert!(symbol.lines().count() > 10);
    }
}
