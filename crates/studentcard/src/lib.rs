//! `studentcard` - Student ID card records with compact QR payloads
//!
//! This library keeps one student's record, persists it on submission, lays
//! out the ID card, and encodes a privacy-minimized view of the record into a
//! short URI-safe token for the card's QR code.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod card;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod logging;
pub mod photo;
pub mod projection;
pub mod record;
pub mod storage;
pub mod store;

pub use card::{CardOptions, CardTemplate, CardView};
pub use config::Config;
pub use controller::{CardController, CardState, Event};
pub use error::{Error, Result};
pub use export::{export_card, CardRasterizer, PngRasterizer};
pub use logging::init_logging;
pub use photo::load_photo;
pub use projection::{decode, encode, project, ProjectedRecord, Token};
pub use record::{Allergy, BusRoute, ClassDivision, DataUri, StudentRecord};
pub use storage::{MemoryStorage, SlotStorage, Storage, StorageStats};
pub use store::{RecordStore, StoredRecord};
