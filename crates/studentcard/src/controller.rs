//! Card lifecycle.
//!
//! A card is either a [`CardState::Draft`] being filled in or a
//! [`CardState::Submitted`] record that is frozen and persisted.
//! [`CardState::transition`] is the pure state machine; [`CardController`]
//! pairs it with a [`RecordStore`] and persists before it commits a
//! submission.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::projection::{self, Token};
use crate::record::{Allergy, BusRoute, ClassDivision, DataUri, StudentRecord};
use crate::storage::SlotStorage;
use crate::store::RecordStore;

/// Lifecycle state of the active card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardState {
    /// Being edited.
    Draft(StudentRecord),
    /// Submitted and frozen.
    Submitted(StudentRecord),
}

impl Default for CardState {
    fn default() -> Self {
        Self::Draft(StudentRecord::default())
    }
}

/// Something the user did to the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Set the name.
    SetName(String),
    /// Set the roll number.
    SetRollNumber(String),
    /// Choose a class division.
    SetClassDivision(ClassDivision),
    /// Replace the allergy selection.
    SetAllergies(Vec<Allergy>),
    /// Toggle one allergy on or off.
    ToggleAllergy(Allergy),
    /// Attach a photo.
    SetPhoto(DataUri),
    /// Remove the photo.
    ClearPhoto,
    /// Set the rack number.
    SetRack(String),
    /// Choose a bus route.
    SetBusRoute(BusRoute),
    /// Submit the draft.
    Submit,
    /// Start over with an empty draft.
    Reset,
}

impl CardState {
    /// State for a record restored from storage.
    ///
    /// A record with both required fields is submitted; anything else
    /// resumes as a draft.
    #[must_use]
    pub fn restore(saved: Option<StudentRecord>) -> Self {
        match saved {
            Some(record) if record.is_complete() => Self::Submitted(record),
            Some(record) => Self::Draft(record),
            None => Self::default(),
        }
    }

    /// The record in either state.
    #[must_use]
    pub fn record(&self) -> &StudentRecord {
        match self {
            Self::Draft(record) | Self::Submitted(record) => record,
        }
    }

    /// Whether the card has been submitted.
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }

    /// Apply `event`.
    ///
    /// Edits change a draft and are ignored once submitted, as is a photo
    /// that is not an image. `Submit` moves
    /// a complete draft to `Submitted` and leaves an incomplete one as it
    /// is. `Reset` always yields an empty draft.
    #[must_use]
    pub fn transition(self, event: Event) -> Self {
        match (self, event) {
            (_, Event::Reset) => Self::default(),
            (Self::Submitted(record), _) => Self::Submitted(record),
            (Self::Draft(record), Event::Submit) => {
                if record.is_complete() {
                    Self::Submitted(record)
                } else {
                    Self::Draft(record)
                }
            }
            (Self::Draft(mut record), edit) => {
                apply_edit(&mut record, edit);
                Self::Draft(record)
            }
        }
    }
}

fn apply_edit(record: &mut StudentRecord, edit: Event) {
    match edit {
        Event::SetName(name) => record.name = name,
        Event::SetRollNumber(roll) => record.roll_number = roll,
        Event::SetClassDivision(class) => record.class_division = class,
        Event::SetAllergies(allergies) => record.set_allergies(allergies),
        Event::ToggleAllergy(allergy) => {
            if let Some(pos) = record.allergies.iter().position(|a| *a == allergy) {
                record.allergies.remove(pos);
            } else {
                record.allergies.push(allergy);
            }
        }
        Event::SetPhoto(photo) => {
            if photo.is_image() {
                record.photo = Some(photo);
            }
        }
        Event::ClearPhoto => record.photo = None,
        Event::SetRack(rack) => record.rack = rack,
        Event::SetBusRoute(route) => record.bus_route = route,
        Event::Submit | Event::Reset => {}
    }
}

/// Owns the card state and persists submissions.
#[derive(Debug)]
pub struct CardController<S> {
    store: RecordStore<S>,
    state: CardState,
}

impl<S: SlotStorage> CardController<S> {
    /// Restore the card from `store`.
    pub fn start(store: RecordStore<S>) -> Self {
        let state = CardState::restore(store.load());
        info!(submitted = state.is_submitted(), "Card state restored");
        Self { store, state }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &CardState {
        &self.state
    }

    /// The backing record store.
    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Apply an event.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadySubmitted`] for an edit or `Submit` after submission.
    /// - [`Error::IncompleteRecord`] for `Submit` with a required field empty.
    /// - [`Error::InvalidDataUri`] for a photo that is not an image.
    /// - Any storage error from saving the submission. The card stays a draft.
    pub fn dispatch(&mut self, event: Event) -> Result<&CardState> {
        match (&self.state, &event) {
            (_, Event::Reset) => {}
            (CardState::Submitted(_), _) => return Err(Error::AlreadySubmitted),
            (CardState::Draft(record), Event::Submit) => {
                if let Some(field) = record.missing_field() {
                    return Err(Error::IncompleteRecord { field });
                }
                self.store.save(record)?;
            }
            (CardState::Draft(_), Event::SetPhoto(photo)) => photo.require_image()?,
            (CardState::Draft(_), _) => {}
        }

        debug!(?event, "Applying card event");
        let state = std::mem::take(&mut self.state);
        self.state = state.transition(event);
        Ok(&self.state)
    }

    /// Submit the current draft.
    ///
    /// # Errors
    ///
    /// See [`CardController::dispatch`].
    pub fn submit(&mut self) -> Result<&CardState> {
        self.dispatch(Event::Submit)
    }

    /// Discard the saved record and start a new draft.
    ///
    /// Returns `true` if a saved record was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved record cannot be removed.
    pub fn reset(&mut self) -> Result<bool> {
        let removed = self.store.clear()?;
        self.state = CardState::default();
        Ok(removed)
    }

    /// QR token of the submitted record. `None` while drafting.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match &self.state {
            CardState::Submitted(record) => Some(projection::encode(record)),
            CardState::Draft(_) => None,
        }
    }
}
