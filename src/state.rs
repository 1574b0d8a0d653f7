use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::mpsc;

use crate::llm::ImageGenerationError;
use crate::wizard::{ImageDataUri, ImageInput, ProjectData, WizardState, INTAKE_STEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Original,
    Concept,
}

impl ImageSlot {
    pub fn from_caption(caption: &str) -> Option<Self> {
        let lowered = caption.to_lowercase();
        if lowered.contains("concept") {
            Some(ImageSlot::Concept)
        } else if lowered.contains("original") || lowered.contains("site") {
            Some(ImageSlot::Original)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ImageSlot::Original => "Original site image",
            ImageSlot::Concept => "New building concept image",
        }
    }
}

/// Images picked on the intake form. They stay attached across resubmits
/// until the session is reset.
///
/// A slot is claimed when the image message arrives and filled once its
/// download finishes, so arrival order decides the slot, not download order.
#[derive(Debug, Clone, Default)]
pub struct IntakeDraft {
    pub original_image: Option<ImageInput>,
    pub concept_image: Option<ImageInput>,
    original_claim: Option<u64>,
    concept_claim: Option<u64>,
    last_claim: u64,
}

impl IntakeDraft {
    fn claim_mut(&mut self, slot: ImageSlot) -> &mut Option<u64> {
        match slot {
            ImageSlot::Original => &mut self.original_claim,
            ImageSlot::Concept => &mut self.concept_claim,
        }
    }

    fn original_taken(&self) -> bool {
        self.original_image.is_some() || self.original_claim.is_some()
    }

    /// Claims the requested slot, or the first free one (original, then
    /// concept; once both are taken the concept is claimed again).
    pub fn claim(&mut self, requested: Option<ImageSlot>) -> (ImageSlot, u64) {
        let slot = requested.unwrap_or(if self.original_taken() {
            ImageSlot::Concept
        } else {
            ImageSlot::Original
        });
        self.last_claim += 1;
        let claim = self.last_claim;
        *self.claim_mut(slot) = Some(claim);
        (slot, claim)
    }

    /// Stores the image if `claim` is still the latest claim on `slot`.
    pub fn fill(&mut self, slot: ImageSlot, claim: u64, image: ImageInput) -> bool {
        let current = self.claim_mut(slot);
        if *current != Some(claim) {
            return false;
        }
        *current = None;
        match slot {
            ImageSlot::Original => self.original_image = Some(image),
            ImageSlot::Concept => self.concept_image = Some(image),
        }
        true
    }

    pub fn release(&mut self, slot: ImageSlot, claim: u64) {
        let current = self.claim_mut(slot);
        if *current == Some(claim) {
            *current = None;
        }
    }

    pub fn to_project(&self, location: &str, requirements: &str) -> ProjectData {
        ProjectData::new(
            location.trim(),
            requirements.trim(),
            self.original_image.clone(),
            self.concept_image.clone(),
        )
    }
}

/// A slot held for an image whose download is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeReservation {
    pub slot: ImageSlot,
    claim: u64,
    epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeFill {
    Attached(ImageSlot),
    /// A later image claimed the same slot.
    Superseded(ImageSlot),
    /// The form was submitted or reset while downloading.
    FormClosed,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    pub wizard: WizardState,
    pub draft: IntakeDraft,
    /// The message the step view is edited into.
    pub view_message_id: Option<MessageId>,
}

impl ChatSession {
    pub fn reset(&mut self) {
        self.wizard.reset();
        self.draft = IntakeDraft::default();
        self.view_message_id = None;
    }

    fn form_open(&self, epoch: u64) -> bool {
        self.wizard.current_step() == INTAKE_STEP && self.wizard.generation_epoch() == epoch
    }

    /// Returns `None` when the intake form is not on screen.
    pub fn reserve_intake_slot(&mut self, requested: Option<ImageSlot>) -> Option<IntakeReservation> {
        if self.wizard.current_step() != INTAKE_STEP {
            return None;
        }
        let (slot, claim) = self.draft.claim(requested);
        Some(IntakeReservation {
            slot,
            claim,
            epoch: self.wizard.generation_epoch(),
        })
    }

    pub fn fill_intake_slot(&mut self, reservation: IntakeReservation, image: ImageInput) -> IntakeFill {
        if !self.form_open(reservation.epoch) {
            return IntakeFill::FormClosed;
        }
        if self.draft.fill(reservation.slot, reservation.claim, image) {
            IntakeFill::Attached(reservation.slot)
        } else {
            IntakeFill::Superseded(reservation.slot)
        }
    }

    pub fn release_intake_slot(&mut self, reservation: IntakeReservation) {
        if self.wizard.generation_epoch() == reservation.epoch {
            self.draft.release(reservation.slot, reservation.claim);
        }
    }
}

#[derive(Debug)]
pub struct GenerationOutcome {
    pub chat_id: ChatId,
    pub epoch: u64,
    pub status_message_id: Option<MessageId>,
    pub result: Result<ImageDataUri, ImageGenerationError>,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<HashMap<ChatId, ChatSession>>>,
    pub completions: mpsc::UnboundedSender<GenerationOutcome>,
}

impl AppState {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GenerationOutcome>) {
        let (completions, receiver) = mpsc::unbounded_channel();
        let state = AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            completions,
        };
        (state, receiver)
    }

    /// Runs `f` against the chat's session, creating it on first use. The
    /// lock is released before this returns, so never call it across an await.
    pub fn with_session<R>(&self, chat_id: ChatId, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut sessions = self.sessions.lock();
        f(sessions.entry(chat_id).or_default())
    }
}
