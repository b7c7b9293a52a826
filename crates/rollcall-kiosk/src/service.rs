//! The kiosk service: one capture-match-record cycle per call.
//!
//! Frame-level entry points run the external pipeline (locate, crop,
//! embed) before handing off to the embedding-level functions, which a
//! front end with its own model invocation can call directly. Writes
//! happen only after a successful match; a provider failure aborts the
//! cycle with nothing recorded.

use chrono::{Local, NaiveDate, NaiveTime};
use image::DynamicImage;
use rollcall_core::{
    AttendanceState, Embedding, EmbeddingProvider, FaceLocator, FirstMatchMatcher, MarkOutcome,
    MatchResult, Matcher, ProviderError,
};
use rollcall_store::{Store, StoreError};
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum KioskError {
    #[error("no face detected in frame")]
    NoFaceDetected,
    #[error("face not recognized (best similarity {similarity:.3})")]
    Unrecognized { similarity: f32 },
    #[error("face already registered as \"{name}\" (id {id})")]
    AlreadyRegistered { id: i64, name: String },
    #[error("name cannot be empty")]
    EmptyName,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A completed registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: i64,
    pub name: String,
}

/// What one mark event did to the day's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkEvent {
    In(NaiveTime),
    Out(NaiveTime),
    /// Day already complete; nothing was written.
    AlreadyRecorded,
}

/// Result of a successful mark-attendance cycle.
#[derive(Debug, Clone)]
pub struct MarkReport {
    pub identity_id: i64,
    pub name: String,
    pub date: NaiveDate,
    pub event: MarkEvent,
}

/// Snapshot for the status listing.
#[derive(Debug, Clone)]
pub struct KioskStatus {
    pub identities: i64,
    pub records_today: i64,
    pub date: NaiveDate,
}

/// The attendance kiosk. Owns the store handle for its lifetime;
/// dropped at exit.
pub struct Kiosk {
    store: Store,
    threshold: f32,
}

impl Kiosk {
    pub fn new(store: Store, threshold: f32) -> Self {
        Self { store, threshold }
    }

    /// Open the kiosk over the configured database.
    pub fn open(config: &Config) -> Result<Self, KioskError> {
        let store = Store::open(&config.db_path)?;
        Ok(Self::new(store, config.similarity_threshold))
    }

    /// Register the face in `frame` under `name`.
    pub fn register(
        &mut self,
        frame: &DynamicImage,
        name: &str,
        locator: &mut dyn FaceLocator,
        provider: &mut dyn EmbeddingProvider,
    ) -> Result<Registration, KioskError> {
        let embedding = capture_embedding(frame, locator, provider)?;
        self.register_embedding(name, &embedding)
    }

    /// Mark attendance for the face in `frame`, dated now.
    pub fn mark_attendance(
        &mut self,
        frame: &DynamicImage,
        locator: &mut dyn FaceLocator,
        provider: &mut dyn EmbeddingProvider,
    ) -> Result<MarkReport, KioskError> {
        let embedding = capture_embedding(frame, locator, provider)?;
        self.mark_attendance_embedding(&embedding)
    }

    /// Register a precomputed embedding under `name`.
    ///
    /// Rejected when the name is empty after trimming, or when the
    /// embedding already resolves to a registered identity.
    pub fn register_embedding(
        &mut self,
        name: &str,
        embedding: &Embedding,
    ) -> Result<Registration, KioskError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(KioskError::EmptyName);
        }

        let gallery = self.store.list_identities()?;
        if let MatchResult {
            matched: true,
            identity_id: Some(id),
            name: Some(existing),
            similarity,
        } = FirstMatchMatcher.resolve(embedding, &gallery, self.threshold)
        {
            tracing::warn!(id, name = %existing, similarity, "registration rejected: duplicate");
            return Err(KioskError::AlreadyRegistered { id, name: existing });
        }

        let id = self.store.insert_identity(name, embedding)?;
        Ok(Registration {
            id,
            name: name.to_string(),
        })
    }

    /// Mark attendance for a precomputed embedding, dated now.
    pub fn mark_attendance_embedding(
        &mut self,
        embedding: &Embedding,
    ) -> Result<MarkReport, KioskError> {
        let now = Local::now();
        self.mark_attendance_embedding_at(embedding, now.date_naive(), now.time())
    }

    /// Mark attendance for a precomputed embedding at an explicit date
    /// and time. Front ends replaying captured events use this; the
    /// clock-driven path above delegates here.
    pub fn mark_attendance_embedding_at(
        &mut self,
        embedding: &Embedding,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<MarkReport, KioskError> {
        let gallery = self.store.list_identities()?;
        let resolved = FirstMatchMatcher.resolve(embedding, &gallery, self.threshold);

        let (id, matched_name) = match resolved {
            MatchResult {
                matched: true,
                identity_id: Some(id),
                name: Some(name),
                ..
            } => (id, name),
            MatchResult { similarity, .. } => {
                tracing::warn!(similarity, "attendance rejected: face not recognized");
                return Err(KioskError::Unrecognized { similarity });
            }
        };

        let name = self.store.get_name(id)?.unwrap_or(matched_name);

        let state = AttendanceState::from_record(self.store.get_record(id, date)?);
        let event = match state.advance() {
            MarkOutcome::In => {
                self.store.insert_record(id, &name, date, time)?;
                MarkEvent::In(time)
            }
            MarkOutcome::Out => {
                self.store.update_out_time(id, date, time)?;
                MarkEvent::Out(time)
            }
            MarkOutcome::AlreadyRecorded => {
                tracing::info!(id, %date, "attendance already complete for the day");
                MarkEvent::AlreadyRecorded
            }
        };

        Ok(MarkReport {
            identity_id: id,
            name,
            date,
            event,
        })
    }

    /// Registered identities (id, name), for listings.
    pub fn registered(&self) -> Result<Vec<(i64, String)>, KioskError> {
        Ok(self.store.list_identity_names()?)
    }

    /// Every attendance row, oldest first.
    pub fn records(&self) -> Result<Vec<rollcall_core::AttendanceRecord>, KioskError> {
        Ok(self.store.list_records()?)
    }

    /// Delete all identities and attendance rows. The front end is
    /// responsible for confirming first; this call is irreversible.
    pub fn clear(&mut self) -> Result<(), KioskError> {
        Ok(self.store.clear_all()?)
    }

    pub fn status(&self) -> Result<KioskStatus, KioskError> {
        let date = Local::now().date_naive();
        Ok(KioskStatus {
            identities: self.store.count_identities()?,
            records_today: self.store.count_records_on(date)?,
            date,
        })
    }
}

/// Run the external pipeline on a frame: locate the (single) face, crop
/// it, extract the embedding. Zero faces aborts the cycle.
fn capture_embedding(
    frame: &DynamicImage,
    locator: &mut dyn FaceLocator,
    provider: &mut dyn EmbeddingProvider,
) -> Result<Embedding, KioskError> {
    let region = locator.locate(frame)?.ok_or(KioskError::NoFaceDetected)?;
    tracing::debug!(
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        confidence = region.confidence,
        "face located"
    );
    let crop = region.crop(frame);
    Ok(provider.embed(&crop)?)
}
