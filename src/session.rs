//! The editable, in-memory side of attendance.
//!
//! A session loads one scope's roster once, applies edits locally, and sends
//! the whole roster back on save. Nothing reaches the store between saves.
use crate::config::OnLoadError;
use crate::error::AttendanceError;
use crate::model::{AttendanceRecord, AttendanceSnapshot, Period, SnapshotScope, WireSnapshot};
use crate::render::{render, shift_month, RenderOptions, ViewModel};
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Transport between a session and the store.
pub trait AttendanceRemote {
    /// Reads a roster in whichever shape the store answers with.
    fn fetch(&self, scope: SnapshotScope) -> Result<WireSnapshot, AttendanceError>;

    /// Replaces the roster and returns the store's acknowledgment text.
    fn replace(
        &self,
        scope: SnapshotScope,
        snapshot: &AttendanceSnapshot,
    ) -> Result<String, AttendanceError>;
}

impl<R: AttendanceRemote + ?Sized> AttendanceRemote for &R {
    fn fetch(&self, scope: SnapshotScope) -> Result<WireSnapshot, AttendanceError> {
        (**self).fetch(scope)
    }

    fn replace(
        &self,
        scope: SnapshotScope,
        snapshot: &AttendanceSnapshot,
    ) -> Result<String, AttendanceError> {
        (**self).replace(scope, snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMode {
    /// Every date shares the single undated roster.
    #[default]
    Undated,
    /// The display date selects the roster.
    PerDay,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    pub on_load_error: OnLoadError,
    pub scope_mode: ScopeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unloaded,
    Loading,
    Loaded,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { students: usize },
    /// The fetch failed and the roster was reset to empty.
    FellBackToEmpty(AttendanceError),
    /// The reload after a committed save failed; the roster is still the one
    /// that was sent.
    ReloadFailed(AttendanceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub message: String,
    /// The reload after the save returned exactly what was sent.
    pub confirmed: bool,
    pub reload: LoadOutcome,
}

pub struct AttendanceSession<R> {
    remote: R,
    options: SessionOptions,
    state: SessionState,
    snapshot: AttendanceSnapshot,
    display_date: NaiveDate,
    present_only: bool,
}

impl<R: AttendanceRemote> AttendanceSession<R> {
    pub fn new(remote: R, options: SessionOptions) -> Self {
        Self::with_date(remote, options, chrono::Local::now().date_naive())
    }

    pub fn with_date(remote: R, options: SessionOptions, display_date: NaiveDate) -> Self {
        Self {
            remote,
            options,
            state: SessionState::Unloaded,
            snapshot: AttendanceSnapshot::new(),
            display_date,
            present_only: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn snapshot(&self) -> &AttendanceSnapshot {
        &self.snapshot
    }

    pub fn display_date(&self) -> NaiveDate {
        self.display_date
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn scope(&self) -> SnapshotScope {
        match self.options.scope_mode {
            ScopeMode::Undated => SnapshotScope::Undated,
            ScopeMode::PerDay => SnapshotScope::Day(self.display_date),
        }
    }

    /// Enters `next` and returns the state to restore on failure.
    ///
    /// Callers hold `&mut self`, so this never sees an overlapping load or
    /// save in safe code. It keeps the state machine closed if the session is
    /// ever shared behind interior mutability.
    fn begin(&mut self, next: SessionState) -> Result<SessionState, AttendanceError> {
        if matches!(self.state, SessionState::Loading | SessionState::Saving) {
            return Err(AttendanceError::Busy);
        }
        Ok(std::mem::replace(&mut self.state, next))
    }

    pub fn load(&mut self) -> Result<LoadOutcome, AttendanceError> {
        let previous = self.begin(SessionState::Loading)?;
        match self.fetch_snapshot() {
            Ok(outcome) => {
                self.state = SessionState::Loaded;
                Ok(outcome)
            }
            Err(e) => {
                self.state = previous;
                Err(e)
            }
        }
    }

    // Applies the load error policy; only `Propagate` ever returns Err.
    fn fetch_snapshot(&mut self) -> Result<LoadOutcome, AttendanceError> {
        let scope = self.scope();
        match self.remote.fetch(scope) {
            Ok(wire) => {
                self.snapshot = AttendanceSnapshot::from(wire);
                debug!(students = self.snapshot.len(), ?scope, "loaded attendance");
                Ok(LoadOutcome::Loaded {
                    students: self.snapshot.len(),
                })
            }
            Err(e) => match self.options.on_load_error {
                OnLoadError::ReturnEmpty => {
                    warn!("Error loading attendance: {e}");
                    self.snapshot = AttendanceSnapshot::new();
                    Ok(LoadOutcome::FellBackToEmpty(e))
                }
                OnLoadError::Propagate => Err(e),
            },
        }
    }

    /// Adds a student with every period absent. Returns the stored name.
    pub fn add_student(&mut self, name: &str) -> Result<String, AttendanceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::EmptyName);
        }
        if self.snapshot.contains(name) {
            return Err(AttendanceError::DuplicateStudent(name.to_string()));
        }
        self.snapshot.insert(AttendanceRecord::new(name));
        Ok(name.to_string())
    }

    /// Flips one period locally and returns the new value.
    pub fn toggle_period(&mut self, student_name: &str, period: u8) -> Result<bool, AttendanceError> {
        let period = Period::new(period)?;
        let record = self
            .snapshot
            .get_mut(student_name)
            .ok_or_else(|| AttendanceError::UnknownStudent(student_name.to_string()))?;
        Ok(record.toggle(period))
    }

    pub fn total_present(&self, student_name: &str) -> Option<u8> {
        self.snapshot.get(student_name).map(|r| r.total_present())
    }

    /// Clears every period of every student and drops the present-only filter.
    pub fn reset(&mut self) {
        for record in self.snapshot.records_mut() {
            record.clear();
        }
        self.present_only = false;
    }

    pub fn save(&mut self) -> Result<SaveOutcome, AttendanceError> {
        if self.snapshot.is_empty() {
            return Err(AttendanceError::EmptyRoster);
        }
        let previous = self.begin(SessionState::Saving)?;
        let scope = self.scope();
        let message = match self.remote.replace(scope, &self.snapshot) {
            Ok(message) => message,
            Err(e) => {
                self.state = previous;
                return Err(e);
            }
        };

        let sent = self.snapshot.clone();
        self.state = SessionState::Loading;
        // The store already committed, so the load error policy does not apply:
        // a failed reload leaves the roster as it was sent.
        let reload = match self.remote.fetch(scope) {
            Ok(wire) => {
                self.snapshot = AttendanceSnapshot::from(wire);
                LoadOutcome::Loaded {
                    students: self.snapshot.len(),
                }
            }
            Err(e) => {
                warn!("Reload after save failed: {e}");
                LoadOutcome::ReloadFailed(e)
            }
        };
        self.state = SessionState::Loaded;
        let confirmed = matches!(reload, LoadOutcome::Loaded { .. }) && self.snapshot == sent;
        Ok(SaveOutcome {
            message,
            confirmed,
            reload,
        })
    }

    pub fn set_present_only(&mut self, present_only: bool) {
        self.present_only = present_only;
    }

    pub fn present_only(&self) -> bool {
        self.present_only
    }

    /// Changes the display date. In per-day mode the caller reloads to see
    /// that day's roster.
    pub fn select_date(&mut self, date: NaiveDate) {
        self.display_date = date;
    }

    pub fn previous_month(&mut self) {
        self.display_date = shift_month(self.display_date, -1);
    }

    pub fn next_month(&mut self) {
        self.display_date = shift_month(self.display_date, 1);
    }

    pub fn view(&self) -> ViewModel {
        render(
            &self.snapshot,
            &RenderOptions {
                display_date: Some(self.display_date),
                present_only: self.present_only,
            },
        )
    }
}
