//! Selection state machine.
//!
//! A session owns the relationship between the currently loaded
//! [`CanonicalResult`], the user's transient preview choice, and the save
//! lifecycle. The representation is a tagged enum so that illegal
//! combinations (a save in flight with no loaded result, a preview with
//! nothing loaded) cannot be expressed.
//!
//! All transitions are pure; the network calls that trigger
//! [`Session::complete_save`], [`Session::fail_save`] and
//! [`Session::complete_unlearn`] live in the `api-client` crate and the
//! binaries.

use crate::normalize::CanonicalResult;
use laybridge_types::SnomedCode;

/// The user's transient code choice. Not persisted until a save succeeds;
/// exists only in the client session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewSelection {
    pub code: SnomedCode,
    pub display: String,
}

/// Save lifecycle within a loaded session.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// A commit request is in flight; callers must not start another.
    Saving,
    /// The last commit failed with this message. The preview is retained.
    Failed(String),
}

/// A session with a lookup result installed.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSession {
    result: CanonicalResult,
    preview: Option<PreviewSelection>,
    save: SaveStatus,
}

impl LoadedSession {
    pub fn result(&self) -> &CanonicalResult {
        &self.result
    }

    pub fn preview(&self) -> Option<&PreviewSelection> {
        self.preview.as_ref()
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save
    }

    /// True when the backend reports a saved code that is absent from the
    /// current option list. Tolerated (the preview simply stays clear), but
    /// callers may want to surface a hint.
    pub fn saved_code_unlisted(&self) -> bool {
        match &self.result.saved_code {
            Some(code) => self.result.option_by_code(code.as_str()).is_none(),
            None => false,
        }
    }
}

/// Errors returned when a transition is not valid in the current state.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no lookup result is loaded")]
    NothingLoaded,
    #[error("no SNOMED option is selected")]
    NothingSelected,
    #[error("the selected code is already the saved code")]
    AlreadySaved,
    #[error("a save is already in flight")]
    SaveInFlight,
}

/// The selection state machine.
///
/// `Empty` means no lookup result is loaded (startup, or after a failed
/// lookup cleared the session). Everything else lives inside `Loaded`.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Session {
    #[default]
    Empty,
    Loaded(LoadedSession),
}

/// Recompute the preview strictly from the result's saved code: when the
/// saved code names a current option, that option becomes the preview,
/// otherwise the preview is clear.
fn reconcile_preview(result: &CanonicalResult) -> Option<PreviewSelection> {
    let saved = result.saved_code.as_ref()?;
    match result.option_by_code(saved.as_str()) {
        Some(option) => Some(PreviewSelection {
            code: option.code.clone(),
            display: option.display.clone(),
        }),
        None => {
            tracing::warn!(
                code = %saved,
                term = %result.text,
                "saved code is not among the current options; preview cleared"
            );
            None
        }
    }
}

impl Session {
    /// Install a new lookup result, replacing whatever was loaded.
    ///
    /// Runs the saved-code reconciliation every time, including after a save
    /// completes with a fresh server-confirmed result. Any save status from a
    /// previous result is discarded with that result.
    pub fn load(&mut self, result: CanonicalResult) {
        let preview = reconcile_preview(&result);
        *self = Session::Loaded(LoadedSession {
            result,
            preview,
            save: SaveStatus::Idle,
        });
    }

    /// Drop the loaded result, e.g. after a failed lookup.
    pub fn clear(&mut self) {
        *self = Session::Empty;
    }

    pub fn loaded(&self) -> Option<&LoadedSession> {
        match self {
            Session::Empty => None,
            Session::Loaded(loaded) => Some(loaded),
        }
    }

    pub fn result(&self) -> Option<&CanonicalResult> {
        self.loaded().map(LoadedSession::result)
    }

    pub fn preview(&self) -> Option<&PreviewSelection> {
        match self {
            Session::Empty => None,
            Session::Loaded(loaded) => loaded.preview.as_ref(),
        }
    }

    pub fn save_status(&self) -> &SaveStatus {
        match self {
            Session::Empty => &SaveStatus::Idle,
            Session::Loaded(loaded) => &loaded.save,
        }
    }

    /// The code the selection surface should show: the preview when one is
    /// set, otherwise the saved code.
    pub fn current_code(&self) -> Option<&str> {
        let loaded = self.loaded()?;
        loaded
            .preview
            .as_ref()
            .map(|p| p.code.as_str())
            .or_else(|| loaded.result.saved_code.as_ref().map(SnomedCode::as_str))
    }

    /// True when a result is loaded and the preview carries both a code and a
    /// non-empty display.
    pub fn can_save(&self) -> bool {
        match self {
            Session::Empty => false,
            Session::Loaded(loaded) => loaded
                .preview
                .as_ref()
                .is_some_and(|p| !p.display.is_empty()),
        }
    }

    /// Choose a code from the current option list.
    ///
    /// An empty code clears the preview. A code that is not among the current
    /// options (stale UI) also clears the preview, silently: no error is
    /// raised for an unmatched code. Either way a previous save failure
    /// message is dismissed.
    pub fn select_option(&mut self, code: &str) -> Result<(), SessionError> {
        let Session::Loaded(loaded) = self else {
            return Err(SessionError::NothingLoaded);
        };
        if loaded.save == SaveStatus::Saving {
            return Err(SessionError::SaveInFlight);
        }

        loaded.preview = if code.trim().is_empty() {
            None
        } else {
            loaded.result.option_by_code(code).map(|option| PreviewSelection {
                code: option.code.clone(),
                display: option.display.clone(),
            })
        };
        loaded.save = SaveStatus::Idle;
        Ok(())
    }

    /// Start a save of the current preview.
    ///
    /// Checks the gating rules and moves to `Saving`, handing back the
    /// selection to send. The caller performs the commit request and then
    /// calls [`Session::complete_save`] or [`Session::fail_save`].
    ///
    /// Re-saving the already-saved code is rejected here with
    /// [`SessionError::AlreadySaved`], stricter than leaving that check to
    /// the call site; non-UI callers get the guard for free.
    pub fn begin_save(&mut self) -> Result<PreviewSelection, SessionError> {
        let Session::Loaded(loaded) = self else {
            return Err(SessionError::NothingLoaded);
        };
        if loaded.save == SaveStatus::Saving {
            return Err(SessionError::SaveInFlight);
        }
        let preview = loaded
            .preview
            .as_ref()
            .filter(|p| !p.display.is_empty())
            .ok_or(SessionError::NothingSelected)?
            .clone();
        if loaded
            .result
            .saved_code
            .as_ref()
            .is_some_and(|saved| *saved == preview.code)
        {
            return Err(SessionError::AlreadySaved);
        }

        loaded.save = SaveStatus::Saving;
        Ok(preview)
    }

    /// A commit succeeded: install the server-confirmed result, re-running
    /// the same reconciliation as any other load.
    pub fn complete_save(&mut self, result: CanonicalResult) {
        self.load(result);
    }

    /// A commit failed: record the message and keep the user's draft choice.
    /// The loaded result is left untouched.
    pub fn fail_save(&mut self, message: impl Into<String>) {
        if let Session::Loaded(loaded) = self {
            loaded.save = SaveStatus::Failed(message.into());
        }
    }

    /// Discard the preview and recompute it from the saved code, with the
    /// same matching rule as [`Session::load`]. Idempotent with load's
    /// reconciliation step.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        let Session::Loaded(loaded) = self else {
            return Err(SessionError::NothingLoaded);
        };
        if loaded.save == SaveStatus::Saving {
            return Err(SessionError::SaveInFlight);
        }

        loaded.preview = reconcile_preview(&loaded.result);
        loaded.save = SaveStatus::Idle;
        Ok(())
    }

    /// A revoke request succeeded: clear the preview regardless of its prior
    /// value. The caller is expected to follow up with a fresh lookup; the
    /// session does not guess the new saved state locally.
    pub fn complete_unlearn(&mut self) -> Result<(), SessionError> {
        let Session::Loaded(loaded) = self else {
            return Err(SessionError::NothingLoaded);
        };
        loaded.preview = None;
        loaded.save = SaveStatus::Idle;
        Ok(())
    }
}
