//! Facility selection: context, persistence and role inference.
//!
//! The selected facility is process-wide state read by every request-shaping
//! and filtering operation, but written only here: an explicit user switch,
//! the one-time role-based auto-selection after login, or logout. The
//! persisted preference lives in a small JSON state file behind an explicit
//! load/save boundary; business logic never touches storage directly.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::facilities::fetch_facilities;
use crate::http::ApiClient;

/// How long the login-time facility fetch may take before role inference is
/// skipped. Login must not block on a slow facility endpoint.
pub const FACILITY_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// The live facility selection shared across the session.
///
/// `None` means "all facilities the role allows". Reads are frequent and
/// cheap; writes happen at a single mutation point per cause.
#[derive(Debug, Default)]
pub struct FacilityContext {
    selected: Mutex<Option<i64>>,
}

impl FacilityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<i64> {
        *self.selected.lock().expect("selection lock poisoned")
    }

    pub fn set(&self, selection: Option<i64>) {
        *self.selected.lock().expect("selection lock poisoned") = selection;
    }

    /// Clear the selection (logout).
    pub fn clear(&self) {
        self.set(None);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredPreferences {
    #[serde(default)]
    selected_facility_id: Option<i64>,
}

/// Load/save boundary for the persisted facility preference.
#[derive(Clone, Debug)]
pub struct FacilityPreferences {
    path: PathBuf,
}

impl FacilityPreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the saved selection.
    ///
    /// A missing or unreadable state file is not an error condition; the
    /// user simply has no saved preference.
    pub fn load(&self) -> Option<i64> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return None,
        };

        match serde_json::from_str::<StoredPreferences>(&contents) {
            Ok(stored) => stored.selected_facility_id,
            Err(err) => {
                tracing::warn!(
                    "ignoring malformed preference file {}: {err}",
                    self.path.display()
                );
                None
            }
        }
    }

    /// Persist the selection; `None` removes the state file.
    pub fn save(&self, selection: Option<i64>) -> ClientResult<()> {
        match selection {
            Some(_) => {
                let stored = StoredPreferences {
                    selected_facility_id: selection,
                };
                let json = serde_json::to_string_pretty(&stored)?;
                std::fs::write(&self.path, json).map_err(|source| {
                    ClientError::PreferencesWrite {
                        path: self.path.clone(),
                        source,
                    }
                })
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(ClientError::PreferencesWrite {
                    path: self.path.clone(),
                    source,
                }),
            },
        }
    }
}

/// Resolve the effective selection from the saved preference and the
/// facilities the role can access.
///
/// Exactly one accessible facility auto-selects it; several restore the
/// saved preference when it is still accessible and otherwise fall back to
/// "all facilities"; none clears the selection.
pub fn apply_accessible(saved: Option<i64>, accessible: &[i64]) -> Option<i64> {
    match accessible {
        [only] => Some(*only),
        [] => None,
        _ => saved.filter(|id| accessible.contains(id)),
    }
}

/// Switch the selection by explicit user action.
///
/// A facility outside the accessible set is rejected with a warning and the
/// current selection stands. `None` always succeeds ("all facilities").
pub fn select_facility(
    context: &FacilityContext,
    preferences: &FacilityPreferences,
    accessible: &[i64],
    selection: Option<i64>,
) -> ClientResult<()> {
    if let Some(facility_id) = selection {
        if !accessible.contains(&facility_id) {
            tracing::warn!("attempted to select inaccessible facility {facility_id}");
            return Ok(());
        }
    }

    context.set(selection);
    preferences.save(selection)
}

/// Login-time role inference: fetch the accessible facilities and apply the
/// auto-selection ladder, racing the fetch against a timeout so login never
/// blocks on it.
///
/// On timeout or fetch failure the selection is left untouched.
pub async fn infer_selection_at_login(
    api: &ApiClient,
    preferences: &FacilityPreferences,
    context: &FacilityContext,
) {
    let facilities = match tokio::time::timeout(FACILITY_FETCH_TIMEOUT, fetch_facilities(api)).await
    {
        Ok(Ok(facilities)) => facilities,
        Ok(Err(err)) => {
            tracing::warn!("facility inference fetch failed: {err}");
            return;
        }
        Err(_) => {
            tracing::warn!("facility inference fetch timed out");
            return;
        }
    };

    let mut accessible: Vec<i64> = facilities.iter().map(|f| f.fac_id).collect();
    accessible.sort_unstable();

    let selection = apply_accessible(preferences.load(), &accessible);
    context.set(selection);
    if let Err(err) = preferences.save(selection) {
        tracing::warn!("failed to persist facility selection: {err}");
    }
}
