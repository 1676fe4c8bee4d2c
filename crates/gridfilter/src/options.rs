//! Coordinator configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::BackendServiceApi;
use crate::store::CurrentFilter;

/// Options a [`FilterCoordinator`](crate::FilterCoordinator) is created with.
///
/// Configuring a backend selects remote filtering at bind time.
#[derive(Clone, Default)]
pub struct FilterOptions {
    /// Remote service, if filtering happens on the data source.
    pub backend: Option<BackendServiceApi>,
    /// Filters applied when the grid is initialized.
    pub presets: Vec<CurrentFilter>,
}

impl FilterOptions {
    /// Options for filtering cached rows locally.
    pub fn local() -> Self {
        Self::default()
    }

    /// Options for filtering through a remote service.
    pub fn remote(backend: BackendServiceApi) -> Self {
        Self {
            backend: Some(backend),
            ..Self::default()
        }
    }

    /// Sets the filters applied on init.
    pub fn with_presets(mut self, presets: Vec<CurrentFilter>) -> Self {
        self.presets = presets;
        self
    }

    /// Builds options from loaded settings, with an optional backend.
    ///
    /// The settings' debounce applies to the backend when given.
    pub fn from_settings(settings: FilterSettings, backend: Option<BackendServiceApi>) -> Self {
        let backend = backend.map(|api| match settings.filter_typing_debounce() {
            Some(delay) => api.with_typing_debounce(delay),
            None => api,
        });
        Self {
            backend,
            presets: settings.presets,
        }
    }

    /// Returns true if a backend is configured.
    pub fn is_remote(&self) -> bool {
        self.backend.is_some()
    }
}

impl fmt::Debug for FilterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterOptions")
            .field("backend", &self.backend)
            .field("presets", &self.presets)
            .finish()
    }
}

/// The serializable part of [`FilterOptions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Delay before a keystroke-driven remote query runs, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_typing_debounce_ms: Option<u64>,

    /// Filters applied when the grid is initialized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<CurrentFilter>,
}

impl FilterSettings {
    pub fn filter_typing_debounce(&self) -> Option<Duration> {
        self.filter_typing_debounce_ms.map(Duration::from_millis)
    }
}
