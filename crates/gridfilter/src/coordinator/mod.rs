//! Filter coordination between UI input, the column filter store and the data.
//!
//! A [`FilterCoordinator`] owns the column filter store and the registry of
//! rendered filter elements. It is bound once to a data view and, depending on
//! whether a [`BackendServiceApi`] is configured, either re-filters cached rows
//! locally or delegates filtering to a remote service.
//!
//! # Lifecycle
//!
//! 1. [`FilterCoordinator::init`] attaches the grid and applies presets.
//! 2. [`FilterCoordinator::bind`] attaches the data view and picks the mode.
//! 3. The host calls [`FilterCoordinator::on_header_rendered`] for every
//!    filter it renders, then reports input through the returned metadata's
//!    callback.
//! 4. [`FilterCoordinator::dispose`] detaches everything.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gridfilter_rs::{
//!     ColumnDefinition, FilterCoordinator, FilterOptions, InputEvent, MemoryDataView,
//!     MemoryGrid, TextElement,
//! };
//! use serde_json::json;
//!
//! let column = ColumnDefinition::new("firstName", "firstName");
//! let grid = Arc::new(MemoryGrid::new(vec![column.clone()]));
//! let view = Arc::new(MemoryDataView::new(vec![
//!     json!({ "id": 1, "firstName": "John" }),
//!     json!({ "id": 2, "firstName": "Jane" }),
//! ]));
//!
//! let coordinator = FilterCoordinator::new(FilterOptions::local());
//! coordinator.init(grid);
//! coordinator.bind(view.clone()).unwrap();
//!
//! let metadata = coordinator
//!     .on_header_rendered(&column, Arc::new(TextElement::new()))
//!     .unwrap();
//! metadata.notify(Some(&InputEvent::key_up("Jo*")));
//!
//! assert_eq!(view.visible_indices(), vec![0]);
//! ```

mod remote;

pub use remote::{
    BackendServiceApi, Deferred, FilterPayload, QueryHandle, QueryKind, RemoteError, RemoteService,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use self::remote::run_query;
use crate::bus::{ChangeBus, Emitter, FilterChangedArgs, SubscriptionId};
use crate::column::ColumnDefinition;
use crate::filter::{retain_terms, FilterError, FilterResult, LocalFilter};
use crate::host::{DataView, GridHost};
use crate::metadata::{
    terms_from_value, FilterCallback, FilterCallbackArgs, FilterElement, FilterMetadata,
    FilterMetadataRegistry, InputEvent,
};
use crate::options::FilterOptions;
use crate::store::{ColumnFilterStore, ColumnFilters, CurrentFilter};

struct RemoteBinding {
    api: BackendServiceApi,
    runtime: Handle,
    /// Debounced query that has not started yet.
    pending: Option<(u64, QueryHandle)>,
    last_query: Option<(u64, QueryHandle)>,
    next_id: u64,
}

enum Binding {
    Local,
    Remote(RemoteBinding),
}

impl Binding {
    fn mode(&self) -> Emitter {
        match self {
            Binding::Local => Emitter::Local,
            Binding::Remote(_) => Emitter::Remote,
        }
    }
}

#[derive(Default)]
struct State {
    store: ColumnFilterStore,
    registry: FilterMetadataRegistry,
    grid: Option<Arc<dyn GridHost>>,
    data_view: Option<Arc<dyn DataView>>,
    binding: Option<Binding>,
}

impl State {
    fn mode(&self) -> Option<Emitter> {
        self.binding.as_ref().map(Binding::mode)
    }

    fn last_query_id(&self) -> Option<u64> {
        match &self.binding {
            Some(Binding::Remote(remote)) => remote.last_query.as_ref().map(|(id, _)| *id),
            _ => None,
        }
    }
}

struct Shared {
    state: Mutex<State>,
    bus: ChangeBus,
    options: FilterOptions,
    /// Bumped on dispose; callbacks created under an older epoch are inert.
    epoch: AtomicU64,
}

/// Coordinates column filters for one grid.
///
/// Cloning yields another handle to the same coordinator.
#[derive(Clone)]
pub struct FilterCoordinator {
    shared: Arc<Shared>,
}

impl FilterCoordinator {
    /// Creates an unbound coordinator.
    pub fn new(options: FilterOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                bus: ChangeBus::new(),
                options,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    // ==================== Lifecycle ====================

    /// Attaches the grid and stores the configured presets.
    ///
    /// Presets naming a column the grid does not display are skipped.
    pub fn init(&self, grid: Arc<dyn GridHost>) {
        let columns = grid.columns();
        let mut state = self.lock();
        for preset in &self.shared.options.presets {
            match columns.iter().find(|c| c.id == preset.column_id) {
                Some(column) => {
                    state.store.upsert(
                        &column.id,
                        column,
                        Some(preset.operator),
                        preset.search_terms.clone(),
                    );
                }
                None => warn!(column_id = %preset.column_id, "preset filter names an unknown column"),
            }
        }
        state.grid = Some(grid);
        debug!(presets = state.store.len(), "filter coordinator initialized");
    }

    /// Attaches the data view and selects local or remote filtering.
    ///
    /// Remote filtering is selected when a backend is configured; it needs to
    /// be called from within a tokio runtime, whose handle runs the queries.
    pub fn bind(&self, data_view: Arc<dyn DataView>) -> FilterResult<()> {
        let mut state = self.lock();
        if state.grid.is_none() {
            return Err(FilterError::NotInitialized);
        }
        if state.binding.is_some() {
            return Err(FilterError::AlreadyBound);
        }

        let binding = match &self.shared.options.backend {
            Some(api) => {
                let runtime = Handle::try_current().map_err(|_| FilterError::NoRuntime)?;
                Binding::Remote(RemoteBinding {
                    api: api.clone(),
                    runtime,
                    pending: None,
                    last_query: None,
                    next_id: 0,
                })
            }
            None => Binding::Local,
        };
        let mode = binding.mode();
        debug!(%mode, "filter coordinator bound");

        state.binding = Some(binding);
        state.data_view = Some(data_view);

        let weak = Arc::downgrade(&self.shared);
        self.shared.bus.search_changed.subscribe(move |args| {
            if let Some(coordinator) = Self::upgrade(&weak) {
                coordinator.handle_search_change(args);
            }
        });
        drop(state);

        if mode == Emitter::Local {
            self.apply_local_filter();
        }
        Ok(())
    }

    /// Returns true once bound to a data view.
    pub fn is_bound(&self) -> bool {
        self.lock().binding.is_some()
    }

    /// Returns true if bound in remote mode.
    pub fn is_remote(&self) -> bool {
        self.lock().mode() == Some(Emitter::Remote)
    }

    /// Detaches subscribers, clears the registry and the store, and makes
    /// every callback handed out so far inert.
    ///
    /// Does nothing if the coordinator was never initialized. Queries already
    /// running still settle; a debounced query that has not started is dropped.
    pub fn dispose(&self) {
        {
            let mut state = self.lock();
            if state.grid.is_none() {
                return;
            }
            self.shared.epoch.fetch_add(1, Ordering::SeqCst);
            state.registry.dispose_all();
            state.store.clear_all();
            if let Some(Binding::Remote(remote)) = state.binding.take() {
                if let Some((_, pending)) = remote.pending {
                    pending.abort();
                }
            }
            state.data_view = None;
            state.grid = None;
        }
        self.shared.bus.unsubscribe_all();
        debug!("filter coordinator disposed");
    }

    // ==================== Filter Elements ====================

    /// Registers a rendered filter element and returns its metadata.
    ///
    /// Rendering the same column again returns the first registration. The
    /// element's initial terms are the column's stored terms, else its preset
    /// terms; non-empty initial terms are stored. Non-filterable columns get
    /// no metadata, and neither does anything rendered before `init` or after
    /// `dispose`.
    pub fn on_header_rendered(
        &self,
        column: &ColumnDefinition,
        element: Arc<dyn FilterElement>,
    ) -> Option<FilterMetadata> {
        if !column.filterable {
            return None;
        }

        let mut state = self.lock();
        if state.grid.is_none() {
            debug!(column = %column.id, "ignoring header render without a grid");
            return None;
        }
        if let Some(existing) = state.registry.get(&column.id) {
            return Some(existing.clone());
        }

        let (operator, search_terms) = match state.store.get(&column.id) {
            Some(filter) => (Some(filter.operator), filter.search_terms.clone()),
            None => (
                column.default_operator(),
                retain_terms(column.preset_search_terms().to_vec()),
            ),
        };
        let changed = !search_terms.is_empty()
            && state
                .store
                .upsert(&column.id, column, operator, search_terms.clone());

        let metadata = FilterMetadata::new(
            column.clone(),
            element,
            search_terms,
            self.callback_for(&column.id),
        );
        state.registry.register(metadata.clone());
        let mode = state.mode();
        drop(state);

        debug!(column_id = %column.id, "registered column filter");
        if changed && mode == Some(Emitter::Local) {
            self.apply_local_filter();
        }
        Some(metadata)
    }

    fn callback_for(&self, column_id: &str) -> FilterCallback {
        let weak = Arc::downgrade(&self.shared);
        let epoch = self.shared.epoch.load(Ordering::SeqCst);
        let column_id = column_id.to_string();

        Arc::new(move |event, args| {
            let Some(coordinator) = Self::upgrade(&weak) else {
                return;
            };
            if coordinator.shared.epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            coordinator.handle_input(&column_id, event, args);
        })
    }

    /// Applies one filter input to the store and announces it.
    fn handle_input(&self, column_id: &str, event: Option<&InputEvent>, args: FilterCallbackArgs) {
        let FilterCallbackArgs {
            column,
            operator,
            search_terms,
            should_trigger_query,
            clear_filter_triggered,
        } = args;

        let search_terms = match search_terms {
            Some(terms) => terms,
            None => match event.and_then(|e| e.target_value.clone()) {
                Some(value) => terms_from_value(value),
                None => self
                    .element_value(column_id)
                    .map(terms_from_value)
                    .unwrap_or_default(),
            },
        };
        let Some(column) = column else {
            return;
        };
        let search_terms = retain_terms(search_terms);

        let (announce, column_filters, grid) = {
            let mut state = self.lock();
            state.registry.set_search_terms(&column.id, search_terms.clone());
            let announce = if search_terms.is_empty() {
                let removed = state.store.remove(&column.id).is_some();
                removed || event.is_some_and(|e| e.enter_key)
            } else {
                state
                    .store
                    .upsert(&column.id, &column, operator, search_terms.clone());
                true
            };
            (announce, state.store.snapshot(), state.grid.clone())
        };
        if !announce {
            return;
        }

        let args = FilterChangedArgs {
            column_id: Some(column.id.clone()),
            column: Some(column),
            operator,
            search_terms,
            should_trigger_query,
            clear_filter_triggered,
            column_filters,
            event: event.cloned(),
            grid,
        };
        self.shared.bus.search_changed.emit(&args);
    }

    fn element_value(&self, column_id: &str) -> Option<Value> {
        let element = self
            .lock()
            .registry
            .get(column_id)
            .map(|m| Arc::clone(m.element()))?;
        element.current_value()
    }

    // ==================== Search Changes ====================

    /// Announces a search change, as a filter callback would.
    ///
    /// Returns the remote query the change scheduled, if any.
    pub fn notify_search_change(&self, args: FilterChangedArgs) -> Option<QueryHandle> {
        let before = self.lock().last_query_id();
        self.shared.bus.search_changed.emit(&args);

        let state = self.lock();
        match &state.binding {
            Some(Binding::Remote(remote)) => remote
                .last_query
                .as_ref()
                .filter(|(id, _)| Some(*id) != before)
                .map(|(_, handle)| handle.clone()),
            _ => None,
        }
    }

    fn handle_search_change(&self, args: &FilterChangedArgs) {
        let mode = {
            let mut state = self.lock();
            if let (Some(column_id), Some(column)) = (&args.column_id, &args.column) {
                state
                    .store
                    .upsert(column_id, column, args.operator, args.search_terms.clone());
            }
            state.mode()
        };

        match mode {
            Some(Emitter::Local) => {
                self.apply_local_filter();
                if !args.clear_filter_triggered {
                    self.emit_filter_changed(Emitter::Local);
                }
            }
            Some(Emitter::Remote) if args.should_trigger_query => {
                let typing = args.event.as_ref().is_some_and(InputEvent::is_typing);
                self.schedule_query(
                    QueryKind::FilterChange,
                    args.column_id.clone(),
                    args.clear_filter_triggered,
                    typing,
                );
            }
            _ => {}
        }
    }

    // ==================== Clearing ====================

    /// Clears one column's filter and its element.
    ///
    /// In remote mode a query runs only if the column was filtered; otherwise
    /// the service's current filters are announced right away.
    pub fn clear_filter_by_column_id(
        &self,
        event: Option<&InputEvent>,
        column_id: &str,
    ) -> Option<QueryHandle> {
        let (removed, metadata, mode) = {
            let mut state = self.lock();
            let removed = state.store.remove(column_id).is_some();
            state.registry.set_search_terms(column_id, Vec::new());
            (removed, state.registry.get(column_id).cloned(), state.mode())
        };
        debug!(column_id, removed, event = ?event.map(|e| e.kind), "cleared column filter");

        if let Some(metadata) = metadata {
            metadata.clear();
        }

        match mode {
            Some(Emitter::Remote) if removed => self.schedule_query(
                QueryKind::ClearColumn,
                Some(column_id.to_string()),
                true,
                false,
            ),
            Some(Emitter::Remote) => {
                self.emit_filter_changed(Emitter::Remote);
                None
            }
            _ => {
                self.apply_local_filter();
                self.emit_filter_changed(Emitter::Local);
                None
            }
        }
    }

    /// Clears every filter and element.
    ///
    /// Locally this re-renders the grid and announces "filter cleared". In
    /// remote mode one query runs with no filters, and "filter cleared" is
    /// announced once it settles, whether it failed or not.
    pub fn clear_filters(&self) -> Option<QueryHandle> {
        let (metadata, mode, grid) = {
            let mut state = self.lock();
            state.store.clear_all();
            let metadata = state.registry.get_all();
            for entry in &metadata {
                state.registry.set_search_terms(entry.column_id(), Vec::new());
            }
            (metadata, state.mode(), state.grid.clone())
        };

        for entry in &metadata {
            entry.clear();
        }

        match (mode, &self.shared.options.backend) {
            (Some(Emitter::Remote), Some(api)) => {
                api.service().clear_filters();
                self.schedule_query(QueryKind::ClearAll, None, true, false)
            }
            _ => {
                self.apply_local_filter();
                if let Some(grid) = grid {
                    grid.invalidate();
                    grid.render();
                }
                self.shared.bus.filter_cleared.emit(&true);
                None
            }
        }
    }

    /// Replaces every filter with `filters` and re-filters.
    ///
    /// Filters naming a column the grid does not display are skipped.
    pub fn update_filters(&self, filters: Vec<CurrentFilter>) -> Option<QueryHandle> {
        let grid = self.lock().grid.clone();
        let columns = grid.map(|g| g.columns()).unwrap_or_default();

        let mode = {
            let mut state = self.lock();
            state.store.clear_all();
            for entry in state.registry.get_all() {
                state.registry.set_search_terms(entry.column_id(), Vec::new());
            }
            for filter in filters {
                let Some(column) = columns.iter().find(|c| c.id == filter.column_id) else {
                    warn!(column_id = %filter.column_id, "filter names an unknown column");
                    continue;
                };
                let search_terms = retain_terms(filter.search_terms);
                state.registry.set_search_terms(&column.id, search_terms.clone());
                state
                    .store
                    .upsert(&column.id, column, Some(filter.operator), search_terms);
            }
            state.mode()
        };

        match mode {
            Some(Emitter::Remote) => self.schedule_query(QueryKind::FilterChange, None, false, false),
            _ => {
                self.apply_local_filter();
                self.emit_filter_changed(Emitter::Local);
                None
            }
        }
    }

    // ==================== Emission ====================

    /// Announces the current filters on "filter changed".
    ///
    /// `Local` sends the store's filters; `Remote` sends the service's.
    pub fn emit_filter_changed(&self, emitter: Emitter) {
        let filters = match (emitter, &self.shared.options.backend) {
            (Emitter::Remote, Some(api)) => api.service().current_filters(),
            _ => self.current_local_filters(),
        };
        self.shared.bus.filter_changed.emit(&filters);
    }

    /// The notification bus.
    pub fn bus(&self) -> &ChangeBus {
        &self.shared.bus
    }

    /// Subscribes to "filter changed".
    pub fn on_filter_changed(
        &self,
        subscriber: impl Fn(&Vec<CurrentFilter>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.bus.filter_changed.subscribe(subscriber)
    }

    /// Subscribes to "filter cleared".
    pub fn on_filter_cleared(&self, subscriber: impl Fn(&bool) + Send + Sync + 'static) -> SubscriptionId {
        self.shared.bus.filter_cleared.subscribe(subscriber)
    }

    /// Subscribes to search changes.
    pub fn on_search_changed(
        &self,
        subscriber: impl Fn(&FilterChangedArgs) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.shared.bus.search_changed.subscribe(subscriber)
    }

    // ==================== Remote Queries ====================

    fn schedule_query(
        &self,
        kind: QueryKind,
        column_id: Option<String>,
        clear_filter_triggered: bool,
        typing: bool,
    ) -> Option<QueryHandle> {
        let mut state = self.lock();
        let column_filters = state.store.current_filters();
        let Some(Binding::Remote(remote)) = state.binding.as_mut() else {
            return None;
        };

        let payload = FilterPayload {
            column_filters,
            column_id,
            clear_filter_triggered,
            should_trigger_query: true,
        };
        let delay = if typing {
            remote.api.filter_typing_debounce()
        } else {
            None
        };

        if let Some((_, superseded)) = remote.pending.take() {
            debug!("superseding pending filter query");
            superseded.abort();
        }

        let id = remote.next_id;
        remote.next_id += 1;

        let api = remote.api.clone();
        let shared = Arc::clone(&self.shared);
        let task = remote.runtime.spawn(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
                let coordinator = Self { shared: Arc::clone(&shared) };
                if !coordinator.take_pending(id) {
                    return false;
                }
            }
            run_query(&api, payload, kind, &shared.bus).await
        });

        let handle = QueryHandle::new(task);
        if delay.is_some() {
            remote.pending = Some((id, handle.clone()));
        }
        remote.last_query = Some((id, handle.clone()));
        Some(handle)
    }

    /// Marks a debounced query as started. False if it was superseded or the
    /// coordinator was disposed meanwhile.
    fn take_pending(&self, id: u64) -> bool {
        let mut state = self.lock();
        match state.binding.as_mut() {
            Some(Binding::Remote(remote))
                if remote.pending.as_ref().is_some_and(|(pending, _)| *pending == id) =>
            {
                remote.pending = None;
                true
            }
            _ => false,
        }
    }

    /// The most recently scheduled remote query.
    pub fn last_query(&self) -> Option<QueryHandle> {
        match &self.lock().binding {
            Some(Binding::Remote(remote)) => remote.last_query.as_ref().map(|(_, h)| h.clone()),
            _ => None,
        }
    }

    // ==================== Local Filtering ====================

    /// Hands the data view a fresh predicate and refreshes it.
    fn apply_local_filter(&self) {
        let Some(data_view) = self.lock().data_view.clone() else {
            return;
        };
        data_view.set_filter(self.local_filter());
        data_view.refresh();
    }

    /// A snapshot of the filters together with the grid's displayed columns.
    pub fn local_filter(&self) -> LocalFilter {
        let (filters, grid) = {
            let state = self.lock();
            (state.store.snapshot(), state.grid.clone())
        };
        let columns = grid.map(|g| g.columns()).unwrap_or_default();
        LocalFilter::new(filters, columns)
    }

    /// Returns true if `row` passes every active filter.
    pub fn matches_filters(&self, row: &Value) -> bool {
        let data_view = self.lock().data_view.clone();
        self.local_filter().matches(row, data_view.as_deref())
    }

    // ==================== Accessors ====================

    /// A snapshot of the active filters.
    pub fn column_filters(&self) -> ColumnFilters {
        self.lock().store.snapshot()
    }

    /// Registered filter elements in render order.
    pub fn filters_metadata(&self) -> Vec<FilterMetadata> {
        self.lock().registry.get_all()
    }

    /// The active filters as current-filter entries.
    pub fn current_local_filters(&self) -> Vec<CurrentFilter> {
        self.lock().store.current_filters()
    }
}

impl fmt::Debug for FilterCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("FilterCoordinator")
            .field("mode", &state.mode())
            .field("filters", &state.store.snapshot().column_ids())
            .field("elements", &state.registry.len())
            .finish_non_exhaustive()
    }
}
