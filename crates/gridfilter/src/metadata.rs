//! Rendered filter elements and their callbacks.
//!
//! Every column filter the host renders gets one [`FilterMetadata`] entry. The
//! entry carries the callback the host calls when the user edits the filter,
//! which is how UI input reaches the column filter store.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::column::ColumnDefinition;
use crate::filter::Operator;

/// A rendered filter input.
pub trait FilterElement: Send + Sync {
    /// The value currently typed or selected, if the element can report one.
    fn current_value(&self) -> Option<Value> {
        None
    }

    /// Resets the element to its empty state.
    fn clear(&self);
}

/// A filter element holding a single value in memory.
#[derive(Debug, Default)]
pub struct TextElement {
    value: Mutex<Option<Value>>,
}

impl TextElement {
    /// Creates an empty element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an element showing `value`.
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    /// Replaces the displayed value.
    pub fn set_value(&self, value: impl Into<Value>) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value.into());
    }

    /// The displayed value.
    pub fn value(&self) -> Option<Value> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl FilterElement for TextElement {
    fn current_value(&self) -> Option<Value> {
        self.value()
    }

    fn clear(&self) {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Kind of UI event that triggered a filter callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEventKind {
    KeyUp,
    KeyDown,
    Change,
    Click,
    Custom,
}

/// The UI event that triggered a filter callback.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// What happened.
    pub kind: InputEventKind,
    /// Value of the element the event fired on.
    pub target_value: Option<Value>,
    /// Whether the Enter key was pressed.
    pub enter_key: bool,
}

impl InputEvent {
    fn new(kind: InputEventKind, target_value: Option<Value>) -> Self {
        Self {
            kind,
            target_value,
            enter_key: false,
        }
    }

    /// A key-up event on an element showing `value`.
    pub fn key_up(value: impl Into<Value>) -> Self {
        Self::new(InputEventKind::KeyUp, Some(value.into()))
    }

    /// A key-down event on an element showing `value`.
    pub fn key_down(value: impl Into<Value>) -> Self {
        Self::new(InputEventKind::KeyDown, Some(value.into()))
    }

    /// A change event on an element showing `value`.
    pub fn change(value: impl Into<Value>) -> Self {
        Self::new(InputEventKind::Change, Some(value.into()))
    }

    /// A click with no target value.
    pub fn click() -> Self {
        Self::new(InputEventKind::Click, None)
    }

    /// A host-defined event with no target value.
    pub fn custom() -> Self {
        Self::new(InputEventKind::Custom, None)
    }

    /// Marks the event as an Enter key press.
    pub fn with_enter(mut self) -> Self {
        self.enter_key = true;
        self
    }

    /// Returns true for keystroke events, the ones remote filtering debounces.
    pub fn is_typing(&self) -> bool {
        matches!(self.kind, InputEventKind::KeyUp | InputEventKind::KeyDown)
    }
}

/// Arguments of a filter callback.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCallbackArgs {
    /// Column the input belongs to. The callback does nothing without one.
    pub column: Option<ColumnDefinition>,
    /// Operator chosen in the input, if any.
    pub operator: Option<Operator>,
    /// Explicit search terms. When absent they are read from the event, then the element.
    pub search_terms: Option<Vec<Value>>,
    /// Whether a remote query should run.
    pub should_trigger_query: bool,
    /// Whether the input is an explicit clear.
    pub clear_filter_triggered: bool,
}

impl Default for FilterCallbackArgs {
    fn default() -> Self {
        Self {
            column: None,
            operator: None,
            search_terms: None,
            should_trigger_query: true,
            clear_filter_triggered: false,
        }
    }
}

impl FilterCallbackArgs {
    /// Args for an input on `column`.
    pub fn for_column(column: &ColumnDefinition) -> Self {
        Self {
            column: Some(column.clone()),
            ..Self::default()
        }
    }

    /// Sets the operator.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Sets explicit search terms.
    pub fn with_search_terms(mut self, search_terms: Vec<Value>) -> Self {
        self.search_terms = Some(search_terms);
        self
    }

    /// Marks the input as an explicit clear.
    pub fn clearing(mut self) -> Self {
        self.clear_filter_triggered = true;
        self
    }
}

/// Turns an input value into search terms.
///
/// Arrays are taken element by element, null gives no terms, anything else is
/// a single term.
pub fn terms_from_value(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Callback invoked when a column's filter input changes.
pub type FilterCallback = Arc<dyn Fn(Option<&InputEvent>, FilterCallbackArgs) + Send + Sync>;

/// One rendered column filter.
#[derive(Clone)]
pub struct FilterMetadata {
    column_id: String,
    column: ColumnDefinition,
    element: Arc<dyn FilterElement>,
    search_terms: Vec<Value>,
    callback: FilterCallback,
}

impl FilterMetadata {
    /// Creates a metadata entry for a rendered element.
    pub fn new(
        column: ColumnDefinition,
        element: Arc<dyn FilterElement>,
        search_terms: Vec<Value>,
        callback: FilterCallback,
    ) -> Self {
        Self {
            column_id: column.id.clone(),
            column,
            element,
            search_terms,
            callback,
        }
    }

    pub fn column_id(&self) -> &str {
        &self.column_id
    }

    pub fn column(&self) -> &ColumnDefinition {
        &self.column
    }

    pub fn element(&self) -> &Arc<dyn FilterElement> {
        &self.element
    }

    /// Search terms last reported for this element.
    pub fn search_terms(&self) -> &[Value] {
        &self.search_terms
    }

    /// Reports an input change.
    pub fn callback(&self, event: Option<&InputEvent>, args: FilterCallbackArgs) {
        (self.callback)(event, args)
    }

    /// Reports an input change from the element's own value.
    pub fn notify(&self, event: Option<&InputEvent>) {
        self.callback(event, FilterCallbackArgs::for_column(&self.column));
    }

    /// Clears the element.
    pub fn clear(&self) {
        self.element.clear();
    }
}

impl fmt::Debug for FilterMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterMetadata")
            .field("column_id", &self.column_id)
            .field("search_terms", &self.search_terms)
            .finish_non_exhaustive()
    }
}

/// Registered filter elements in render order.
#[derive(Debug, Default)]
pub struct FilterMetadataRegistry {
    entries: Vec<FilterMetadata>,
}

impl FilterMetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an entry. The first registration of a column wins.
    ///
    /// Returns false if the column was already registered.
    pub fn register(&mut self, metadata: FilterMetadata) -> bool {
        if self.contains(metadata.column_id()) {
            return false;
        }
        self.entries.push(metadata);
        true
    }

    pub fn get(&self, column_id: &str) -> Option<&FilterMetadata> {
        self.entries.iter().find(|m| m.column_id == column_id)
    }

    pub fn contains(&self, column_id: &str) -> bool {
        self.get(column_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry in render order.
    pub fn get_all(&self) -> Vec<FilterMetadata> {
        self.entries.clone()
    }

    /// Records the search terms last reported for a column.
    pub fn set_search_terms(&mut self, column_id: &str, search_terms: Vec<Value>) {
        if let Some(entry) = self.entries.iter_mut().find(|m| m.column_id == column_id) {
            entry.search_terms = search_terms;
        }
    }

    /// Empties the registry, returning the removed entries.
    pub fn dispose_all(&mut self) -> Vec<FilterMetadata> {
        std::mem::take(&mut self.entries)
    }
}
