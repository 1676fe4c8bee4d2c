//! Column filtering for tabular data views.
//!
//! This crate keeps per-column filter state for a grid and evaluates it
//! against JSON row records. Filtering either runs locally over cached rows or
//! is delegated to a remote service.
//!
//! - [`filter`]: operators, value resolution and row evaluation
//! - [`ColumnFilterStore`]: the active filters
//! - [`FilterCoordinator`]: wires filter input, the store and the data together
//! - [`ChangeBus`]: filter-changed and filter-cleared notifications

pub mod bus;
pub mod column;
pub mod coordinator;
pub mod filter;
pub mod host;
pub mod metadata;
pub mod options;
pub mod store;

pub use bus::{ChangeBus, Channel, Emitter, FilterChangedArgs, SubscriptionId};
pub use column::{CollectionOption, ColumnDefinition, ColumnFilterConfig, Formatter, FormatterArgs};
pub use coordinator::{
    BackendServiceApi, Deferred, FilterCoordinator, FilterPayload, QueryHandle, QueryKind,
    RemoteError, RemoteService,
};
pub use filter::{FilterError, FilterResult, LocalFilter, Operator};
pub use host::{DataView, GridHost, MemoryDataView, MemoryGrid};
pub use metadata::{
    FilterCallback, FilterCallbackArgs, FilterElement, FilterMetadata, FilterMetadataRegistry,
    InputEvent, InputEventKind, TextElement,
};
pub use options::{FilterOptions, FilterSettings};
pub use store::{ColumnFilter, ColumnFilterStore, ColumnFilters, CurrentFilter};
