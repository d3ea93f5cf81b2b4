//! The table widget family: sortable, filterable, paginated rows with row selection.

mod definition;
mod record;
mod sort;

use std::collections::HashMap;
use std::rc::Rc;

use anyhow::Context;
pub use definition::{
    ColumnDefinition, DEFAULT_ROW_KEY, DataKind, PaginationWindow, RowClickDefinition, SortDirection, TableDefinition,
};
pub use record::TableRecord;
use serde_json::Value;
pub use sort::{compare_by_column, sort_rows};

use super::{DataState, Definition};
use crate::StoreError;
use crate::fetch::{FetchRequest, Fetching, RequestHandler};
use crate::flux::{
    Action, ActionEnvelope, ComponentKind, ComponentTags, DispatchContext, Event, InstanceId, NotificationBus,
    Registry, RequestData, Store,
};

/// A single table row as received from the server.
pub type Row = serde_json::Map<String, Value>;

/// The value of a row's key field, used to track its selection.
pub type RowKey = String;

/// Post-processes the rows of every payload before they are stored.
pub type RowTransform = Rc<dyn Fn(Vec<Row>) -> Vec<Row>>;

/// Invoked with the clicked row.
pub type RowClickCallback = Rc<dyn Fn(&Row)>;

/// The resolved row-click configuration of an instance.
#[derive(Clone)]
pub struct RowClickData {
    /// The row field used as the label of the click affordance.
    pub label_key: String,
    pub callback: RowClickCallback,
}

impl RowClickData {
    pub fn invoke(&self, row: &Row) {
        (self.callback)(row)
    }
}

/// Owns every table instance and routes table actions to them.
pub struct TableStore {
    registry: Registry<TableRecord>,
    bus: NotificationBus,
    fetcher: Rc<dyn RequestHandler>,
    row_clicks: HashMap<String, RowClickCallback>,
    transforms: HashMap<String, RowTransform>,
    last_ticket: u64,
}

impl TableStore {
    pub fn new(fetcher: Rc<dyn RequestHandler>) -> Self {
        TableStore {
            registry: Registry::new(),
            bus: NotificationBus::new(ComponentKind::Table),
            fetcher,
            row_clicks: HashMap::new(),
            transforms: HashMap::new(),
            last_ticket: 0,
        }
    }

    /// Makes the callback available to definitions as `rowClick.callback`.
    pub fn register_row_click(&mut self, name: impl Into<String>, callback: RowClickCallback) {
        self.row_clicks.insert(name.into(), callback);
    }

    /// Makes the transform available to definitions as `postProcess`.
    pub fn register_transform(&mut self, name: impl Into<String>, transform: RowTransform) {
        self.transforms.insert(name.into(), transform);
    }

    /// Creates a new instance unless one with the same id already exists.
    ///
    /// Returns `Ok(false)` if the instance already exists. Fails if the definition references callbacks that
    /// weren't registered or describes a table that can't be displayed.
    pub fn create_instance(&mut self, id: &InstanceId, definition: TableDefinition) -> Result<bool, StoreError> {
        if self.registry.contains(id) {
            return Ok(false);
        }

        self.validate(id, &definition)?;
        tracing::debug!("Creating table '{}' for {}", id, definition.url);
        Ok(self.registry.create(id.clone(), TableRecord::new(definition)))
    }

    /// Removes the instance and cancels its pending request.
    ///
    /// Returns `false` if there was no such instance.
    pub fn destroy_instance(&mut self, id: &InstanceId) -> bool {
        let Some(mut record) = self.registry.destroy(id) else {
            return false;
        };

        record.requests().abort();
        tracing::debug!("Destroyed table '{}'", id);
        true
    }

    /// The bus this store emits its notifications on.
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NotificationBus {
        &mut self.bus
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.registry.contains(id)
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.registry.ids().cloned().collect()
    }

    pub fn record(&self, id: &InstanceId) -> Option<&TableRecord> {
        self.registry.get(id)
    }

    /// Returns the current page of filtered rows, or `None` if there's no such instance.
    pub fn get_data(&self, id: &InstanceId) -> Option<DataState<Vec<Row>>> {
        Some(self.registry.get(id)?.get_data())
    }

    /// Returns the number of rows that pass the filter. `None` until the data is loaded.
    pub fn get_data_count(&self, id: &InstanceId) -> Option<usize> {
        self.registry.get(id)?.data_count()
    }

    pub fn get_col_definitions(&self, id: &InstanceId) -> Option<Vec<ColumnDefinition>> {
        Some(self.registry.get(id)?.columns().to_vec())
    }

    pub fn get_sort_col_index(&self, id: &InstanceId) -> Option<usize> {
        self.registry.get(id)?.sort_col_index()
    }

    pub fn get_row_click_data(&self, id: &InstanceId) -> Option<RowClickData> {
        let row_click = self.registry.get(id)?.definition().row_click.as_ref()?;
        let callback = self.row_clicks.get(&row_click.callback)?;

        Some(RowClickData {
            label_key: row_click.label_key.clone(),
            callback: callback.clone(),
        })
    }

    pub fn get_pagination_data(&self, id: &InstanceId) -> Option<PaginationWindow> {
        self.registry.get(id)?.pagination()
    }

    pub fn get_selected_items(&self, id: &InstanceId) -> Option<Vec<RowKey>> {
        Some(self.registry.get(id)?.selected_items())
    }

    /// Returns the selection keys of the rows on the current page.
    pub fn get_row_keys(&self, id: &InstanceId) -> Option<DataState<Vec<RowKey>>> {
        Some(self.registry.get(id)?.get_row_keys())
    }

    /// Returns every row that passes the filter, ignoring pagination.
    pub fn get_filtered_data(&self, id: &InstanceId) -> Option<DataState<Vec<Row>>> {
        Some(self.registry.get(id)?.get_filtered_data())
    }

    fn validate(&self, id: &InstanceId, definition: &TableDefinition) -> Result<(), StoreError> {
        if let Some(row_click) = &definition.row_click {
            if !self.row_clicks.contains_key(&row_click.callback) {
                return Err(StoreError::invalid_definition(
                    id,
                    format!("row click callback '{}' isn't registered", row_click.callback),
                ));
            }
        }

        if let Some(post_process) = &definition.post_process {
            if !self.transforms.contains_key(post_process) {
                return Err(StoreError::invalid_definition(
                    id,
                    format!("row transform '{}' isn't registered", post_process),
                ));
            }
        }

        if definition.pagination.is_some_and(|pagination| pagination.size == 0) {
            return Err(StoreError::invalid_definition(id, "page size must be positive"));
        }

        if let Some(col_index) = definition.sort_col_index {
            if col_index >= definition.columns.len() {
                return Err(StoreError::invalid_definition(
                    id,
                    format!(
                        "sort column {} is out of range for {} columns",
                        col_index,
                        definition.columns.len()
                    ),
                ));
            }
        }

        Ok(())
    }

    fn request_data(
        &mut self,
        id: &InstanceId,
        request: &RequestData,
        ctx: &mut DispatchContext<'_>,
    ) -> anyhow::Result<()> {
        if !self.registry.contains(id) {
            match &request.definition {
                Some(Definition::Table(definition)) => {
                    self.create_instance(id, definition.clone())
                        .context("failed to create a table instance")?;
                }
                Some(other) => {
                    return Err(StoreError::UnexpectedDefinition {
                        id: id.clone(),
                        expected: ComponentKind::Table,
                        found: other.component(),
                    }
                    .into());
                }
                None => {
                    tracing::warn!("Can't request data for table '{}': it doesn't exist and has no definition", id);
                    return Ok(());
                }
            }
        }

        let Some(record) = self.registry.get_mut(id) else {
            return Ok(());
        };

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        let responder = ctx.responder(ComponentKind::Table, id.clone(), ticket);
        let handle = self.fetcher.request(
            FetchRequest {
                url: record.definition().url.clone(),
                params: request.params.clone(),
            },
            responder,
        );
        record.requests().replace(ticket, handle);
        Ok(())
    }

    /// Ingests a payload. Returns `false` if the completion was discarded.
    fn receive_data(&mut self, id: &InstanceId, ticket: u64, payload: &Value) -> bool {
        let Some(record) = self.registry.settle(id, ticket) else {
            return false;
        };

        match serde_json::from_value::<Vec<Row>>(payload.clone()) {
            Ok(rows) => {
                let transform = record
                    .definition()
                    .post_process
                    .as_ref()
                    .and_then(|name| self.transforms.get(name));
                record.on_data_received(rows, transform);
                self.bus.emit_scoped(Event::Change, id);
            }
            Err(e) => {
                tracing::warn!("Table '{}' received a malformed payload: {}", id, e);
                record.on_request_failed();
                self.bus.emit_scoped(Event::Fail, id);
            }
        }
        true
    }

    fn request_failed(&mut self, id: &InstanceId, ticket: u64, reason: &str) -> bool {
        let Some(record) = self.registry.settle(id, ticket) else {
            return false;
        };

        tracing::warn!("Failed to load data for table '{}': {}", id, reason);
        record.on_request_failed();
        self.bus.emit_scoped(Event::Fail, id);
        true
    }

    /// Applies the update to an existing instance and emits a change if it reports one.
    fn update(&mut self, id: &InstanceId, update: impl FnOnce(&mut TableRecord) -> bool) {
        let Some(record) = self.registry.get_mut(id) else {
            tracing::debug!("Ignoring an update for table '{}': the instance doesn't exist", id);
            return;
        };

        if update(record) {
            self.bus.emit_scoped(Event::Change, id);
        }
    }
}

impl Store for TableStore {
    fn component_tags(&self) -> ComponentTags {
        ComponentTags::One(ComponentKind::Table)
    }

    fn handle(&mut self, envelope: &ActionEnvelope, ctx: &mut DispatchContext<'_>) -> anyhow::Result<()> {
        let Some(id) = envelope.id.as_ref() else {
            tracing::debug!("Ignoring family-wide {} for tables", envelope.action.name());
            return Ok(());
        };

        match &envelope.action {
            Action::RequestData(request) => self.request_data(id, request, ctx)?,
            Action::ReceiveData { ticket, payload } => {
                self.receive_data(id, *ticket, payload);
            }
            Action::RequestFailed { ticket, reason } => {
                self.request_failed(id, *ticket, reason);
            }
            Action::SortChange { col_index, direction } => {
                self.update(id, |record| record.sort_data(*col_index, *direction));
            }
            Action::Filter(value) => self.update(id, |record| {
                record.set_filter(value);
                true
            }),
            Action::Paginate(direction) => self.update(id, |record| record.paginate(*direction)),
            Action::ToggleRowSelect(key) => self.update(id, |record| {
                record.toggle_row_select(key);
                true
            }),
            Action::ToggleBulkSelect => self.update(id, |record| {
                record.toggle_bulk_select();
                true
            }),
            Action::DestroyInstance => {
                self.destroy_instance(id);
            }
            Action::DrillIn(_) | Action::DrillOut | Action::Query(_) => {
                tracing::debug!("Tables don't support {}", envelope.action.name());
            }
        }

        Ok(())
    }
}
