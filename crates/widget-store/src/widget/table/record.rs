use indexmap::IndexMap;

use super::definition::{ColumnDefinition, DataKind, PaginationWindow, SortDirection, TableDefinition};
use super::sort::{cell_number, cell_text, sort_rows_by};
use super::{Row, RowKey, RowTransform};
use crate::fetch::{Fetching, RequestSlot};
use crate::flux::Direction;
use crate::widget::DataState;

/// A received row together with its position in the payload, which keys rows lacking a key field.
struct StoredRow {
    position: usize,
    row: Row,
}

/// The state of one table instance.
pub struct TableRecord {
    /// The definition the instance was created with.
    definition: TableDefinition,
    /// Column descriptors; their sort directions change as the table is sorted.
    columns: Vec<ColumnDefinition>,
    rows: DataState<Vec<StoredRow>>,
    /// The number of rows received with the latest payload.
    count: usize,
    sort_col_index: Option<usize>,
    filter: Option<String>,
    pagination: Option<PaginationWindow>,
    selection: IndexMap<RowKey, bool>,
    requests: RequestSlot,
}

impl TableRecord {
    pub fn new(definition: TableDefinition) -> Self {
        TableRecord {
            columns: definition.columns.clone(),
            rows: DataState::Loading,
            count: 0,
            sort_col_index: definition.sort_col_index,
            filter: None,
            pagination: definition.pagination,
            selection: IndexMap::new(),
            requests: RequestSlot::default(),
            definition,
        }
    }

    pub fn definition(&self) -> &TableDefinition {
        &self.definition
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn sort_col_index(&self) -> Option<usize> {
        self.sort_col_index
    }

    pub fn pagination(&self) -> Option<PaginationWindow> {
        self.pagination
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Stores the received rows and re-applies the current sort.
    pub fn on_data_received(&mut self, rows: Vec<Row>, transform: Option<&RowTransform>) {
        self.count = rows.len();
        let rows = match transform {
            Some(transform) => transform(rows),
            None => rows,
        };
        self.rows = DataState::Ready(
            rows.into_iter()
                .enumerate()
                .map(|(position, row)| StoredRow { position, row })
                .collect(),
        );

        if let Some(col_index) = self.sort_col_index {
            let direction = self
                .columns
                .get(col_index)
                .and_then(|column| column.sort_direction)
                .unwrap_or_default();
            self.sort_data(col_index, direction);
        }
    }

    /// Drops the rows and marks the data as failed to load.
    pub fn on_request_failed(&mut self) {
        self.rows = DataState::Failed;
        self.count = 0;
    }

    /// Returns the filtered rows of the current page.
    ///
    /// Without a filter and pagination, returns a copy of all rows.
    pub fn get_data(&self) -> DataState<Vec<Row>> {
        self.rows.as_ref().map(|rows| {
            let rows = self.filtered(rows);
            match self.pagination {
                Some(PaginationWindow { cursor, size }) => rows.into_iter().skip(cursor).take(size).cloned().collect(),
                None => rows.into_iter().cloned().collect(),
            }
        })
    }

    /// Returns all rows that pass the filter, ignoring pagination.
    pub fn get_filtered_data(&self) -> DataState<Vec<Row>> {
        self.rows
            .as_ref()
            .map(|rows| self.filtered(rows).into_iter().cloned().collect())
    }

    /// Returns the total number of rows, taking the filter into account.
    pub fn data_count(&self) -> Option<usize> {
        let rows = self.rows.ready()?;
        match self.filter {
            Some(_) => Some(self.filtered(rows).len()),
            None => Some(self.count),
        }
    }

    /// Sorts all rows by the column and resets the pagination cursor.
    ///
    /// Returns `false` if there is no such column.
    pub fn sort_data(&mut self, col_index: usize, direction: SortDirection) -> bool {
        let Some(column) = self.columns.get_mut(col_index) else {
            tracing::debug!("Can't sort by column {}: the table has {} columns", col_index, self.columns.len());
            return false;
        };

        column.sort_direction = Some(direction);
        self.sort_col_index = Some(col_index);
        self.reset_cursor();

        if let DataState::Ready(rows) = &mut self.rows {
            sort_rows_by(rows, |stored| &stored.row, &self.columns[col_index], direction);
        }
        true
    }

    /// Sets the quick filter and resets the pagination cursor. An empty value clears the filter.
    pub fn set_filter(&mut self, value: &str) {
        self.filter = (!value.is_empty()).then(|| value.to_string());
        self.reset_cursor();
    }

    /// Moves the cursor by one page.
    ///
    /// Doesn't clamp the cursor to the number of rows: deciding whether there's a next page is up to the view.
    /// Returns `false` if the table isn't paginated.
    pub fn paginate(&mut self, direction: Direction) -> bool {
        let Some(pagination) = self.pagination.as_mut() else {
            return false;
        };

        pagination.cursor = match direction {
            Direction::Right => pagination.cursor + pagination.size,
            Direction::Left => pagination.cursor.saturating_sub(pagination.size),
        };
        true
    }

    /// Flips the selection of a single row.
    pub fn toggle_row_select(&mut self, key: &str) {
        let selected = self.selection.entry(key.to_string()).or_insert(false);
        *selected = !*selected;
    }

    /// Selects every row of the filtered view, or deselects them all if they're already selected.
    pub fn toggle_bulk_select(&mut self) {
        let Some(rows) = self.rows.ready() else {
            return;
        };

        let keys = self
            .filtered_stored(rows)
            .map(|stored| self.key_of(stored))
            .collect::<Vec<_>>();
        let select = !keys.iter().all(|key| self.is_selected(key));

        for key in keys {
            self.selection.insert(key, select);
        }
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selection.get(key).copied().unwrap_or(false)
    }

    /// Returns the keys of all selected rows in the order they were first toggled.
    pub fn selected_items(&self) -> Vec<RowKey> {
        self.selection
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the keys of the rows [TableRecord::get_data] returns, in the same order.
    pub fn get_row_keys(&self) -> DataState<Vec<RowKey>> {
        self.rows.as_ref().map(|rows| {
            let keys = self.filtered_stored(rows).map(|stored| self.key_of(stored));
            match self.pagination {
                Some(PaginationWindow { cursor, size }) => keys.skip(cursor).take(size).collect(),
                None => keys.collect(),
            }
        })
    }

    /// Rows without a key field are keyed by their position in the received payload.
    fn key_of(&self, stored: &StoredRow) -> RowKey {
        cell_text(stored.row.get(self.definition.row_key())).unwrap_or_else(|| stored.position.to_string())
    }

    fn reset_cursor(&mut self) {
        if let Some(pagination) = self.pagination.as_mut() {
            pagination.cursor = 0;
        }
    }

    fn filtered<'r>(&self, rows: &'r [StoredRow]) -> Vec<&'r Row> {
        self.filtered_stored(rows).map(|stored| &stored.row).collect()
    }

    fn filtered_stored<'r>(&self, rows: &'r [StoredRow]) -> impl Iterator<Item = &'r StoredRow> {
        let needle = self.filter.as_ref().map(|filter| QuickFilter::new(filter));
        let columns = &self.columns;
        rows.iter()
            .filter(move |stored| needle.as_ref().is_none_or(|needle| needle.matches(&stored.row, columns)))
    }
}

/// A parsed quick filter value.
struct QuickFilter {
    lowercase: String,
    number: Option<f64>,
}

impl QuickFilter {
    fn new(value: &str) -> Self {
        QuickFilter {
            lowercase: value.to_lowercase(),
            number: value.trim().parse().ok(),
        }
    }

    /// Returns true if any filter-eligible column matches.
    fn matches(&self, row: &Row, columns: &[ColumnDefinition]) -> bool {
        columns.iter().filter(|column| column.quick_filter).any(|column| {
            let value = row.get(&column.data_property);
            match column.kind {
                DataKind::String | DataKind::Status | DataKind::Select => {
                    cell_text(value).is_some_and(|text| text.to_lowercase().contains(&self.lowercase))
                }
                DataKind::Number | DataKind::Percent => match (self.number, cell_number(value)) {
                    (Some(needle), Some(value)) => needle == value,
                    _ => false,
                },
                DataKind::Time => false,
            }
        })
    }
}

impl Fetching for TableRecord {
    fn requests(&mut self) -> &mut RequestSlot {
        &mut self.requests
    }
}
