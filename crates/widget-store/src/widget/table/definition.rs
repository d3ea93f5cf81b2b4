use serde::{Deserialize, Serialize};

/// The field that is used as a row key when the definition doesn't specify one.
pub const DEFAULT_ROW_KEY: &str = "id";

/// The kind of data stored in a table column. Drives sorting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    String,
    Number,
    Percent,
    Time,
    Status,
    Select,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    /// The row field displayed in this column.
    pub data_property: String,
    /// The row field displayed when hovering over a cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover_property: Option<String>,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: DataKind,
    /// The direction used when the table is sorted by this column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    /// Whether the quick filter looks at this column.
    #[serde(default)]
    pub quick_filter: bool,
}

impl ColumnDefinition {
    pub fn new(data_property: impl Into<String>, label: impl Into<String>, kind: DataKind) -> Self {
        ColumnDefinition {
            data_property: data_property.into(),
            hover_property: None,
            label: label.into(),
            kind,
            sort_direction: None,
            width: None,
            quick_filter: false,
        }
    }

    pub fn with_sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = Some(direction);
        self
    }

    pub fn with_quick_filter(mut self) -> Self {
        self.quick_filter = true;
        self
    }
}

/// A window into the table's rows: `[cursor, cursor + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationWindow {
    pub cursor: usize,
    pub size: usize,
}

/// Describes what happens when a row is clicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowClickDefinition {
    /// The name of a callback registered with [super::TableStore::register_row_click].
    pub callback: String,
    /// The row field used as the label of the click affordance.
    pub label_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub url: String,
    pub columns: Vec<ColumnDefinition>,
    /// The column the table is initially sorted by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_col_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_click: Option<RowClickDefinition>,
    /// The row field used to identify rows for selection. Defaults to [DEFAULT_ROW_KEY].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_key: Option<String>,
    /// The name of a transform registered with [super::TableStore::register_transform].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_process: Option<String>,
}

impl TableDefinition {
    pub fn new(url: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        TableDefinition {
            url: url.into(),
            columns,
            sort_col_index: None,
            pagination: None,
            row_click: None,
            row_key: None,
            post_process: None,
        }
    }

    pub fn with_sort_col_index(mut self, index: usize) -> Self {
        self.sort_col_index = Some(index);
        self
    }

    pub fn with_pagination(mut self, size: usize) -> Self {
        self.pagination = Some(PaginationWindow { cursor: 0, size });
        self
    }

    pub fn row_key(&self) -> &str {
        self.row_key.as_deref().unwrap_or(DEFAULT_ROW_KEY)
    }
}
