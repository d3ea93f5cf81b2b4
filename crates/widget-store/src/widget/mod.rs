pub mod pie_chart;
pub mod search;
pub mod table;

use pie_chart::PieChartDefinition;
use search::SearchDefinition;
use serde::{Deserialize, Serialize};
use table::TableDefinition;

use crate::flux::ComponentKind;

/// The load state of an instance's data as seen by the views.
///
/// Keeps "not loaded yet" and "failed to load" distinct from an empty, successfully loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum DataState<T> {
    Loading,
    Failed,
    Ready(T),
}

impl<T> DataState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, DataState::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DataState::Failed)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            DataState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> DataState<&T> {
        match self {
            DataState::Loading => DataState::Loading,
            DataState::Failed => DataState::Failed,
            DataState::Ready(data) => DataState::Ready(data),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DataState<U> {
        match self {
            DataState::Loading => DataState::Loading,
            DataState::Failed => DataState::Failed,
            DataState::Ready(data) => DataState::Ready(f(data)),
        }
    }
}

/// Describes how an instance fetches and interprets its data.
///
/// Definitions are told apart by their shape: tables have `columns`, pie charts have a `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Definition {
    Table(TableDefinition),
    PieChart(PieChartDefinition),
    Search(SearchDefinition),
}

impl Definition {
    /// Returns the widget family this definition belongs to.
    pub fn component(&self) -> ComponentKind {
        match self {
            Definition::Table(_) => ComponentKind::Table,
            Definition::PieChart(_) => ComponentKind::PieChart,
            Definition::Search(_) => ComponentKind::Search,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Definition::Table(definition) => &definition.url,
            Definition::PieChart(definition) => &definition.url,
            Definition::Search(definition) => &definition.url,
        }
    }
}

impl From<TableDefinition> for Definition {
    fn from(value: TableDefinition) -> Self {
        Definition::Table(value)
    }
}

impl From<PieChartDefinition> for Definition {
    fn from(value: PieChartDefinition) -> Self {
        Definition::PieChart(value)
    }
}

impl From<SearchDefinition> for Definition {
    fn from(value: SearchDefinition) -> Self {
        Definition::Search(value)
    }
}
