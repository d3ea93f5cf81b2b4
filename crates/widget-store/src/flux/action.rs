use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::widget::Definition;
use crate::widget::table::{RowKey, SortDirection};

/// Query parameters that are appended to a widget's data URL.
pub type QueryParams = IndexMap<String, String>;

/// An opaque, caller-generated identity of a single widget instance.
///
/// Used both as the registry key and as the suffix of scoped notification topics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        InstanceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(value: &str) -> Self {
        InstanceId::new(value)
    }
}

impl From<String> for InstanceId {
    fn from(value: String) -> Self {
        InstanceId(value)
    }
}

/// The widget family an action is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Table,
    PieChart,
    Search,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Table => "table",
            ComponentKind::PieChart => "piechart",
            ComponentKind::Search => "search",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a direction in which the user wants to [Action::Paginate].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
}

/// Payload of [Action::RequestData].
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    /// Used to create the instance if it doesn't exist yet, ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Definition>,
    /// Filter parameters sent along with the request.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub params: QueryParams,
}

/// A Flux action.
///
/// Serialized as `{"actionType": "...", "data": ...}` when it's a part of an [ActionEnvelope].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "actionType",
    content = "data",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    /// Create the instance if needed and (re)fetch its data.
    RequestData(RequestData),
    /// Sort a table by the column at the provided index.
    SortChange { col_index: usize, direction: SortDirection },
    /// Set the table's quick filter. An empty string clears it.
    Filter(String),
    /// Move the table's pagination window by one page.
    Paginate(Direction),
    /// Flip the selection of a single table row.
    ToggleRowSelect(RowKey),
    /// Select or deselect every row in the filtered table view.
    ToggleBulkSelect,
    /// Drill into the pie chart category at the provided index of the current frame.
    DrillIn(usize),
    /// Go back to the previous pie chart frame.
    DrillOut,
    /// Update the search term.
    Query(String),
    /// Remove the instance with all of its state.
    DestroyInstance,
    /// A request issued by the store succeeded.
    ///
    /// Produced by the [super::Dispatcher] when a fetch completes.
    ReceiveData { ticket: u64, payload: Value },
    /// A request issued by the store failed.
    ///
    /// Produced by the [super::Dispatcher] when a fetch completes.
    RequestFailed { ticket: u64, reason: String },
}

impl Action {
    /// Returns the wire name of this action.
    pub fn name(&self) -> &'static str {
        match self {
            Action::RequestData(_) => "REQUEST_DATA",
            Action::SortChange { .. } => "SORT_CHANGE",
            Action::Filter(_) => "FILTER",
            Action::Paginate(_) => "PAGINATE",
            Action::ToggleRowSelect(_) => "TOGGLE_ROW_SELECT",
            Action::ToggleBulkSelect => "TOGGLE_BULK_SELECT",
            Action::DrillIn(_) => "DRILL_IN",
            Action::DrillOut => "DRILL_OUT",
            Action::Query(_) => "QUERY",
            Action::DestroyInstance => "DESTROY_INSTANCE",
            Action::ReceiveData { .. } => "RECEIVE_DATA",
            Action::RequestFailed { .. } => "REQUEST_FAILED",
        }
    }
}

/// The message that flows through the [super::Dispatcher].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(flatten)]
    pub action: Action,
    /// The widget family this action is addressed to.
    pub component: ComponentKind,
    /// The addressed instance. Missing for family-wide actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InstanceId>,
}

impl ActionEnvelope {
    /// Creates an envelope addressed to a single instance.
    pub fn new(component: ComponentKind, id: impl Into<InstanceId>, action: Action) -> Self {
        ActionEnvelope {
            action,
            component,
            id: Some(id.into()),
        }
    }

    /// Creates an envelope addressed to the whole widget family.
    pub fn family_wide(component: ComponentKind, action: Action) -> Self {
        ActionEnvelope {
            action,
            component,
            id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::widget::pie_chart::PieChartDefinition;

    #[test]
    fn envelope_uses_the_flat_wire_format() {
        let envelope = ActionEnvelope::new(
            ComponentKind::Table,
            "orders",
            Action::SortChange {
                col_index: 1,
                direction: SortDirection::Descending,
            },
        );

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "actionType": "SORT_CHANGE",
                "component": "table",
                "id": "orders",
                "data": { "colIndex": 1, "direction": "descending" }
            })
        );
    }

    #[test]
    fn envelope_keeps_id_and_data_when_parsed() {
        let raw = json!({
            "actionType": "REQUEST_DATA",
            "component": "piechart",
            "id": "regions",
            "data": {
                "definition": { "url": "http://localhost/regions", "label": "Regions" },
                "params": { "year": "2024" }
            }
        });

        let envelope: ActionEnvelope = serde_json::from_value(raw.clone()).unwrap();

        let Action::RequestData(request) = &envelope.action else {
            panic!("unexpected action: {envelope:?}");
        };
        assert_eq!(envelope.id, Some(InstanceId::from("regions")));
        assert_eq!(
            request.definition,
            Some(Definition::PieChart(PieChartDefinition {
                url: "http://localhost/regions".to_string(),
                label: "Regions".to_string(),
            }))
        );
        assert_eq!(request.params.get("year").map(String::as_str), Some("2024"));
        assert_eq!(serde_json::to_value(&envelope).unwrap(), raw);
    }

    #[test]
    fn unit_actions_have_no_data() {
        let envelope: ActionEnvelope = serde_json::from_value(json!({
            "actionType": "DESTROY_INSTANCE",
            "component": "search",
            "id": "people"
        }))
        .unwrap();

        assert_eq!(envelope.action, Action::DestroyInstance);
        assert_eq!(envelope.component, ComponentKind::Search);
    }
}
