//! The pie chart widget family: hierarchical categories with drill-down.

mod record;

use std::rc::Rc;

pub use record::PieChartRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataState, Definition};
use crate::fetch::{FetchRequest, Fetching, RequestHandler};
use crate::flux::{
    Action, ActionEnvelope, ComponentKind, ComponentTags, DispatchContext, Event, InstanceId, NotificationBus,
    Registry, RequestData, Store,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieChartDefinition {
    pub url: String,
    /// The title of the chart.
    pub label: String,
}

/// One category of a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieNode {
    pub name: String,
    pub value: f64,
    pub percent: f64,
    /// Subcategories that can be drilled into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<PieNode>>,
}

impl PieNode {
    /// The label of the frame this node opens when drilled into, e.g. `Europe - 75%`.
    pub fn breadcrumb(&self) -> String {
        format!("{} - {}%", self.name, self.percent)
    }
}

/// One level of the drill-down stack.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillFrame {
    pub data: Vec<PieNode>,
    /// `None` for the root frame.
    pub label: Option<String>,
}

/// Owns every pie chart instance and routes pie chart actions to them.
pub struct PieChartStore {
    registry: Registry<PieChartRecord>,
    bus: NotificationBus,
    fetcher: Rc<dyn RequestHandler>,
    last_ticket: u64,
}

impl PieChartStore {
    pub fn new(fetcher: Rc<dyn RequestHandler>) -> Self {
        PieChartStore {
            registry: Registry::new(),
            bus: NotificationBus::new(ComponentKind::PieChart),
            fetcher,
            last_ticket: 0,
        }
    }

    /// Creates a new instance unless one with the same id already exists.
    pub fn create_instance(&mut self, id: &InstanceId, definition: PieChartDefinition) -> bool {
        self.registry.create(id.clone(), PieChartRecord::new(definition))
    }

    /// Removes the instance and cancels its pending request.
    pub fn destroy_instance(&mut self, id: &InstanceId) -> bool {
        let Some(mut record) = self.registry.destroy(id) else {
            return false;
        };

        record.requests().abort();
        tracing::debug!("Destroyed pie chart '{}'", id);
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

    /// Returns the categories of the current drill frame, or `None` if there's no such instance.
    pub fn get_data(&self, id: &InstanceId) -> Option<DataState<Vec<PieNode>>> {
        Some(self.registry.get(id)?.get_data())
    }

    /// Returns the chart's title, or `None` if there's no such instance.
    pub fn get_label(&self, id: &InstanceId) -> Option<&str> {
        Some(self.registry.get(id)?.label())
    }

    pub fn get_breadcrumbs(&self, id: &InstanceId) -> Option<Vec<String>> {
        Some(self.registry.get(id)?.breadcrumbs())
    }

    pub fn get_drill_depth(&self, id: &InstanceId) -> Option<usize> {
        Some(self.registry.get(id)?.drill_depth())
    }

    fn request_data(
        &mut self,
        id: &InstanceId,
        request: &RequestData,
        ctx: &mut DispatchContext<'_>,
    ) -> anyhow::Result<()> {
        if !self.registry.contains(id) {
            match &request.definition {
                Some(Definition::PieChart(definition)) => {
                    tracing::debug!("Creating pie chart '{}' for {}", id, definition.url);
                    self.create_instance(id, definition.clone());
                }
                Some(other) => {
                    return Err(crate::StoreError::UnexpectedDefinition {
                        id: id.clone(),
                        expected: ComponentKind::PieChart,
                        found: other.component(),
                    }
                    .into());
                }
                None => {
                    tracing::warn!(
                        "Can't request data for pie chart '{}': it doesn't exist and has no definition",
                        id
                    );
                    return Ok(());
                }
            }
        }

        let Some(record) = self.registry.get_mut(id) else {
            return Ok(());
        };

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        let responder = ctx.responder(ComponentKind::PieChart, id.clone(), ticket);
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

    fn receive_data(&mut self, id: &InstanceId, ticket: u64, payload: &Value) {
        let Some(record) = self.registry.settle(id, ticket) else {
            return;
        };

        match serde_json::from_value::<Vec<PieNode>>(payload.clone()) {
            Ok(nodes) => {
                record.on_data_received(nodes);
                self.bus.emit_scoped(Event::Change, id);
            }
            Err(e) => {
                tracing::warn!("Pie chart '{}' received a malformed payload: {}", id, e);
                record.on_request_failed();
                self.bus.emit_scoped(Event::Fail, id);
            }
        }
    }

    fn request_failed(&mut self, id: &InstanceId, ticket: u64, reason: &str) {
        let Some(record) = self.registry.settle(id, ticket) else {
            return;
        };

        tracing::warn!("Failed to load data for pie chart '{}': {}", id, reason);
        record.on_request_failed();
        self.bus.emit_scoped(Event::Fail, id);
    }

    fn update(&mut self, id: &InstanceId, update: impl FnOnce(&mut PieChartRecord) -> bool) {
        let Some(record) = self.registry.get_mut(id) else {
            tracing::debug!("Ignoring an update for pie chart '{}': the instance doesn't exist", id);
            return;
        };

        if update(record) {
            self.bus.emit_scoped(Event::Change, id);
        }
    }
}

impl Store for PieChartStore {
    fn component_tags(&self) -> ComponentTags {
        ComponentTags::One(ComponentKind::PieChart)
    }

    fn handle(&mut self, envelope: &ActionEnvelope, ctx: &mut DispatchContext<'_>) -> anyhow::Result<()> {
        let Some(id) = envelope.id.as_ref() else {
            tracing::debug!("Ignoring family-wide {} for pie charts", envelope.action.name());
            return Ok(());
        };

        match &envelope.action {
            Action::RequestData(request) => self.request_data(id, request, ctx)?,
            Action::ReceiveData { ticket, payload } => self.receive_data(id, *ticket, payload),
            Action::RequestFailed { ticket, reason } => self.request_failed(id, *ticket, reason),
            Action::DrillIn(index) => self.update(id, |record| record.drill_in(*index)),
            Action::DrillOut => self.update(id, PieChartRecord::drill_out),
            Action::DestroyInstance => {
                self.destroy_instance(id);
            }
            Action::SortChange { .. }
            | Action::Filter(_)
            | Action::Paginate(_)
            | Action::ToggleRowSelect(_)
            | Action::ToggleBulkSelect
            | Action::Query(_) => {
                tracing::debug!("Pie charts don't support {}", envelope.action.name());
            }
        }

        Ok(())
    }
}
