use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use indexmap::IndexMap;
use serde::Serialize;

use crate::fetch::RequestHandler;
use crate::flux::{
    ActionEnvelope, ComponentTags, DispatchContext, Dispatcher, Event, InstanceId, Listener,
    Notification, Store, StoreHandle,
};
use crate::widget::DataState;
use crate::widget::pie_chart::{PieChartStore, PieNode};
use crate::widget::search::{SearchMatch, SearchStore};
use crate::widget::table::{PaginationWindow, Row, RowKey, TableStore};

/// Traces every dispatched action regardless of its widget family.
#[derive(Default)]
struct ActionLog {
    handled: usize,
}

impl Store for ActionLog {
    fn component_tags(&self) -> ComponentTags {
        ComponentTags::Any
    }

    fn handle(&mut self, envelope: &ActionEnvelope, _: &mut DispatchContext<'_>) -> anyhow::Result<()> {
        self.handled += 1;
        tracing::debug!(
            "#{}: {} for {} '{}'",
            self.handled,
            envelope.action.name(),
            envelope.component,
            envelope.id.as_ref().map(InstanceId::as_str).unwrap_or("*")
        );
        Ok(())
    }
}

/// Every widget store wired to a single dispatcher.
pub struct Replay {
    dispatcher: Dispatcher,
    log: StoreHandle<ActionLog>,
    tables: StoreHandle<TableStore>,
    pie_charts: StoreHandle<PieChartStore>,
    searches: StoreHandle<SearchStore>,
    /// The upper bound on waiting for the requests issued by a single action.
    wait: Duration,
}

impl Replay {
    pub fn new(fetcher: Rc<dyn RequestHandler>, wait: Duration) -> Self {
        let mut dispatcher = Dispatcher::new();
        let log = dispatcher.register(ActionLog::default());
        let tables = dispatcher.register(TableStore::new(fetcher.clone()));
        let pie_charts = dispatcher.register(PieChartStore::new(fetcher.clone()));
        let searches = dispatcher.register(SearchStore::new(fetcher));

        Replay {
            dispatcher,
            log,
            tables,
            pie_charts,
            searches,
            wait,
        }
    }

    pub fn dispatcher(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    pub fn tables(&self) -> &TableStore {
        self.dispatcher.store(self.tables)
    }

    pub fn tables_mut(&mut self) -> &mut TableStore {
        self.dispatcher.store_mut(self.tables)
    }

    pub fn pie_charts(&self) -> &PieChartStore {
        self.dispatcher.store(self.pie_charts)
    }

    pub fn searches(&self) -> &SearchStore {
        self.dispatcher.store(self.searches)
    }

    /// Returns the number of actions dispatched so far.
    pub fn dispatched(&self) -> usize {
        self.dispatcher.store(self.log).handled
    }

    /// Logs every notification emitted by any of the stores.
    pub fn subscribe(&mut self) -> anyhow::Result<()> {
        let listener: Listener = Rc::new(|notification: &Notification| match notification.event {
            Event::Change => tracing::info!("{} '{}' changed", notification.component, notification.id),
            Event::Fail => tracing::warn!("{} '{}' failed to load", notification.component, notification.id),
        });

        for topic in [Event::Change.topic(), Event::Fail.topic()] {
            self.dispatcher.store_mut(self.tables).bus_mut().on(topic, listener.clone())?;
            self.dispatcher.store_mut(self.pie_charts).bus_mut().on(topic, listener.clone())?;
            self.dispatcher.store_mut(self.searches).bus_mut().on(topic, listener.clone())?;
        }
        Ok(())
    }

    /// Dispatches the actions one by one, letting the requests of each action settle before the next one.
    pub fn run(&mut self, actions: Vec<ActionEnvelope>) -> anyhow::Result<Snapshot> {
        for action in actions {
            let name = action.action.name();
            self.dispatcher
                .dispatch(action)
                .with_context(|| format!("failed to dispatch {}", name))?;

            if !self.dispatcher.run_until_idle(self.wait)? {
                tracing::warn!(
                    "{} request(s) didn't complete within {:?}",
                    self.dispatcher.in_flight(),
                    self.wait
                );
            }
        }

        Ok(self.snapshot())
    }

    /// Captures what the views would currently display.
    pub fn snapshot(&self) -> Snapshot {
        let tables = self.tables();
        let pie_charts = self.pie_charts();
        let searches = self.searches();

        Snapshot {
            tables: tables
                .instance_ids()
                .into_iter()
                .filter_map(|id| {
                    let snapshot = TableSnapshot {
                        data: tables.get_data(&id)?,
                        count: tables.get_data_count(&id),
                        sort_col_index: tables.get_sort_col_index(&id),
                        pagination: tables.get_pagination_data(&id),
                        selected: tables.get_selected_items(&id)?,
                    };
                    Some((id, snapshot))
                })
                .collect(),
            pie_charts: pie_charts
                .instance_ids()
                .into_iter()
                .filter_map(|id| {
                    let snapshot = PieChartSnapshot {
                        label: pie_charts.get_label(&id)?.to_string(),
                        data: pie_charts.get_data(&id)?,
                        breadcrumbs: pie_charts.get_breadcrumbs(&id)?,
                    };
                    Some((id, snapshot))
                })
                .collect(),
            searches: searches
                .instance_ids()
                .into_iter()
                .filter_map(|id| {
                    let snapshot = SearchSnapshot {
                        term: searches.get_term(&id)?.to_string(),
                        matches: searches.get_data(&id)?,
                        disabled: searches.is_disabled(&id)?,
                    };
                    Some((id, snapshot))
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tables: IndexMap<InstanceId, TableSnapshot>,
    pub pie_charts: IndexMap<InstanceId, PieChartSnapshot>,
    pub searches: IndexMap<InstanceId, SearchSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub data: DataState<Vec<Row>>,
    pub count: Option<usize>,
    pub sort_col_index: Option<usize>,
    pub pagination: Option<PaginationWindow>,
    pub selected: Vec<RowKey>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PieChartSnapshot {
    pub label: String,
    pub data: DataState<Vec<PieNode>>,
    pub breadcrumbs: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnapshot {
    pub term: String,
    pub matches: DataState<Vec<SearchMatch>>,
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::fetch::{FetchRequest, RequestHandle, Responder};

    /// Answers every request right away with the payload registered for its URL.
    struct Canned(HashMap<&'static str, Value>);

    impl RequestHandler for Canned {
        fn request(&self, request: FetchRequest, responder: Responder) -> RequestHandle {
            let handle = responder.handle();
            match self.0.get(request.url.as_str()) {
                Some(payload) => responder.succeed(payload.clone()),
                None => responder.fail("not found"),
            }
            handle
        }
    }

    fn replay() -> Replay {
        let handler = Canned(HashMap::from([
            (
                "http://localhost/orders",
                json!([{ "id": "a", "total": 5 }, { "id": "b", "total": 9 }, { "id": "c", "total": 1 }]),
            ),
            (
                "http://localhost/regions",
                json!([{ "name": "EU", "value": 2, "percent": 50, "children": [{ "name": "DE", "value": 2, "percent": 100 }] }]),
            ),
            ("http://localhost/people", json!({ "people": [{ "name": "Ada" }, { "name": "Grace" }] })),
        ]));
        Replay::new(Rc::new(handler), Duration::from_secs(1))
    }

    fn script(actions: Value) -> Vec<ActionEnvelope> {
        serde_json::from_value(actions).unwrap()
    }

    #[test]
    fn replays_a_script_against_every_store() {
        let mut replay = replay();
        replay.subscribe().unwrap();

        let snapshot = replay
            .run(script(json!([
                {
                    "actionType": "REQUEST_DATA",
                    "component": "table",
                    "id": "orders",
                    "data": {
                        "definition": {
                            "url": "http://localhost/orders",
                            "columns": [{ "dataProperty": "total", "label": "Total", "type": "number" }],
                            "pagination": { "cursor": 0, "size": 2 }
                        }
                    }
                },
                { "actionType": "SORT_CHANGE", "component": "table", "id": "orders", "data": { "colIndex": 0, "direction": "descending" } },
                { "actionType": "TOGGLE_BULK_SELECT", "component": "table", "id": "orders" },
                {
                    "actionType": "REQUEST_DATA",
                    "component": "piechart",
                    "id": "regions",
                    "data": { "definition": { "url": "http://localhost/regions", "label": "Regions" } }
                },
                { "actionType": "DRILL_IN", "component": "piechart", "id": "regions", "data": 0 },
                {
                    "actionType": "REQUEST_DATA",
                    "component": "search",
                    "id": "people",
                    "data": { "definition": { "url": "http://localhost/people", "fullDataResponse": true, "listKey": "people" } }
                },
                { "actionType": "QUERY", "component": "search", "id": "people", "data": "gr" },
            ])))
            .unwrap();

        assert_eq!(replay.dispatched(), 10);

        let orders = &snapshot.tables[&InstanceId::from("orders")];
        let totals = orders.data.ready().unwrap().iter().map(|row| row["total"].clone()).collect::<Vec<_>>();
        assert_eq!(totals, vec![json!(9), json!(5)]);
        assert_eq!(orders.count, Some(3));
        assert_eq!(orders.selected, vec!["b", "a", "c"]);

        let regions = &snapshot.pie_charts[&InstanceId::from("regions")];
        assert_eq!(regions.breadcrumbs, vec!["EU - 50%"]);

        let people = &snapshot.searches[&InstanceId::from("people")];
        assert_eq!(people.matches.ready().unwrap()[0].name, "Grace");
        assert!(!people.disabled);
    }

    #[test]
    fn snapshots_serialize_load_states() {
        let mut replay = replay();

        let snapshot = replay
            .run(script(json!([{
                "actionType": "REQUEST_DATA",
                "component": "piechart",
                "id": "missing",
                "data": { "definition": { "url": "http://localhost/missing", "label": "Missing" } }
            }])))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({
                "tables": {},
                "pieCharts": { "missing": { "label": "Missing", "data": { "status": "failed" }, "breadcrumbs": [] } },
                "searches": {}
            })
        );
    }

    #[test]
    fn invalid_definitions_stop_the_replay() {
        let mut replay = replay();

        let result = replay.run(script(json!([{
            "actionType": "REQUEST_DATA",
            "component": "table",
            "id": "orders",
            "data": { "definition": { "url": "http://localhost/orders", "columns": [], "sortColIndex": 3 } }
        }])));

        assert!(result.is_err());
        assert!(replay.tables().instance_ids().is_empty());
    }
}
