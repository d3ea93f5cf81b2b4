//! The search widget family: ranked substring matching over candidates fetched either at once or per term.

mod matcher;
mod record;

use std::rc::Rc;

pub use matcher::{SearchMatch, find_matches, normalize, rank};
pub use record::SearchRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{DataState, Definition};
use crate::StoreError;
use crate::fetch::{FetchRequest, Fetching, RequestHandler};
use crate::flux::{
    Action, ActionEnvelope, ComponentKind, ComponentTags, DispatchContext, Event, InstanceId, NotificationBus,
    Registry, RequestData, Store,
};

pub const DEFAULT_NAME_KEY: &str = "name";
pub const DEFAULT_QUERY_PARAM: &str = "q";

fn default_name_key() -> String {
    DEFAULT_NAME_KEY.to_string()
}

fn default_query_param() -> String {
    DEFAULT_QUERY_PARAM.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchDefinition {
    pub url: String,
    /// The minimum number of characters a term needs before it's searched for.
    #[serde(default)]
    pub min_length: usize,
    /// Fetch every candidate once and match locally instead of requesting each term.
    #[serde(default)]
    pub full_data_response: bool,
    /// The payload field that holds the candidates. The payload itself is the list if it's missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_key: Option<String>,
    /// The candidate field that is matched against.
    #[serde(default = "default_name_key")]
    pub name_key: String,
    /// The query parameter that carries the term in the per-term mode.
    #[serde(default = "default_query_param")]
    pub query_param: String,
}

impl SearchDefinition {
    pub fn new(url: impl Into<String>) -> Self {
        SearchDefinition {
            url: url.into(),
            min_length: 0,
            full_data_response: false,
            list_key: None,
            name_key: default_name_key(),
            query_param: default_query_param(),
        }
    }

    /// Extracts the candidates from a payload.
    fn candidates(&self, payload: &Value) -> Option<Vec<Value>> {
        let list = match &self.list_key {
            Some(key) => payload.get(key)?,
            None => payload,
        };
        list.as_array().cloned()
    }
}

/// Owns every search session and routes search actions to them.
pub struct SearchStore {
    registry: Registry<SearchRecord>,
    bus: NotificationBus,
    fetcher: Rc<dyn RequestHandler>,
    last_ticket: u64,
}

impl SearchStore {
    pub fn new(fetcher: Rc<dyn RequestHandler>) -> Self {
        SearchStore {
            registry: Registry::new(),
            bus: NotificationBus::new(ComponentKind::Search),
            fetcher,
            last_ticket: 0,
        }
    }

    /// Creates a new session unless one with the same id already exists.
    pub fn create_instance(&mut self, id: &InstanceId, definition: SearchDefinition) -> bool {
        self.registry.create(id.clone(), SearchRecord::new(definition))
    }

    /// Removes the session and cancels its pending request.
    pub fn destroy_instance(&mut self, id: &InstanceId) -> bool {
        let Some(mut record) = self.registry.destroy(id) else {
            return false;
        };

        record.requests().abort();
        tracing::debug!("Destroyed search '{}'", id);
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

    /// Returns the ranked matches of the current term, or `None` if there's no such session.
    pub fn get_data(&self, id: &InstanceId) -> Option<DataState<Vec<SearchMatch>>> {
        Some(self.registry.get(id)?.get_data())
    }

    /// Matches an arbitrary query against the candidates the session has loaded.
    pub fn match_query(&self, id: &InstanceId, query: &str) -> Option<DataState<Vec<SearchMatch>>> {
        Some(self.registry.get(id)?.match_query(query))
    }

    pub fn get_term(&self, id: &InstanceId) -> Option<&str> {
        Some(self.registry.get(id)?.term())
    }

    pub fn is_disabled(&self, id: &InstanceId) -> Option<bool> {
        Some(self.registry.get(id)?.is_disabled())
    }

    fn request_data(
        &mut self,
        id: &InstanceId,
        request: &RequestData,
        ctx: &mut DispatchContext<'_>,
    ) -> anyhow::Result<()> {
        if !self.registry.contains(id) {
            match &request.definition {
                Some(Definition::Search(definition)) => {
                    tracing::debug!("Creating search '{}' for {}", id, definition.url);
                    self.create_instance(id, definition.clone());
                }
                Some(other) => {
                    return Err(StoreError::UnexpectedDefinition {
                        id: id.clone(),
                        expected: ComponentKind::Search,
                        found: other.component(),
                    }
                    .into());
                }
                None => {
                    tracing::warn!("Can't request data for search '{}': it doesn't exist and has no definition", id);
                    return Ok(());
                }
            }
        }

        let Some(record) = self.registry.get_mut(id) else {
            return Ok(());
        };
        record.set_params(request.params.clone());

        if record.definition().full_data_response {
            self.fetch(id, None, ctx);
        } else if let Some(term) = record.refetch_term() {
            self.fetch(id, Some(term), ctx);
        }
        Ok(())
    }

    fn query(&mut self, id: &InstanceId, term: &str, ctx: &mut DispatchContext<'_>) {
        let Some(record) = self.registry.get_mut(id) else {
            tracing::debug!("Ignoring a query for search '{}': the session doesn't exist", id);
            return;
        };

        if let Some(term) = record.set_term(term) {
            self.fetch(id, Some(term), ctx);
        }
        self.bus.emit_scoped(Event::Change, id);
    }

    /// Requests the candidates, superseding the request in flight.
    fn fetch(&mut self, id: &InstanceId, term: Option<String>, ctx: &mut DispatchContext<'_>) {
        let Some(record) = self.registry.get_mut(id) else {
            return;
        };

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        let request = FetchRequest {
            url: record.definition().url.clone(),
            params: record.request_params(term.as_deref()),
        };
        tracing::trace!("Requesting candidates #{} for search '{}'", ticket, id);

        let responder = ctx.responder(ComponentKind::Search, id.clone(), ticket);
        let handle = self.fetcher.request(request, responder);
        record.requests().replace(ticket, handle);
    }

    fn receive_data(&mut self, id: &InstanceId, ticket: u64, payload: &Value) {
        let Some(record) = self.registry.settle(id, ticket) else {
            return;
        };

        match record.definition().candidates(payload) {
            Some(items) => {
                record.on_items_received(items);
                self.bus.emit_scoped(Event::Change, id);
            }
            None => {
                tracing::warn!("Search '{}' received a payload without a candidate list", id);
                record.on_request_failed();
                self.bus.emit_scoped(Event::Fail, id);
            }
        }
    }

    fn request_failed(&mut self, id: &InstanceId, ticket: u64, reason: &str) {
        let Some(record) = self.registry.settle(id, ticket) else {
            return;
        };

        tracing::warn!("Failed to load candidates for search '{}': {}", id, reason);
        record.on_request_failed();
        self.bus.emit_scoped(Event::Fail, id);
    }
}

impl Store for SearchStore {
    fn component_tags(&self) -> ComponentTags {
        ComponentTags::One(ComponentKind::Search)
    }

    fn handle(&mut self, envelope: &ActionEnvelope, ctx: &mut DispatchContext<'_>) -> anyhow::Result<()> {
        let Some(id) = envelope.id.as_ref() else {
            tracing::debug!("Ignoring family-wide {} for searches", envelope.action.name());
            return Ok(());
        };

        match &envelope.action {
            Action::RequestData(request) => self.request_data(id, request, ctx)?,
            Action::Query(term) => self.query(id, term, ctx),
            Action::ReceiveData { ticket, payload } => self.receive_data(id, *ticket, payload),
            Action::RequestFailed { ticket, reason } => self.request_failed(id, *ticket, reason),
            Action::DestroyInstance => {
                self.destroy_instance(id);
            }
            Action::SortChange { .. }
            | Action::Filter(_)
            | Action::Paginate(_)
            | Action::ToggleRowSelect(_)
            | Action::ToggleBulkSelect
            | Action::DrillIn(_)
            | Action::DrillOut => {
                tracing::debug!("Searches don't support {}", envelope.action.name());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::fetch::mock::MockRequestHandler;
    use crate::flux::{Dispatcher, StoreHandle};
    use crate::testing::NotificationLog;

    struct Fixture {
        dispatcher: Dispatcher,
        searches: StoreHandle<SearchStore>,
        fetcher: Rc<MockRequestHandler>,
        notifications: NotificationLog,
    }

    impl Fixture {
        fn new(definition: SearchDefinition) -> Self {
            let fetcher = Rc::new(MockRequestHandler::default());
            let mut store = SearchStore::new(fetcher.clone());
            let notifications = NotificationLog::default();
            notifications.listen(store.bus_mut(), &["change:s", "fail:s"]);

            let mut dispatcher = Dispatcher::new();
            let searches = dispatcher.register(store);
            let mut fixture = Fixture {
                dispatcher,
                searches,
                fetcher,
                notifications,
            };
            fixture.send(Action::RequestData(RequestData {
                definition: Some(definition.into()),
                params: Default::default(),
            }));
            fixture
        }

        fn send(&mut self, action: Action) {
            self.dispatcher
                .dispatch(ActionEnvelope::new(ComponentKind::Search, "s", action))
                .unwrap();
        }

        fn resolve(&mut self, index: usize, payload: Value) {
            self.fetcher.resolve(index, payload);
            self.dispatcher.pump().unwrap();
        }

        fn names(&self) -> Vec<String> {
            self.dispatcher
                .store(self.searches)
                .get_data(&InstanceId::from("s"))
                .unwrap()
                .ready()
                .unwrap()
                .iter()
                .map(|m| m.name.clone())
                .collect()
        }
    }

    #[test]
    fn full_data_is_fetched_once_and_ranked_locally() {
        let mut definition = SearchDefinition::new("http://localhost/products");
        definition.full_data_response = true;
        definition.list_key = Some("items".into());
        let mut fixture = Fixture::new(definition);
        fixture.resolve(0, json!({ "items": [{ "name": "ACME" }, { "name": "ME Item" }, { "name": "Other" }] }));

        fixture.send(Action::Query("ME".into()));
        assert_eq!(fixture.names(), vec!["ME Item", "ACME"]);

        fixture.send(Action::Query("oth".into()));
        assert_eq!(fixture.names(), vec!["Other"]);
        assert_eq!(fixture.fetcher.requests().len(), 1);
    }

    #[test]
    fn per_term_requests_carry_the_term_and_are_cached() {
        let mut fixture = Fixture::new(SearchDefinition::new("http://localhost/people"));
        assert!(fixture.fetcher.requests().is_empty());

        fixture.send(Action::Query("Ada".into()));
        let requests = fixture.fetcher.requests();
        assert_eq!(requests[0].params.get("q").map(String::as_str), Some("Ada"));
        fixture.resolve(0, json!([{ "name": "Ada Lovelace" }]));
        assert_eq!(fixture.names(), vec!["Ada Lovelace"]);

        fixture.send(Action::Query("Bob".into()));
        fixture.resolve(1, json!([{ "name": "Bobby" }]));
        fixture.send(Action::Query("Ada".into()));

        assert_eq!(fixture.fetcher.requests().len(), 2);
        assert_eq!(fixture.names(), vec!["Ada Lovelace"]);
    }

    #[test]
    fn superseded_terms_never_overwrite_newer_results() {
        let mut fixture = Fixture::new(SearchDefinition::new("http://localhost/people"));

        fixture.send(Action::Query("Al".into()));
        fixture.send(Action::Query("Alan".into()));
        fixture.resolve(1, json!(["Alan Turing"]));
        // The slow response for the earlier term arrives last
        fixture.resolve(0, json!(["Alice", "Alan Turing"]));

        assert_eq!(fixture.names(), vec!["Alan Turing"]);
        assert_eq!(fixture.dispatcher.in_flight(), 0);
    }

    #[test]
    fn returning_to_a_cached_term_drops_the_request_in_flight() {
        let mut fixture = Fixture::new(SearchDefinition::new("http://localhost/people"));
        fixture.send(Action::Query("Ad".into()));
        fixture.resolve(0, json!(["Ada"]));

        fixture.send(Action::Query("Adx".into()));
        fixture.send(Action::Query("Ad".into()));
        assert_eq!(fixture.names(), vec!["Ada"]);
        assert_eq!(fixture.dispatcher.in_flight(), 1);

        // The abandoned request completes after the cache hit
        fixture.resolve(1, json!(["Adxel"]));

        assert_eq!(fixture.names(), vec!["Ada"]);
        assert_eq!(fixture.fetcher.requests().len(), 2);
        assert_eq!(fixture.dispatcher.in_flight(), 0);
        assert_eq!(fixture.notifications.events().len(), 4);
    }

    #[test]
    fn failures_disable_the_session() {
        let mut fixture = Fixture::new(SearchDefinition::new("http://localhost/people"));

        fixture.send(Action::Query("Ada".into()));
        fixture.fetcher.reject(0);
        fixture.dispatcher.pump().unwrap();

        let store = fixture.dispatcher.store(fixture.searches);
        assert_eq!(store.is_disabled(&InstanceId::from("s")), Some(true));
        assert_eq!(
            fixture.notifications.events(),
            vec![(Event::Change, InstanceId::from("s")), (Event::Fail, InstanceId::from("s"))]
        );
    }

    #[test]
    fn destroying_a_session_aborts_its_request() {
        let mut fixture = Fixture::new(SearchDefinition::new("http://localhost/people"));
        fixture.send(Action::Query("Ada".into()));

        fixture.send(Action::DestroyInstance);
        fixture.resolve(0, json!(["Ada"]));

        assert_eq!(fixture.dispatcher.store(fixture.searches).get_data(&InstanceId::from("s")), None);
        assert_eq!(fixture.notifications.events(), vec![(Event::Change, InstanceId::from("s"))]);
    }
}
