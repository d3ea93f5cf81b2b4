use std::collections::HashMap;

use serde_json::Value;

use super::SearchDefinition;
use super::matcher::{SearchMatch, find_matches, normalize};
use crate::fetch::{Fetching, RequestSlot};
use crate::flux::QueryParams;
use crate::widget::DataState;

/// The state of one search session.
pub struct SearchRecord {
    definition: SearchDefinition,
    /// The candidates the current term is matched against.
    items: DataState<Vec<Value>>,
    term: String,
    /// Filter parameters sent with every request.
    params: QueryParams,
    /// Candidates fetched per term, keyed by the term as it was typed.
    cache: HashMap<String, Vec<Value>>,
    /// The term of the request the record is waiting for.
    pending_term: Option<String>,
    requests: RequestSlot,
}

impl SearchRecord {
    pub fn new(definition: SearchDefinition) -> Self {
        let items = if definition.full_data_response {
            DataState::Loading
        } else {
            DataState::Ready(Vec::new())
        };

        SearchRecord {
            definition,
            items,
            term: String::new(),
            params: QueryParams::new(),
            cache: HashMap::new(),
            pending_term: None,
            requests: RequestSlot::default(),
        }
    }

    pub fn definition(&self) -> &SearchDefinition {
        &self.definition
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Returns `true` while the data couldn't be loaded.
    pub fn is_disabled(&self) -> bool {
        self.items.is_failed()
    }

    pub fn set_params(&mut self, params: QueryParams) {
        self.params = params;
    }

    /// Returns `true` if the term is long enough to be searched for.
    pub fn is_searchable(&self, term: &str) -> bool {
        term.chars().count() >= self.definition.min_length && !normalize(term).is_empty()
    }

    /// Updates the term.
    ///
    /// In the per-term mode returns the term that has to be fetched. Cached terms are served without a request.
    pub fn set_term(&mut self, term: &str) -> Option<String> {
        self.term = term.to_string();
        if self.definition.full_data_response {
            return None;
        }

        if !self.is_searchable(term) {
            self.cancel_pending();
            return None;
        }

        if let Some(cached) = self.cache.get(term) {
            tracing::trace!("Serving '{}' from the cache", term);
            let cached = cached.clone();
            self.cancel_pending();
            self.items = DataState::Ready(cached);
            return None;
        }

        self.items = DataState::Loading;
        self.pending_term = Some(self.term.clone());
        Some(self.term.clone())
    }

    /// Returns the term that has to be fetched again on a data request, bypassing the cache.
    pub fn refetch_term(&mut self) -> Option<String> {
        if self.definition.full_data_response || !self.is_searchable(&self.term) {
            return None;
        }

        self.items = DataState::Loading;
        self.pending_term = Some(self.term.clone());
        Some(self.term.clone())
    }

    /// Builds the query parameters of a request, adding the term if there is one.
    pub fn request_params(&self, term: Option<&str>) -> QueryParams {
        let mut params = self.params.clone();
        if let Some(term) = term {
            params.insert(self.definition.query_param.clone(), term.to_string());
        }
        params
    }

    /// Stores the fetched candidates.
    ///
    /// In the per-term mode they are cached under the term they were requested for.
    pub fn on_items_received(&mut self, items: Vec<Value>) {
        if self.definition.full_data_response {
            self.items = DataState::Ready(items);
            return;
        }

        if let Some(term) = self.pending_term.take() {
            self.cache.insert(term, items.clone());
        }
        self.items = DataState::Ready(items);
    }

    /// Disables the search until the next successful request.
    pub fn on_request_failed(&mut self) {
        self.items = DataState::Failed;
        self.pending_term = None;
    }

    /// Returns the ranked matches of the current term.
    pub fn get_data(&self) -> DataState<Vec<SearchMatch>> {
        self.match_query(&self.term)
    }

    /// Matches an arbitrary query against the loaded candidates.
    pub fn match_query(&self, query: &str) -> DataState<Vec<SearchMatch>> {
        self.items.as_ref().map(|items| {
            if self.is_searchable(query) {
                find_matches(items, query, &self.definition.name_key)
            } else {
                Vec::new()
            }
        })
    }

    fn cancel_pending(&mut self) {
        self.requests.abort();
        if self.pending_term.take().is_some() {
            self.items = DataState::Ready(Vec::new());
        }
    }
}

impl Fetching for SearchRecord {
    fn requests(&mut self) -> &mut RequestSlot {
        &mut self.requests
    }
}
