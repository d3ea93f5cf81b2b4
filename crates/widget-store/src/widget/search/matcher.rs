use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;

/// A candidate whose name contains the search term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub name: String,
    /// The character offset of the term within the normalized name.
    pub match_index: usize,
    /// The candidate as it was received.
    pub item: Value,
}

/// Lowercases the value and strips all whitespace from it.
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns the name of a candidate: either the candidate itself if it's a string, or its `name_key` field.
pub fn candidate_name<'a>(item: &'a Value, name_key: &str) -> Option<&'a str> {
    match item {
        Value::String(name) => Some(name),
        Value::Object(fields) => fields.get(name_key)?.as_str(),
        _ => None,
    }
}

/// Finds the candidates that contain the query and ranks them.
///
/// An empty query (after normalization) matches nothing.
pub fn find_matches(items: &[Value], query: &str, name_key: &str) -> Vec<SearchMatch> {
    let needle = normalize(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut matches = items
        .iter()
        .filter_map(|item| {
            let name = candidate_name(item, name_key)?;
            let haystack = normalize(name);
            let byte_index = haystack.find(&needle)?;

            Some(SearchMatch {
                name: name.to_string(),
                match_index: haystack[..byte_index].chars().count(),
                item: item.clone(),
            })
        })
        .collect::<Vec<_>>();

    if matches.len() > 1 {
        matches.sort_by(rank);
    }
    matches
}

/// Earlier matches first, then shorter names, then alphabetical order.
pub fn rank(a: &SearchMatch, b: &SearchMatch) -> Ordering {
    a.match_index
        .cmp(&b.match_index)
        .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn names(matches: &[SearchMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn earlier_offsets_rank_first() {
        let items = vec![json!("ACME"), json!("ME Item")];

        let matches = find_matches(&items, "ME", "name");

        assert_eq!(names(&matches), vec!["ME Item", "ACME"]);
        assert_eq!(matches[0].match_index, 0);
        assert_eq!(matches[1].match_index, 2);
    }

    #[test]
    fn ties_are_broken_by_length_then_alphabetically() {
        let items = vec![json!("mellow"), json!("melon"), json!("melee"), json!("me")];

        let matches = find_matches(&items, "me", "name");

        assert_eq!(names(&matches), vec!["me", "melee", "melon", "mellow"]);
    }

    #[test]
    fn matching_ignores_case_and_whitespace() {
        let items = vec![json!({ "name": "New  York", "id": 1 }), json!({ "name": "Newark", "id": 2 })];

        let matches = find_matches(&items, "wy ORK", "name");

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].match_index, 2);
        assert_eq!(matches[0].item, json!({ "name": "New  York", "id": 1 }));
    }

    #[test]
    fn single_matches_are_returned_as_is() {
        let items = vec![json!({ "title": "Alpha" }), json!({ "title": "Beta" })];

        let matches = find_matches(&items, "bet", "title");

        assert_eq!(names(&matches), vec!["Beta"]);
    }

    #[test]
    fn blank_queries_and_nameless_candidates_match_nothing() {
        let items = vec![json!({ "id": 1 }), json!(42), json!("named")];

        assert!(find_matches(&items, "  ", "name").is_empty());
        assert_eq!(names(&find_matches(&items, "a", "name")), vec!["named"]);
    }
}
