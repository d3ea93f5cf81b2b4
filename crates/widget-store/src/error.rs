use std::borrow::Cow;

use thiserror::Error;

use crate::flux::{ComponentKind, InstanceId};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid definition for '{id}': {reason}")]
    InvalidDefinition {
        id: InstanceId,
        reason: Cow<'static, str>,
    },
    #[error("'{id}' was requested with a {found} definition, but belongs to the {expected} store")]
    UnexpectedDefinition {
        id: InstanceId,
        expected: ComponentKind,
        found: ComponentKind,
    },
    #[error("'{0}' is a reserved topic name")]
    ReservedTopic(String),
}

impl StoreError {
    pub(crate) fn invalid_definition(id: &InstanceId, reason: impl Into<Cow<'static, str>>) -> StoreError {
        StoreError::InvalidDefinition {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}
