use std::any::Any;

use super::action::{ActionEnvelope, ComponentKind};
use super::dispatcher::DispatchContext;

/// The widget families a [Store] wants to receive actions for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentTags {
    /// Accepts actions for every widget family.
    Any,
    One(ComponentKind),
    Many(Vec<ComponentKind>),
}

impl ComponentTags {
    /// Returns true if an action addressed to the provided family is applicable.
    pub fn accepts(&self, component: ComponentKind) -> bool {
        match self {
            ComponentTags::Any => true,
            ComponentTags::One(tag) => *tag == component,
            ComponentTags::Many(tags) => tags.contains(&component),
        }
    }
}

/// A Flux store that can handle [ActionEnvelopes](ActionEnvelope).
///
/// Each store is registered with the [super::Dispatcher] exactly once.
pub trait Store: Any {
    /// The widget families this store handles.
    fn component_tags(&self) -> ComponentTags;

    /// Returns true if the store should receive an action addressed to the provided family.
    ///
    /// Actions that aren't applicable are ignored without any side effects.
    fn should_handle(&self, component: ComponentKind) -> bool {
        self.component_tags().accepts(component)
    }

    /// Handles an applicable [ActionEnvelope].
    ///
    /// Must not fail for unknown instances or unsupported actions: those are no-ops.
    fn handle(&mut self, action: &ActionEnvelope, ctx: &mut DispatchContext<'_>) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_filter_components() {
        assert!(ComponentTags::Any.accepts(ComponentKind::Search));
        assert!(ComponentTags::One(ComponentKind::Table).accepts(ComponentKind::Table));
        assert!(!ComponentTags::One(ComponentKind::Table).accepts(ComponentKind::PieChart));

        let many = ComponentTags::Many(vec![ComponentKind::Table, ComponentKind::Search]);
        assert!(many.accepts(ComponentKind::Search));
        assert!(!many.accepts(ComponentKind::PieChart));
    }
}
