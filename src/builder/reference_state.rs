//! Define-once bookkeeping for a single serialization pass.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::BuilderError;

/// The set of fullnames already fully emitted during one serialization pass.
///
/// A named type is defined at its first occurrence in depth-first, field-by-field
/// order and referenced by its fullname everywhere after. Create a fresh state
/// per build; it is never shared between builds.
///
/// It also tracks the namespace of the innermost definition being written,
/// which a nested definition in the null namespace must override explicitly.
#[derive(Debug, Default)]
pub struct ReferenceState {
    emitted: HashSet<String>,
    enclosing_namespace: Option<String>,
}

impl ReferenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_emitted(&self, fullname: &str) -> bool {
        self.emitted.contains(fullname)
    }

    /// Number of types emitted so far.
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    /// Return the bare fullname if already emitted; otherwise mark it and
    /// produce the definition with `define`.
    ///
    /// The mark is placed before `define` runs, so recursion back into the
    /// same fullname yields a reference.
    pub fn definition_or_reference<F>(
        &mut self,
        fullname: &str,
        define: F,
    ) -> Result<Value, BuilderError>
    where
        F: FnOnce(&mut Self) -> Result<Value, BuilderError>,
    {
        if !self.emitted.insert(fullname.to_string()) {
            return Ok(Value::String(fullname.to_string()));
        }
        define(self)
    }

    /// Infallible variant for types without nested members.
    pub(crate) fn reference_or_define<F>(&mut self, fullname: &str, define: F) -> Value
    where
        F: FnOnce(&Self) -> Value,
    {
        if !self.emitted.insert(fullname.to_string()) {
            return Value::String(fullname.to_string());
        }
        define(self)
    }

    /// Namespace a definition written at this point would inherit.
    pub fn enclosing_namespace(&self) -> Option<&str> {
        self.enclosing_namespace.as_deref()
    }

    /// Run `f` with `namespace` as the enclosing namespace, restoring the
    /// previous one afterwards.
    pub(crate) fn within_namespace<T, F>(&mut self, namespace: Option<&str>, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        let previous = std::mem::replace(
            &mut self.enclosing_namespace,
            namespace.map(str::to_string),
        );
        let result = f(self);
        self.enclosing_namespace = previous;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_is_definition_then_reference() {
        let mut state = ReferenceState::new();
        let first = state
            .definition_or_reference("ns.A", |_| Ok(json!({"defined": true})))
            .unwrap();
        let second = state
            .definition_or_reference("ns.A", |_| Ok(json!({"defined": true})))
            .unwrap();

        assert_eq!(first, json!({"defined": true}));
        assert_eq!(second, json!("ns.A"));
        assert!(state.is_emitted("ns.A"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_marked_before_definition_runs() {
        let mut state = ReferenceState::new();
        let doc = state
            .definition_or_reference("ns.Node", |state| {
                let inner = state.definition_or_reference("ns.Node", |_| Ok(json!("unreachable")))?;
                Ok(json!({"next": inner}))
            })
            .unwrap();
        assert_eq!(doc, json!({"next": "ns.Node"}));
    }

    #[test]
    fn test_enclosing_namespace_is_restored() {
        let mut state = ReferenceState::new();
        let inner = state.within_namespace(Some("outer"), |state| {
            state.within_namespace(None, |state| state.enclosing_namespace().is_none())
                && state.enclosing_namespace() == Some("outer")
        });
        assert!(inner);
        assert_eq!(state.enclosing_namespace(), None);
    }
}
