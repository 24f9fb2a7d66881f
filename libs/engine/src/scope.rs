//! Lexical scopes.
//!
//! Scopes live in an arena owned by the engine; a frame points at its
//! parent by index, so there are no reference cycles to manage. Lookup
//! walks the chain from the current frame outward; `define` creates or
//! shadows in the innermost frame.

use crate::defs::Definition;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub(crate) struct Scope {
    bindings: HashMap<Arc<str>, Definition>,
    parent: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct ScopeArena {
    scopes: Vec<Scope>,
    current: usize,
}

impl ScopeArena {
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![Scope::default()],
            current: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Opens a child of the current frame and enters it.
    pub fn push(&mut self) -> usize {
        self.scopes.push(Scope {
            bindings: HashMap::new(),
            parent: Some(self.current),
        });
        self.current = self.scopes.len() - 1;
        self.current
    }

    /// Leaves the current frame. Its bindings are discarded from lookup
    /// (the frame stays in the arena; frames are cheap and evaluation
    /// depth is bounded).
    pub fn pop(&mut self) -> Result<()> {
        let parent = self.scopes[self.current]
            .parent
            .ok_or(Error::ScopeUnderflow)?;
        self.current = parent;
        Ok(())
    }

    pub fn define(&mut self, name: Arc<str>, def: Definition) {
        self.scopes[self.current].bindings.insert(name, def);
    }

    pub fn define_in_global(&mut self, name: Arc<str>, def: Definition) {
        self.scopes[0].bindings.insert(name, def);
    }

    /// Walks the chain from the current frame outward.
    pub fn lookup(&self, name: &str) -> Option<&Definition> {
        let mut frame = Some(self.current);
        while let Some(i) = frame {
            if let Some(def) = self.scopes[i].bindings.get(name) {
                return Some(def);
            }
            frame = self.scopes[i].parent;
        }
        None
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Definition> {
        let mut frame = Some(self.current);
        while let Some(i) = frame {
            if self.scopes[i].bindings.contains_key(name) {
                return self.scopes[i].bindings.get_mut(name);
            }
            frame = self.scopes[i].parent;
        }
        None
    }

    /// Is `name` bound in the *current* frame (not an outer one)?
    pub fn is_local(&self, name: &str) -> bool {
        self.scopes[self.current].bindings.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::ValueDef;
    use crate::expr::Expr;
    use crate::types::Type;

    fn value_def(n: i64) -> Definition {
        Definition::Value(ValueDef::new(Type::INTEGERS).with_value(Expr::int(n)))
    }

    #[test]
    fn test_shadowing() {
        let mut arena = ScopeArena::new();
        arena.define(Arc::from("x"), value_def(1));
        arena.push();
        arena.define(Arc::from("x"), value_def(2));

        let def = arena.lookup("x").unwrap();
        let v = def.as_value().unwrap().value.as_ref().unwrap();
        assert!(v.is_same(&Expr::int(2)));

        arena.pop().unwrap();
        let def = arena.lookup("x").unwrap();
        let v = def.as_value().unwrap().value.as_ref().unwrap();
        assert!(v.is_same(&Expr::int(1)));
    }

    #[test]
    fn test_outer_lookup() {
        let mut arena = ScopeArena::new();
        arena.define(Arc::from("a"), value_def(1));
        arena.push();
        assert!(arena.lookup("a").is_some());
        assert!(!arena.is_local("a"));
    }

    #[test]
    fn test_pop_underflow() {
        let mut arena = ScopeArena::new();
        assert!(arena.pop().is_err());
    }
}
