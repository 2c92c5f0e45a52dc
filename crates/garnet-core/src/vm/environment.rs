//! Local variable scopes
//!
//! A method frame owns a root environment; every block invocation gets a
//! child environment whose parent is the scope the block was created in.
//! `GetLocal depth=n` walks `n` parents, so a block body reads and writes
//! the locals of its defining frame directly. Environments are shared
//! handles, which is how a thread body sees the spawner's locals.

use crate::value::Value;
use crate::{VmError, VmResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// One lexical scope of local slots
#[derive(Debug)]
pub struct Environment {
    slots: Mutex<Vec<Value>>,
    parent: Option<Arc<Environment>>,
}

impl Environment {
    /// Outermost scope of a method frame
    pub fn root(size: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(vec![Value::nil(); size]),
            parent: None,
        })
    }

    /// Nested scope for a block invocation
    pub fn child(parent: &Arc<Environment>, size: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: Mutex::new(vec![Value::nil(); size]),
            parent: Some(parent.clone()),
        })
    }

    /// Parent scope
    pub fn parent(&self) -> Option<&Arc<Environment>> {
        self.parent.as_ref()
    }

    fn scope(&self, depth: usize) -> VmResult<&Environment> {
        let mut env = self;
        for _ in 0..depth {
            env = env.parent.as_deref().ok_or_else(|| {
                VmError::InvalidBytecode(format!("no enclosing scope at depth {}", depth))
            })?;
        }
        Ok(env)
    }

    /// Read slot `index` of the scope `depth` levels up
    pub fn get(&self, depth: usize, index: usize) -> VmResult<Value> {
        let env = self.scope(depth)?;
        let slots = env.slots.lock();
        slots.get(index).cloned().ok_or_else(|| {
            VmError::InvalidBytecode(format!("local {} out of bounds ({})", index, slots.len()))
        })
    }

    /// Write slot `index` of the scope `depth` levels up
    pub fn set(&self, depth: usize, index: usize, value: Value) -> VmResult<()> {
        let env = self.scope(depth)?;
        let mut slots = env.slots.lock();
        let len = slots.len();
        let slot = slots.get_mut(index).ok_or_else(|| {
            VmError::InvalidBytecode(format!("local {} out of bounds ({})", index, len))
        })?;
        *slot = value;
        Ok(())
    }

    /// Number of slots in this scope
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether this scope has no slots
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_sees_parent_writes() {
        let root = Environment::root(2);
        let child = Environment::child(&root, 1);

        child.set(1, 0, Value::int(5)).unwrap();
        assert_eq!(root.get(0, 0).unwrap(), Value::int(5));
        assert_eq!(child.get(0, 0).unwrap(), Value::nil());
    }

    #[test]
    fn test_out_of_bounds() {
        let root = Environment::root(1);
        assert!(root.get(0, 1).is_err());
        assert!(root.get(1, 0).is_err());
    }
}
