//! Hierarchical variable-binding scopes and the capability grant set.
//!
//! A context is owned by exactly one execution at a time. Name resolution
//! walks the scope stack innermost to outermost; writes land in the
//! nearest scope that already defines the name, otherwise in the
//! innermost scope. Block-local names never leak upward, but mutations of
//! pre-existing outer names remain visible after the block exits.

use std::collections::{HashMap, HashSet};

use super::expression::Value;

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("undefined name: {0}")]
    UndefinedName(String),
}

/// Raised when a side-effecting step names a capability absent from the
/// active grant set. Never a silent no-op.
#[derive(Debug, thiserror::Error)]
#[error("capability '{capability}' required for {action}")]
pub struct CapabilityError {
    pub capability: String,
    pub action: String,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    variables: HashMap<String, Value>,
}

/// Execution context: scope stack plus capability grants and dry-run flag.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    scopes: Vec<Scope>,
    capabilities: HashSet<String>,
    dry_run: bool,
    // Writes never resolve into scopes below this index. 0 in normal
    // execution; raised to the overlay boundary while a dry run is active
    // so the seeded bindings stay untouched.
    barrier: usize,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            capabilities: HashSet::new(),
            dry_run: false,
            barrier: 0,
        }
    }

    pub fn from_bindings(bindings: HashMap<String, Value>) -> Self {
        let mut ctx = Self::new();
        ctx.scopes[0].variables = bindings;
        ctx
    }

    /// Looks a name up, innermost scope first.
    pub fn get(&self, name: &str) -> Result<Value, ContextError> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.variables.get(name) {
                return Ok(value.clone());
            }
        }
        Err(ContextError::UndefinedName(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|scope| scope.variables.contains_key(name))
    }

    /// Overwrites the nearest scope at or above the write barrier that
    /// already defines `name`; otherwise defines it in the innermost
    /// scope. A name only defined below the barrier is shadowed at the
    /// overlay root instead, so the write survives block exits exactly as
    /// a live run's ancestor mutation would while the protected bindings
    /// stay untouched.
    pub fn set(&mut self, name: &str, value: Value) {
        for index in (self.barrier..self.scopes.len()).rev() {
            if self.scopes[index].variables.contains_key(name) {
                self.scopes[index]
                    .variables
                    .insert(name.to_string(), value);
                return;
            }
        }
        let shadows_protected = self.scopes[..self.barrier]
            .iter()
            .any(|scope| scope.variables.contains_key(name));
        let target = if shadows_protected {
            self.barrier.min(self.scopes.len() - 1)
        } else {
            self.scopes.len() - 1
        };
        self.scopes[target].variables.insert(name.to_string(), value);
    }

    /// Forces a definition in the innermost scope, shadowing any outer
    /// binding. Used for loop iterator bindings.
    pub fn define(&mut self, name: &str, value: Value) {
        self.scopes
            .last_mut()
            .expect("context always has a root scope")
            .variables
            .insert(name.to_string(), value);
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Starts a dry-run overlay: writes from here on can only land at or
    /// above the overlay, so everything below stays untouched. Returns
    /// the previous barrier for [`Self::end_overlay`].
    pub fn begin_overlay(&mut self) -> usize {
        let previous = self.barrier;
        self.barrier = self.scopes.len();
        self.push_scope();
        previous
    }

    /// Discards the overlay and restores the previous write barrier.
    pub fn end_overlay(&mut self, previous: usize) {
        while self.scopes.len() > self.barrier {
            self.scopes.pop();
        }
        self.barrier = previous;
    }

    /// Flattens visible bindings for trace snapshots; inner scopes shadow
    /// outer ones.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let mut flat = HashMap::new();
        for scope in &self.scopes {
            for (name, value) in &scope.variables {
                flat.insert(name.clone(), value.clone());
            }
        }
        flat
    }

    pub fn grant(&mut self, capability: impl Into<String>) {
        self.capabilities.insert(capability.into());
    }

    pub fn grant_all<I, S>(&mut self, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for capability in capabilities {
            self.grant(capability);
        }
    }

    /// A `"*"` grant satisfies every capability check.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability) || self.capabilities.contains("*")
    }

    pub fn require_capability(&self, capability: &str, action: &str) -> Result<(), CapabilityError> {
        if self.has_capability(capability) {
            Ok(())
        } else {
            Err(CapabilityError {
                capability: capability.to_string(),
                action: action.to_string(),
            })
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }
}
