use crate::callable::Function;
use crate::error::BindingError;
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Arena size below which no collection is attempted.
const MIN_COLLECT: usize = 64;

/// Handle to one scope inside an [`Environments`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Execution is inside this scope or one of its children.
    #[default]
    Active,
    /// Execution left it, but a closure may still point at it.
    Exited,
    Free,
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Value>,
    constants: HashSet<String>,
    functions: HashSet<String>,
    parent: Option<EnvId>,
    /// A function was declared here or in a descendant.
    captured: bool,
    state: State,
}

impl Scope {
    fn clear(&mut self) {
        self.bindings.clear();
        self.constants.clear();
        self.functions.clear();
    }
    fn is_locked(&self, name: &str) -> bool {
        self.constants.contains(name) || self.functions.contains(name)
    }
}

/// How many times the arena itself refers to each function and array.
/// Anything with more strong references than that is held from outside.
#[derive(Default)]
struct Census {
    functions: HashMap<*const Function, usize>,
    arrays: HashMap<*const Vec<Value>, usize>,
}

impl Census {
    fn count(&mut self, value: &Value) {
        match value {
            Value::Function(function) => *self.functions.entry(Rc::as_ptr(function)).or_default() += 1,
            Value::Array(elements) => {
                let seen = self.arrays.entry(Rc::as_ptr(elements)).or_default();
                *seen += 1;
                if *seen == 1 {
                    elements.iter().for_each(|element| self.count(element));
                }
            }
            _ => {}
        }
    }
    fn held_outside(&self, function: &Rc<Function>, extra: usize) -> bool {
        let inside = self.functions.get(&Rc::as_ptr(function)).copied().unwrap_or(0);
        Rc::strong_count(function) - extra > inside
    }
    /// Queues every closure inside arrays the arena does not own alone.
    fn outside_arrays(&self, value: &Value, seen: &mut HashSet<*const Vec<Value>>, pending: &mut Vec<EnvId>) {
        if let Value::Array(elements) = value {
            if !seen.insert(Rc::as_ptr(elements)) {
                return;
            }
            let inside = self.arrays.get(&Rc::as_ptr(elements)).copied().unwrap_or(0);
            if Rc::strong_count(elements) > inside {
                closures_in(value, pending);
            } else {
                for element in elements.iter() {
                    self.outside_arrays(element, seen, pending);
                }
            }
        }
    }
}

fn closures_in(value: &Value, pending: &mut Vec<EnvId>) {
    match value {
        Value::Function(function) => pending.push(function.closure),
        Value::Array(elements) => elements.iter().for_each(|element| closures_in(element, pending)),
        _ => {}
    }
}

/// Every scope of a running program. Children point at their parent by
/// handle, so lookups walk the chain without any shared ownership.
///
/// A scope is recycled as soon as execution leaves it, unless a function
/// was declared inside it. Those wait in the arena until [`collect`] finds
/// that no live scope and no live function value reaches them any more.
///
/// [`collect`]: Environments::collect
#[derive(Debug)]
pub struct Environments {
    scopes: Vec<Scope>,
    free: Vec<EnvId>,
    /// Every declared function, to spot the ones only Rust code still holds.
    closures: Vec<Weak<Function>>,
    next_collect: usize,
    next_prune: usize,
}

impl Default for Environments {
    fn default() -> Environments {
        Environments::new()
    }
}

impl Environments {
    /// Creates the arena with an empty root scope.
    pub fn new() -> Environments {
        Environments {
            scopes: vec![Scope::default()],
            free: Vec::new(),
            closures: Vec::new(),
            next_collect: MIN_COLLECT,
            next_prune: MIN_COLLECT,
        }
    }
    pub fn root(&self) -> EnvId {
        EnvId(0)
    }
    pub fn parent(&self, env: EnvId) -> Option<EnvId> {
        self.scopes[env.0].parent
    }
    /// Slots in the arena, live or free.
    pub fn allocated(&self) -> usize {
        self.scopes.len()
    }
    pub fn new_child(&mut self, parent: EnvId) -> EnvId {
        if self.free.is_empty() && self.scopes.len() >= self.next_collect {
            self.sweep(Some(parent));
        }
        let scope = Scope {
            parent: Some(parent),
            ..Scope::default()
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.scopes[id.0] = scope;
                id
            }
            None => {
                self.scopes.push(scope);
                EnvId(self.scopes.len() - 1)
            }
        };
        trace!(scope = id.0, parent = parent.0, "new scope");
        id
    }
    /// Binds `name` in `env` itself. Ancestors may already hold the name;
    /// the new binding shadows theirs.
    pub fn define(
        &mut self,
        env: EnvId,
        name: &str,
        value: Value,
        is_constant: bool,
        is_function: bool,
    ) -> Result<Value, BindingError> {
        let scope = &mut self.scopes[env.0];
        if scope.bindings.contains_key(name) {
            return Err(BindingError::Redefinition(name.to_string()));
        }
        if is_function {
            scope.functions.insert(name.to_string());
        } else if is_constant {
            scope.constants.insert(name.to_string());
        }
        scope.bindings.insert(name.to_string(), value.clone());
        Ok(value)
    }
    /// Installs a binding in the root scope, replacing any earlier one.
    /// Functions are locked; anything else is an ordinary variable.
    pub(crate) fn define_builtin(&mut self, name: &str, value: Value, is_function: bool) {
        let root = &mut self.scopes[0];
        if is_function {
            root.functions.insert(name.to_string());
        } else {
            root.functions.remove(name);
        }
        root.bindings.insert(name.to_string(), value);
    }
    pub fn get(&self, env: EnvId, name: &str) -> Result<Value, BindingError> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = &self.scopes[id.0];
            if let Some(x) = scope.bindings.get(name) {
                return Ok(x.clone());
            }
            cur = scope.parent;
        }
        Err(BindingError::Undefined(name.to_string()))
    }
    /// Overwrites the nearest binding of `name`. Constants and functions
    /// only ever get shadowed, never overwritten.
    pub fn set(&mut self, env: EnvId, name: &str, value: Value) -> Result<Value, BindingError> {
        let id = self.owner(env, name)?;
        let scope = &mut self.scopes[id.0];
        if scope.is_locked(name) {
            return Err(BindingError::Reassignment(name.to_string()));
        }
        scope.bindings.insert(name.to_string(), value.clone());
        Ok(value)
    }
    /// Removes the nearest binding of `name` and hands back its value.
    pub fn delete(&mut self, env: EnvId, name: &str) -> Result<Value, BindingError> {
        let id = self.owner(env, name)?;
        let scope = &mut self.scopes[id.0];
        if scope.is_locked(name) {
            return Err(BindingError::Deletion(name.to_string()));
        }
        scope
            .bindings
            .remove(name)
            .ok_or_else(|| BindingError::Undefined(name.to_string()))
    }
    /// Drops every binding of `env`. Parent and children are untouched.
    pub fn destroy(&mut self, env: EnvId) {
        self.scopes[env.0].clear();
    }
    /// Records a freshly declared function. Its closure scope and all of
    /// their ancestors stay in the arena after execution leaves them, for as
    /// long as the function can still be reached.
    pub fn capture(&mut self, function: &Rc<Function>) {
        let mut cur = Some(function.closure);
        while let Some(id) = cur {
            let scope = &mut self.scopes[id.0];
            if scope.captured {
                break;
            }
            scope.captured = true;
            cur = scope.parent;
        }
        if self.closures.len() >= self.next_prune {
            self.closures.retain(|function| function.strong_count() > 0);
            self.next_prune = (self.closures.len() * 2).max(MIN_COLLECT);
        }
        self.closures.push(Rc::downgrade(function));
    }
    /// Called when execution leaves `env`. Unless a function was declared
    /// in it, its bindings are dropped and the slot is reused by the next
    /// child.
    pub fn release(&mut self, env: EnvId) {
        if env == self.root() {
            return;
        }
        let scope = &mut self.scopes[env.0];
        if scope.captured {
            scope.state = State::Exited;
            trace!(scope = env.0, "exited captured scope");
            return;
        }
        self.destroy(env);
        self.scopes[env.0].state = State::Free;
        self.free.push(env);
        trace!(scope = env.0, "released scope");
    }
    /// Frees every exited scope that nothing can reach any more.
    pub fn collect(&mut self) {
        self.sweep(None);
    }
    /// Marks from the root, the active scopes, `keep`, and the closures of
    /// functions held outside the arena, then frees the unmarked exited
    /// scopes.
    fn sweep(&mut self, keep: Option<EnvId>) {
        let mut census = Census::default();
        for scope in self.scopes.iter().filter(|scope| scope.state != State::Free) {
            scope.bindings.values().for_each(|value| census.count(value));
        }

        let mut pending: Vec<EnvId> = self
            .scopes
            .iter()
            .enumerate()
            .filter(|(_, scope)| scope.state == State::Active)
            .map(|(i, _)| EnvId(i))
            .collect();
        pending.extend(keep);
        self.closures.retain(|function| function.strong_count() > 0);
        for function in self.closures.iter().filter_map(Weak::upgrade) {
            // One reference is the upgrade itself.
            if census.held_outside(&function, 1) {
                pending.push(function.closure);
            }
        }
        let mut seen = HashSet::new();
        for scope in self.scopes.iter().filter(|scope| scope.state != State::Free) {
            for value in scope.bindings.values() {
                census.outside_arrays(value, &mut seen, &mut pending);
            }
        }

        let mut marked = vec![false; self.scopes.len()];
        while let Some(id) = pending.pop() {
            if std::mem::replace(&mut marked[id.0], true) {
                continue;
            }
            let scope = &self.scopes[id.0];
            pending.extend(scope.parent);
            for value in scope.bindings.values() {
                closures_in(value, &mut pending);
            }
        }

        let mut freed = 0;
        for (i, scope) in self.scopes.iter_mut().enumerate() {
            if scope.state == State::Exited && !marked[i] {
                scope.clear();
                scope.state = State::Free;
                self.free.push(EnvId(i));
                freed += 1;
            }
        }
        let live = self.scopes.len() - self.free.len();
        self.next_collect = (live * 2).max(MIN_COLLECT);
        debug!(freed, live, "collected scopes");
    }
    fn owner(&self, env: EnvId, name: &str) -> Result<EnvId, BindingError> {
        let mut cur = Some(env);
        while let Some(id) = cur {
            let scope = &self.scopes[id.0];
            if scope.bindings.contains_key(name) {
                return Ok(id);
            }
            cur = scope.parent;
        }
        Err(BindingError::Undefined(name.to_string()))
    }
}
