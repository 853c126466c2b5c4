use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::value::Value;

pub type EnvRef = Rc<RefCell<Env>>;

/// What a name means in one scope: a binding of its own, or a redirect
/// planted by a `global` or `nonlocal` declaration.
#[derive(Debug)]
enum Slot {
    Local(Value),
    Global,
    Nonlocal,
}

/// One lexical scope in the environment chain. Function calls push a child
/// of the function's closure environment.
#[derive(Debug, Default)]
pub struct Env {
    parent: Option<EnvRef>,
    slots: FxHashMap<String, Slot>,
}

impl Env {
    pub fn root() -> EnvRef {
        Rc::new(RefCell::new(Env::default()))
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Env {
            parent: Some(parent.clone()),
            slots: FxHashMap::default(),
        }))
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.slots.insert(name.to_string(), Slot::Local(value));
    }

    pub fn mark_global(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Slot::Global);
    }

    pub fn mark_nonlocal(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Slot::Nonlocal);
    }
}

enum Jump {
    Root,
    Parent,
}

fn root_of(env: &EnvRef) -> EnvRef {
    let mut current = env.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

pub fn lookup(env: &EnvRef, name: &str) -> Option<Value> {
    let mut current = env.clone();
    loop {
        let jump = {
            let guard = current.borrow();
            match guard.slots.get(name) {
                Some(Slot::Local(value)) => return Some(value.clone()),
                Some(Slot::Global) => Jump::Root,
                Some(Slot::Nonlocal) | None => Jump::Parent,
            }
        };
        match jump {
            Jump::Root => current = root_of(&current),
            Jump::Parent => {
                let parent = current.borrow().parent.clone();
                match parent {
                    Some(parent) => current = parent,
                    None => return None,
                }
            }
        }
    }
}

pub fn assign(env: &EnvRef, name: &str, value: Value) -> bool {
    let mut current = env.clone();
    loop {
        let jump = {
            let mut guard = current.borrow_mut();
            match guard.slots.get_mut(name) {
                Some(Slot::Local(slot)) => {
                    *slot = value;
                    return true;
                }
                Some(Slot::Global) => Jump::Root,
                Some(Slot::Nonlocal) | None => Jump::Parent,
            }
        };
        match jump {
            Jump::Root => current = root_of(&current),
            Jump::Parent => {
                let parent = current.borrow().parent.clone();
                match parent {
                    Some(parent) => current = parent,
                    None => return false,
                }
            }
        }
    }
}
