use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::FuncDecl;

use super::env::EnvRef;

/// A runtime value. Lists, instances, functions and classes have reference
/// semantics: cloning a `Value` clones the handle, not the payload.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Int(i32),
    Bool(bool),
    Str(String),
    List(Rc<RefCell<Vec<Value>>>),
    Function(Rc<Function>),
    Class(Rc<RuntimeClass>),
    Instance(Rc<Instance>),
}

/// A user function together with the environment it closed over.
#[derive(Debug)]
pub struct Function {
    pub decl: Rc<FuncDecl>,
    pub closure: EnvRef,
}

#[derive(Debug)]
pub struct RuntimeClass {
    pub name: String,
    pub superclass: Option<Rc<RuntimeClass>>,
    /// Field defaults in declaration order, inherited fields first. The
    /// defaults are evaluated once at class definition time.
    pub fields: Vec<(String, Value)>,
    pub methods: FxHashMap<String, Rc<Function>>,
}

impl RuntimeClass {
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref()?.find_method(name)
    }
}

#[derive(Debug)]
pub struct Instance {
    pub class: Rc<RuntimeClass>,
    pub fields: RefCell<FxHashMap<String, Value>>,
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Class(_) => "type".to_string(),
            Value::Instance(instance) => instance.class.name.clone(),
        }
    }

    /// The textual form `print` produces.
    pub fn render(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Int(value) => value.to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Str(value) => value.clone(),
            Value::List(items) => {
                let rendered = items
                    .borrow()
                    .iter()
                    .map(Value::render)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{rendered}]")
            }
            Value::Function(function) => format!("<function {}>", function.decl.name),
            Value::Class(class) => format!("<class {}>", class.name),
            Value::Instance(instance) => format!("<{} instance>", instance.class.name),
        }
    }

    /// Reference identity, the semantics of `is`.
    pub fn same_identity(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::None, Value::None) => true,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_python_spellings() {
        assert_eq!(Value::None.render(), "None");
        assert_eq!(Value::Bool(true).render(), "True");
        assert_eq!(Value::Bool(false).render(), "False");
        assert_eq!(Value::Int(-3).render(), "-3");
        assert_eq!(Value::Str("hi".to_string()).render(), "hi");
        let nested = Value::list(vec![Value::Int(1), Value::list(vec![Value::Int(2)])]);
        assert_eq!(nested.render(), "[1, [2]]");
    }

    #[test]
    fn identity_follows_handles_not_contents() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = Value::list(vec![Value::Int(1)]);
        let alias = a.clone();
        assert!(Value::same_identity(&a, &alias));
        assert!(!Value::same_identity(&a, &b));
        assert!(Value::same_identity(&Value::None, &Value::None));
        assert!(!Value::same_identity(&Value::None, &a));
    }
}
