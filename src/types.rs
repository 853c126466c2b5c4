use std::fmt;

use rustc_hash::FxHashMap;

/// Static types form a small nominal lattice: `object` on top, `<None>`
/// assignable to anything non-primitive, `<Empty>` assignable to any list.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Object,
    Int,
    Str,
    Bool,
    None,
    Empty,
    Class(String),
    List(Box<Type>),
    Func(FuncSig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub ret: Box<Type>,
}

impl FuncSig {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret: Box::new(ret),
        }
    }

    /// Signature equality modulo the first (`self`) parameter, used for
    /// override checking.
    pub fn method_equals(&self, other: &FuncSig) -> bool {
        if self.params.is_empty() || other.params.is_empty() {
            return false;
        }
        self.params[1..] == other.params[1..] && self.ret == other.ret
    }
}

impl Type {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Str | Type::Bool)
    }

    /// The class name a type resolves member lookups through, if any.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Type::Object => Some("object"),
            Type::Class(name) => Some(name),
            Type::None => Some("<None>"),
            Type::Empty => Some("<Empty>"),
            _ => None,
        }
    }

    /// Normalizes a class name to the lattice: the builtin names map onto
    /// their dedicated variants.
    pub fn from_class_name(name: &str) -> Type {
        match name {
            "object" => Type::Object,
            "int" => Type::Int,
            "str" => Type::Str,
            "bool" => Type::Bool,
            "<None>" => Type::None,
            "<Empty>" => Type::Empty,
            _ => Type::Class(name.to_string()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Object => write!(f, "object"),
            Type::Int => write!(f, "int"),
            Type::Str => write!(f, "str"),
            Type::Bool => write!(f, "bool"),
            Type::None => write!(f, "<None>"),
            Type::Empty => write!(f, "<Empty>"),
            Type::Class(name) => write!(f, "{name}"),
            Type::List(element) => write!(f, "[{element}]"),
            Type::Func(sig) => {
                write!(f, "[")?;
                for (i, param) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, "] -> {}", sig.ret)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub superclass: Option<String>,
    pub attrs: FxHashMap<String, Type>,
    pub methods: FxHashMap<String, FuncSig>,
}

impl ClassInfo {
    pub fn new(name: impl Into<String>, superclass: Option<String>) -> Self {
        Self {
            name: name.into(),
            superclass,
            attrs: FxHashMap::default(),
            methods: FxHashMap::default(),
        }
    }
}

/// Class metadata built during resolution: single-inheritance graph rooted
/// at `object`, with member lookup walking the superclass chain.
#[derive(Debug, Default)]
pub struct ClassTable {
    classes: FxHashMap<String, ClassInfo>,
}

impl ClassTable {
    pub fn with_object_root() -> Self {
        let mut table = Self::default();
        let mut object = ClassInfo::new("object", None);
        object.methods.insert(
            "__init__".to_string(),
            FuncSig::new(vec![Type::Object], Type::None),
        );
        table.classes.insert("object".to_string(), object);
        for name in ["int", "str", "bool"] {
            table.insert(ClassInfo::new(name, Some("object".to_string())));
        }
        table
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassInfo> {
        self.classes.get_mut(name)
    }

    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn method(&self, class: &str, name: &str) -> Option<&FuncSig> {
        let info = self.classes.get(class)?;
        if let Some(sig) = info.methods.get(name) {
            return Some(sig);
        }
        self.method(info.superclass.as_deref()?, name)
    }

    pub fn attr(&self, class: &str, name: &str) -> Option<&Type> {
        let info = self.classes.get(class)?;
        if let Some(ty) = info.attrs.get(name) {
            return Some(ty);
        }
        self.attr(info.superclass.as_deref()?, name)
    }

    pub fn attr_or_method(&self, class: &str, name: &str) -> Option<Type> {
        let info = self.classes.get(class)?;
        if let Some(sig) = info.methods.get(name) {
            return Some(Type::Func(sig.clone()));
        }
        if let Some(ty) = info.attrs.get(name) {
            return Some(ty.clone());
        }
        self.attr_or_method(info.superclass.as_deref()?, name)
    }

    /// Whether `a` names the same class as `b` or a subclass of it.
    pub fn is_subclass(&self, a: &str, b: &str) -> bool {
        let mut current = Some(a.to_string());
        while let Some(name) = current {
            if name == b {
                return true;
            }
            current = self
                .classes
                .get(&name)
                .and_then(|info| info.superclass.clone());
        }
        false
    }

    fn is_subtype(&self, a: &Type, b: &Type) -> bool {
        if matches!(b, Type::Object) {
            return true;
        }
        if let (Type::Class(a_name), Type::Class(b_name)) = (a, b) {
            return self.is_subclass(a_name, b_name);
        }
        a == b
    }

    /// Whether a value of type `a` may be assigned or passed where `b` is
    /// expected.
    pub fn can_assign(&self, a: &Type, b: &Type) -> bool {
        if self.is_subtype(a, b) {
            return true;
        }
        if matches!(a, Type::None) && !b.is_primitive() {
            return true;
        }
        if let Type::List(b_elem) = b {
            if matches!(a, Type::Empty) {
                return true;
            }
            if let Type::List(a_elem) = a {
                if matches!(**a_elem, Type::None) {
                    return self.can_assign(a_elem, b_elem);
                }
            }
        }
        false
    }

    /// Least common supertype, used to unify ternary branches and list
    /// literal elements.
    pub fn join(&self, a: &Type, b: &Type) -> Type {
        if self.can_assign(a, b) {
            return b.clone();
        }
        if self.can_assign(b, a) {
            return a.clone();
        }
        if let (Type::List(a_elem), Type::List(b_elem)) = (a, b) {
            return Type::List(Box::new(self.join(b_elem, a_elem)));
        }
        if matches!(a, Type::List(_)) || matches!(b, Type::List(_)) {
            return Type::Object;
        }

        // Two unrelated classes: lowest common ancestor of their
        // superclass chains.
        let a_path = self.ancestors(a);
        let b_path = self.ancestors(b);
        let mut common = None;
        for (x, y) in a_path.iter().zip(b_path.iter()) {
            if x == y {
                common = Some(x.clone());
            } else {
                break;
            }
        }
        match common {
            Some(name) => Type::from_class_name(&name),
            None => Type::Object,
        }
    }

    /// Superclass chain of a type, root first, excluding the type itself.
    fn ancestors(&self, ty: &Type) -> Vec<String> {
        let mut path = Vec::new();
        let Some(mut current) = ty.class_name().map(str::to_string) else {
            return path;
        };
        while let Some(info) = self.classes.get(&current) {
            match &info.superclass {
                Some(superclass) if superclass != "<None>" => {
                    path.push(superclass.clone());
                    current = superclass.clone();
                }
                _ => break,
            }
        }
        path.reverse();
        path
    }
}
