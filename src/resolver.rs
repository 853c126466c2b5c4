use rustc_hash::FxHashMap;

use crate::ast::{
    BinaryOp, ClassDecl, Expr, ExprKind, FuncDecl, LiteralValue, NodeId, Stmt, StmtKind,
    TypeAnnotation, UnaryOp,
};
use crate::diagnostics::{Diagnostics, ErrorKind};
use crate::types::{ClassInfo, ClassTable, FuncSig, Type};

/// Per-statement progress marker for the two-pass walk. Declarations seen in
/// the first pass are not re-declared in the second; members rejected during
/// registration are skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Declared,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    TopLevel,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone)]
enum ScopeEntry {
    /// Declared but not yet initialized; reading it is an error.
    Stub,
    Bound(Type),
}

/// The output of resolution: inferred types per expression node plus the
/// class metadata table. Diagnostics land in the shared sink.
#[derive(Debug)]
pub struct Resolution {
    pub types: FxHashMap<NodeId, Type>,
    pub classes: ClassTable,
}

pub fn resolve(program: &[Stmt], diags: &mut Diagnostics) -> Resolution {
    let mut resolver = Resolver::new(diags);
    resolver.resolve_program(program);
    Resolution {
        types: resolver.types,
        classes: resolver.classes,
    }
}

pub struct Resolver<'a> {
    diags: &'a mut Diagnostics,
    classes: ClassTable,
    scopes: Vec<FxHashMap<String, ScopeEntry>>,
    types: FxHashMap<NodeId, Type>,
    stages: FxHashMap<NodeId, Stage>,
    current_function: FunctionKind,
    current_class: Option<String>,
    return_types: Vec<Type>,
}

impl<'a> Resolver<'a> {
    pub fn new(diags: &'a mut Diagnostics) -> Self {
        Self {
            diags,
            classes: ClassTable::with_object_root(),
            scopes: Vec::new(),
            types: FxHashMap::default(),
            stages: FxHashMap::default(),
            current_function: FunctionKind::TopLevel,
            current_class: None,
            return_types: Vec::new(),
        }
    }

    /// Two full passes over the top-level statements. Pass one hoists every
    /// class, function signature and global variable so that bodies checked
    /// in pass two may reference declarations made later in the file.
    pub fn resolve_program(&mut self, program: &[Stmt]) {
        self.begin_scope();
        self.define(
            "print",
            Type::Func(FuncSig::new(vec![Type::Object], Type::None)),
        );
        self.define("input", Type::Func(FuncSig::new(vec![], Type::Str)));
        self.define("len", Type::Func(FuncSig::new(vec![Type::Object], Type::Int)));
        self.define("object", Type::Object);

        for stmt in program {
            self.declare_stmt(stmt);
        }
        for stmt in program {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
    }

    // Pass one: declarations only, no bodies.

    fn declare_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::VarDecl { name, annotation, .. } => {
                if self.classes.contains(name) {
                    self.error_name(stmt.line, format!("Cannot shadow class name: {name}"));
                } else if self.current_contains(name) {
                    self.error_name(stmt.line, format!("Duplicate declaration of identifier: {name}"));
                }
                let ty = resolve_annotation(annotation);
                self.define(name, ty);
                self.stages.insert(stmt.id, Stage::Declared);
            }
            StmtKind::Func(decl) => {
                if self.current_contains(&decl.name) {
                    self.error_name(
                        decl.line,
                        format!("Duplicate declaration of identifier: {}", decl.name),
                    );
                }
                let sig = signature_of(decl);
                self.define(&decl.name, Type::Func(sig));
                self.stages.insert(stmt.id, Stage::Declared);
            }
            StmtKind::Class(decl) => {
                self.declare_class(decl);
                self.stages.insert(stmt.id, Stage::Declared);
            }
            _ => {}
        }
    }

    fn declare_class(&mut self, decl: &ClassDecl) {
        let name = &decl.name;
        if self.classes.contains(name) {
            self.error_name(decl.line, format!("Cannot shadow class name: {name}"));
        } else if self.current_contains(name) {
            self.error_name(decl.line, format!("Duplicate declaration of identifier: {name}"));
        }

        // Superclasses are resolved in declaration order: a class may only
        // extend one declared above it.
        let mut superclass = decl.superclass.clone();
        if !self.classes.contains(&superclass) {
            self.error_name(
                decl.superclass_line,
                format!("Unknown superclass: {superclass}"),
            );
            superclass = "object".to_string();
        } else if superclass == "int"
            || superclass == "bool"
            || superclass == "str"
            || superclass == *name
        {
            self.error_type(
                decl.superclass_line,
                format!("Illegal superclass: {superclass}"),
            );
            superclass = "object".to_string();
        }

        self.define(name, Type::from_class_name(name));
        self.classes.insert(ClassInfo::new(name.clone(), Some(superclass)));

        for member in &decl.body {
            match &member.kind {
                StmtKind::Func(method) => {
                    if self.member_declared(name, &method.name) {
                        self.error_name(
                            method.line,
                            format!("Duplicate declaration of identifier: {}", method.name),
                        );
                        self.stages.insert(member.id, Stage::Skipped);
                        continue;
                    }
                    let sig = signature_of(method);
                    match self.classes.attr_or_method(name, &method.name) {
                        // Initializers are free to change arity; the
                        // constructor call site is checked against them.
                        Some(Type::Func(inherited)) => {
                            if method.name != "__init__" && !inherited.method_equals(&sig) {
                                self.error_type(
                                    method.line,
                                    format!(
                                        "Redefined method doesn't match superclass signature: {}",
                                        method.name
                                    ),
                                );
                                self.stages.insert(member.id, Stage::Skipped);
                                continue;
                            }
                        }
                        Some(_) => {
                            self.error_type(
                                method.line,
                                format!("Method names shadows attribute: {}", method.name),
                            );
                            self.stages.insert(member.id, Stage::Skipped);
                            continue;
                        }
                        None => {}
                    }
                    if let Some(info) = self.classes.get_mut(name) {
                        info.methods.insert(method.name.clone(), sig);
                    }
                }
                StmtKind::VarDecl {
                    name: attr,
                    annotation,
                    ..
                } => {
                    if self.classes.attr_or_method(name, attr).is_some() {
                        self.error_attribute(
                            member.line,
                            format!("Cannot redefine attribute: {attr}"),
                        );
                        self.stages.insert(member.id, Stage::Skipped);
                        continue;
                    }
                    let ty = resolve_annotation(annotation);
                    if let Some(info) = self.classes.get_mut(name) {
                        info.attrs.insert(attr.clone(), ty);
                    }
                }
                _ => {}
            }
        }
    }

    fn member_declared(&self, class: &str, member: &str) -> bool {
        self.classes
            .get(class)
            .is_some_and(|info| info.methods.contains_key(member) || info.attrs.contains_key(member))
    }

    // Pass two: full resolution. Returns whether every control path through
    // the statement ends in a return.

    fn resolve_stmt(&mut self, stmt: &Stmt) -> bool {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.resolve_expr(expr);
                false
            }
            StmtKind::VarDecl { name, annotation, init } => {
                let declared = self.stages.get(&stmt.id) == Some(&Stage::Declared);
                if !declared {
                    if self.classes.contains(name) {
                        self.error_name(stmt.line, format!("Cannot shadow class name: {name}"));
                    } else if self.current_contains(name) {
                        self.error_name(
                            stmt.line,
                            format!("Duplicate declaration of identifier: {name}"),
                        );
                    }
                    self.declare(name);
                }
                let ty = resolve_annotation(annotation);
                if !self.is_type_defined(&ty) {
                    self.error_name(stmt.line, format!("Unknown type: {ty}"));
                }
                let init_ty = self.resolve_expr(init);
                if !self.classes.can_assign(&init_ty, &ty) {
                    self.error_type(stmt.line, format!("Expected {ty}, got {init_ty}"));
                }
                if !declared {
                    self.define(name, ty);
                }
                false
            }
            StmtKind::Assign { targets, value } => {
                self.resolve_assign(stmt.line, targets, value);
                false
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.resolve_expr(condition);
                if cond_ty != Type::Bool {
                    self.error_type(condition.line, format!("Expected bool, got {cond_ty}"));
                    return false;
                }
                let then_returns = self.resolve_block(then_branch);
                let else_returns = self.resolve_block(else_branch);
                then_returns && !else_branch.is_empty() && else_returns
            }
            StmtKind::While { condition, body } => {
                let cond_ty = self.resolve_expr(condition);
                let body_returns = self.resolve_block(body);
                if cond_ty != Type::Bool {
                    self.error_type(condition.line, format!("Expected bool, got {cond_ty}"));
                    return false;
                }
                body_returns
            }
            StmtKind::For {
                variable,
                variable_line,
                iterable,
                body,
            } => {
                let var_ty = self.resolve_identifier(variable, *variable_line);
                let iter_ty = self.resolve_expr(iterable);
                let body_returns = self.resolve_block(body);
                match &iter_ty {
                    Type::List(element) => {
                        if !self.classes.can_assign(element, &var_ty) {
                            self.error_type(
                                *variable_line,
                                format!("Expected {element}, got {var_ty}"),
                            );
                            return false;
                        }
                    }
                    Type::Str => {
                        if !self.classes.can_assign(&Type::Str, &var_ty) {
                            self.error_type(*variable_line, format!("Expected str, got {var_ty}"));
                            return false;
                        }
                    }
                    _ => {
                        self.error_type(
                            *variable_line,
                            format!("Expected iterable, got {iter_ty}"),
                        );
                        return false;
                    }
                }
                body_returns
            }
            StmtKind::Func(decl) => {
                if self.stages.get(&stmt.id) != Some(&Stage::Declared) {
                    if self.current_contains(&decl.name) {
                        self.error_name(
                            decl.line,
                            format!("Duplicate declaration of identifier: {}", decl.name),
                        );
                    }
                    let sig = signature_of(decl);
                    self.define(&decl.name, Type::Func(sig));
                }
                self.resolve_function(decl, FunctionKind::Function);
                false
            }
            StmtKind::Class(decl) => {
                self.resolve_class(decl);
                false
            }
            StmtKind::Return { value } => {
                if self.current_function == FunctionKind::TopLevel {
                    self.error_syntax(stmt.line, "Can't return from top-level code.");
                    return true;
                }
                let expected = self
                    .return_types
                    .last()
                    .cloned()
                    .unwrap_or(Type::None);
                match value {
                    Some(expr) => {
                        if self.current_function == FunctionKind::Initializer {
                            self.error_type(stmt.line, "Can't return a value from an initializer.");
                        }
                        let value_ty = self.resolve_expr(expr);
                        if !self.classes.can_assign(&value_ty, &expected) {
                            self.error_type(
                                stmt.line,
                                format!("Expected {expected}, got {value_ty}"),
                            );
                        }
                    }
                    None => {
                        if !self.classes.can_assign(&Type::None, &expected) {
                            self.error_type(stmt.line, format!("Expected {expected}, got <None>"));
                        }
                    }
                }
                true
            }
            StmtKind::Global { name } => {
                if self.current_function == FunctionKind::TopLevel {
                    self.error_syntax(stmt.line, "Global declaration is outside of function");
                    return false;
                }
                if self.classes.contains(name) {
                    self.error_name(stmt.line, format!("Cannot shadow class name: {name}"));
                    return false;
                }
                if self.current_contains(name) {
                    self.error_name(stmt.line, format!("Duplicate declaration of identifier: {name}"));
                    return false;
                }
                match self.global_type(name) {
                    Some(ty) if !matches!(ty, Type::Func(_)) => {
                        self.define(name, ty);
                    }
                    _ => {
                        self.error_name(stmt.line, format!("Unknown global variable {name}"));
                    }
                }
                false
            }
            StmtKind::Nonlocal { name } => {
                if self.current_function == FunctionKind::TopLevel {
                    self.error_syntax(stmt.line, "Nonlocal declaration is outside of function");
                    return false;
                }
                if self.classes.contains(name) {
                    self.error_name(stmt.line, format!("Cannot shadow class name: {name}"));
                    return false;
                }
                if self.current_contains(name) {
                    self.error_name(stmt.line, format!("Duplicate declaration of identifier: {name}"));
                    return false;
                }
                match self.nonlocal_type(name) {
                    Some(ty) if !matches!(ty, Type::Func(_)) => {
                        self.define(name, ty);
                    }
                    _ => {
                        self.error_name(stmt.line, format!("Unknown nonlocal variable {name}"));
                    }
                }
                false
            }
            StmtKind::Pass => false,
        }
    }

    fn resolve_block(&mut self, stmts: &[Stmt]) -> bool {
        let mut any_returns = false;
        for stmt in stmts {
            if self.resolve_stmt(stmt) {
                any_returns = true;
            }
        }
        any_returns
    }

    fn resolve_class(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.current_class.replace(decl.name.clone());
        self.begin_scope();
        self.define("self", Type::from_class_name(&decl.name));

        for member in &decl.body {
            if self.stages.get(&member.id) == Some(&Stage::Skipped) {
                continue;
            }
            match &member.kind {
                StmtKind::Func(method) => {
                    let sig = self
                        .classes
                        .method(&decl.name, &method.name)
                        .cloned()
                        .unwrap_or_else(|| signature_of(method));
                    self.define(&method.name, Type::Func(sig));
                    let kind = if method.name == "__init__" {
                        FunctionKind::Initializer
                    } else {
                        FunctionKind::Method
                    };
                    self.resolve_function(method, kind);
                }
                StmtKind::VarDecl { .. } => {
                    self.resolve_stmt(member);
                }
                _ => {}
            }
        }

        self.end_scope();
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FuncDecl, kind: FunctionKind) {
        let sig = signature_of(decl);

        if kind == FunctionKind::Function && self.classes.contains(&decl.name) {
            self.error_name(
                decl.line,
                format!("Functions can't shadow classes: {}", decl.name),
            );
            return;
        }
        if matches!(kind, FunctionKind::Method | FunctionKind::Initializer) {
            let expected_self = self
                .current_class
                .as_deref()
                .map(Type::from_class_name)
                .unwrap_or(Type::Object);
            let self_ok = decl
                .params
                .first()
                .is_some_and(|p| p.name == "self" && sig.params[0] == expected_self);
            if !self_ok {
                self.error_type(
                    decl.line,
                    format!("Missing self param in method: {}", decl.name),
                );
                return;
            }
        }

        // Return types must name a known class; list types drill down to
        // their base element.
        let mut base = (*sig.ret).clone();
        while let Type::List(element) = base {
            base = *element;
        }
        if let Type::Class(class) = &base {
            if !self.classes.contains(class) {
                self.error_name(decl.line, format!("Unknown return type {}", sig.ret));
            }
        }

        self.begin_scope();
        self.return_types.push((*sig.ret).clone());
        let enclosing_function = self.current_function;
        self.current_function = kind;

        for param in &decl.params {
            if self.classes.contains(&param.name) {
                self.error_name(param.line, format!("Cannot shadow class name: {}", param.name));
                continue;
            }
            if self.current_contains(&param.name) {
                self.error_name(
                    param.line,
                    format!("Duplicate declaration of identifier: {}", param.name),
                );
                continue;
            }
            let ty = resolve_annotation(&param.annotation);
            if !self.is_type_defined(&ty) {
                self.error_name(param.line, format!("Unknown type: {ty}"));
            }
            self.define(&param.name, ty);
        }

        let any_returns = self.resolve_block(&decl.body);
        let expected = self.return_types.last().cloned().unwrap_or(Type::None);
        if !any_returns && !self.classes.can_assign(&Type::None, &expected) {
            self.error_type(
                decl.line,
                format!("Expected return statement of type {expected}"),
            );
        }

        self.current_function = enclosing_function;
        self.return_types.pop();
        self.end_scope();
    }

    fn resolve_assign(&mut self, line: usize, targets: &[Expr], value: &Expr) {
        let value_ty = self.resolve_expr(value);

        // A value of type [<None>] is one unassignable empty-ish list; the
        // same target may not soak it up twice within one assignment group.
        if value_ty == Type::List(Box::new(Type::None)) {
            let mut seen = Vec::new();
            for target in targets {
                if let Some(key) = target_key(target) {
                    if seen.contains(&key) {
                        self.error_type(
                            line,
                            "Cannot assign [<None>] to the same target twice",
                        );
                        break;
                    }
                    seen.push(key);
                }
            }
        }

        for target in targets {
            match &target.kind {
                ExprKind::Identifier(name) => {
                    let target_ty = self.resolve_identifier(name, target.line);
                    self.note(target.id, target_ty.clone());
                    if !self.classes.can_assign(&value_ty, &target_ty) {
                        self.error_type(
                            target.line,
                            format!("Expected {target_ty}, got {value_ty}"),
                        );
                    }
                }
                ExprKind::Attribute { object, name } => {
                    let object_ty = self.resolve_expr(object);
                    if object_ty.is_primitive() {
                        self.error_type(target.line, format!("Expected object, got {object_ty}"));
                        continue;
                    }
                    let Some(class) = object_ty.class_name().map(str::to_string) else {
                        self.error_type(target.line, format!("Expected object, got {object_ty}"));
                        continue;
                    };
                    match self.classes.attr(&class, name) {
                        None => {
                            if self.classes.method(&class, name).is_some() {
                                self.error_type(
                                    target.line,
                                    format!("Can't set to class method {name}"),
                                );
                            } else {
                                self.error_attribute(
                                    target.line,
                                    format!("Attribute {name} doesn't exist for class {class}"),
                                );
                            }
                        }
                        Some(attr_ty) => {
                            let attr_ty = attr_ty.clone();
                            self.note(target.id, attr_ty.clone());
                            if !self.classes.can_assign(&value_ty, &attr_ty) {
                                self.error_type(
                                    target.line,
                                    format!("Expected {attr_ty}, got {value_ty}"),
                                );
                            }
                        }
                    }
                }
                ExprKind::Index { object, index } => {
                    let object_ty = self.resolve_expr(object);
                    let index_ty = self.resolve_expr(index);
                    if object_ty == Type::Str {
                        self.error_type(target.line, "Cannot assign to index of string");
                    }
                    if index_ty != Type::Int {
                        self.error_type(target.line, format!("Expected int index, got {index_ty}"));
                    }
                    if let Type::List(element) = &object_ty {
                        let element = (**element).clone();
                        self.note(target.id, element.clone());
                        if !self.classes.can_assign(&value_ty, &element) {
                            self.error_type(
                                target.line,
                                format!("Expected {element}, got {value_ty}"),
                            );
                        }
                    }
                }
                // The parser reports other shapes as invalid targets.
                _ => {}
            }
        }
    }

    // Expressions.

    fn resolve_expr(&mut self, expr: &Expr) -> Type {
        let ty = match &expr.kind {
            ExprKind::Literal(value) => match value {
                LiteralValue::None => Type::None,
                LiteralValue::Int(_) => Type::Int,
                LiteralValue::Str(_) => Type::Str,
                LiteralValue::Bool(_) => Type::Bool,
            },
            ExprKind::ListLiteral(elements) => {
                if elements.is_empty() {
                    Type::Empty
                } else {
                    let mut element_ty = self.resolve_expr(&elements[0]);
                    for element in &elements[1..] {
                        let ty = self.resolve_expr(element);
                        element_ty = self.classes.join(&element_ty, &ty);
                    }
                    Type::List(Box::new(element_ty))
                }
            }
            ExprKind::Identifier(name) => self.resolve_identifier(name, expr.line),
            ExprKind::SelfRef => {
                if self.current_class.is_none() {
                    self.error_syntax(expr.line, "Can't use 'self' outside of a class.");
                    Type::Object
                } else {
                    match self.lookup_any("self") {
                        Some(ty) => ty,
                        None => Type::Object,
                    }
                }
            }
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.resolve_expr(operand);
                match op {
                    UnaryOp::Neg => {
                        if operand_ty == Type::Int {
                            Type::Int
                        } else {
                            self.error_type(expr.line, format!("Expected int, got {operand_ty}"));
                            Type::Object
                        }
                    }
                    UnaryOp::Not => {
                        if operand_ty == Type::Bool {
                            Type::Bool
                        } else {
                            self.error_type(expr.line, format!("Expected bool, got {operand_ty}"));
                            Type::Object
                        }
                    }
                }
            }
            ExprKind::Binary { left, op, right } => {
                let left_ty = self.resolve_expr(left);
                let right_ty = self.resolve_expr(right);
                self.resolve_binary(expr.line, *op, &left_ty, &right_ty)
            }
            ExprKind::Logical { left, op, right } => {
                let left_ty = self.resolve_expr(left);
                let right_ty = self.resolve_expr(right);
                if left_ty == Type::Bool && right_ty == Type::Bool {
                    Type::Bool
                } else {
                    self.error_type(
                        expr.line,
                        format!(
                            "unsupported operand type(s) for {op}: '{left_ty}' and '{right_ty}'"
                        ),
                    );
                    Type::Object
                }
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                let cond_ty = self.resolve_expr(condition);
                let otherwise_ty = self.resolve_expr(otherwise);
                let then_ty = self.resolve_expr(then);
                if cond_ty != Type::Bool {
                    self.error_type(expr.line, format!("Expected bool, got {cond_ty}"));
                }
                self.classes.join(&then_ty, &otherwise_ty)
            }
            ExprKind::Call { callee, args } => self.resolve_call(expr.line, callee, args),
            ExprKind::Attribute { object, name } => {
                let object_ty = self.resolve_expr(object);
                if object_ty.is_primitive() {
                    self.error_type(expr.line, format!("Expected object, got {object_ty}"));
                    Type::Object
                } else if let Some(class) = object_ty.class_name().map(str::to_string) {
                    match self.classes.attr(&class, name) {
                        Some(ty) => ty.clone(),
                        None => {
                            self.error_attribute(
                                expr.line,
                                format!("Attribute {name} doesn't exist for class {class}"),
                            );
                            Type::Object
                        }
                    }
                } else {
                    self.error_type(expr.line, format!("Expected object, got {object_ty}"));
                    Type::Object
                }
            }
            ExprKind::Index { object, index } => {
                let object_ty = self.resolve_expr(object);
                let index_ty = self.resolve_expr(index);
                if index_ty != Type::Int {
                    self.error_type(expr.line, format!("Expected int index, got {index_ty}"));
                }
                match object_ty {
                    Type::Str => Type::Str,
                    Type::List(element) => *element,
                    other => {
                        self.error_type(expr.line, format!("Cannot index into {other}"));
                        Type::Object
                    }
                }
            }
            ExprKind::Len(value) => {
                let value_ty = self.resolve_expr(value);
                if value_ty != Type::Str && !matches!(value_ty, Type::List(_)) {
                    self.error_type(expr.line, format!("Expected str or list, got {value_ty}"));
                }
                Type::Int
            }
            ExprKind::Input => Type::Str,
            ExprKind::Print(value) => {
                let value_ty = self.resolve_expr(value);
                if !value_ty.is_primitive() {
                    self.error_type(
                        value.line,
                        format!("Expected str, int or bool, got {value_ty}"),
                    );
                }
                Type::None
            }
        };
        self.note(expr.id, ty.clone());
        ty
    }

    fn resolve_binary(&mut self, line: usize, op: BinaryOp, left: &Type, right: &Type) -> Type {
        let ok = match op {
            BinaryOp::Add => match (left, right) {
                (Type::List(a), Type::List(b)) => {
                    return Type::List(Box::new(self.classes.join(a, b)));
                }
                _ => left == right && (*left == Type::Int || *left == Type::Str),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                *left == Type::Int && *right == Type::Int
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                *left == Type::Int && *right == Type::Int
            }
            BinaryOp::Eq | BinaryOp::Ne => left == right && left.is_primitive(),
            BinaryOp::Is => !left.is_primitive() && !right.is_primitive(),
        };
        if !ok {
            self.error_type(
                line,
                format!("unsupported operand type(s) for {op}: '{left}' and '{right}'"),
            );
            return Type::Object;
        }
        match op {
            BinaryOp::Add if *left == Type::Str => Type::Str,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                Type::Int
            }
            _ => Type::Bool,
        }
    }

    fn resolve_call(&mut self, line: usize, callee: &Expr, args: &[Expr]) -> Type {
        match &callee.kind {
            ExprKind::Identifier(name) => {
                let arg_types: Vec<Type> = args.iter().map(|a| self.resolve_expr(a)).collect();
                if self.classes.contains(name) {
                    // Constructor call, checked against __init__ minus self.
                    if let Some(sig) = self.classes.method(name, "__init__").cloned() {
                        self.note(callee.id, Type::Func(sig.clone()));
                        self.check_args(line, &sig, &arg_types, true);
                    }
                    return Type::from_class_name(name);
                }
                match self.lookup_entry(name) {
                    None => {
                        self.error_name(callee.line, format!("Callable not defined: {name}"));
                        self.error_type(line, format!("Not a function: {name}"));
                        Type::Object
                    }
                    Some(ScopeEntry::Stub) => {
                        self.error_type(line, format!("Not a function: {name}"));
                        Type::Object
                    }
                    Some(ScopeEntry::Bound(Type::Func(sig))) => {
                        let sig = sig.clone();
                        self.note(callee.id, Type::Func(sig.clone()));
                        self.check_args(line, &sig, &arg_types, false);
                        (*sig.ret).clone()
                    }
                    Some(ScopeEntry::Bound(_)) => {
                        self.error_type(line, format!("Not a function: {name}"));
                        Type::Object
                    }
                }
            }
            ExprKind::Attribute { object, name } => {
                let object_ty = self.resolve_expr(object);
                let arg_types: Vec<Type> = args.iter().map(|a| self.resolve_expr(a)).collect();
                if object_ty.is_primitive() {
                    self.error_type(line, format!("Expected object, got {object_ty}"));
                    return Type::Object;
                }
                let class = match object_ty.class_name() {
                    Some(class) if self.classes.contains(class) => class.to_string(),
                    _ => {
                        self.error_type(line, format!("Expected object, got {object_ty}"));
                        return Type::Object;
                    }
                };
                match self.classes.method(&class, name).cloned() {
                    None => {
                        self.error_attribute(
                            line,
                            format!("Method {name} doesn't exist for class {class}"),
                        );
                        Type::Object
                    }
                    Some(sig) => {
                        self.note(callee.id, Type::Func(sig.clone()));
                        self.check_args(line, &sig, &arg_types, true);
                        (*sig.ret).clone()
                    }
                }
            }
            _ => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
                self.error_type(line, "Identifier is not callable");
                Type::Object
            }
        }
    }

    /// Arity and per-argument assignability; `skip_self` offsets by the
    /// implicit receiver for methods and constructors.
    fn check_args(&mut self, line: usize, sig: &FuncSig, args: &[Type], skip_self: bool) {
        let offset = usize::from(skip_self);
        let expected = sig.params.len().saturating_sub(offset);
        if expected != args.len() {
            self.error_type(line, format!("Expected {expected} args, got {}", args.len()));
            return;
        }
        for (param, arg) in sig.params[offset..].iter().zip(args) {
            if !self.classes.can_assign(arg, param) {
                self.error_type(line, format!("Expected {param}, got {arg}"));
            }
        }
    }

    /// Non-callable identifier lookup: the name must be visible in the
    /// current scope (outer variables come in via global/nonlocal
    /// declarations).
    fn resolve_identifier(&mut self, name: &str, line: usize) -> Type {
        match self.scopes.last().and_then(|scope| scope.get(name)) {
            None => {
                self.error_name(line, format!("Identifier not defined in current scope: {name}"));
                Type::Object
            }
            Some(ScopeEntry::Stub) => {
                self.error_name(line, "Can't read local variable in its own initializer.");
                Type::Object
            }
            Some(ScopeEntry::Bound(ty)) => ty.clone(),
        }
    }

    // Scope plumbing.

    fn begin_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.entry(name.to_string()).or_insert(ScopeEntry::Stub);
        }
    }

    fn define(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ScopeEntry::Bound(ty));
        }
    }

    fn current_contains(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name))
    }

    fn lookup_entry(&self, name: &str) -> Option<&ScopeEntry> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn lookup_any(&self, name: &str) -> Option<Type> {
        match self.lookup_entry(name) {
            Some(ScopeEntry::Bound(ty)) => Some(ty.clone()),
            _ => None,
        }
    }

    fn global_type(&self, name: &str) -> Option<Type> {
        match self.scopes.first()?.get(name)? {
            ScopeEntry::Bound(ty) => Some(ty.clone()),
            ScopeEntry::Stub => None,
        }
    }

    /// A nonlocal target lives in some enclosing function scope: neither
    /// the global scope nor the current one.
    fn nonlocal_type(&self, name: &str) -> Option<Type> {
        if self.scopes.len() < 3 {
            return None;
        }
        for scope in self.scopes[1..self.scopes.len() - 1].iter().rev() {
            if let Some(ScopeEntry::Bound(ty)) = scope.get(name) {
                return Some(ty.clone());
            }
        }
        None
    }

    fn is_type_defined(&self, ty: &Type) -> bool {
        let mut base = ty;
        while let Type::List(element) = base {
            base = element;
        }
        match base {
            Type::Int | Type::Str | Type::Bool | Type::Object => true,
            Type::Class(name) => self.classes.contains(name),
            _ => false,
        }
    }

    fn note(&mut self, id: NodeId, ty: Type) {
        self.types.insert(id, ty);
    }

    fn error_name(&mut self, line: usize, message: impl std::fmt::Display) {
        self.diags.error(line, ErrorKind::Name, message);
    }

    fn error_type(&mut self, line: usize, message: impl std::fmt::Display) {
        self.diags.error(line, ErrorKind::Type, message);
    }

    fn error_attribute(&mut self, line: usize, message: impl std::fmt::Display) {
        self.diags.error(line, ErrorKind::Attribute, message);
    }

    fn error_syntax(&mut self, line: usize, message: impl std::fmt::Display) {
        self.diags.error(line, ErrorKind::Syntax, message);
    }
}

fn resolve_annotation(annotation: &TypeAnnotation) -> Type {
    match annotation {
        TypeAnnotation::Name(name) => Type::from_class_name(name),
        TypeAnnotation::ListOf(element) => Type::List(Box::new(resolve_annotation(element))),
    }
}

fn signature_of(decl: &FuncDecl) -> FuncSig {
    FuncSig::new(
        decl.params
            .iter()
            .map(|p| resolve_annotation(&p.annotation))
            .collect(),
        resolve_annotation(&decl.return_annotation),
    )
}

/// A stable rendering of an assignment target, used to detect the same
/// target repeated within one multi-target assignment.
fn target_key(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Identifier(name) => Some(name.clone()),
        ExprKind::SelfRef => Some("self".to_string()),
        ExprKind::Attribute { object, name } => {
            target_key(object).map(|base| format!("{base}.{name}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};
    use indoc::indoc;

    fn check(source: &str) -> Vec<String> {
        let mut diags = Diagnostics::new();
        let tokens = lexer::tokenize(source, &mut diags);
        let program = parser::parse(tokens, &mut diags);
        assert!(
            !diags.had_error(),
            "front end errors before resolution: {:?}",
            diags.messages()
        );
        resolve(&program, &mut diags);
        diags.messages().to_vec()
    }

    fn check_clean(source: &str) {
        let messages = check(source);
        assert!(messages.is_empty(), "unexpected errors: {messages:?}");
    }

    fn expr_ids(expr: &Expr, out: &mut Vec<NodeId>) {
        out.push(expr.id);
        match &expr.kind {
            ExprKind::Literal(_)
            | ExprKind::Identifier(_)
            | ExprKind::SelfRef
            | ExprKind::Input => {}
            ExprKind::ListLiteral(elements) => {
                for element in elements {
                    expr_ids(element, out);
                }
            }
            ExprKind::Unary { operand, .. } => expr_ids(operand, out),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                expr_ids(left, out);
                expr_ids(right, out);
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                expr_ids(condition, out);
                expr_ids(then, out);
                expr_ids(otherwise, out);
            }
            ExprKind::Call { callee, args } => {
                expr_ids(callee, out);
                for arg in args {
                    expr_ids(arg, out);
                }
            }
            ExprKind::Attribute { object, .. } => expr_ids(object, out),
            ExprKind::Index { object, index } => {
                expr_ids(object, out);
                expr_ids(index, out);
            }
            ExprKind::Len(value) | ExprKind::Print(value) => expr_ids(value, out),
        }
    }

    fn stmt_expr_ids(stmt: &Stmt, out: &mut Vec<NodeId>) {
        match &stmt.kind {
            StmtKind::Expression(expr) => expr_ids(expr, out),
            StmtKind::VarDecl { init, .. } => expr_ids(init, out),
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    expr_ids(target, out);
                }
                expr_ids(value, out);
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                expr_ids(condition, out);
                for stmt in then_branch.iter().chain(else_branch) {
                    stmt_expr_ids(stmt, out);
                }
            }
            StmtKind::While { condition, body } => {
                expr_ids(condition, out);
                for stmt in body {
                    stmt_expr_ids(stmt, out);
                }
            }
            StmtKind::For { iterable, body, .. } => {
                expr_ids(iterable, out);
                for stmt in body {
                    stmt_expr_ids(stmt, out);
                }
            }
            StmtKind::Func(decl) => {
                for stmt in &decl.body {
                    stmt_expr_ids(stmt, out);
                }
            }
            StmtKind::Class(decl) => {
                for stmt in &decl.body {
                    stmt_expr_ids(stmt, out);
                }
            }
            StmtKind::Return { value } => {
                if let Some(expr) = value {
                    expr_ids(expr, out);
                }
            }
            _ => {}
        }
    }

    #[test]
    fn clean_resolution_types_every_expression() {
        let source = indoc! {"
            class Point(object):
                x: int = 0
                def __init__(self: \"Point\", x: int):
                    self.x = x
            xs: [int] = []
            b: bool = True
            n: int = 0
            p: Point = None
            p = Point(4)
            xs = [1, 2] + [3]
            n = xs[0] if b else p.x
            print(n + len(xs))
        "};
        let mut diags = Diagnostics::new();
        let tokens = lexer::tokenize(source, &mut diags);
        let program = parser::parse(tokens, &mut diags);
        let resolution = resolve(&program, &mut diags);
        assert!(!diags.had_error(), "unexpected errors: {:?}", diags.messages());

        let mut ids = Vec::new();
        for stmt in &program {
            stmt_expr_ids(stmt, &mut ids);
        }
        for id in ids {
            assert!(resolution.types.contains_key(&id), "expression {id} has no type");
        }
        assert!(resolution.classes.contains("Point"));
    }

    #[test]
    fn well_typed_program_resolves_cleanly() {
        check_clean(indoc! {"
            x: int = 5
            s: str = \"hi\"
            flags: [bool] = None
            flags = [True, False]
            print(x + 1)
            print(s + \"!\")
        "});
    }

    #[test]
    fn forward_function_reference_resolves() {
        check_clean(indoc! {"
            def even(n: int) -> bool:
                return n == 0 if n < 2 else odd(n - 1)
            def odd(n: int) -> bool:
                return False if n == 0 else even(n - 1)
            print(even(10))
        "});
    }

    #[test]
    fn reports_undefined_identifier() {
        let messages = check("print(missing)\n");
        assert_eq!(
            messages,
            [
                "[line 1] NameError: Identifier not defined in current scope: missing",
                "[line 1] TypeError: Expected str, int or bool, got object"
            ]
        );
    }

    #[test]
    fn reports_duplicate_declaration() {
        let messages = check(indoc! {"
            x: int = 1
            x: str = \"two\"
        "});
        assert_eq!(
            messages,
            ["[line 2] NameError: Duplicate declaration of identifier: x"]
        );
    }

    #[test]
    fn declared_type_mismatch() {
        let messages = check("x: int = \"five\"\n");
        assert_eq!(messages, ["[line 1] TypeError: Expected int, got str"]);
    }

    #[test]
    fn binary_operator_typing() {
        let messages = check("x: int = 1\nx = 1 + \"a\"\n");
        assert_eq!(
            messages,
            [
                "[line 2] TypeError: unsupported operand type(s) for +: 'int' and 'str'",
                "[line 2] TypeError: Expected int, got object"
            ]
        );
        check_clean("x: str = \"a\"\nx = \"a\" + \"b\"\n");
        let messages = check("b: bool = True\nb = None is 1\n");
        assert_eq!(
            messages,
            [
                "[line 2] TypeError: unsupported operand type(s) for is: '<None>' and 'int'",
                "[line 2] TypeError: Expected bool, got object"
            ]
        );
    }

    #[test]
    fn list_concat_joins_element_types() {
        check_clean(indoc! {"
            class Animal(object):
                pass
            class Dog(Animal):
                pass
            class Cat(Animal):
                pass
            pets: [Animal] = None
            pets = [Dog()] + [Cat()]
        "});
    }

    #[test]
    fn condition_must_be_bool() {
        let messages = check(indoc! {"
            if 1:
                pass
        "});
        assert_eq!(messages, ["[line 1] TypeError: Expected bool, got int"]);
    }

    #[test]
    fn superclass_rules() {
        let messages = check(indoc! {"
            class A(Missing):
                pass
        "});
        assert_eq!(messages, ["[line 1] NameError: Unknown superclass: Missing"]);
        let messages = check(indoc! {"
            class B(int):
                pass
        "});
        assert_eq!(messages, ["[line 1] TypeError: Illegal superclass: int"]);
    }

    #[test]
    fn override_must_match_signature() {
        let messages = check(indoc! {"
            class A(object):
                def m(self: \"A\", x: int) -> int:
                    return x
            class B(A):
                def m(self: \"B\", x: str) -> int:
                    return 0
        "});
        assert_eq!(
            messages,
            ["[line 5] TypeError: Redefined method doesn't match superclass signature: m"]
        );
    }

    #[test]
    fn override_with_matching_signature_is_fine() {
        check_clean(indoc! {"
            class A(object):
                def m(self: \"A\", x: int) -> int:
                    return x
            class B(A):
                def m(self: \"B\", x: int) -> int:
                    return x + 1
        "});
    }

    #[test]
    fn initializer_may_change_arity() {
        check_clean(indoc! {"
            class Point(object):
                x: int = 0
                def __init__(self: \"Point\", x: int):
                    self.x = x
            class Point3(Point):
                z: int = 0
                def __init__(self: \"Point3\", x: int, z: int):
                    self.x = x
                    self.z = z
            p: Point = None
            p = Point3(1, 2)
        "});
    }

    #[test]
    fn attribute_cannot_be_redefined() {
        let messages = check(indoc! {"
            class A(object):
                x: int = 0
            class B(A):
                x: int = 1
        "});
        assert_eq!(
            messages,
            ["[line 4] AttributeError: Cannot redefine attribute: x"]
        );
    }

    #[test]
    fn method_needs_self_param() {
        let messages = check(indoc! {"
            class A(object):
                def m(x: int) -> int:
                    return x
        "});
        assert_eq!(messages, ["[line 2] TypeError: Missing self param in method: m"]);
    }

    #[test]
    fn return_coverage() {
        let messages = check(indoc! {"
            def f(b: bool) -> int:
                if b:
                    return 1
        "});
        assert_eq!(
            messages,
            ["[line 1] TypeError: Expected return statement of type int"]
        );
        check_clean(indoc! {"
            def g(b: bool) -> int:
                if b:
                    return 1
                else:
                    return 0
        "});
    }

    #[test]
    fn cannot_return_from_top_level() {
        let messages = check("return 1\n");
        assert_eq!(
            messages,
            ["[line 1] SyntaxError: Can't return from top-level code."]
        );
    }

    #[test]
    fn initializer_cannot_return_value() {
        let messages = check(indoc! {"
            class A(object):
                def __init__(self: \"A\"):
                    return 1
        "});
        assert_eq!(
            messages,
            [
                "[line 3] TypeError: Can't return a value from an initializer.",
                "[line 3] TypeError: Expected <None>, got int"
            ]
        );
    }

    #[test]
    fn global_requires_known_global_variable() {
        let messages = check(indoc! {"
            def f():
                global missing
        "});
        assert_eq!(messages, ["[line 2] NameError: Unknown global variable missing"]);
        check_clean(indoc! {"
            counter: int = 0
            def bump():
                global counter
                counter = counter + 1
        "});
    }

    #[test]
    fn nonlocal_needs_enclosing_function_binding() {
        check_clean(indoc! {"
            def outer() -> int:
                n: int = 0
                def inner():
                    nonlocal n
                    n = n + 1
                inner()
                return n
        "});
        let messages = check(indoc! {"
            top: int = 0
            def f():
                nonlocal top
        "});
        assert_eq!(messages, ["[line 3] NameError: Unknown nonlocal variable top"]);
    }

    #[test]
    fn reading_outer_variable_requires_declaration() {
        let messages = check(indoc! {"
            x: int = 1
            def f() -> int:
                return x
        "});
        assert_eq!(
            messages,
            [
                "[line 3] NameError: Identifier not defined in current scope: x",
                "[line 3] TypeError: Expected int, got object"
            ]
        );
    }

    #[test]
    fn self_outside_class() {
        let messages = check("print(self)\n");
        assert_eq!(
            messages,
            [
                "[line 1] SyntaxError: Can't use 'self' outside of a class.",
                "[line 1] TypeError: Expected str, int or bool, got object"
            ]
        );
    }

    #[test]
    fn call_checks_arity_and_types() {
        let messages = check(indoc! {"
            def f(a: int, b: str) -> int:
                return a
            n: int = 0
            n = f(1)
        "});
        assert_eq!(messages, ["[line 4] TypeError: Expected 2 args, got 1"]);
        let messages = check(indoc! {"
            def f(a: int) -> int:
                return a
            n: int = 0
            n = f(\"one\")
        "});
        assert_eq!(messages, ["[line 4] TypeError: Expected int, got str"]);
    }

    #[test]
    fn constructor_checks_init_signature() {
        let messages = check(indoc! {"
            class Point(object):
                x: int = 0
                def __init__(self: \"Point\", x: int):
                    self.x = x
            p: Point = None
            p = Point()
        "});
        assert_eq!(messages, ["[line 6] TypeError: Expected 1 args, got 0"]);
    }

    #[test]
    fn primitive_constructors_type_check() {
        check_clean(indoc! {"
            n: int = 1
            s: str = \"x\"
            b: bool = True
            n = int()
            s = str()
            b = bool()
        "});
        let messages = check("n: int = 0\nn = int(5)\n");
        assert_eq!(messages, ["[line 2] TypeError: Expected 0 args, got 1"]);
    }

    #[test]
    fn method_lookup_through_superclass() {
        check_clean(indoc! {"
            class Animal(object):
                def noise(self: \"Animal\") -> str:
                    return \"?\"
            class Dog(Animal):
                pass
            d: Dog = None
            d = Dog()
            print(d.noise())
        "});
    }

    #[test]
    fn indexing_rules() {
        check_clean(indoc! {"
            xs: [int] = None
            xs = [1, 2]
            n: int = 0
            n = xs[0]
            s: str = \"abc\"
            c: str = \"\"
            c = s[1]
        "});
        let messages = check("n: int = 0\nn = n[0]\n");
        assert_eq!(
            messages,
            [
                "[line 2] TypeError: Cannot index into int",
                "[line 2] TypeError: Expected int, got object"
            ]
        );
        let messages = check("s: str = \"a\"\ns[0] = \"b\"\n");
        assert_eq!(
            messages,
            ["[line 2] TypeError: Cannot assign to index of string"]
        );
    }

    #[test]
    fn len_requires_str_or_list() {
        let messages = check("print(len(1))\n");
        assert_eq!(messages, ["[line 1] TypeError: Expected str or list, got int"]);
    }

    #[test]
    fn empty_list_assigns_to_list_types() {
        check_clean("xs: [int] = None\nxs = []\n");
    }

    #[test]
    fn repeated_none_list_target_rejected() {
        let messages = check(indoc! {"
            xs: [object] = None
            xs = xs = [None]
        "});
        assert_eq!(
            messages,
            ["[line 2] TypeError: Cannot assign [<None>] to the same target twice"]
        );
        check_clean(indoc! {"
            xs: [object] = None
            ys: [object] = None
            xs = ys = [None]
        "});
    }

    #[test]
    fn ternary_joins_branches() {
        check_clean(indoc! {"
            class Animal(object):
                pass
            class Dog(Animal):
                pass
            class Cat(Animal):
                pass
            b: bool = True
            pet: Animal = None
            pet = Dog() if b else Cat()
        "});
    }
}
