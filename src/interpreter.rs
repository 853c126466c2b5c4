use std::io::{BufRead, Write};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::{BinaryOp, Expr, ExprKind, LiteralValue, LogicalOp, Stmt, StmtKind, UnaryOp};
use crate::diagnostics::ErrorKind;

mod env;
mod fault;
mod value;

pub use fault::Fault;
pub use value::Value;

use env::{Env, EnvRef};
use value::{Function, Instance, RuntimeClass};

/// Control-flow marker for statement execution.
enum Signal {
    Proceed,
    Return(Value),
}

pub fn interpret(
    program: &[Stmt],
    stdin: &mut dyn BufRead,
    stdout: &mut dyn Write,
) -> Result<(), Fault> {
    let mut interpreter = Interpreter::new(stdin, stdout);
    interpreter.run(program)
}

pub struct Interpreter<'a> {
    globals: EnvRef,
    classes: FxHashMap<String, Rc<RuntimeClass>>,
    stdin: &'a mut dyn BufRead,
    stdout: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(stdin: &'a mut dyn BufRead, stdout: &'a mut dyn Write) -> Self {
        let globals = Env::root();
        let mut classes = FxHashMap::default();

        // The builtin classes exist from the start; only `object` is
        // reachable by name, the primitives just anchor their subclasses.
        let object = Rc::new(RuntimeClass {
            name: "object".to_string(),
            superclass: None,
            fields: Vec::new(),
            methods: FxHashMap::default(),
        });
        for name in ["int", "str", "bool"] {
            let class = Rc::new(RuntimeClass {
                name: name.to_string(),
                superclass: Some(object.clone()),
                fields: Vec::new(),
                methods: FxHashMap::default(),
            });
            globals.borrow_mut().define(name, Value::Class(class.clone()));
            classes.insert(name.to_string(), class);
        }
        globals.borrow_mut().define("object", Value::Class(object.clone()));
        classes.insert("object".to_string(), object);

        Self {
            globals,
            classes,
            stdin,
            stdout,
        }
    }

    pub fn run(&mut self, program: &[Stmt]) -> Result<(), Fault> {
        let globals = self.globals.clone();
        for stmt in program {
            self.exec_stmt(stmt, &globals)?;
        }
        Ok(())
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &EnvRef) -> Result<Signal, Fault> {
        for stmt in stmts {
            if let Signal::Return(value) = self.exec_stmt(stmt, env)? {
                return Ok(Signal::Return(value));
            }
        }
        Ok(Signal::Proceed)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Signal, Fault> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.eval(expr, env)?;
                Ok(Signal::Proceed)
            }
            StmtKind::VarDecl { name, init, .. } => {
                let value = self.eval(init, env)?;
                env.borrow_mut().define(name, value);
                Ok(Signal::Proceed)
            }
            StmtKind::Assign { targets, value } => {
                let value = self.eval(value, env)?;
                for target in targets {
                    self.assign_target(target, &value, env)?;
                }
                Ok(Signal::Proceed)
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if self.eval_condition(condition, env)? {
                    then_branch
                } else {
                    else_branch
                };
                self.exec_block(branch, env)
            }
            StmtKind::While { condition, body } => {
                while self.eval_condition(condition, env)? {
                    if let Signal::Return(value) = self.exec_block(body, env)? {
                        return Ok(Signal::Return(value));
                    }
                }
                Ok(Signal::Proceed)
            }
            StmtKind::For {
                variable,
                variable_line,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, env)?;
                match iterable {
                    Value::List(items) => {
                        // Iterate a snapshot: in-body mutation of the list or
                        // of the loop variable does not derail the walk.
                        let snapshot: Vec<Value> = items.borrow().clone();
                        for item in snapshot {
                            self.rebind(variable, item, *variable_line, env)?;
                            if let Signal::Return(value) = self.exec_block(body, env)? {
                                return Ok(Signal::Return(value));
                            }
                        }
                    }
                    Value::Str(text) => {
                        // Characters, not bytes: input() can carry non-ASCII.
                        for ch in text.chars() {
                            let item = Value::Str(ch.to_string());
                            self.rebind(variable, item, *variable_line, env)?;
                            if let Signal::Return(value) = self.exec_block(body, env)? {
                                return Ok(Signal::Return(value));
                            }
                        }
                    }
                    Value::None => {
                        return Err(Fault::none_operation(
                            stmt.line,
                            "'NoneType' object is not iterable",
                        ));
                    }
                    other => {
                        return Err(Fault::type_error(
                            stmt.line,
                            format!("'{}' object is not iterable", other.type_name()),
                        ));
                    }
                }
                Ok(Signal::Proceed)
            }
            StmtKind::Func(decl) => {
                let function = Function {
                    decl: decl.clone(),
                    closure: env.clone(),
                };
                env.borrow_mut()
                    .define(&decl.name, Value::Function(Rc::new(function)));
                Ok(Signal::Proceed)
            }
            StmtKind::Class(decl) => {
                let superclass = self
                    .classes
                    .get(&decl.superclass)
                    .or_else(|| self.classes.get("object"))
                    .cloned();
                let mut fields = superclass
                    .as_ref()
                    .map(|class| class.fields.clone())
                    .unwrap_or_default();
                let mut methods = FxHashMap::default();
                for member in &decl.body {
                    match &member.kind {
                        StmtKind::VarDecl { name, init, .. } => {
                            let value = self.eval(init, env)?;
                            fields.push((name.clone(), value));
                        }
                        StmtKind::Func(method) => {
                            methods.insert(
                                method.name.clone(),
                                Rc::new(Function {
                                    decl: method.clone(),
                                    closure: self.globals.clone(),
                                }),
                            );
                        }
                        _ => {}
                    }
                }
                let class = Rc::new(RuntimeClass {
                    name: decl.name.clone(),
                    superclass,
                    fields,
                    methods,
                });
                self.classes.insert(decl.name.clone(), class.clone());
                env.borrow_mut().define(&decl.name, Value::Class(class));
                Ok(Signal::Proceed)
            }
            StmtKind::Return { value } => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::None,
                };
                Ok(Signal::Return(value))
            }
            StmtKind::Global { name } => {
                env.borrow_mut().mark_global(name);
                Ok(Signal::Proceed)
            }
            StmtKind::Nonlocal { name } => {
                env.borrow_mut().mark_nonlocal(name);
                Ok(Signal::Proceed)
            }
            StmtKind::Pass => Ok(Signal::Proceed),
        }
    }

    fn rebind(&mut self, name: &str, value: Value, line: usize, env: &EnvRef) -> Result<(), Fault> {
        if env::assign(env, name, value) {
            Ok(())
        } else {
            Err(Fault::name_error(line, format!("Undefined variable '{name}'")))
        }
    }

    fn assign_target(&mut self, target: &Expr, value: &Value, env: &EnvRef) -> Result<(), Fault> {
        match &target.kind {
            ExprKind::Identifier(name) => self.rebind(name, value.clone(), target.line, env),
            ExprKind::Attribute { object, name } => {
                let object = self.eval(object, env)?;
                match object {
                    Value::Instance(instance) => {
                        instance
                            .fields
                            .borrow_mut()
                            .insert(name.clone(), value.clone());
                        Ok(())
                    }
                    Value::None => Err(Fault::none_attribute_write(target.line, name)),
                    other => Err(Fault::attribute_error(
                        target.line,
                        format!("'{}' object has no attribute '{name}'", other.type_name()),
                    )),
                }
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                let index = self.as_int(&index, target.line)?;
                match object {
                    Value::List(items) => {
                        let mut items = items.borrow_mut();
                        let len = items.len();
                        match usize::try_from(index).ok().filter(|&i| i < len) {
                            Some(i) => {
                                items[i] = value.clone();
                                Ok(())
                            }
                            None => Err(Fault::index(target.line, "list index out of range")),
                        }
                    }
                    Value::None => Err(Fault::none_operation(
                        target.line,
                        "'NoneType' object is not subscriptable",
                    )),
                    other => Err(Fault::type_error(
                        target.line,
                        format!(
                            "'{}' object does not support item assignment",
                            other.type_name()
                        ),
                    )),
                }
            }
            _ => Err(Fault::type_error(target.line, "cannot assign to this target")),
        }
    }

    fn eval(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value, Fault> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                LiteralValue::None => Value::None,
                LiteralValue::Int(value) => Value::Int(*value),
                LiteralValue::Str(value) => Value::Str(value.clone()),
                LiteralValue::Bool(value) => Value::Bool(*value),
            }),
            ExprKind::ListLiteral(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element, env)?);
                }
                Ok(Value::list(items))
            }
            ExprKind::Identifier(name) => self.load(name, expr.line, env),
            ExprKind::SelfRef => self.load("self", expr.line, env),
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand, env)?;
                match op {
                    UnaryOp::Neg => {
                        let value = self.as_int(&operand, expr.line)?;
                        Ok(Value::Int(value.wrapping_neg()))
                    }
                    UnaryOp::Not => {
                        let value = self.as_bool(&operand, expr.line)?;
                        Ok(Value::Bool(!value))
                    }
                }
            }
            ExprKind::Binary { left, op, right } => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                self.binary(expr.line, *op, lhs, rhs)
            }
            ExprKind::Logical { left, op, right } => {
                let lhs = self.eval(left, env)?;
                let lhs = self.as_bool(&lhs, expr.line)?;
                match op {
                    LogicalOp::And if !lhs => Ok(Value::Bool(false)),
                    LogicalOp::Or if lhs => Ok(Value::Bool(true)),
                    _ => self.eval(right, env),
                }
            }
            ExprKind::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if self.eval_condition(condition, env)? {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            ExprKind::Call { callee, args } => self.eval_call(expr.line, callee, args, env),
            ExprKind::Attribute { object, name } => {
                let object = self.eval(object, env)?;
                match object {
                    Value::Instance(instance) => {
                        let field = instance.fields.borrow().get(name).cloned();
                        field.ok_or_else(|| {
                            Fault::attribute_error(
                                expr.line,
                                format!(
                                    "'{}' object has no attribute '{name}'",
                                    instance.class.name
                                ),
                            )
                        })
                    }
                    Value::None => Err(Fault::none_attribute(expr.line, name)),
                    other => Err(Fault::attribute_error(
                        expr.line,
                        format!("'{}' object has no attribute '{name}'", other.type_name()),
                    )),
                }
            }
            ExprKind::Index { object, index } => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                let index = self.as_int(&index, expr.line)?;
                match object {
                    Value::Str(text) => {
                        match usize::try_from(index).ok().and_then(|i| text.chars().nth(i)) {
                            Some(ch) => Ok(Value::Str(ch.to_string())),
                            None => Err(Fault::index(expr.line, "string index out of range")),
                        }
                    }
                    Value::List(items) => {
                        let items = items.borrow();
                        match usize::try_from(index).ok().and_then(|i| items.get(i)) {
                            Some(value) => Ok(value.clone()),
                            None => Err(Fault::index(expr.line, "list index out of range")),
                        }
                    }
                    Value::None => Err(Fault::none_operation(
                        expr.line,
                        "'NoneType' object is not subscriptable",
                    )),
                    other => Err(Fault::type_error(
                        expr.line,
                        format!("'{}' object is not subscriptable", other.type_name()),
                    )),
                }
            }
            ExprKind::Len(value) => {
                let value = self.eval(value, env)?;
                match value {
                    Value::Str(text) => Ok(Value::Int(text.chars().count() as i32)),
                    Value::List(items) => Ok(Value::Int(items.borrow().len() as i32)),
                    Value::None => Err(Fault::none_len(expr.line)),
                    other => Err(Fault::type_error(
                        expr.line,
                        format!("object of type '{}' has no len()", other.type_name()),
                    )),
                }
            }
            ExprKind::Input => {
                let mut buffer = String::new();
                let read = self.stdin.read_line(&mut buffer).map_err(|err| {
                    Fault::io(expr.line, format!("failed to read input: {err}"))
                })?;
                if read == 0 {
                    return Ok(Value::Str(String::new()));
                }
                while buffer.ends_with('\n') || buffer.ends_with('\r') {
                    buffer.pop();
                }
                buffer.push('\n');
                Ok(Value::Str(buffer))
            }
            ExprKind::Print(value) => {
                let value = self.eval(value, env)?;
                let rendered = value.render();
                writeln!(self.stdout, "{rendered}").map_err(|err| {
                    Fault::io(expr.line, format!("failed to write output: {err}"))
                })?;
                Ok(Value::None)
            }
        }
    }

    fn eval_call(
        &mut self,
        line: usize,
        callee: &Expr,
        args: &[Expr],
        env: &EnvRef,
    ) -> Result<Value, Fault> {
        // Method calls bind the receiver as the implicit first argument.
        if let ExprKind::Attribute { object, name } = &callee.kind {
            let receiver = self.eval(object, env)?;
            return match receiver {
                Value::Instance(instance) => {
                    let method = instance.class.find_method(name).ok_or_else(|| {
                        Fault::attribute_error(
                            line,
                            format!("'{}' object has no attribute '{name}'", instance.class.name),
                        )
                    })?;
                    let mut values = Vec::with_capacity(args.len() + 1);
                    values.push(Value::Instance(instance.clone()));
                    for arg in args {
                        values.push(self.eval(arg, env)?);
                    }
                    self.call_function(&method, values)
                }
                Value::None => Err(Fault::none_attribute(line, name)),
                other => Err(Fault::attribute_error(
                    line,
                    format!("'{}' object has no attribute '{name}'", other.type_name()),
                )),
            };
        }

        let callee = self.eval(callee, env)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg, env)?);
        }
        match callee {
            Value::Function(function) => self.call_function(&function, values),
            Value::Class(class) => self.instantiate(&class, values),
            Value::None => Err(Fault::none_operation(
                line,
                "'NoneType' object is not callable",
            )),
            other => Err(Fault::type_error(
                line,
                format!("'{}' object is not callable", other.type_name()),
            )),
        }
    }

    fn call_function(&mut self, function: &Rc<Function>, args: Vec<Value>) -> Result<Value, Fault> {
        let frame = Env::child(&function.closure);
        for (param, value) in function.decl.params.iter().zip(args) {
            frame.borrow_mut().define(&param.name, value);
        }
        match self.exec_block(&function.decl.body, &frame)? {
            Signal::Return(value) => Ok(value),
            Signal::Proceed => Ok(Value::None),
        }
    }

    /// A constructor call always yields the new instance; any value the
    /// initializer body produces is discarded.
    fn instantiate(&mut self, class: &Rc<RuntimeClass>, args: Vec<Value>) -> Result<Value, Fault> {
        // The primitive constructors yield their zero values.
        match class.name.as_str() {
            "int" => return Ok(Value::Int(0)),
            "str" => return Ok(Value::Str(String::new())),
            "bool" => return Ok(Value::Bool(false)),
            _ => {}
        }
        let mut fields = FxHashMap::default();
        for (name, value) in &class.fields {
            fields.insert(name.clone(), value.clone());
        }
        let instance = Rc::new(Instance {
            class: class.clone(),
            fields: std::cell::RefCell::new(fields),
        });
        if let Some(init) = class.find_method("__init__") {
            let mut values = Vec::with_capacity(args.len() + 1);
            values.push(Value::Instance(instance.clone()));
            values.extend(args);
            self.call_function(&init, values)?;
        }
        Ok(Value::Instance(instance))
    }

    fn binary(&mut self, line: usize, op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, Fault> {
        match (op, &lhs, &rhs) {
            (BinaryOp::Add, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (BinaryOp::Add, Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
            (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
            (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(Fault::zero_division(line))
                } else {
                    Ok(Value::Int(floor_div(*a, *b)))
                }
            }
            (BinaryOp::Mod, Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    Err(Fault::zero_division(line))
                } else {
                    Ok(Value::Int(floor_mod(*a, *b)))
                }
            }
            (BinaryOp::Lt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
            (BinaryOp::Le, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a <= b)),
            (BinaryOp::Gt, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
            (BinaryOp::Ge, Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a >= b)),
            (BinaryOp::Eq, _, _) => Ok(Value::Bool(equals(&lhs, &rhs))),
            (BinaryOp::Ne, _, _) => Ok(Value::Bool(!equals(&lhs, &rhs))),
            (BinaryOp::Is, _, _) => Ok(Value::Bool(Value::same_identity(&lhs, &rhs))),
            _ => {
                let exit_code = if matches!(lhs, Value::None) || matches!(rhs, Value::None) {
                    4
                } else {
                    70
                };
                Err(Fault::new(
                    line,
                    ErrorKind::Type,
                    format!(
                        "unsupported operand type(s) for {op}: '{}' and '{}'",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                    exit_code,
                ))
            }
        }
    }

    fn eval_condition(&mut self, condition: &Expr, env: &EnvRef) -> Result<bool, Fault> {
        let value = self.eval(condition, env)?;
        self.as_bool(&value, condition.line)
    }

    fn load(&mut self, name: &str, line: usize, env: &EnvRef) -> Result<Value, Fault> {
        env::lookup(env, name)
            .ok_or_else(|| Fault::name_error(line, format!("Undefined variable '{name}'")))
    }

    fn as_int(&self, value: &Value, line: usize) -> Result<i32, Fault> {
        match value {
            Value::Int(value) => Ok(*value),
            other => Err(Fault::type_error(
                line,
                format!("expected int, got '{}'", other.type_name()),
            )),
        }
    }

    fn as_bool(&self, value: &Value, line: usize) -> Result<bool, Fault> {
        match value {
            Value::Bool(value) => Ok(*value),
            other => Err(Fault::type_error(
                line,
                format!("expected bool, got '{}'", other.type_name()),
            )),
        }
    }
}

/// Quotient rounded toward negative infinity, matching `//`.
fn floor_div(a: i32, b: i32) -> i32 {
    if b == -1 {
        return a.wrapping_neg();
    }
    let quotient = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// Remainder with the divisor's sign, matching `%`.
fn floor_mod(a: i32, b: i32) -> i32 {
    if b == -1 {
        return 0;
    }
    let remainder = a % b;
    if remainder != 0 && (remainder < 0) != (b < 0) {
        remainder + b
    } else {
        remainder
    }
}

fn equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::{lexer, parser, resolver};
    use indoc::indoc;
    use std::io::Cursor;

    fn run_with_input(source: &str, input: &str) -> Result<String, Fault> {
        let mut diags = Diagnostics::new();
        let tokens = lexer::tokenize(source, &mut diags);
        let program = parser::parse(tokens, &mut diags);
        resolver::resolve(&program, &mut diags);
        assert!(
            !diags.had_error(),
            "static errors before interpretation: {:?}",
            diags.messages()
        );
        let mut stdin = Cursor::new(input.as_bytes().to_vec());
        let mut stdout = Vec::new();
        interpret(&program, &mut stdin, &mut stdout)?;
        Ok(String::from_utf8(stdout).expect("output is utf-8"))
    }

    fn run(source: &str) -> Result<String, Fault> {
        run_with_input(source, "")
    }

    fn output(source: &str) -> String {
        run(source).expect("program faulted")
    }

    fn fault(source: &str) -> Fault {
        run(source).expect_err("program did not fault")
    }

    #[test]
    fn prints_arithmetic_result() {
        assert_eq!(output("x: int = 5\nprint(x + 1)\n"), "6\n");
    }

    #[test]
    fn division_and_modulo_round_toward_negative_infinity() {
        let source = indoc! {"
            print(7 // 2)
            print(-7 // 2)
            print(7 // -2)
            print(7 % 3)
            print(-7 % 3)
            print(7 % -3)
        "};
        assert_eq!(output(source), "3\n-4\n-4\n1\n2\n-2\n");
    }

    #[test]
    fn arithmetic_wraps_at_i32_bounds() {
        assert_eq!(output("print(2147483647 + 1)\n"), "-2147483648\n");
    }

    #[test]
    fn division_by_zero_faults_with_exit_two() {
        assert_eq!(fault("print(1 % 0)\n").exit_code, 2);
        let fault = fault("print(1 // 0)\n");
        assert_eq!(fault.to_string(), "[line 1] ZeroDivisionError: division by zero");
        assert_eq!(fault.exit_code, 2);
    }

    #[test]
    fn string_concat_index_and_len() {
        let source = indoc! {"
            s: str = \"abc\"
            t: str = \"\"
            t = s + \"def\"
            print(t)
            print(t[3])
            print(len(t))
        "};
        assert_eq!(output(source), "abcdef\nd\n6\n");
    }

    #[test]
    fn string_index_out_of_range() {
        let fault = fault("s: str = \"ab\"\nprint(s[2])\n");
        assert_eq!(fault.to_string(), "[line 2] IndexError: string index out of range");
        assert_eq!(fault.exit_code, 3);
    }

    #[test]
    fn list_indexing_and_mutation() {
        let source = indoc! {"
            xs: [int] = []
            xs = [1, 2, 3]
            xs[1] = 20
            print(xs[0] + xs[1] + xs[2])
        "};
        assert_eq!(output(source), "24\n");
    }

    #[test]
    fn empty_list_index_faults_with_exit_three() {
        let fault = fault("lst: [int] = []\nprint(lst[0])\n");
        assert_eq!(fault.to_string(), "[line 2] IndexError: list index out of range");
        assert_eq!(fault.exit_code, 3);
    }

    #[test]
    fn list_aliasing_shares_storage() {
        let source = indoc! {"
            xs: [int] = []
            ys: [int] = []
            xs = [1, 2]
            ys = xs
            ys[0] = 9
            print(xs[0])
            print(xs is ys)
        "};
        assert_eq!(output(source), "9\nTrue\n");
    }

    #[test]
    fn list_concat_builds_a_new_list() {
        let source = indoc! {"
            xs: [int] = []
            ys: [int] = []
            xs = [1]
            ys = xs + [2]
            print(len(xs))
            print(len(ys))
            print(xs is ys)
        "};
        assert_eq!(output(source), "1\n2\nFalse\n");
    }

    #[test]
    fn for_loop_over_list_and_string() {
        let source = indoc! {"
            total: int = 0
            n: int = 0
            c: str = \"\"
            for n in [1, 2, 3]:
                total = total + n
            print(total)
            for c in \"hi\":
                print(c)
        "};
        assert_eq!(output(source), "6\nh\ni\n");
    }

    #[test]
    fn loop_variable_keeps_last_element_and_survives_rebinding() {
        let source = indoc! {"
            i: int = 0
            for i in [1, 2, 3]:
                i = i * 10
            print(i)
        "};
        // Rebinding inside the body does not derail iteration; the final
        // pass leaves the body's last write in place.
        assert_eq!(output(source), "30\n");
    }

    #[test]
    fn while_counts_down() {
        let source = indoc! {"
            n: int = 3
            while n > 0:
                print(n)
                n = n - 1
        "};
        assert_eq!(output(source), "3\n2\n1\n");
    }

    #[test]
    fn ternary_picks_branch_lazily() {
        let source = indoc! {"
            n: int = 0
            print(1 if n == 0 else 1 // n)
        "};
        assert_eq!(output(source), "1\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = indoc! {"
            def boom() -> bool:
                return 1 // 0 == 0
            print(False and boom())
            print(True or boom())
        "};
        assert_eq!(output(source), "False\nTrue\n");
    }

    #[test]
    fn functions_recurse_and_forward_reference() {
        let source = indoc! {"
            def even(n: int) -> bool:
                return True if n == 0 else odd(n - 1)
            def odd(n: int) -> bool:
                return False if n == 0 else even(n - 1)
            print(even(10))
            print(odd(10))
        "};
        assert_eq!(output(source), "True\nFalse\n");
    }

    #[test]
    fn nested_function_closes_over_locals() {
        let source = indoc! {"
            def counter() -> int:
                n: int = 0
                def bump():
                    nonlocal n
                    n = n + 1
                bump()
                bump()
                bump()
                return n
            print(counter())
        "};
        assert_eq!(output(source), "3\n");
    }

    #[test]
    fn global_declaration_writes_through() {
        let source = indoc! {"
            counter: int = 0
            def bump():
                global counter
                counter = counter + 1
            bump()
            bump()
            print(counter)
        "};
        assert_eq!(output(source), "2\n");
    }

    #[test]
    fn classes_construct_with_fields_and_methods() {
        let source = indoc! {"
            class Point(object):
                x: int = 0
                y: int = 0
                def __init__(self: \"Point\", x: int, y: int):
                    self.x = x
                    self.y = y
                def sum(self: \"Point\") -> int:
                    return self.x + self.y
            p: Point = None
            p = Point(3, 4)
            print(p.sum())
            p.x = 10
            print(p.sum())
        "};
        assert_eq!(output(source), "7\n14\n");
    }

    #[test]
    fn default_fields_without_initializer() {
        let source = indoc! {"
            class Counter(object):
                n: int = 100
            c: Counter = None
            c = Counter()
            print(c.n)
        "};
        assert_eq!(output(source), "100\n");
    }

    #[test]
    fn field_defaults_are_evaluated_once_and_shared() {
        let source = indoc! {"
            class Box(object):
                items: [int] = [0]
            a: Box = None
            b: Box = None
            a = Box()
            b = Box()
            a.items[0] = 7
            print(b.items[0])
            print(a.items is b.items)
            a.items = [5]
            print(b.items[0])
            print(a.items is b.items)
        "};
        // The default list is built at class definition time, so fresh
        // instances start out aliasing it; reassigning the field on one
        // instance leaves the other untouched.
        assert_eq!(output(source), "7\nTrue\n7\nFalse\n");
    }

    #[test]
    fn chained_assignment_evaluates_value_once_left_to_right() {
        let source = indoc! {"
            class Cell(object):
                other: \"Cell\" = None
            a: Cell = None
            b: Cell = None
            xs: [int] = []
            ys: [int] = []
            xs = ys = [1, 2]
            print(xs is ys)
            a = Cell()
            b = Cell()
            a = a.other = b
            print(a is b)
            print(a.other is b)
        "};
        // One evaluation of the right-hand side, so both list targets alias
        // it. Targets apply left to right: `a` is rebound to `b` before the
        // `a.other` target is resolved, so the write lands on `b`.
        assert_eq!(output(source), "True\nTrue\nTrue\n");
    }

    #[test]
    fn inherited_methods_dispatch_dynamically() {
        let source = indoc! {"
            class Animal(object):
                def noise(self: \"Animal\") -> str:
                    return \"...\"
                def speak(self: \"Animal\") -> str:
                    return self.noise()
            class Dog(Animal):
                def noise(self: \"Dog\") -> str:
                    return \"woof\"
            a: Animal = None
            a = Dog()
            print(a.speak())
        "};
        assert_eq!(output(source), "woof\n");
    }

    #[test]
    fn initializer_with_bare_return_still_yields_instance() {
        let source = indoc! {"
            class Once(object):
                n: int = 0
                def __init__(self: \"Once\"):
                    self.n = 5
                    return
            o: Once = None
            o = Once()
            print(o.n)
        "};
        assert_eq!(output(source), "5\n");
    }

    #[test]
    fn is_compares_identity_not_contents() {
        let source = indoc! {"
            class A(object):
                pass
            x: A = None
            y: A = None
            x = A()
            y = A()
            print(x is x)
            print(x is y)
            print(x is None)
            print(None is None)
        "};
        assert_eq!(output(source), "True\nFalse\nFalse\nTrue\n");
    }

    #[test]
    fn input_returns_line_with_newline_or_empty_at_eof() {
        let source = indoc! {"
            s: str = \"\"
            s = input()
            print(len(s))
            s = input()
            print(len(s))
        "};
        // First read takes "ab" plus the normalized newline; second read
        // hits end of input and yields the empty string.
        assert_eq!(run_with_input(source, "ab\n").expect("faulted"), "3\n0\n");
    }

    #[test]
    fn non_ascii_input_indexes_and_measures_characters() {
        let source = indoc! {"
            s: str = \"\"
            c: str = \"\"
            s = input()
            print(len(s))
            print(s[1])
            for c in s:
                print(c)
        "};
        assert_eq!(
            run_with_input(source, "hé\n").expect("faulted"),
            "3\né\nh\né\n\n"
        );
    }

    #[test]
    fn attribute_access_on_none_faults_with_exit_one() {
        let source = indoc! {"
            class A(object):
                n: int = 0
            a: A = None
            print(a.n)
        "};
        let fault = fault(source);
        assert_eq!(
            fault.to_string(),
            "[line 4] AttributeError: 'NoneType' object has no attribute 'n'"
        );
        assert_eq!(fault.exit_code, 1);
    }

    #[test]
    fn attribute_write_on_none_faults_with_exit_four() {
        let source = indoc! {"
            class A(object):
                n: int = 0
            a: A = None
            a.n = 5
        "};
        let fault = fault(source);
        assert_eq!(
            fault.to_string(),
            "[line 4] AttributeError: 'NoneType' object has no attribute 'n'"
        );
        assert_eq!(fault.exit_code, 4);
    }

    #[test]
    fn method_call_on_none_faults_with_exit_one() {
        let source = indoc! {"
            class A(object):
                def m(self: \"A\") -> int:
                    return 1
            a: A = None
            print(a.m())
        "};
        assert_eq!(fault(source).exit_code, 1);
    }

    #[test]
    fn len_of_none_faults_with_exit_one() {
        let fault = fault("xs: [int] = None\nprint(len(xs))\n");
        assert_eq!(
            fault.to_string(),
            "[line 2] TypeError: object of type 'NoneType' has no len()"
        );
        assert_eq!(fault.exit_code, 1);
    }

    #[test]
    fn indexing_none_faults_with_exit_four() {
        let fault = fault("xs: [int] = None\nprint(xs[0])\n");
        assert_eq!(
            fault.to_string(),
            "[line 2] TypeError: 'NoneType' object is not subscriptable"
        );
        assert_eq!(fault.exit_code, 4);
    }

    #[test]
    fn iterating_none_faults_with_exit_four() {
        let source = indoc! {"
            xs: [int] = None
            n: int = 0
            for n in xs:
                pass
        "};
        let fault = fault(source);
        assert_eq!(
            fault.to_string(),
            "[line 3] TypeError: 'NoneType' object is not iterable"
        );
        assert_eq!(fault.exit_code, 4);
    }

    #[test]
    fn adding_none_to_list_faults_with_exit_four() {
        let source = indoc! {"
            xs: [int] = None
            ys: [int] = None
            ys = xs + [1]
        "};
        let fault = fault(source);
        assert_eq!(
            fault.to_string(),
            "[line 3] TypeError: unsupported operand type(s) for +: 'NoneType' and 'list'"
        );
        assert_eq!(fault.exit_code, 4);
    }

    #[test]
    fn calling_before_definition_is_a_runtime_name_error() {
        let source = indoc! {"
            def call_it() -> int:
                return helper()
            n: int = 0
            n = call_it()
            def helper() -> int:
                return 1
        "};
        let fault = fault(source);
        assert_eq!(
            fault.to_string(),
            "[line 2] NameError: Undefined variable 'helper'"
        );
        assert_eq!(fault.exit_code, 70);
    }

    #[test]
    fn primitive_constructors_yield_zero_values() {
        let source = indoc! {"
            print(int())
            print(len(str()))
            print(bool())
        "};
        assert_eq!(output(source), "0\n0\nFalse\n");
    }

    #[test]
    fn object_constructor_produces_distinct_instances() {
        let source = indoc! {"
            a: object = None
            b: object = None
            a = object()
            b = object()
            print(a is b)
            print(a is a)
        "};
        assert_eq!(output(source), "False\nTrue\n");
    }
}
