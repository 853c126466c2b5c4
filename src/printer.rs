use std::fmt::Write;

use crate::ast::{Expr, ExprKind, FuncDecl, LiteralValue, Stmt, StmtKind};

/// Renders a parsed program back to a canonical source form, with every
/// compound expression fully parenthesized. Debugging and test aid; the
/// output is not guaranteed to re-lex byte for byte.
pub fn render(program: &[Stmt]) -> String {
    let mut out = String::new();
    for stmt in program {
        render_stmt(&mut out, stmt, 0);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn render_block(out: &mut String, stmts: &[Stmt], depth: usize) {
    for stmt in stmts {
        render_stmt(out, stmt, depth);
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    indent(out, depth);
    match &stmt.kind {
        StmtKind::Expression(expr) => {
            let _ = writeln!(out, "{}", render_expr(expr));
        }
        StmtKind::VarDecl {
            name,
            annotation,
            init,
        } => {
            let _ = writeln!(out, "{name}: {annotation} = {}", render_expr(init));
        }
        StmtKind::Assign { targets, value } => {
            for target in targets {
                let _ = write!(out, "{} = ", render_expr(target));
            }
            let _ = writeln!(out, "{}", render_expr(value));
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            let _ = writeln!(out, "if {}:", render_expr(condition));
            render_block(out, then_branch, depth + 1);
            if !else_branch.is_empty() {
                indent(out, depth);
                out.push_str("else:\n");
                render_block(out, else_branch, depth + 1);
            }
        }
        StmtKind::While { condition, body } => {
            let _ = writeln!(out, "while {}:", render_expr(condition));
            render_block(out, body, depth + 1);
        }
        StmtKind::For {
            variable, iterable, body, ..
        } => {
            let _ = writeln!(out, "for {variable} in {}:", render_expr(iterable));
            render_block(out, body, depth + 1);
        }
        StmtKind::Func(decl) => render_func(out, decl, depth),
        StmtKind::Class(decl) => {
            let _ = writeln!(out, "class {}({}):", decl.name, decl.superclass);
            render_block(out, &decl.body, depth + 1);
        }
        StmtKind::Return { value } => match value {
            Some(expr) => {
                let _ = writeln!(out, "return {}", render_expr(expr));
            }
            None => out.push_str("return\n"),
        },
        StmtKind::Global { name } => {
            let _ = writeln!(out, "global {name}");
        }
        StmtKind::Nonlocal { name } => {
            let _ = writeln!(out, "nonlocal {name}");
        }
        StmtKind::Pass => out.push_str("pass\n"),
    }
}

fn render_func(out: &mut String, decl: &FuncDecl, depth: usize) {
    let params = decl
        .params
        .iter()
        .map(|p| format!("{}: {}", p.name, p.annotation))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(
        out,
        "def {}({params}) -> {}:",
        decl.name, decl.return_annotation
    );
    render_block(out, &decl.body, depth + 1);
}

fn render_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(literal) => match literal {
            LiteralValue::None => "None".to_string(),
            LiteralValue::Int(value) => value.to_string(),
            LiteralValue::Str(value) => format!("{value:?}"),
            LiteralValue::Bool(true) => "True".to_string(),
            LiteralValue::Bool(false) => "False".to_string(),
        },
        ExprKind::ListLiteral(elements) => {
            let rendered = elements
                .iter()
                .map(render_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{rendered}]")
        }
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::SelfRef => "self".to_string(),
        ExprKind::Unary { op, operand } => match op {
            crate::ast::UnaryOp::Neg => format!("(-{})", render_expr(operand)),
            crate::ast::UnaryOp::Not => format!("(not {})", render_expr(operand)),
        },
        ExprKind::Binary { left, op, right } => {
            format!("({} {op} {})", render_expr(left), render_expr(right))
        }
        ExprKind::Logical { left, op, right } => {
            format!("({} {op} {})", render_expr(left), render_expr(right))
        }
        ExprKind::Ternary {
            condition,
            then,
            otherwise,
        } => format!(
            "({} if {} else {})",
            render_expr(then),
            render_expr(condition),
            render_expr(otherwise)
        ),
        ExprKind::Call { callee, args } => {
            let rendered = args.iter().map(render_expr).collect::<Vec<_>>().join(", ");
            format!("{}({rendered})", render_expr(callee))
        }
        ExprKind::Attribute { object, name } => {
            format!("{}.{name}", render_expr(object))
        }
        ExprKind::Index { object, index } => {
            format!("{}[{}]", render_expr(object), render_expr(index))
        }
        ExprKind::Len(value) => format!("len({})", render_expr(value)),
        ExprKind::Input => "input()".to_string(),
        ExprKind::Print(value) => format!("print({})", render_expr(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::{lexer, parser};
    use indoc::indoc;

    fn render_source(source: &str) -> String {
        let mut diags = Diagnostics::new();
        let tokens = lexer::tokenize(source, &mut diags);
        let program = parser::parse(tokens, &mut diags);
        assert!(!diags.had_error(), "parse errors: {:?}", diags.messages());
        render(&program)
    }

    #[test]
    fn parenthesizes_by_precedence() {
        assert_eq!(render_source("print(1 + 2 * 3)\n"), "print((1 + (2 * 3)))\n");
        assert_eq!(
            render_source("x: bool = True\nx = not 1 == 2\n"),
            "x: bool = True\nx = (not (1 == 2))\n"
        );
    }

    #[test]
    fn renders_declarations_and_blocks() {
        let source = indoc! {"
            class Point(object):
                x: int = 0
                def magnitude(self: \"Point\") -> int:
                    return self.x
            def twice(n: int) -> int:
                return n * 2
            p: Point = None
            if True:
                p = Point()
            else:
                pass
        "};
        let expected = indoc! {"
            class Point(object):
                x: int = 0
                def magnitude(self: Point) -> int:
                    return self.x
            def twice(n: int) -> int:
                return (n * 2)
            p: Point = None
            if True:
                p = Point()
            else:
                pass
        "};
        assert_eq!(render_source(source), expected);
    }

    #[test]
    fn renders_chained_assignment_and_loops() {
        let source = indoc! {"
            a: int = 0
            b: int = 0
            a = b = 5
            while a > 0:
                a = a - 1
            for a in [1, 2]:
                print(a)
        "};
        let expected = indoc! {"
            a: int = 0
            b: int = 0
            a = b = 5
            while (a > 0):
                a = (a - 1)
            for a in [1, 2]:
                print(a)
        "};
        assert_eq!(render_source(source), expected);
    }
}
