//! Canonical pretty-printer for the AST.
//!
//! Produces parseable source whose re-parse lowers to a structurally equal
//! AST (modulo spans and node ids): operands of binary and postfix
//! expressions are parenthesized, so precedence never shifts on the way
//! back in. Backs the parse→print→parse round-trip property and is usable
//! by external tooling.

use super::*;

/// Render a compilation unit as canonical source text.
pub fn print(unit: &CompilationUnit) -> String {
    let mut p = Printer::new();
    p.unit(unit);
    p.out
}

/// Render a single expression (used in diagnostics and tests).
pub fn print_expr(expr: &Expr) -> String {
    let mut p = Printer::new();
    p.expr(expr);
    p.out
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn push(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn line(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    // ── Unit & declarations ──────────────────────────────────────────

    fn unit(&mut self, unit: &CompilationUnit) {
        if !unit.module_path.is_empty() {
            self.push("module ");
            self.push(&unit.module_path.dotted_colons());
            self.line();
        }
        for u in &unit.uses {
            self.use_decl(u);
            self.line();
        }
        for d in &unit.decls {
            self.line();
            self.decl(d);
            self.line();
        }
    }

    fn use_decl(&mut self, u: &UseDecl) {
        self.push("use ");
        self.push(&u.module_path.dotted_colons());
        match &u.kind {
            UseKind::Single { item, alias } => {
                if !u.module_path.is_empty() {
                    self.push("::");
                }
                self.push(item);
                if let Some(a) = alias {
                    self.push(" as ");
                    self.push(a);
                }
            }
            UseKind::List(items) => {
                self.push("::{");
                self.push(&items.join(", "));
                self.push("}");
            }
            UseKind::Wildcard => self.push("::*"),
        }
        self.push(";");
    }

    fn header(&mut self, h: &DeclHeader) {
        for a in &h.annotations {
            self.push("@");
            self.push(&a.name.dotted_colons());
            if !a.args.is_empty() {
                self.push("(");
                self.comma_exprs(&a.args);
                self.push(")");
            }
            self.line();
        }
        if h.visibility.is_public() {
            self.push("pub ");
        }
    }

    fn decl(&mut self, d: &TopDecl) {
        match d {
            TopDecl::Class(c) => self.class_like(c, "class"),
            TopDecl::Context(c) => self.class_like(c, "context"),
            TopDecl::Supervisor(c) => self.class_like(c, "supervisor"),
            TopDecl::Flow(c) => self.class_like(c, "flow"),
            TopDecl::Interface(i) => self.interface(i),
            TopDecl::Enum(e) => self.enum_decl(e),
            TopDecl::Data(dd) => self.data_decl(dd),
            TopDecl::Struct(s) => self.struct_decl(s),
            TopDecl::Spark(s) => self.spark_decl(s),
            TopDecl::Trait(t) => self.trait_decl(t, "trait"),
            TopDecl::Protocol(t) => self.trait_decl(t, "protocol"),
            TopDecl::Impl(i) => self.impl_decl(i),
            TopDecl::TypeAlias(t) => {
                self.header(&t.header);
                self.push("type ");
                self.push(&t.name);
                self.type_params(&t.type_params);
                self.push(" = ");
                self.ty(&t.aliased);
                self.push(";");
            }
            TopDecl::Extend(e) => {
                self.header(&e.header);
                self.push("extend ");
                self.ty(&e.target);
                self.push(" {");
                self.indent += 1;
                for m in &e.methods {
                    self.line();
                    self.function(m);
                }
                self.indent -= 1;
                self.line();
                self.push("}");
            }
            TopDecl::Macro(m) => {
                self.header(&m.header);
                self.push("macro ");
                self.push(&m.name);
                self.push("(");
                self.push(&m.params.join(", "));
                self.push(") ");
                self.push(&m.body_text);
            }
            TopDecl::Exception(e) => {
                self.header(&e.header);
                self.push("exception ");
                self.push(&e.name);
                if !e.fields.is_empty() {
                    self.push("(");
                    for (i, f) in e.fields.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.push(&f.name);
                        self.push(": ");
                        self.ty(&f.ty);
                    }
                    self.push(")");
                }
                if let Some(sup) = &e.super_ty {
                    self.push(" : ");
                    self.ty(sup);
                }
                self.push(";");
            }
            TopDecl::Function(f) => self.function(f),
        }
    }

    fn class_like(&mut self, c: &ClassDecl, keyword: &str) {
        self.header(&c.header);
        self.push(keyword);
        self.push(" ");
        self.push(&c.name);
        self.type_params(&c.type_params);
        self.supers(&c.supers);
        self.push(" {");
        self.indent += 1;
        for f in &c.fields {
            self.line();
            self.field_decl(f);
        }
        for m in &c.methods {
            self.line();
            self.function(m);
        }
        for n in &c.nested {
            self.line();
            self.decl(n);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn interface(&mut self, i: &InterfaceDecl) {
        self.header(&i.header);
        self.push("interface ");
        self.push(&i.name);
        self.type_params(&i.type_params);
        self.supers(&i.supers);
        self.push(" {");
        self.indent += 1;
        for m in &i.methods {
            self.line();
            self.function(m);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn enum_decl(&mut self, e: &EnumDecl) {
        self.header(&e.header);
        self.push("enum ");
        self.push(&e.name);
        self.push(" {");
        self.indent += 1;
        for (i, v) in e.variants.iter().enumerate() {
            self.line();
            self.push(&v.name);
            if i + 1 < e.variants.len() {
                self.push(",");
            }
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn data_decl(&mut self, d: &DataDecl) {
        self.header(&d.header);
        self.push("data ");
        self.push(&d.name);
        self.type_params(&d.type_params);
        self.push(" {");
        self.indent += 1;
        for (i, v) in d.variants.iter().enumerate() {
            self.line();
            self.push(&v.name);
            if !v.fields.is_empty() {
                self.push("(");
                for (j, f) in v.fields.iter().enumerate() {
                    if j > 0 {
                        self.push(", ");
                    }
                    self.push(&f.name);
                    self.push(": ");
                    self.ty(&f.ty);
                }
                self.push(")");
            }
            if i + 1 < d.variants.len() {
                self.push(",");
            }
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn struct_decl(&mut self, s: &StructDecl) {
        self.header(&s.header);
        self.push("struct ");
        self.push(&s.name);
        self.type_params(&s.type_params);
        self.push(" {");
        self.indent += 1;
        for f in &s.fields {
            self.line();
            self.push(&f.name);
            self.push(": ");
            self.ty(&f.ty);
            self.push(",");
        }
        for m in &s.methods {
            self.line();
            self.function(m);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn spark_decl(&mut self, s: &SparkDecl) {
        self.header(&s.header);
        self.push("spark ");
        self.push(&s.name);
        self.type_params(&s.type_params);
        self.push(" {");
        self.indent += 1;
        for f in &s.fields {
            self.line();
            self.push(&f.name);
            self.push(": ");
            self.ty(&f.ty);
            self.push(",");
        }
        if let Some(b) = &s.validate {
            self.line();
            self.push("validate ");
            self.block(b);
        }
        if let Some(b) = &s.before_update {
            self.line();
            self.push("before update ");
            self.block(b);
        }
        if let Some(b) = &s.after_update {
            self.line();
            self.push("after update ");
            self.block(b);
        }
        for c in &s.computed {
            self.line();
            self.push("computed ");
            self.push(&c.name);
            self.push(": ");
            self.ty(&c.ty);
            self.push(" ");
            self.block(&c.body);
        }
        for m in &s.methods {
            self.line();
            self.function(m);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn trait_decl(&mut self, t: &TraitDecl, keyword: &str) {
        self.header(&t.header);
        self.push(keyword);
        self.push(" ");
        self.push(&t.name);
        self.type_params(&t.type_params);
        self.supers(&t.supers);
        self.push(" {");
        self.indent += 1;
        for m in &t.methods {
            self.line();
            self.function(m);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn impl_decl(&mut self, i: &ImplDecl) {
        self.header(&i.header);
        self.push("impl ");
        if let Some(tr) = &i.trait_ref {
            self.ty(tr);
            self.push(" for ");
        }
        self.ty(&i.self_ty);
        self.push(" {");
        self.indent += 1;
        for m in &i.methods {
            self.line();
            self.function(m);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn field_decl(&mut self, f: &FieldDecl) {
        self.header(&f.header);
        self.push("let ");
        if f.mutable {
            self.push("mut ");
        }
        self.push(&f.name);
        if let Some(t) = &f.ty {
            self.push(": ");
            self.ty(t);
        }
        if let Some(init) = &f.init {
            self.push(" = ");
            self.expr(init);
        }
        self.push(";");
    }

    fn function(&mut self, f: &FunctionDecl) {
        self.header(&f.header);
        if f.is_static {
            self.push("static ");
        }
        if f.is_async {
            self.push("async ");
        }
        self.push("fn ");
        self.push(&f.name);
        self.type_params(&f.type_params);
        self.push("(");
        for (i, p) in f.params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&p.name);
            if let Some(t) = &p.ty {
                self.push(": ");
                self.ty(t);
            }
        }
        self.push(")");
        if let Some(r) = &f.return_type {
            self.push(" -> ");
            self.ty(r);
        }
        if !f.effects.is_empty() {
            self.push(" with ");
            self.push(&f.effects.join(", "));
        }
        if let Some(r) = &f.requires {
            self.push(" requires ");
            self.expr(r);
        }
        match &f.body {
            Some(b) => {
                self.push(" ");
                self.block(b);
            }
            None => self.push(";"),
        }
    }

    fn type_params(&mut self, params: &[TypeParam]) {
        if params.is_empty() {
            return;
        }
        self.push("<");
        for (i, tp) in params.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push(&tp.name);
            if !tp.bounds.is_empty() {
                self.push(": ");
                for (j, b) in tp.bounds.iter().enumerate() {
                    if j > 0 {
                        self.push(" + ");
                    }
                    self.ty(b);
                }
            }
        }
        self.push(">");
    }

    fn supers(&mut self, supers: &[TypeExpr]) {
        if supers.is_empty() {
            return;
        }
        self.push(" : ");
        for (i, s) in supers.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ty(s);
        }
    }

    // ── Types ────────────────────────────────────────────────────────

    fn ty(&mut self, t: &TypeExpr) {
        match &t.kind {
            TypeKind::Primitive(p) => self.push(p.name()),
            TypeKind::Named { path, args } => {
                self.push(&path.dotted_colons());
                if !args.is_empty() {
                    self.push("<");
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.ty(a);
                    }
                    self.push(">");
                }
            }
            TypeKind::Optional(inner) => {
                self.ty(inner);
                self.push("?");
            }
            TypeKind::Array(elem) => {
                self.push("[");
                self.ty(elem);
                self.push("]");
            }
            TypeKind::Map { key, value } => {
                self.push("[");
                self.ty(key);
                self.push(": ");
                self.ty(value);
                self.push("]");
            }
            TypeKind::Reference { inner, mutable } => {
                self.push(if *mutable { "&mut " } else { "&" });
                self.ty(inner);
            }
            TypeKind::Function { params, ret } => {
                self.push("(");
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.ty(p);
                }
                self.push(") -> ");
                self.ty(ret);
            }
            TypeKind::Tuple(elems) => {
                self.push("(");
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.ty(e);
                }
                self.push(")");
            }
            TypeKind::Union(a, b) => {
                self.ty(a);
                self.push(" | ");
                self.ty(b);
            }
            TypeKind::Intersection(a, b) => {
                self.ty(a);
                self.push(" & ");
                self.ty(b);
            }
            TypeKind::Error => self.push("<error>"),
        }
    }

    // ── Statements & expressions ─────────────────────────────────────

    fn block(&mut self, b: &Block) {
        self.push("{");
        self.indent += 1;
        for s in &b.stmts {
            self.line();
            match s {
                Stmt::Let(l) => self.let_stmt(l),
                Stmt::Expr(e) => {
                    self.expr(e);
                    self.push(";");
                }
            }
        }
        if let Some(tail) = &b.tail {
            self.line();
            self.expr(tail);
        }
        self.indent -= 1;
        self.line();
        self.push("}");
    }

    fn let_stmt(&mut self, l: &LetStmt) {
        self.push("let ");
        if l.mutable {
            self.push("mut ");
        }
        self.pattern(&l.pattern);
        if let Some(t) = &l.ty {
            self.push(": ");
            self.ty(t);
        }
        if let Some(init) = &l.init {
            self.push(" = ");
            self.expr(init);
        }
        self.push(";");
    }

    fn comma_exprs(&mut self, exprs: &[Expr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(e);
        }
    }

    /// Print an operand of a postfix chain; anything non-atomic gets parens.
    fn operand(&mut self, e: &Expr) {
        let atomic = matches!(
            e.kind,
            ExprKind::Literal(_)
                | ExprKind::Identifier(_)
                | ExprKind::Path(_)
                | ExprKind::SelfRef
                | ExprKind::Call { .. }
                | ExprKind::MethodCall { .. }
                | ExprKind::StaticCall { .. }
                | ExprKind::FieldAccess { .. }
                | ExprKind::SafeAccess { .. }
                | ExprKind::Index { .. }
                | ExprKind::Await(_)
                | ExprKind::Unwrap(_)
                | ExprKind::ForceUnwrap(_)
                | ExprKind::TupleLit(_)
                | ExprKind::ArrayLit(_)
                | ExprKind::MapLit(_)
                | ExprKind::StructLit { .. }
                | ExprKind::Interpolated(_)
                | ExprKind::New { .. }
        );
        if atomic {
            self.expr(e);
        } else {
            self.push("(");
            self.expr(e);
            self.push(")");
        }
    }

    fn expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::Literal(lit) => self.literal(lit),
            ExprKind::Interpolated(parts) => {
                self.push("f\"");
                for part in parts {
                    match part {
                        InterpPart::Text(t) => self.push(&escape_interp(t)),
                        InterpPart::Hole(h) => {
                            self.push("{");
                            self.expr(h);
                            self.push("}");
                        }
                    }
                }
                self.push("\"");
            }
            ExprKind::Identifier(name) => self.push(name),
            ExprKind::SelfRef => self.push("self"),
            ExprKind::Path(p) => self.push(&p.dotted_colons()),
            ExprKind::Binary { op, lhs, rhs } => {
                self.push("(");
                self.expr(lhs);
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.expr(rhs);
                self.push(")");
            }
            ExprKind::Unary { op, operand } => {
                self.push("(");
                self.push(op.symbol());
                self.expr(operand);
                self.push(")");
            }
            ExprKind::Call { callee, args } => {
                self.operand(callee);
                self.push("(");
                self.comma_exprs(args);
                self.push(")");
            }
            ExprKind::MethodCall {
                recv,
                name,
                args,
                safe,
            } => {
                self.operand(recv);
                self.push(if *safe { "?." } else { "." });
                self.push(name);
                self.push("(");
                self.comma_exprs(args);
                self.push(")");
            }
            ExprKind::StaticCall {
                type_path,
                name,
                args,
            } => {
                self.push(&type_path.dotted_colons());
                self.push("::");
                self.push(name);
                self.push("(");
                self.comma_exprs(args);
                self.push(")");
            }
            ExprKind::FieldAccess { recv, name } => {
                self.operand(recv);
                self.push(".");
                self.push(name);
            }
            ExprKind::SafeAccess { recv, name } => {
                self.operand(recv);
                self.push("?.");
                self.push(name);
            }
            ExprKind::Index { recv, index } => {
                self.operand(recv);
                self.push("[");
                self.expr(index);
                self.push("]");
            }
            ExprKind::Block(b) => self.block(b),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.push("if ");
                self.expr(cond);
                self.push(" ");
                self.block(then_branch);
                if let Some(els) = else_branch {
                    self.push(" else ");
                    self.expr(els);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.push("match ");
                self.expr(scrutinee);
                self.push(" {");
                self.indent += 1;
                for arm in arms {
                    self.line();
                    self.pattern(&arm.pattern);
                    self.push(" => ");
                    self.expr(&arm.body);
                    self.push(",");
                }
                self.indent -= 1;
                self.line();
                self.push("}");
            }
            ExprKind::For {
                binding,
                iterable,
                body,
            } => {
                self.push("for ");
                self.pattern(binding);
                self.push(" in ");
                self.expr(iterable);
                self.push(" ");
                self.block(body);
            }
            ExprKind::While { cond, body } => {
                self.push("while ");
                self.expr(cond);
                self.push(" ");
                self.block(body);
            }
            ExprKind::Lambda {
                params,
                return_type,
                body,
            } => {
                if params.is_empty() {
                    self.push("||");
                } else {
                    self.push("|");
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.push(&p.name);
                        if let Some(t) = &p.ty {
                            self.push(": ");
                            self.ty(t);
                        }
                    }
                    self.push("|");
                }
                if let Some(r) = return_type {
                    self.push(" -> ");
                    self.ty(r);
                }
                self.push(" ");
                self.expr(body);
            }
            ExprKind::Return(value) => {
                self.push("return");
                if let Some(v) = value {
                    self.push(" ");
                    self.expr(v);
                }
            }
            ExprKind::Break => self.push("break"),
            ExprKind::Continue => self.push("continue"),
            ExprKind::Await(inner) => {
                self.operand(inner);
                self.push(".await");
            }
            ExprKind::Throw(inner) => {
                self.push("throw ");
                self.expr(inner);
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                self.push("try ");
                self.block(body);
                for c in catches {
                    self.push(" catch (");
                    self.pattern(&c.pattern);
                    self.push(") ");
                    self.block(&c.body);
                }
                if let Some(f) = finally {
                    self.push(" finally ");
                    self.block(f);
                }
            }
            ExprKind::Concurrent { bindings } => {
                self.push("concurrent { ");
                for (i, b) in bindings.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push("let ");
                    self.push(&b.name);
                    self.push(" = ");
                    self.expr(&b.init);
                }
                self.push(" }");
            }
            ExprKind::Race { clauses } => {
                self.push("race { ");
                for (i, c) in clauses.iter().enumerate() {
                    if i > 0 {
                        self.push("; ");
                    }
                    self.expr(c);
                }
                self.push(" }");
            }
            ExprKind::Timeout { duration, body } => {
                self.push("timeout(");
                self.expr(duration);
                self.push(") ");
                self.block(body);
            }
            ExprKind::With { args, body } => {
                self.push("with (");
                self.comma_exprs(args);
                self.push(") ");
                self.block(body);
            }
            ExprKind::New { ty, args } => {
                self.push("new ");
                self.ty(ty);
                self.push("(");
                self.comma_exprs(args);
                self.push(")");
            }
            ExprKind::StructLit { path, fields } => {
                self.push(&path.dotted_colons());
                self.push(" { ");
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(name);
                    self.push(": ");
                    self.expr(value);
                }
                self.push(" }");
            }
            ExprKind::ArrayLit(elems) => {
                self.push("[");
                self.comma_exprs(elems);
                self.push("]");
            }
            ExprKind::MapLit(entries) => {
                if entries.is_empty() {
                    self.push("[:]");
                } else {
                    self.push("[");
                    for (i, (k, v)) in entries.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.expr(k);
                        self.push(": ");
                        self.expr(v);
                    }
                    self.push("]");
                }
            }
            ExprKind::TupleLit(elems) => {
                self.push("(");
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.expr(e);
                }
                if elems.len() == 1 {
                    self.push(",");
                }
                self.push(")");
            }
            ExprKind::Cast { expr, ty } => {
                self.push("(");
                self.expr(expr);
                self.push(" as ");
                self.ty(ty);
                self.push(")");
            }
            ExprKind::TypeCheck { expr, ty } => {
                self.push("(");
                self.expr(expr);
                self.push(" is ");
                self.ty(ty);
                self.push(")");
            }
            ExprKind::Coalesce { lhs, rhs } => {
                self.push("(");
                self.expr(lhs);
                self.push(" ?? ");
                self.expr(rhs);
                self.push(")");
            }
            ExprKind::Elvis { lhs, rhs } => {
                self.push("(");
                self.expr(lhs);
                self.push(" ?: ");
                self.expr(rhs);
                self.push(")");
            }
            ExprKind::Range { lo, hi, inclusive } => {
                self.push("(");
                self.expr(lo);
                self.push(if *inclusive { "..=" } else { ".." });
                self.expr(hi);
                self.push(")");
            }
            ExprKind::ForceUnwrap(inner) => {
                self.operand(inner);
                self.push("!!");
            }
            ExprKind::Unwrap(inner) => {
                self.operand(inner);
                self.push("?");
            }
            ExprKind::Assignment { target, value } => {
                self.push("(");
                self.expr(target);
                self.push(" = ");
                self.expr(value);
                self.push(")");
            }
            ExprKind::CompoundAssignment { op, target, value } => {
                self.push("(");
                self.expr(target);
                self.push(" ");
                self.push(op.symbol());
                self.push("= ");
                self.expr(value);
                self.push(")");
            }
            ExprKind::Error => self.push("<error>"),
        }
    }

    fn literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Int(v) => self.push(&v.to_string()),
            Literal::Float(v) => self.push(&format!("{v:?}")),
            Literal::Str(s) => {
                self.push("\"");
                self.push(&escape_str(s));
                self.push("\"");
            }
            Literal::Char(c) => {
                self.push("'");
                match c {
                    '\n' => self.push("\\n"),
                    '\t' => self.push("\\t"),
                    '\r' => self.push("\\r"),
                    '\\' => self.push("\\\\"),
                    '\'' => self.push("\\'"),
                    other => self.out.push(*other),
                }
                self.push("'");
            }
            Literal::Bool(true) => self.push("true"),
            Literal::Bool(false) => self.push("false"),
            Literal::None => self.push("none"),
        }
    }

    // ── Patterns ─────────────────────────────────────────────────────

    fn pattern(&mut self, p: &Pattern) {
        match &p.kind {
            PatternKind::Literal(lit) => self.literal(lit),
            PatternKind::Binding { name, mutable, ty } => {
                if *mutable {
                    self.push("mut ");
                }
                self.push(name);
                if let Some(t) = ty {
                    self.push(": ");
                    self.ty(t);
                }
            }
            PatternKind::Struct { path, fields, rest } => {
                self.push(&path.dotted_colons());
                self.push(" { ");
                for (i, (name, sub)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.push(name);
                    if let Some(s) = sub {
                        self.push(": ");
                        self.pattern(s);
                    }
                }
                if *rest {
                    if !fields.is_empty() {
                        self.push(", ");
                    }
                    self.push("..");
                }
                self.push(" }");
            }
            PatternKind::TupleStruct { path, elems } => {
                self.push(&path.dotted_colons());
                if !elems.is_empty() {
                    self.push("(");
                    for (i, e) in elems.iter().enumerate() {
                        if i > 0 {
                            self.push(", ");
                        }
                        self.pattern(e);
                    }
                    self.push(")");
                }
            }
            PatternKind::Tuple(elems) => {
                self.push("(");
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.pattern(e);
                }
                self.push(")");
            }
            PatternKind::Array {
                prefix,
                rest,
                suffix,
            } => {
                self.push("[");
                let mut first = true;
                for e in prefix {
                    if !first {
                        self.push(", ");
                    }
                    first = false;
                    self.pattern(e);
                }
                if let Some(name) = rest {
                    if !first {
                        self.push(", ");
                    }
                    first = false;
                    self.push("..");
                    if let Some(n) = name {
                        self.push(n);
                    }
                }
                for e in suffix {
                    if !first {
                        self.push(", ");
                    }
                    first = false;
                    self.pattern(e);
                }
                self.push("]");
            }
            PatternKind::Range { lo, hi, inclusive } => {
                self.literal(lo);
                self.push(if *inclusive { "..=" } else { ".." });
                self.literal(hi);
            }
            PatternKind::Wildcard => self.push("_"),
            PatternKind::Or(alts) => {
                for (i, a) in alts.iter().enumerate() {
                    if i > 0 {
                        self.push(" | ");
                    }
                    self.pattern(a);
                }
            }
            PatternKind::Guard { inner, cond } => {
                self.pattern(inner);
                self.push(" when ");
                self.expr(cond);
            }
            PatternKind::Error => self.push("_"),
        }
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

fn escape_interp(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            other => out.push(other),
        }
    }
    out
}
