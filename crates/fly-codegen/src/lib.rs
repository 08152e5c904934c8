//! Class-file code generation for the Flylang compiler.
//!
//! Consumes a semantically validated [`CompilationUnit`] plus the analysis
//! side tables and returns a map from fully-qualified internal class name
//! (`a/b/C`, nested `a/b/Outer$Inner`) to serialized class bytes.
//!
//! Lowering overview:
//!
//! - `module a::b::c` → VM package `a/b/c`; every emitted class carries it.
//! - classes/interfaces/traits/protocols → one class file each; nested
//!   declarations emit sibling `Outer$Inner` files.
//! - struct/spark → immutable value classes: private final fields, an
//!   all-fields constructor, getters, `equals`/`hashCode`/`toString`, and
//!   per-field `withX` copy methods (sparks add validation and update
//!   hooks, computed properties, and user methods).
//! - data → abstract base plus one final `Base$Variant` subclass per
//!   variant; enums lower the same way with fieldless variants.
//! - exceptions → subclasses of the declared superclass (the root
//!   exception type by default) with the standard constructors.
//! - top-level functions → static methods of the synthetic module class
//!   `<pkg>/Module`.
//! - `impl`/`extend` methods → static helper classes dispatched at call
//!   sites (receiver passed as first argument).
//! - async/lambdas → synthetic `fly/runtime/FunctionN` classes; an async
//!   body is submitted to `fly/runtime/Executor.spawn` and its method
//!   returns the runtime future.
//!
//! Generics are erased: every generic slot is reference-typed and
//! primitives box at the boundary. Codegen assumes semantic analysis
//! passed; anything that still fails here is reported as an internal
//! error (`CG999`) and is fatal for the file only.

use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Phase};
use fly_common::span::SourceSpan;
use fly_parser::ast::{
    ClassDecl, CompilationUnit, DataDecl, EnumDecl, ExceptionDecl, FunctionDecl, NodeId,
    SparkDecl, StructDecl, TopDecl, TraitDecl,
};
use fly_typeck::resolver::TypeResolver;
use fly_typeck::ty::Ty;
use fly_typeck::{Analysis, FieldSig, FnSig, TypeDefKind};
use rustc_hash::FxHashMap;

pub mod bytecode;
pub mod classfile;
mod expr;
pub mod types;

use classfile::{
    ClassBuilder, CodeAttribute, MethodDef, ACC_ABSTRACT, ACC_FINAL, ACC_INTERFACE,
    ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC, ACC_SUPER, ACC_SYNTHETIC,
};
use types::JvmType;

pub use classfile::{read_class, split_method_descriptor, ReadError};

/// The root of the exception hierarchy generated `exception` types extend
/// by default.
pub const ROOT_EXCEPTION: &str = "java/lang/RuntimeException";
const OBJECT: &str = "java/lang/Object";

#[derive(Debug, Clone, Default)]
pub struct CodegenOptions {
    /// Emit `LineNumberTable`s (per-statement line fidelity).
    pub emit_debug_info: bool,
    /// Source file name recorded in every emitted class.
    pub source_file: String,
}

/// Generate class files for a validated unit. The returned map keys are
/// internal names with `/` separators.
pub fn generate(
    unit: &CompilationUnit,
    analysis: &Analysis,
    resolver: &TypeResolver<'_>,
    options: &CodegenOptions,
    reporter: &mut DiagnosticReporter,
) -> FxHashMap<String, Vec<u8>> {
    let package = resolver.package_internal();
    let module_class = if package.is_empty() {
        "Module".to_string()
    } else {
        format!("{package}/Module")
    };

    let mut ctx = Ctx {
        analysis,
        resolver,
        options,
        reporter,
        package,
        module_class,
        classes: FxHashMap::default(),
        synth_counter: 0,
    };

    // Top-level functions collect into the module class.
    let top_fns: Vec<&FunctionDecl> = unit
        .decls
        .iter()
        .filter_map(|d| match d {
            TopDecl::Function(f) => Some(f),
            _ => None,
        })
        .collect();
    if !top_fns.is_empty() {
        emit_module_class(&mut ctx, &top_fns);
    }

    for decl in &unit.decls {
        emit_decl(&mut ctx, decl, None);
    }

    ctx.classes
}

/// Shared, mutable codegen state for one unit.
pub(crate) struct Ctx<'a, 'env> {
    pub analysis: &'a Analysis,
    pub resolver: &'a TypeResolver<'env>,
    pub options: &'a CodegenOptions,
    pub reporter: &'a mut DiagnosticReporter,
    pub package: String,
    pub module_class: String,
    pub classes: FxHashMap<String, Vec<u8>>,
    pub synth_counter: u32,
}

impl<'a, 'env> Ctx<'a, 'env> {
    pub fn internal_error(&mut self, message: String, span: &SourceSpan) {
        self.reporter.report(
            Diagnostic::error("CG999", format!("internal codegen error: {message}"), Phase::Codegen)
                .with_span(span.clone()),
        );
    }

    /// Type of an analyzed expression; Error if the table misses.
    pub fn ty_of(&self, id: NodeId) -> Ty {
        self.analysis.types.get(&id).cloned().unwrap_or(Ty::Error)
    }

    pub fn jty_of(&self, id: NodeId) -> JvmType {
        JvmType::from_ty(&self.ty_of(id), self.resolver)
    }

    pub fn jty(&self, ty: &Ty) -> JvmType {
        JvmType::from_ty(ty, self.resolver)
    }

    /// Internal name of a locally declared type.
    pub fn internal_of(&self, simple_name: &str) -> String {
        match self.resolver.resolve(simple_name) {
            Ok(r) => r.internal,
            Err(_) => {
                if self.package.is_empty() {
                    simple_name.to_string()
                } else {
                    format!("{}/{}", self.package, simple_name)
                }
            }
        }
    }

    pub fn variant_internal(&self, owner: &str, variant: &str) -> String {
        format!("{}${variant}", self.internal_of(owner))
    }

    pub fn fresh_synthetic(&mut self, base: &str) -> String {
        self.synth_counter += 1;
        format!("{base}$Lambda{}", self.synth_counter)
    }

    pub fn finish_class(&mut self, builder: ClassBuilder) {
        let name = builder.this_class().to_string();
        self.classes.insert(name, builder.build());
    }

    fn new_builder(&self, access: u16, internal: &str, super_internal: &str) -> ClassBuilder {
        let mut b = ClassBuilder::new(access, internal, super_internal);
        if !self.options.source_file.is_empty() {
            b.set_source_file(&self.options.source_file);
        }
        b
    }

    /// Method descriptor for a signature; async methods return the runtime
    /// future type.
    pub fn method_descriptor(&self, sig: &FnSig) -> String {
        let mut d = String::from("(");
        for p in &sig.params {
            d.push_str(&self.jty(p).descriptor());
        }
        d.push(')');
        if sig.is_async {
            d.push_str("Lfly/runtime/Future;");
        } else {
            d.push_str(&self.jty(&sig.ret).descriptor());
        }
        d
    }
}

// ── Declaration dispatch ─────────────────────────────────────────────

fn emit_decl(ctx: &mut Ctx<'_, '_>, decl: &TopDecl, outer: Option<&str>) {
    match decl {
        TopDecl::Class(c) | TopDecl::Context(c) | TopDecl::Supervisor(c) | TopDecl::Flow(c) => {
            emit_class(ctx, c, outer)
        }
        TopDecl::Interface(i) => {
            let internal = nested_internal(ctx, &i.name, outer);
            let mut b = ctx.new_builder(
                ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT,
                &internal,
                OBJECT,
            );
            for s in &i.supers {
                if let Some(name) = s.simple_name() {
                    let iface = ctx.internal_of(name);
                    b.add_interface(&iface);
                }
            }
            for m in &i.methods {
                emit_abstract_or_default(ctx, &mut b, &internal, m);
            }
            ctx.finish_class(b);
        }
        TopDecl::Trait(t) | TopDecl::Protocol(t) => emit_trait(ctx, t, outer),
        TopDecl::Enum(e) => emit_enum(ctx, e, outer),
        TopDecl::Data(d) => emit_data(ctx, d, outer),
        TopDecl::Struct(s) => emit_struct(ctx, s, outer),
        TopDecl::Spark(s) => emit_spark(ctx, s, outer),
        TopDecl::Exception(e) => emit_exception(ctx, e, outer),
        TopDecl::Impl(i) => {
            let type_name = i
                .self_ty
                .simple_name()
                .unwrap_or("Unknown")
                .to_string();
            let trait_part = i
                .trait_ref
                .as_ref()
                .and_then(|t| t.simple_name())
                .unwrap_or("Inherent");
            let internal = format!(
                "{}$impl${trait_part}",
                ctx.internal_of(&type_name)
            );
            emit_static_helper_class(ctx, &internal, &i.methods, impl_self_ty(ctx, &i.self_ty));
        }
        TopDecl::Extend(e) => {
            let type_name = e.target.simple_name().unwrap_or("Unknown").to_string();
            let internal = format!("{}$ext", ctx.internal_of(&type_name));
            emit_static_helper_class(ctx, &internal, &e.methods, impl_self_ty(ctx, &e.target));
        }
        // Type aliases and macros have no artifact; top-level functions were
        // collected into the module class.
        TopDecl::TypeAlias(_) | TopDecl::Macro(_) | TopDecl::Function(_) => {}
    }
}

fn impl_self_ty(ctx: &Ctx<'_, '_>, te: &fly_parser::ast::TypeExpr) -> Ty {
    use fly_parser::ast::{PrimKind, TypeKind};
    match &te.kind {
        TypeKind::Primitive(p) => match p {
            PrimKind::Int => Ty::int(),
            PrimKind::Long => Ty::Prim(fly_typeck::ty::PrimTy::Long),
            PrimKind::Float => Ty::float(),
            PrimKind::Double => Ty::Prim(fly_typeck::ty::PrimTy::Double),
            PrimKind::Bool => Ty::bool(),
            PrimKind::Char => Ty::Prim(fly_typeck::ty::PrimTy::Char),
            PrimKind::Byte => Ty::Prim(fly_typeck::ty::PrimTy::Byte),
            PrimKind::Short => Ty::Prim(fly_typeck::ty::PrimTy::Short),
            PrimKind::Str => Ty::Str,
            PrimKind::Void | PrimKind::Unit => Ty::unit(),
        },
        _ => te
            .simple_name()
            .map(Ty::named)
            .unwrap_or(Ty::Error),
    }
    .clone()
}

fn nested_internal(ctx: &Ctx<'_, '_>, name: &str, outer: Option<&str>) -> String {
    match outer {
        Some(o) => format!("{}${name}", ctx.internal_of(o)),
        None => ctx.internal_of(name),
    }
}

// ── Module class (top-level functions) ───────────────────────────────

fn emit_module_class(ctx: &mut Ctx<'_, '_>, fns: &[&FunctionDecl]) {
    let internal = ctx.module_class.clone();
    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER | ACC_FINAL, &internal, OBJECT);

    let mut meta = String::new();
    for f in fns {
        let Some(sig) = ctx.analysis.registry.functions.get(&f.name).cloned() else {
            continue;
        };
        let mut static_sig = sig;
        static_sig.is_static = true;
        expr::emit_function(ctx, &mut b, &internal, f, &static_sig, None, true);
        append_meta(&mut meta, f);
    }
    if !meta.is_empty() {
        b.set_meta(&meta);
    }
    ctx.finish_class(b);
}

fn append_meta(meta: &mut String, f: &FunctionDecl) {
    if f.effects.is_empty() && f.requires.is_none() {
        return;
    }
    if !meta.is_empty() {
        meta.push(';');
    }
    meta.push_str(&f.name);
    if !f.effects.is_empty() {
        meta.push_str(":with=");
        meta.push_str(&f.effects.join(","));
    }
    if f.requires.is_some() {
        meta.push_str(":requires");
    }
}

// ── Classes ──────────────────────────────────────────────────────────

fn emit_class(ctx: &mut Ctx<'_, '_>, c: &ClassDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &c.name, outer);
    let def = ctx.analysis.registry.types.get(&c.name).cloned();

    // Split declared supers into the superclass and interfaces: the first
    // resolved non-interface type is the superclass.
    let mut super_internal = OBJECT.to_string();
    let mut interfaces = Vec::new();
    if let Some(def) = &def {
        for s in &def.supers {
            if let Ty::Named { name, .. } = s {
                let resolved = ctx.internal_of(name);
                let is_interface = ctx
                    .analysis
                    .registry
                    .types
                    .get(name)
                    .map(|d| d.kind == TypeDefKind::Interface || d.kind.is_trait_like())
                    .or_else(|| {
                        ctx.resolver
                            .resolve(name)
                            .ok()
                            .and_then(|r| ctx.resolver.environment().lookup(&r.dotted))
                            .map(|info| info.is_interface)
                    })
                    .unwrap_or(false);
                if is_interface {
                    interfaces.push(resolved);
                } else if super_internal == OBJECT {
                    super_internal = resolved;
                } else {
                    interfaces.push(resolved);
                }
            }
        }
    }

    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER, &internal, &super_internal);
    for iface in &interfaces {
        b.add_interface(iface);
    }

    let fields: Vec<FieldSig> = def.as_ref().map(|d| d.fields.clone()).unwrap_or_default();
    for f in &fields {
        b.add_field(ACC_PUBLIC, &f.name, &ctx.jty(&f.ty).descriptor());
    }

    // Constructor assigning every declared field, in order.
    emit_all_fields_ctor(ctx, &mut b, &internal, &super_internal, &fields, None);

    let mut meta = String::new();
    let self_ty = Ty::named(&c.name);
    for m in &c.methods {
        let sig = def
            .as_ref()
            .and_then(|d| d.methods.iter().find(|s| s.name == m.name))
            .cloned();
        let Some(sig) = sig else { continue };
        expr::emit_function(ctx, &mut b, &internal, m, &sig, Some(&self_ty), false);
        append_meta(&mut meta, m);

        // The `fly` entry point also gets a static `main` springboard when
        // the class is default-constructible.
        if m.name == "fly" && fields.is_empty() && !sig.is_static {
            emit_main_springboard(ctx, &mut b, &internal);
        }
    }
    if !meta.is_empty() {
        b.set_meta(&meta);
    }

    ctx.finish_class(b);

    for nested in &c.nested {
        emit_decl(ctx, nested, Some(&c.name));
    }
}

/// `public static void main(String[] args) { new C().fly(args); }`
fn emit_main_springboard(ctx: &mut Ctx<'_, '_>, b: &mut ClassBuilder, internal: &str) {
    let mut code = bytecode::CodeBuffer::new();
    let class_idx = b.pool.class(internal);
    code.op(bytecode::NEW, 1);
    code.u16_operand(class_idx);
    code.op(bytecode::DUP, 1);
    let ctor = b.pool.method_ref(internal, "<init>", "()V");
    code.op(bytecode::INVOKESPECIAL, -1);
    code.u16_operand(ctor);
    code.op(bytecode::ALOAD, 1);
    code.u8_operand(0);
    let fly = b
        .pool
        .method_ref(internal, "fly", "([Ljava/lang/String;)V");
    code.op(bytecode::INVOKEVIRTUAL, -2);
    code.u16_operand(fly);
    code.op(bytecode::RETURN, 0);
    code.mark_unreachable();
    let (bytes, max_stack, exceptions, lines) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC | ACC_STATIC,
        name: "main".to_string(),
        descriptor: "([Ljava/lang/String;)V".to_string(),
        code: Some(CodeAttribute {
            max_stack,
            max_locals: 1,
            code: bytes,
            exception_table: exceptions,
            line_numbers: if ctx.options.emit_debug_info { lines } else { Vec::new() },
        }),
    });
}

/// A constructor taking every field in order, assigning each, then calling
/// `validate()` when requested (sparks).
fn emit_all_fields_ctor(
    ctx: &mut Ctx<'_, '_>,
    b: &mut ClassBuilder,
    internal: &str,
    super_internal: &str,
    fields: &[FieldSig],
    validate: Option<&str>,
) {
    let mut descriptor = String::from("(");
    for f in fields {
        descriptor.push_str(&ctx.jty(&f.ty).descriptor());
    }
    descriptor.push_str(")V");

    let mut code = bytecode::CodeBuffer::new();
    code.op(bytecode::ALOAD, 1);
    code.u8_operand(0);
    let super_ctor = b.pool.method_ref(super_internal, "<init>", "()V");
    code.op(bytecode::INVOKESPECIAL, -1);
    code.u16_operand(super_ctor);

    let mut slot: u16 = 1;
    let mut max_locals: u16 = 1;
    for f in fields {
        let jty = ctx.jty(&f.ty);
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        code.op(jty.load_op(), jty.stack_effect());
        code.u8_operand(slot as u8);
        let fref = b
            .pool
            .field_ref(internal, &f.name, &jty.descriptor());
        code.op(bytecode::PUTFIELD, -1 - jty.stack_effect());
        code.u16_operand(fref);
        slot += jty.width();
        max_locals = slot;
    }

    if let Some(validate_name) = validate {
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        let vref = b.pool.method_ref(internal, validate_name, "()V");
        code.op(bytecode::INVOKEVIRTUAL, -1);
        code.u16_operand(vref);
    }

    code.op(bytecode::RETURN, 0);
    code.mark_unreachable();
    let (bytes, max_stack, exceptions, _) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC,
        name: "<init>".to_string(),
        descriptor,
        code: Some(CodeAttribute {
            max_stack,
            max_locals: max_locals.max(1),
            code: bytes,
            exception_table: exceptions,
            line_numbers: Vec::new(),
        }),
    });
}

// ── Traits & interfaces ──────────────────────────────────────────────

fn emit_trait(ctx: &mut Ctx<'_, '_>, t: &TraitDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &t.name, outer);
    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT, &internal, OBJECT);
    for s in &t.supers {
        if let Some(name) = s.simple_name() {
            let iface = ctx.internal_of(name);
            b.add_interface(&iface);
        }
    }
    for m in &t.methods {
        emit_abstract_or_default(ctx, &mut b, &internal, m);
    }
    ctx.finish_class(b);
}

fn emit_abstract_or_default(
    ctx: &mut Ctx<'_, '_>,
    b: &mut ClassBuilder,
    internal: &str,
    m: &FunctionDecl,
) {
    let def = ctx
        .analysis
        .registry
        .types
        .values()
        .find_map(|d| {
            d.methods
                .iter()
                .find(|s| s.name == m.name && s.span == m.span)
        })
        .cloned();
    let Some(sig) = def else { return };
    if m.body.is_some() {
        // Interface default method.
        let self_ty = Ty::named("Object");
        expr::emit_function(ctx, b, internal, m, &sig, Some(&self_ty), false);
    } else {
        b.add_method(MethodDef {
            access: ACC_PUBLIC | ACC_ABSTRACT,
            name: m.name.clone(),
            descriptor: ctx.method_descriptor(&sig),
            code: None,
        });
    }
}

// ── Value classes: structs, sparks, data, enums ──────────────────────

fn emit_struct(ctx: &mut Ctx<'_, '_>, s: &StructDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &s.name, outer);
    let def = ctx.analysis.registry.types.get(&s.name).cloned();
    let fields = def.as_ref().map(|d| d.fields.clone()).unwrap_or_default();

    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER | ACC_FINAL, &internal, OBJECT);
    emit_value_members(ctx, &mut b, &internal, &fields, None, None);

    let self_ty = Ty::named(&s.name);
    for m in &s.methods {
        let sig = def
            .as_ref()
            .and_then(|d| d.methods.iter().find(|x| x.name == m.name))
            .cloned();
        if let Some(sig) = sig {
            expr::emit_function(ctx, &mut b, &internal, m, &sig, Some(&self_ty), false);
        }
    }
    ctx.finish_class(b);
}

fn emit_spark(ctx: &mut Ctx<'_, '_>, s: &SparkDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &s.name, outer);
    let def = ctx.analysis.registry.types.get(&s.name).cloned();
    let fields = def.as_ref().map(|d| d.fields.clone()).unwrap_or_default();
    let self_ty = Ty::named(&s.name);

    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER | ACC_FINAL, &internal, OBJECT);
    emit_value_members(
        ctx,
        &mut b,
        &internal,
        &fields,
        s.validate.as_ref().map(|_| "validate$"),
        Some((
            s.before_update.is_some(),
            s.after_update.is_some(),
        )),
    );

    // Validation and hook bodies become private zero-arg methods.
    let hook_blocks = [
        (s.validate.as_ref(), "validate$"),
        (s.before_update.as_ref(), "beforeUpdate$"),
        (s.after_update.as_ref(), "afterUpdate$"),
    ];
    for (block, name) in hook_blocks {
        if let Some(block) = block {
            expr::emit_block_method(ctx, &mut b, &internal, name, block, &self_ty, ACC_PRIVATE);
        }
    }

    // Computed properties are zero-arg methods.
    for c in &s.computed {
        let ret = def
            .as_ref()
            .and_then(|d| d.computed.iter().find(|f| f.name == c.name))
            .map(|f| f.ty.clone())
            .unwrap_or(Ty::Error);
        expr::emit_computed(ctx, &mut b, &internal, &c.name, &c.body, &ret, &self_ty);
    }

    for m in &s.methods {
        let sig = def
            .as_ref()
            .and_then(|d| d.methods.iter().find(|x| x.name == m.name))
            .cloned();
        if let Some(sig) = sig {
            expr::emit_function(ctx, &mut b, &internal, m, &sig, Some(&self_ty), false);
        }
    }
    ctx.finish_class(b);
}

/// Shared immutable-record surface: private final fields, all-fields
/// constructor, getters, `withX` copy methods, `equals`/`hashCode`/
/// `toString`.
fn emit_value_members(
    ctx: &mut Ctx<'_, '_>,
    b: &mut ClassBuilder,
    internal: &str,
    fields: &[FieldSig],
    validate: Option<&str>,
    hooks: Option<(bool, bool)>,
) {
    for f in fields {
        b.add_field(ACC_PRIVATE | ACC_FINAL, &f.name, &ctx.jty(&f.ty).descriptor());
    }
    emit_all_fields_ctor(ctx, b, internal, OBJECT, fields, validate);

    // Getters.
    for f in fields {
        let jty = ctx.jty(&f.ty);
        let mut code = bytecode::CodeBuffer::new();
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        let fref = b.pool.field_ref(internal, &f.name, &jty.descriptor());
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        code.op(jty.return_op(), -jty.stack_effect());
        code.mark_unreachable();
        let (bytes, max_stack, exceptions, _) = code.finish();
        b.add_method(MethodDef {
            access: ACC_PUBLIC,
            name: f.name.clone(),
            descriptor: format!("(){}", jty.descriptor()),
            code: Some(CodeAttribute {
                max_stack,
                max_locals: 1,
                code: bytes,
                exception_table: exceptions,
                line_numbers: Vec::new(),
            }),
        });
    }

    // withX copy methods: replace one field, re-running construction (and
    // with it any validation); sparks invoke the update hooks around it.
    let (before_hook, after_hook) = hooks.unwrap_or((false, false));
    for (i, f) in fields.iter().enumerate() {
        let new_jty = ctx.jty(&f.ty);
        let mut code = bytecode::CodeBuffer::new();

        if before_hook {
            code.op(bytecode::ALOAD, 1);
            code.u8_operand(0);
            let href = b.pool.method_ref(internal, "beforeUpdate$", "()V");
            code.op(bytecode::INVOKEVIRTUAL, -1);
            code.u16_operand(href);
        }

        let class_idx = b.pool.class(internal);
        code.op(bytecode::NEW, 1);
        code.u16_operand(class_idx);
        code.op(bytecode::DUP, 1);
        let mut ctor_desc = String::from("(");
        for other in fields {
            ctor_desc.push_str(&ctx.jty(&other.ty).descriptor());
        }
        ctor_desc.push_str(")V");
        let mut arg_width: i32 = 0;
        for (j, other) in fields.iter().enumerate() {
            let ojty = ctx.jty(&other.ty);
            if j == i {
                code.op(new_jty.load_op(), new_jty.stack_effect());
                code.u8_operand(1);
            } else {
                code.op(bytecode::ALOAD, 1);
                code.u8_operand(0);
                let fref = b.pool.field_ref(internal, &other.name, &ojty.descriptor());
                code.op(bytecode::GETFIELD, ojty.stack_effect() - 1);
                code.u16_operand(fref);
            }
            arg_width += ojty.stack_effect();
        }
        let ctor = b.pool.method_ref(internal, "<init>", &ctor_desc);
        code.op(bytecode::INVOKESPECIAL, -1 - arg_width);
        code.u16_operand(ctor);

        if after_hook {
            code.op(bytecode::DUP, 1);
            let href = b.pool.method_ref(internal, "afterUpdate$", "()V");
            code.op(bytecode::INVOKEVIRTUAL, -1);
            code.u16_operand(href);
        }

        code.op(bytecode::ARETURN, -1);
        code.mark_unreachable();
        let (bytes, max_stack, exceptions, _) = code.finish();
        let cap = capitalize(&f.name);
        b.add_method(MethodDef {
            access: ACC_PUBLIC,
            name: format!("with{cap}"),
            descriptor: format!("({})L{internal};", new_jty.descriptor()),
            code: Some(CodeAttribute {
                max_stack,
                max_locals: 1 + new_jty.width(),
                code: bytes,
                exception_table: exceptions,
                line_numbers: Vec::new(),
            }),
        });
    }

    emit_equals(ctx, b, internal, fields);
    emit_hash_code(ctx, b, internal, fields);
    emit_to_string(ctx, b, internal, fields);
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Value equality: same class and `Objects.equals` / primitive compare on
/// every field.
fn emit_equals(ctx: &mut Ctx<'_, '_>, b: &mut ClassBuilder, internal: &str, fields: &[FieldSig]) {
    let mut code = bytecode::CodeBuffer::new();
    let false_l = code.new_label();

    // if (!(other instanceof C)) return false;
    code.op(bytecode::ALOAD, 1);
    code.u8_operand(1);
    let class_idx = b.pool.class(internal);
    code.op(bytecode::INSTANCEOF, 0);
    code.u16_operand(class_idx);
    code.branch(bytecode::IFEQ, false_l, -1);

    // C that = (C) other;
    code.op(bytecode::ALOAD, 1);
    code.u8_operand(1);
    code.op(bytecode::CHECKCAST, 0);
    code.u16_operand(class_idx);
    code.op(bytecode::ASTORE, -1);
    code.u8_operand(2);

    for f in fields {
        let jty = ctx.jty(&f.ty);
        let fref = b.pool.field_ref(internal, &f.name, &jty.descriptor());
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(2);
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        match jty {
            JvmType::Long => {
                code.op(bytecode::LCMP, -3);
                code.branch(bytecode::IFNE, false_l, -1);
            }
            JvmType::Double => {
                code.op(bytecode::DCMPL, -3);
                code.branch(bytecode::IFNE, false_l, -1);
            }
            JvmType::Reference(_) | JvmType::Array(_) => {
                let eq = b.pool.method_ref(
                    "java/util/Objects",
                    "equals",
                    "(Ljava/lang/Object;Ljava/lang/Object;)Z",
                );
                code.op(bytecode::INVOKESTATIC, -1);
                code.u16_operand(eq);
                code.branch(bytecode::IFEQ, false_l, -1);
            }
            _ => {
                code.branch(bytecode::IF_ICMPNE, false_l, -2);
            }
        }
    }

    code.op(bytecode::ICONST_0 + 1, 1); // iconst_1
    code.op(bytecode::IRETURN, -1);
    code.mark_unreachable();
    code.bind(false_l);
    code.op(bytecode::ICONST_0, 1);
    code.op(bytecode::IRETURN, -1);
    code.mark_unreachable();

    let (bytes, max_stack, exceptions, _) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC,
        name: "equals".to_string(),
        descriptor: "(Ljava/lang/Object;)Z".to_string(),
        code: Some(CodeAttribute {
            max_stack,
            max_locals: 3,
            code: bytes,
            exception_table: exceptions,
            line_numbers: Vec::new(),
        }),
    });
}

/// `hashCode` via `Objects.hash(Object...)` over the boxed fields.
fn emit_hash_code(
    ctx: &mut Ctx<'_, '_>,
    b: &mut ClassBuilder,
    internal: &str,
    fields: &[FieldSig],
) {
    let mut code = bytecode::CodeBuffer::new();
    push_int(&mut code, &mut b.pool, fields.len() as i64);
    let object_idx = b.pool.class(OBJECT);
    code.op(bytecode::ANEWARRAY, 0);
    code.u16_operand(object_idx);
    for (i, f) in fields.iter().enumerate() {
        let jty = ctx.jty(&f.ty);
        code.op(bytecode::DUP, 1);
        push_int(&mut code, &mut b.pool, i as i64);
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        let fref = b.pool.field_ref(internal, &f.name, &jty.descriptor());
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        types::emit_box(&mut code, &mut b.pool, &jty);
        code.op(bytecode::AASTORE, -3);
    }
    let hash = b
        .pool
        .method_ref("java/util/Objects", "hash", "([Ljava/lang/Object;)I");
    code.op(bytecode::INVOKESTATIC, 0);
    code.u16_operand(hash);
    code.op(bytecode::IRETURN, -1);
    code.mark_unreachable();

    let (bytes, max_stack, exceptions, _) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC,
        name: "hashCode".to_string(),
        descriptor: "()I".to_string(),
        code: Some(CodeAttribute {
            max_stack,
            max_locals: 1,
            code: bytes,
            exception_table: exceptions,
            line_numbers: Vec::new(),
        }),
    });
}

/// `toString` as `Name(field=value, ...)` via StringBuilder.
fn emit_to_string(
    ctx: &mut Ctx<'_, '_>,
    b: &mut ClassBuilder,
    internal: &str,
    fields: &[FieldSig],
) {
    let simple = internal.rsplit(['/', '$']).next().unwrap_or(internal);
    let sb = "java/lang/StringBuilder";

    let mut code = bytecode::CodeBuffer::new();
    let sb_idx = b.pool.class(sb);
    code.op(bytecode::NEW, 1);
    code.u16_operand(sb_idx);
    code.op(bytecode::DUP, 1);
    let sb_ctor = b.pool.method_ref(sb, "<init>", "()V");
    code.op(bytecode::INVOKESPECIAL, -1);
    code.u16_operand(sb_ctor);

    let append_str = b
        .pool
        .method_ref(sb, "append", "(Ljava/lang/String;)Ljava/lang/StringBuilder;");
    let append_obj = b
        .pool
        .method_ref(sb, "append", "(Ljava/lang/Object;)Ljava/lang/StringBuilder;");

    let mut push_text = |code: &mut bytecode::CodeBuffer, b: &mut ClassBuilder, text: &str| {
        let s = b.pool.string(text);
        if s <= u8::MAX as u16 {
            code.op(bytecode::LDC, 1);
            code.u8_operand(s as u8);
        } else {
            code.op(bytecode::LDC_W, 1);
            code.u16_operand(s);
        }
        code.op(bytecode::INVOKEVIRTUAL, -1);
        code.u16_operand(append_str);
    };

    push_text(&mut code, b, &format!("{simple}("));
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            push_text(&mut code, b, ", ");
        }
        push_text(&mut code, b, &format!("{}=", f.name));
        let jty = ctx.jty(&f.ty);
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        let fref = b.pool.field_ref(internal, &f.name, &jty.descriptor());
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        types::emit_box(&mut code, &mut b.pool, &jty);
        code.op(bytecode::INVOKEVIRTUAL, -1);
        code.u16_operand(append_obj);
    }
    push_text(&mut code, b, ")");

    let to_string = b
        .pool
        .method_ref(sb, "toString", "()Ljava/lang/String;");
    code.op(bytecode::INVOKEVIRTUAL, 0);
    code.u16_operand(to_string);
    code.op(bytecode::ARETURN, -1);
    code.mark_unreachable();

    let (bytes, max_stack, exceptions, _) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC,
        name: "toString".to_string(),
        descriptor: "()Ljava/lang/String;".to_string(),
        code: Some(CodeAttribute {
            max_stack,
            max_locals: 1,
            code: bytes,
            exception_table: exceptions,
            line_numbers: Vec::new(),
        }),
    });
}

pub(crate) fn push_int(
    code: &mut bytecode::CodeBuffer,
    pool: &mut classfile::ConstantPool,
    value: i64,
) {
    if (-1..=5).contains(&value) {
        code.op((bytecode::ICONST_0 as i64 + value) as u8, 1);
    } else if (i8::MIN as i64..=i8::MAX as i64).contains(&value) {
        code.op(bytecode::BIPUSH, 1);
        code.u8_operand(value as u8);
    } else if (i16::MIN as i64..=i16::MAX as i64).contains(&value) {
        code.op(bytecode::SIPUSH, 1);
        code.u16_operand(value as u16);
    } else if (i32::MIN as i64..=i32::MAX as i64).contains(&value) {
        let idx = pool.integer(value as i32);
        if idx <= u8::MAX as u16 {
            code.op(bytecode::LDC, 1);
            code.u8_operand(idx as u8);
        } else {
            code.op(bytecode::LDC_W, 1);
            code.u16_operand(idx);
        }
    } else {
        let idx = pool.long(value);
        code.op(bytecode::LDC2_W, 2);
        code.u16_operand(idx);
    }
}

fn emit_enum(ctx: &mut Ctx<'_, '_>, e: &EnumDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &e.name, outer);
    emit_sum_base(ctx, &internal);
    for v in &e.variants {
        emit_variant_class(ctx, &internal, &v.name, &[]);
    }
}

fn emit_data(ctx: &mut Ctx<'_, '_>, d: &DataDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &d.name, outer);
    emit_sum_base(ctx, &internal);
    let def = ctx.analysis.registry.types.get(&d.name).cloned();
    for v in &d.variants {
        let fields = def
            .as_ref()
            .and_then(|t| t.variants.iter().find(|x| x.name == v.name))
            .map(|x| x.fields.clone())
            .unwrap_or_default();
        emit_variant_class(ctx, &internal, &v.name, &fields);
    }
}

/// The abstract base class of a sum type.
fn emit_sum_base(ctx: &mut Ctx<'_, '_>, internal: &str) {
    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER | ACC_ABSTRACT, internal, OBJECT);
    // Protected-equivalent no-arg constructor for the variant subclasses.
    let mut code = bytecode::CodeBuffer::new();
    code.op(bytecode::ALOAD, 1);
    code.u8_operand(0);
    let super_ctor = b.pool.method_ref(OBJECT, "<init>", "()V");
    code.op(bytecode::INVOKESPECIAL, -1);
    code.u16_operand(super_ctor);
    code.op(bytecode::RETURN, 0);
    code.mark_unreachable();
    let (bytes, max_stack, exceptions, _) = code.finish();
    b.add_method(MethodDef {
        access: ACC_PUBLIC,
        name: "<init>".to_string(),
        descriptor: "()V".to_string(),
        code: Some(CodeAttribute {
            max_stack,
            max_locals: 1,
            code: bytes,
            exception_table: exceptions,
            line_numbers: Vec::new(),
        }),
    });
    ctx.finish_class(b);
}

/// One final subclass per variant, participating in value equality.
fn emit_variant_class(ctx: &mut Ctx<'_, '_>, base: &str, variant: &str, fields: &[FieldSig]) {
    let internal = format!("{base}${variant}");
    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER | ACC_FINAL, &internal, base);
    for f in fields {
        b.add_field(ACC_PRIVATE | ACC_FINAL, &f.name, &ctx.jty(&f.ty).descriptor());
    }
    emit_all_fields_ctor(ctx, &mut b, &internal, base, fields, None);
    // Getters + value semantics, shared with structs.
    for f in fields {
        let jty = ctx.jty(&f.ty);
        let mut code = bytecode::CodeBuffer::new();
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        let fref = b.pool.field_ref(&internal, &f.name, &jty.descriptor());
        code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
        code.u16_operand(fref);
        code.op(jty.return_op(), -jty.stack_effect());
        code.mark_unreachable();
        let (bytes, max_stack, exceptions, _) = code.finish();
        b.add_method(MethodDef {
            access: ACC_PUBLIC,
            name: f.name.clone(),
            descriptor: format!("(){}", jty.descriptor()),
            code: Some(CodeAttribute {
                max_stack,
                max_locals: 1,
                code: bytes,
                exception_table: exceptions,
                line_numbers: Vec::new(),
            }),
        });
    }
    emit_equals(ctx, &mut b, &internal, fields);
    emit_hash_code(ctx, &mut b, &internal, fields);
    emit_to_string(ctx, &mut b, &internal, fields);
    ctx.finish_class(b);
}

// ── Exceptions ───────────────────────────────────────────────────────

fn emit_exception(ctx: &mut Ctx<'_, '_>, e: &ExceptionDecl, outer: Option<&str>) {
    let internal = nested_internal(ctx, &e.name, outer);
    let def = ctx.analysis.registry.types.get(&e.name).cloned();
    let super_internal = def
        .as_ref()
        .and_then(|d| d.supers.first())
        .and_then(|s| match s {
            Ty::Named { name, .. } => Some(ctx.internal_of(name)),
            _ => None,
        })
        .unwrap_or_else(|| ROOT_EXCEPTION.to_string());
    let fields = def.as_ref().map(|d| d.fields.clone()).unwrap_or_default();

    let mut b = ctx.new_builder(ACC_PUBLIC | ACC_SUPER, &internal, &super_internal);
    for f in &fields {
        b.add_field(ACC_PRIVATE | ACC_FINAL, &f.name, &ctx.jty(&f.ty).descriptor());
    }

    if fields.is_empty() {
        // The standard exception constructors, delegating to super.
        for (descriptor, args_effect) in [
            ("()V", 0i32),
            ("(Ljava/lang/String;)V", 1),
            ("(Ljava/lang/String;Ljava/lang/Throwable;)V", 2),
            ("(Ljava/lang/Throwable;)V", 1),
        ] {
            let mut code = bytecode::CodeBuffer::new();
            code.op(bytecode::ALOAD, 1);
            code.u8_operand(0);
            for i in 0..args_effect {
                code.op(bytecode::ALOAD, 1);
                code.u8_operand(1 + i as u8);
            }
            let super_ctor = b.pool.method_ref(&super_internal, "<init>", descriptor);
            code.op(bytecode::INVOKESPECIAL, -1 - args_effect);
            code.u16_operand(super_ctor);
            code.op(bytecode::RETURN, 0);
            code.mark_unreachable();
            let (bytes, max_stack, exceptions, _) = code.finish();
            b.add_method(MethodDef {
                access: ACC_PUBLIC,
                name: "<init>".to_string(),
                descriptor: descriptor.to_string(),
                code: Some(CodeAttribute {
                    max_stack,
                    max_locals: 1 + args_effect as u16,
                    code: bytes,
                    exception_table: exceptions,
                    line_numbers: Vec::new(),
                }),
            });
        }
    } else {
        // One constructor taking the declared fields; a leading String
        // field doubles as the exception message.
        let mut descriptor = String::from("(");
        for f in &fields {
            descriptor.push_str(&ctx.jty(&f.ty).descriptor());
        }
        descriptor.push_str(")V");

        let first_is_string = matches!(fields.first().map(|f| &f.ty), Some(Ty::Str));
        let mut code = bytecode::CodeBuffer::new();
        code.op(bytecode::ALOAD, 1);
        code.u8_operand(0);
        if first_is_string {
            code.op(bytecode::ALOAD, 1);
            code.u8_operand(1);
            let super_ctor =
                b.pool
                    .method_ref(&super_internal, "<init>", "(Ljava/lang/String;)V");
            code.op(bytecode::INVOKESPECIAL, -2);
            code.u16_operand(super_ctor);
        } else {
            let super_ctor = b.pool.method_ref(&super_internal, "<init>", "()V");
            code.op(bytecode::INVOKESPECIAL, -1);
            code.u16_operand(super_ctor);
        }

        let mut slot: u16 = 1;
        for f in &fields {
            let jty = ctx.jty(&f.ty);
            code.op(bytecode::ALOAD, 1);
            code.u8_operand(0);
            code.op(jty.load_op(), jty.stack_effect());
            code.u8_operand(slot as u8);
            let fref = b.pool.field_ref(&internal, &f.name, &jty.descriptor());
            code.op(bytecode::PUTFIELD, -1 - jty.stack_effect());
            code.u16_operand(fref);
            slot += jty.width();
        }
        code.op(bytecode::RETURN, 0);
        code.mark_unreachable();
        let (bytes, max_stack, exceptions, _) = code.finish();
        b.add_method(MethodDef {
            access: ACC_PUBLIC,
            name: "<init>".to_string(),
            descriptor,
            code: Some(CodeAttribute {
                max_stack,
                max_locals: slot,
                code: bytes,
                exception_table: exceptions,
                line_numbers: Vec::new(),
            }),
        });

        // Field getters.
        for f in &fields {
            let jty = ctx.jty(&f.ty);
            let mut code = bytecode::CodeBuffer::new();
            code.op(bytecode::ALOAD, 1);
            code.u8_operand(0);
            let fref = b.pool.field_ref(&internal, &f.name, &jty.descriptor());
            code.op(bytecode::GETFIELD, jty.stack_effect() - 1);
            code.u16_operand(fref);
            code.op(jty.return_op(), -jty.stack_effect());
            code.mark_unreachable();
            let (bytes, max_stack, exceptions, _) = code.finish();
            b.add_method(MethodDef {
                access: ACC_PUBLIC,
                name: f.name.clone(),
                descriptor: format!("(){}", jty.descriptor()),
                code: Some(CodeAttribute {
                    max_stack,
                    max_locals: 1,
                    code: bytes,
                    exception_table: exceptions,
                    line_numbers: Vec::new(),
                }),
            });
        }
    }

    ctx.finish_class(b);
}

// ── Impl/extension helper classes ────────────────────────────────────

/// Methods of `impl`/`extend` blocks become static helpers taking the
/// receiver as the first argument; call sites dispatch statically.
fn emit_static_helper_class(
    ctx: &mut Ctx<'_, '_>,
    internal: &str,
    methods: &[FunctionDecl],
    self_ty: Ty,
) {
    let mut b = ctx.new_builder(
        ACC_PUBLIC | ACC_SUPER | ACC_FINAL | ACC_SYNTHETIC,
        internal,
        OBJECT,
    );
    for m in methods {
        let sig = find_impl_sig(ctx, m);
        let Some(sig) = sig else { continue };
        expr::emit_impl_method(ctx, &mut b, internal, m, &sig, &self_ty);
    }
    ctx.finish_class(b);
}

fn find_impl_sig(ctx: &Ctx<'_, '_>, m: &FunctionDecl) -> Option<FnSig> {
    for imp in &ctx.analysis.registry.impls {
        if let Some(sig) = imp.methods.iter().find(|s| s.span == m.span) {
            return Some(sig.clone());
        }
    }
    for (_, methods) in &ctx.analysis.registry.extends {
        if let Some(sig) = methods.iter().find(|s| s.span == m.span) {
            return Some(sig.clone());
        }
    }
    None
}
