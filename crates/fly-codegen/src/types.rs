//! Mapping from semantic types to VM-level types.
//!
//! Drives descriptor selection, load/store/return opcode choice, slot
//! widths, and boxing at primitive/reference boundaries. `Float` maps to
//! the VM's 64-bit floating type, so there is no 32-bit float category
//! here at all.

use fly_typeck::resolver::TypeResolver;
use fly_typeck::ty::{PrimTy, Ty};

use crate::bytecode::{self, CodeBuffer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JvmType {
    Int,
    Long,
    Double,
    Boolean,
    Char,
    Byte,
    Short,
    /// Internal class name, e.g. `java/lang/String`.
    Reference(String),
    Array(Box<JvmType>),
    Void,
}

impl JvmType {
    pub fn object() -> JvmType {
        JvmType::Reference("java/lang/Object".to_string())
    }

    pub fn string() -> JvmType {
        JvmType::Reference("java/lang/String".to_string())
    }

    pub fn from_ty(ty: &Ty, resolver: &TypeResolver<'_>) -> JvmType {
        match ty {
            Ty::Prim(PrimTy::Int) => JvmType::Int,
            Ty::Prim(PrimTy::Long) => JvmType::Long,
            Ty::Prim(PrimTy::Float) | Ty::Prim(PrimTy::Double) => JvmType::Double,
            Ty::Prim(PrimTy::Bool) => JvmType::Boolean,
            Ty::Prim(PrimTy::Char) => JvmType::Char,
            Ty::Prim(PrimTy::Byte) => JvmType::Byte,
            Ty::Prim(PrimTy::Short) => JvmType::Short,
            Ty::Prim(PrimTy::Unit) => JvmType::Void,
            Ty::Str => JvmType::string(),
            Ty::Named { .. } => JvmType::Reference(resolver.internal_name_of(ty)),
            // Optionals erase to the nullable boxed form.
            Ty::Optional(inner) => JvmType::from_ty(inner, resolver).boxed(),
            Ty::Array(elem) => JvmType::Array(Box::new(JvmType::from_ty(elem, resolver))),
            Ty::Map(_, _) => JvmType::Reference("java/util/Map".to_string()),
            Ty::Fun(params, _) => {
                JvmType::Reference(format!("fly/runtime/Function{}", params.len()))
            }
            Ty::Tuple(elems) if elems.is_empty() => JvmType::Void,
            Ty::Tuple(_) => JvmType::Reference("fly/runtime/Tuple".to_string()),
            Ty::Union(_, _) | Ty::Intersection(_, _) | Ty::Param(_) => JvmType::object(),
            Ty::Never => JvmType::Void,
            Ty::Var(_) | Ty::Error => JvmType::object(),
        }
    }

    pub fn descriptor(&self) -> String {
        match self {
            JvmType::Int => "I".to_string(),
            JvmType::Long => "J".to_string(),
            JvmType::Double => "D".to_string(),
            JvmType::Boolean => "Z".to_string(),
            JvmType::Char => "C".to_string(),
            JvmType::Byte => "B".to_string(),
            JvmType::Short => "S".to_string(),
            JvmType::Reference(internal) => format!("L{internal};"),
            JvmType::Array(elem) => format!("[{}", elem.descriptor()),
            JvmType::Void => "V".to_string(),
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            JvmType::Reference(_) | JvmType::Array(_) | JvmType::Void
        )
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, JvmType::Long | JvmType::Double)
    }

    /// Slots occupied in the locals array / operand stack.
    pub fn width(&self) -> u16 {
        if self.is_wide() {
            2
        } else {
            1
        }
    }

    pub fn stack_effect(&self) -> i32 {
        match self {
            JvmType::Void => 0,
            t if t.is_wide() => 2,
            _ => 1,
        }
    }

    pub fn load_op(&self) -> u8 {
        match self {
            JvmType::Long => bytecode::LLOAD,
            JvmType::Double => bytecode::DLOAD,
            JvmType::Reference(_) | JvmType::Array(_) => bytecode::ALOAD,
            _ => bytecode::ILOAD,
        }
    }

    pub fn store_op(&self) -> u8 {
        match self {
            JvmType::Long => bytecode::LSTORE,
            JvmType::Double => bytecode::DSTORE,
            JvmType::Reference(_) | JvmType::Array(_) => bytecode::ASTORE,
            _ => bytecode::ISTORE,
        }
    }

    pub fn return_op(&self) -> u8 {
        match self {
            JvmType::Void => bytecode::RETURN,
            JvmType::Long => bytecode::LRETURN,
            JvmType::Double => bytecode::DRETURN,
            JvmType::Reference(_) | JvmType::Array(_) => bytecode::ARETURN,
            _ => bytecode::IRETURN,
        }
    }

    /// Array element load opcode for arrays of this element type.
    pub fn array_load_op(&self) -> u8 {
        match self {
            JvmType::Int => 0x2e,
            JvmType::Long => 0x2f,
            JvmType::Double => 0x31,
            JvmType::Boolean | JvmType::Byte => 0x33,
            JvmType::Char => 0x34,
            JvmType::Short => 0x35,
            _ => bytecode::AALOAD,
        }
    }

    pub fn array_store_op(&self) -> u8 {
        match self {
            JvmType::Int => 0x4f,
            JvmType::Long => 0x50,
            JvmType::Double => 0x52,
            JvmType::Boolean | JvmType::Byte => 0x54,
            JvmType::Char => 0x55,
            JvmType::Short => 0x56,
            _ => bytecode::AASTORE,
        }
    }

    /// The boxed counterpart of a primitive; references box to themselves.
    pub fn boxed(&self) -> JvmType {
        match self.boxed_internal() {
            Some(internal) => JvmType::Reference(internal.to_string()),
            None => self.clone(),
        }
    }

    pub fn boxed_internal(&self) -> Option<&'static str> {
        Some(match self {
            JvmType::Int => "java/lang/Integer",
            JvmType::Long => "java/lang/Long",
            JvmType::Double => "java/lang/Double",
            JvmType::Boolean => "java/lang/Boolean",
            JvmType::Char => "java/lang/Character",
            JvmType::Byte => "java/lang/Byte",
            JvmType::Short => "java/lang/Short",
            _ => return None,
        })
    }

    fn unbox_method(&self) -> Option<(&'static str, &'static str)> {
        Some(match self {
            JvmType::Int => ("intValue", "()I"),
            JvmType::Long => ("longValue", "()J"),
            JvmType::Double => ("doubleValue", "()D"),
            JvmType::Boolean => ("booleanValue", "()Z"),
            JvmType::Char => ("charValue", "()C"),
            JvmType::Byte => ("byteValue", "()B"),
            JvmType::Short => ("shortValue", "()S"),
            _ => return None,
        })
    }

    /// The internal name used by `checkcast`/`instanceof`/`new`.
    pub fn internal_name(&self) -> String {
        match self {
            JvmType::Reference(internal) => internal.clone(),
            JvmType::Array(_) => self.descriptor(),
            other => other
                .boxed_internal()
                .unwrap_or("java/lang/Object")
                .to_string(),
        }
    }
}

/// Emit a boxing conversion when `value` is primitive, e.g.
/// `Integer.valueOf(I)Ljava/lang/Integer;`.
pub fn emit_box(code: &mut CodeBuffer, pool: &mut crate::classfile::ConstantPool, value: &JvmType) {
    let Some(boxed) = value.boxed_internal() else {
        return;
    };
    let descriptor = format!("({})L{boxed};", value.descriptor());
    let mref = pool.method_ref(boxed, "valueOf", &descriptor);
    // A wide primitive collapses from two slots to one reference.
    let effect = 1 - value.stack_effect();
    code.op(bytecode::INVOKESTATIC, effect);
    code.u16_operand(mref);
}

/// Emit checkcast-to-boxed + `xxxValue()` when `target` is primitive.
pub fn emit_unbox(
    code: &mut CodeBuffer,
    pool: &mut crate::classfile::ConstantPool,
    target: &JvmType,
) {
    let (Some(boxed), Some((method, descriptor))) =
        (target.boxed_internal(), target.unbox_method())
    else {
        return;
    };
    let class = pool.class(boxed);
    code.op(bytecode::CHECKCAST, 0);
    code.u16_operand(class);
    let mref = pool.method_ref(boxed, method, descriptor);
    let effect = target.stack_effect() - 1;
    code.op(bytecode::INVOKEVIRTUAL, effect);
    code.u16_operand(mref);
}

/// Emit a reference downcast when `target` is a reference type other than
/// Object.
pub fn emit_checkcast(
    code: &mut CodeBuffer,
    pool: &mut crate::classfile::ConstantPool,
    target: &JvmType,
) {
    match target {
        JvmType::Reference(internal) if internal != "java/lang/Object" => {
            let class = pool.class(internal);
            code.op(bytecode::CHECKCAST, 0);
            code.u16_operand(class);
        }
        JvmType::Array(_) => {
            let class = pool.class(&target.descriptor());
            code.op(bytecode::CHECKCAST, 0);
            code.u16_operand(class);
        }
        _ => {}
    }
}

/// Numeric widening along Int → Long → Float/Double.
pub fn emit_widen(code: &mut CodeBuffer, from: &JvmType, to: &JvmType) {
    match (from, to) {
        (JvmType::Int | JvmType::Byte | JvmType::Short | JvmType::Char, JvmType::Long) => {
            code.op(bytecode::I2L, 1);
        }
        (JvmType::Int | JvmType::Byte | JvmType::Short | JvmType::Char, JvmType::Double) => {
            code.op(bytecode::I2D, 1);
        }
        (JvmType::Long, JvmType::Double) => {
            code.op(bytecode::L2D, 0);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fly_common::class_env::EmptyClassEnvironment;

    #[test]
    fn float_maps_to_double_descriptor() {
        let env = EmptyClassEnvironment;
        let resolver = TypeResolver::new(&env, vec!["demo".into()]);
        let t = JvmType::from_ty(&Ty::float(), &resolver);
        assert_eq!(t, JvmType::Double);
        assert_eq!(t.descriptor(), "D");
        assert!(t.is_wide());
    }

    #[test]
    fn optional_int_erases_to_boxed_integer() {
        let env = EmptyClassEnvironment;
        let resolver = TypeResolver::new(&env, vec!["demo".into()]);
        let t = JvmType::from_ty(&Ty::optional(Ty::int()), &resolver);
        assert_eq!(t, JvmType::Reference("java/lang/Integer".to_string()));
    }

    #[test]
    fn array_descriptors_nest() {
        let env = EmptyClassEnvironment;
        let resolver = TypeResolver::new(&env, vec!["demo".into()]);
        let t = JvmType::from_ty(
            &Ty::Array(Box::new(Ty::Array(Box::new(Ty::int())))),
            &resolver,
        );
        assert_eq!(t.descriptor(), "[[I");
    }

    #[test]
    fn opcode_selection_per_category() {
        assert_eq!(JvmType::Int.load_op(), bytecode::ILOAD);
        assert_eq!(JvmType::Double.load_op(), bytecode::DLOAD);
        assert_eq!(JvmType::string().load_op(), bytecode::ALOAD);
        assert_eq!(JvmType::Long.return_op(), bytecode::LRETURN);
        assert_eq!(JvmType::Void.return_op(), bytecode::RETURN);
    }
}
