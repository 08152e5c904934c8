//! Class-file serialization and deserialization.
//!
//! Writes the target VM's binary class format: magic, constant pool, access
//! flags, fields, methods with `Code` attributes (and `LineNumberTable`
//! when debug info is requested), and a `SourceFile` attribute. The reader
//! recovers a [`ClassInfo`] from emitted bytes — enough for a driver to
//! re-load generated classes into a `ClassEnvironment`.

use fly_common::class_env::{ClassInfo, FieldInfo, MethodInfo};
use rustc_hash::FxHashMap;

// ── Access flags ─────────────────────────────────────────────────────

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

const MAGIC: u32 = 0xCAFE_BABE;
/// Class format major version (Java 8 level features only).
const MAJOR_VERSION: u16 = 52;

// ── Constant pool ────────────────────────────────────────────────────

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;

#[derive(Debug, Clone, PartialEq)]
enum CpEntry {
    Utf8(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Class(u16),
    Str(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
}

impl CpEntry {
    /// Long and Double occupy two constant-pool slots.
    fn width(&self) -> u16 {
        match self {
            CpEntry::Long(_) | CpEntry::Double(_) => 2,
            _ => 1,
        }
    }
}

/// A deduplicating constant pool builder. Indices are 1-based.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<CpEntry>,
    next_index: u16,
    utf8: FxHashMap<String, u16>,
    classes: FxHashMap<String, u16>,
    strings: FxHashMap<String, u16>,
    integers: FxHashMap<i32, u16>,
    longs: FxHashMap<i64, u16>,
    doubles: FxHashMap<u64, u16>,
    nats: FxHashMap<(u16, u16), u16>,
    refs: FxHashMap<(u8, u16, u16), u16>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            next_index: 1,
            ..Self::default()
        }
    }

    fn push(&mut self, entry: CpEntry) -> u16 {
        let index = self.next_index;
        self.next_index += entry.width();
        self.entries.push(entry);
        index
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        if let Some(&i) = self.utf8.get(text) {
            return i;
        }
        let i = self.push(CpEntry::Utf8(text.to_string()));
        self.utf8.insert(text.to_string(), i);
        i
    }

    /// A Class entry for an internal name (`a/b/C` or an array descriptor).
    pub fn class(&mut self, internal: &str) -> u16 {
        if let Some(&i) = self.classes.get(internal) {
            return i;
        }
        let name = self.utf8(internal);
        let i = self.push(CpEntry::Class(name));
        self.classes.insert(internal.to_string(), i);
        i
    }

    pub fn string(&mut self, value: &str) -> u16 {
        if let Some(&i) = self.strings.get(value) {
            return i;
        }
        let text = self.utf8(value);
        let i = self.push(CpEntry::Str(text));
        self.strings.insert(value.to_string(), i);
        i
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        if let Some(&i) = self.integers.get(&value) {
            return i;
        }
        let i = self.push(CpEntry::Integer(value));
        self.integers.insert(value, i);
        i
    }

    pub fn long(&mut self, value: i64) -> u16 {
        if let Some(&i) = self.longs.get(&value) {
            return i;
        }
        let i = self.push(CpEntry::Long(value));
        self.longs.insert(value, i);
        i
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let bits = value.to_bits();
        if let Some(&i) = self.doubles.get(&bits) {
            return i;
        }
        let i = self.push(CpEntry::Double(value));
        self.doubles.insert(bits, i);
        i
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let n = self.utf8(name);
        let d = self.utf8(descriptor);
        if let Some(&i) = self.nats.get(&(n, d)) {
            return i;
        }
        let i = self.push(CpEntry::NameAndType(n, d));
        self.nats.insert((n, d), i);
        i
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_FIELDREF, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_METHODREF, class, name, descriptor)
    }

    pub fn interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(TAG_INTERFACE_METHODREF, class, name, descriptor)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let c = self.class(class);
        let nat = self.name_and_type(name, descriptor);
        if let Some(&i) = self.refs.get(&(tag, c, nat)) {
            return i;
        }
        let entry = match tag {
            TAG_FIELDREF => CpEntry::FieldRef(c, nat),
            TAG_METHODREF => CpEntry::MethodRef(c, nat),
            _ => CpEntry::InterfaceMethodRef(c, nat),
        };
        let i = self.push(entry);
        self.refs.insert((tag, c, nat), i);
        i
    }

    fn write(&self, out: &mut Vec<u8>) {
        write_u16(out, self.next_index);
        for entry in &self.entries {
            match entry {
                CpEntry::Utf8(text) => {
                    out.push(TAG_UTF8);
                    let bytes = text.as_bytes();
                    write_u16(out, bytes.len() as u16);
                    out.extend_from_slice(bytes);
                }
                CpEntry::Integer(v) => {
                    out.push(TAG_INTEGER);
                    write_u32(out, *v as u32);
                }
                CpEntry::Long(v) => {
                    out.push(TAG_LONG);
                    out.extend_from_slice(&v.to_be_bytes());
                }
                CpEntry::Double(v) => {
                    out.push(TAG_DOUBLE);
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
                CpEntry::Class(name) => {
                    out.push(TAG_CLASS);
                    write_u16(out, *name);
                }
                CpEntry::Str(text) => {
                    out.push(TAG_STRING);
                    write_u16(out, *text);
                }
                CpEntry::FieldRef(c, nat) => {
                    out.push(TAG_FIELDREF);
                    write_u16(out, *c);
                    write_u16(out, *nat);
                }
                CpEntry::MethodRef(c, nat) => {
                    out.push(TAG_METHODREF);
                    write_u16(out, *c);
                    write_u16(out, *nat);
                }
                CpEntry::InterfaceMethodRef(c, nat) => {
                    out.push(TAG_INTERFACE_METHODREF);
                    write_u16(out, *c);
                    write_u16(out, *nat);
                }
                CpEntry::NameAndType(n, d) => {
                    out.push(TAG_NAME_AND_TYPE);
                    write_u16(out, *n);
                    write_u16(out, *d);
                }
            }
        }
    }
}

// ── Class structure ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ExceptionEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Constant-pool Class index; 0 catches everything.
    pub catch_type: u16,
}

#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionEntry>,
    /// (start_pc, line_number) pairs; emitted only when non-empty.
    pub line_numbers: Vec<(u16, u16)>,
}

#[derive(Debug)]
pub struct FieldDef {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug)]
pub struct MethodDef {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    /// `None` for abstract methods.
    pub code: Option<CodeAttribute>,
}

/// Builder for one class file.
#[derive(Debug)]
pub struct ClassBuilder {
    pub pool: ConstantPool,
    pub access: u16,
    this_class: String,
    super_class: String,
    interfaces: Vec<String>,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
    source_file: Option<String>,
    /// Effect/`requires` metadata, carried as a `FlyMeta` attribute for
    /// downstream consumers.
    meta: Option<String>,
}

impl ClassBuilder {
    pub fn new(access: u16, this_class: &str, super_class: &str) -> Self {
        Self {
            pool: ConstantPool::new(),
            access,
            this_class: this_class.to_string(),
            super_class: super_class.to_string(),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            source_file: None,
            meta: None,
        }
    }

    pub fn this_class(&self) -> &str {
        &self.this_class
    }

    pub fn super_class(&self) -> &str {
        &self.super_class
    }

    pub fn add_interface(&mut self, internal: &str) {
        self.interfaces.push(internal.to_string());
    }

    pub fn add_field(&mut self, access: u16, name: &str, descriptor: &str) {
        self.fields.push(FieldDef {
            access,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }

    pub fn add_method(&mut self, method: MethodDef) {
        self.methods.push(method);
    }

    pub fn set_source_file(&mut self, file: &str) {
        self.source_file = Some(file.to_string());
    }

    pub fn set_meta(&mut self, meta: &str) {
        self.meta = Some(meta.to_string());
    }

    /// Serialize to class-file bytes.
    pub fn build(mut self) -> Vec<u8> {
        // Intern everything the fixed sections reference before writing the
        // pool, which must serialize first.
        let this_idx = self.pool.class(&self.this_class);
        let super_idx = self.pool.class(&self.super_class);
        let iface_idx: Vec<u16> = self
            .interfaces
            .iter()
            .map(|i| self.pool.class(i))
            .collect();

        struct PreparedField {
            access: u16,
            name: u16,
            desc: u16,
        }
        let fields: Vec<PreparedField> = self
            .fields
            .iter()
            .map(|f| PreparedField {
                access: f.access,
                name: self.pool.utf8(&f.name),
                desc: self.pool.utf8(&f.descriptor),
            })
            .collect();

        struct PreparedMethod {
            access: u16,
            name: u16,
            desc: u16,
            code: Option<CodeAttribute>,
            code_attr: u16,
            lnt_attr: u16,
        }
        let code_attr_name = self.pool.utf8("Code");
        let lnt_attr_name = self.pool.utf8("LineNumberTable");
        let methods: Vec<PreparedMethod> = self
            .methods
            .iter()
            .map(|m| PreparedMethod {
                access: m.access,
                name: self.pool.utf8(&m.name),
                desc: self.pool.utf8(&m.descriptor),
                code: m.code.clone(),
                code_attr: code_attr_name,
                lnt_attr: lnt_attr_name,
            })
            .collect();

        let source_attr = self
            .source_file
            .as_ref()
            .map(|f| (self.pool.utf8("SourceFile"), self.pool.utf8(f)));
        let meta_attr = self
            .meta
            .as_ref()
            .map(|m| (self.pool.utf8("FlyMeta"), self.pool.utf8(m)));

        let mut out = Vec::new();
        write_u32(&mut out, MAGIC);
        write_u16(&mut out, 0); // minor
        write_u16(&mut out, MAJOR_VERSION);
        self.pool.write(&mut out);
        write_u16(&mut out, self.access);
        write_u16(&mut out, this_idx);
        write_u16(&mut out, super_idx);
        write_u16(&mut out, iface_idx.len() as u16);
        for i in iface_idx {
            write_u16(&mut out, i);
        }

        write_u16(&mut out, fields.len() as u16);
        for f in fields {
            write_u16(&mut out, f.access);
            write_u16(&mut out, f.name);
            write_u16(&mut out, f.desc);
            write_u16(&mut out, 0); // attributes
        }

        write_u16(&mut out, methods.len() as u16);
        for m in methods {
            write_u16(&mut out, m.access);
            write_u16(&mut out, m.name);
            write_u16(&mut out, m.desc);
            match m.code {
                None => write_u16(&mut out, 0),
                Some(code) => {
                    write_u16(&mut out, 1);
                    write_code_attribute(&mut out, m.code_attr, m.lnt_attr, &code);
                }
            }
        }

        let attr_count = source_attr.iter().count() + meta_attr.iter().count();
        write_u16(&mut out, attr_count as u16);
        for (name, value) in source_attr.into_iter().chain(meta_attr) {
            write_u16(&mut out, name);
            write_u32(&mut out, 2);
            write_u16(&mut out, value);
        }

        out
    }
}

fn write_code_attribute(out: &mut Vec<u8>, attr_name: u16, lnt_name: u16, code: &CodeAttribute) {
    let mut body = Vec::new();
    write_u16(&mut body, code.max_stack);
    write_u16(&mut body, code.max_locals);
    write_u32(&mut body, code.code.len() as u32);
    body.extend_from_slice(&code.code);
    write_u16(&mut body, code.exception_table.len() as u16);
    for e in &code.exception_table {
        write_u16(&mut body, e.start_pc);
        write_u16(&mut body, e.end_pc);
        write_u16(&mut body, e.handler_pc);
        write_u16(&mut body, e.catch_type);
    }
    if code.line_numbers.is_empty() {
        write_u16(&mut body, 0);
    } else {
        write_u16(&mut body, 1);
        write_u16(&mut body, lnt_name);
        write_u32(&mut body, 2 + 4 * code.line_numbers.len() as u32);
        write_u16(&mut body, code.line_numbers.len() as u16);
        for (pc, line) in &code.line_numbers {
            write_u16(&mut body, *pc);
            write_u16(&mut body, *line);
        }
    }

    write_u16(out, attr_name);
    write_u32(out, body.len() as u32);
    out.extend_from_slice(&body);
}

fn write_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

// ── Reader ───────────────────────────────────────────────────────────

/// Errors produced while parsing class bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    Truncated,
    BadMagic(u32),
    BadConstantTag(u8),
    BadIndex(u16),
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Truncated => write!(f, "class file is truncated"),
            ReadError::BadMagic(m) => write!(f, "bad magic 0x{m:08x}"),
            ReadError::BadConstantTag(t) => write!(f, "unknown constant tag {t}"),
            ReadError::BadIndex(i) => write!(f, "constant index {i} out of range"),
        }
    }
}

impl std::error::Error for ReadError {}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, ReadError> {
        let b = *self.bytes.get(self.pos).ok_or(ReadError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self) -> Result<u16, ReadError> {
        Ok(((self.u8()? as u16) << 8) | self.u8()? as u16)
    }

    fn u32(&mut self) -> Result<u32, ReadError> {
        Ok(((self.u16()? as u32) << 16) | self.u16()? as u32)
    }

    fn skip(&mut self, n: usize) -> Result<(), ReadError> {
        if self.pos + n > self.bytes.len() {
            return Err(ReadError::Truncated);
        }
        self.pos += n;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        if self.pos + n > self.bytes.len() {
            return Err(ReadError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[derive(Debug, Clone, Default)]
enum RawConstant {
    #[default]
    Empty,
    Utf8(String),
    Class(u16),
}

/// Parse emitted class bytes back into a [`ClassInfo`].
///
/// Only the structural surface is recovered (superclass, interfaces, member
/// names and descriptors); code attributes are skipped.
pub fn read_class(bytes: &[u8]) -> Result<ClassInfo, ReadError> {
    let mut r = Reader { bytes, pos: 0 };
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ReadError::BadMagic(magic));
    }
    r.u16()?; // minor
    r.u16()?; // major

    let count = r.u16()?;
    let mut constants: Vec<RawConstant> = vec![RawConstant::Empty; count as usize];
    let mut i = 1u16;
    while i < count {
        let tag = r.u8()?;
        match tag {
            TAG_UTF8 => {
                let len = r.u16()? as usize;
                let text = String::from_utf8_lossy(r.take(len)?).into_owned();
                constants[i as usize] = RawConstant::Utf8(text);
            }
            TAG_CLASS => {
                let name = r.u16()?;
                constants[i as usize] = RawConstant::Class(name);
            }
            TAG_STRING => {
                r.skip(2)?;
            }
            TAG_INTEGER => r.skip(4)?,
            TAG_LONG | TAG_DOUBLE => {
                r.skip(8)?;
                i += 1;
            }
            TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_NAME_AND_TYPE => {
                r.skip(4)?;
            }
            other => return Err(ReadError::BadConstantTag(other)),
        }
        i += 1;
    }

    let utf8_at = |idx: u16| -> Result<String, ReadError> {
        match constants.get(idx as usize) {
            Some(RawConstant::Utf8(s)) => Ok(s.clone()),
            _ => Err(ReadError::BadIndex(idx)),
        }
    };
    let class_at = |idx: u16| -> Result<String, ReadError> {
        match constants.get(idx as usize) {
            Some(RawConstant::Class(name)) => utf8_at(*name),
            _ => Err(ReadError::BadIndex(idx)),
        }
    };

    let access = r.u16()?;
    let this_class = class_at(r.u16()?)?;
    let super_idx = r.u16()?;
    let superclass = if super_idx == 0 {
        None
    } else {
        Some(class_at(super_idx)?.replace('/', "."))
    };

    let iface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(iface_count as usize);
    for _ in 0..iface_count {
        interfaces.push(class_at(r.u16()?)?.replace('/', "."));
    }

    let skip_attributes = |r: &mut Reader<'_>| -> Result<(), ReadError> {
        let n = r.u16()?;
        for _ in 0..n {
            r.u16()?; // name
            let len = r.u32()? as usize;
            r.skip(len)?;
        }
        Ok(())
    };

    let field_count = r.u16()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        let facc = r.u16()?;
        let name = utf8_at(r.u16()?)?;
        let descriptor = utf8_at(r.u16()?)?;
        skip_attributes(&mut r)?;
        fields.push(FieldInfo {
            name,
            descriptor,
            is_static: facc & ACC_STATIC != 0,
        });
    }

    let method_count = r.u16()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        let macc = r.u16()?;
        let name = utf8_at(r.u16()?)?;
        let descriptor = utf8_at(r.u16()?)?;
        skip_attributes(&mut r)?;
        let (params, ret) = split_method_descriptor(&descriptor);
        methods.push(MethodInfo {
            name,
            param_descriptors: params,
            return_descriptor: ret,
            is_static: macc & ACC_STATIC != 0,
        });
    }

    Ok(ClassInfo {
        name: this_class.replace(['/', '$'], "."),
        superclass,
        interfaces,
        methods,
        fields,
        is_interface: access & ACC_INTERFACE != 0,
    })
}

/// Split `(ILjava/lang/String;)V` into its parameter descriptors and return
/// descriptor.
pub fn split_method_descriptor(descriptor: &str) -> (Vec<String>, String) {
    let mut params = Vec::new();
    let inner = descriptor
        .strip_prefix('(')
        .and_then(|d| d.split_once(')'))
        .map(|(p, r)| (p, r.to_string()));
    let Some((param_str, ret)) = inner else {
        return (params, "V".to_string());
    };
    let mut chars = param_str.chars().peekable();
    while chars.peek().is_some() {
        let mut one = String::new();
        while let Some(c) = chars.next() {
            one.push(c);
            match c {
                '[' => continue,
                'L' => {
                    for c2 in chars.by_ref() {
                        one.push(c2);
                        if c2 == ';' {
                            break;
                        }
                    }
                    break;
                }
                _ => break,
            }
        }
        params.push(one);
    }
    (params, ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_deduplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.utf8("hello");
        let b = pool.utf8("hello");
        assert_eq!(a, b);
        let c1 = pool.class("java/lang/Object");
        let c2 = pool.class("java/lang/Object");
        assert_eq!(c1, c2);
    }

    #[test]
    fn long_and_double_take_two_slots() {
        let mut pool = ConstantPool::new();
        let l = pool.long(42);
        let after = pool.utf8("x");
        assert_eq!(after, l + 2);
    }

    #[test]
    fn split_descriptors() {
        let (params, ret) = split_method_descriptor("(ILjava/lang/String;[D)V");
        assert_eq!(params, vec!["I", "Ljava/lang/String;", "[D"]);
        assert_eq!(ret, "V");
        let (params, ret) = split_method_descriptor("()Lfly/runtime/Future;");
        assert!(params.is_empty());
        assert_eq!(ret, "Lfly/runtime/Future;");
    }

    #[test]
    fn write_then_read_round_trips_structure() {
        let mut b = ClassBuilder::new(ACC_PUBLIC | ACC_SUPER, "demo/Point", "java/lang/Object");
        b.add_interface("demo/Printable");
        b.add_field(ACC_PRIVATE | ACC_FINAL, "x", "I");
        b.add_field(ACC_PRIVATE | ACC_FINAL, "y", "I");
        b.add_method(MethodDef {
            access: ACC_PUBLIC,
            name: "x".to_string(),
            descriptor: "()I".to_string(),
            code: Some(CodeAttribute {
                max_stack: 1,
                max_locals: 1,
                // aload_0, getfield #?, ireturn — indices are fake but the
                // reader skips code bodies entirely.
                code: vec![0x2a, 0xb4, 0x00, 0x01, 0xac],
                exception_table: Vec::new(),
                line_numbers: vec![(0, 3)],
            }),
        });
        b.set_source_file("point.fly");
        let bytes = b.build();

        let info = read_class(&bytes).expect("readable class");
        assert_eq!(info.name, "demo.Point");
        assert_eq!(info.superclass.as_deref(), Some("java.lang.Object"));
        assert_eq!(info.interfaces, vec!["demo.Printable"]);
        assert_eq!(info.fields.len(), 2);
        assert_eq!(info.methods.len(), 1);
        assert_eq!(info.methods[0].name, "x");
        assert_eq!(info.methods[0].return_descriptor, "I");
        assert!(!info.is_interface);
    }
}
