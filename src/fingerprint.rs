//! Type fingerprints.
//!
//! A [`TypeFingerprint`] identifies the runtime representation of a value:
//! "64-bit signed integer", "64-bit float", "sequence of 64-bit signed
//! integer", and so on. Two fingerprints compare equal iff the underlying
//! representations are interchangeable without conversion.
//!
//! Fingerprints are `Copy` and computing one never allocates. Statically typed
//! values answer from their type alone; dynamically typed values ([`Value`],
//! `Option`, sequences of either) are inspected in place.

use std::any::{type_name, TypeId};
use std::fmt;
use std::ops::Add;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Scalar part of a fingerprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Leaf {
    Unit,
    Nothing,
    Bool,
    Char,
    Str,
    Int {
        bits: u8,
        signed: bool,
    },
    Float {
        bits: u8,
    },
    /// Mixed element types.
    Any,
    /// An arbitrary Rust type, identified by its `TypeId`.
    Named {
        name: &'static str,
        id: TypeId,
    },
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Unit => f.write_str("()"),
            Leaf::Nothing => f.write_str("nothing"),
            Leaf::Bool => f.write_str("bool"),
            Leaf::Char => f.write_str("char"),
            Leaf::Str => f.write_str("str"),
            Leaf::Int { bits, signed: true } => write!(f, "i{bits}"),
            Leaf::Int { bits, signed: false } => write!(f, "u{bits}"),
            Leaf::Float { bits } => write!(f, "f{bits}"),
            Leaf::Any => f.write_str("any"),
            Leaf::Named { name, .. } => f.write_str(name),
        }
    }
}

/// Structural identifier of a value's runtime representation.
///
/// Serializes as its display form, e.g. `"[i64]"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeFingerprint {
    pub leaf: Leaf,
    /// Sequence nesting: 0 for scalars, 1 for `[T]`, 2 for `[[T]]`.
    pub depth: u8,
}

impl TypeFingerprint {
    pub const UNIT: Self = Self::scalar(Leaf::Unit);
    pub const NOTHING: Self = Self::scalar(Leaf::Nothing);
    pub const ANY: Self = Self::scalar(Leaf::Any);
    pub const BOOL: Self = Self::scalar(Leaf::Bool);
    pub const STR: Self = Self::scalar(Leaf::Str);
    pub const I64: Self = Self::int(64, true);
    pub const F64: Self = Self::float(64);

    pub const fn scalar(leaf: Leaf) -> Self {
        Self { leaf, depth: 0 }
    }

    pub const fn int(bits: u8, signed: bool) -> Self {
        Self::scalar(Leaf::Int { bits, signed })
    }

    pub const fn float(bits: u8) -> Self {
        Self::scalar(Leaf::Float { bits })
    }

    /// Fingerprint of an arbitrary Rust type, by `TypeId`.
    pub fn named<T: ?Sized + 'static>() -> Self {
        Self::scalar(Leaf::Named {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        })
    }

    /// Sequence whose elements have this fingerprint.
    pub const fn sequence_of(self) -> Self {
        Self {
            leaf: self.leaf,
            depth: self.depth.saturating_add(1),
        }
    }

    pub fn is_sequence(&self) -> bool {
        self.depth > 0
    }
}

impl fmt::Display for TypeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.depth {
            f.write_str("[")?;
        }
        write!(f, "{}", self.leaf)?;
        for _ in 0..self.depth {
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl Serialize for TypeFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Values whose representation can be fingerprinted.
pub trait Fingerprint {
    fn fingerprint(&self) -> TypeFingerprint;

    /// Fingerprint shared by every value of the type, if there is one.
    ///
    /// Containers use it to skip scanning and to type empty sequences.
    /// References and boxes forward it, so `Vec<&str>` and `Vec<Box<f64>>`
    /// are typed the same whether empty or not.
    fn static_fingerprint() -> Option<TypeFingerprint> {
        None
    }
}

macro_rules! static_fingerprint {
    ($($ty:ty => $fp:expr),* $(,)?) => {
        $(
            impl Fingerprint for $ty {
                #[inline]
                fn fingerprint(&self) -> TypeFingerprint {
                    $fp
                }

                fn static_fingerprint() -> Option<TypeFingerprint> {
                    Some($fp)
                }
            }
        )*
    };
}

static_fingerprint! {
    () => TypeFingerprint::UNIT,
    bool => TypeFingerprint::BOOL,
    char => TypeFingerprint::scalar(Leaf::Char),
    String => TypeFingerprint::STR,
    i8 => TypeFingerprint::int(8, true),
    i16 => TypeFingerprint::int(16, true),
    i32 => TypeFingerprint::int(32, true),
    i64 => TypeFingerprint::I64,
    i128 => TypeFingerprint::int(128, true),
    isize => TypeFingerprint::int(usize::BITS as u8, true),
    u8 => TypeFingerprint::int(8, false),
    u16 => TypeFingerprint::int(16, false),
    u32 => TypeFingerprint::int(32, false),
    u64 => TypeFingerprint::int(64, false),
    u128 => TypeFingerprint::int(128, false),
    usize => TypeFingerprint::int(usize::BITS as u8, false),
    f32 => TypeFingerprint::float(32),
    f64 => TypeFingerprint::F64,
}

impl Fingerprint for str {
    fn fingerprint(&self) -> TypeFingerprint {
        TypeFingerprint::STR
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        Some(TypeFingerprint::STR)
    }
}

impl<T: Fingerprint> Fingerprint for [T] {
    fn fingerprint(&self) -> TypeFingerprint {
        if let Some(fp) = T::static_fingerprint() {
            return fp.sequence_of();
        }
        let mut iter = self.iter();
        let Some(first) = iter.next() else {
            return TypeFingerprint::ANY.sequence_of();
        };
        let element = first.fingerprint();
        if iter.all(|v| v.fingerprint() == element) {
            element.sequence_of()
        } else {
            TypeFingerprint::ANY.sequence_of()
        }
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        T::static_fingerprint().map(TypeFingerprint::sequence_of)
    }
}

impl<T: Fingerprint> Fingerprint for Vec<T> {
    fn fingerprint(&self) -> TypeFingerprint {
        self.as_slice().fingerprint()
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        T::static_fingerprint().map(TypeFingerprint::sequence_of)
    }
}

impl<T: Fingerprint, const N: usize> Fingerprint for [T; N] {
    fn fingerprint(&self) -> TypeFingerprint {
        self.as_slice().fingerprint()
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        T::static_fingerprint().map(TypeFingerprint::sequence_of)
    }
}

/// `None` is `nothing`; `Some(v)` is whatever `v` is. A function returning
/// both is therefore type-unstable.
///
/// The fingerprint depends on the value, so `Option<T>` has no static
/// fingerprint and sequences of options are scanned like sequences of
/// [`Value`]: all `Some(f64)` is `[f64]`, all `None` is `[nothing]`, and a
/// mixed or empty sequence is `[any]`.
impl<T: Fingerprint> Fingerprint for Option<T> {
    fn fingerprint(&self) -> TypeFingerprint {
        match self {
            Some(v) => v.fingerprint(),
            None => TypeFingerprint::NOTHING,
        }
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for Box<T> {
    fn fingerprint(&self) -> TypeFingerprint {
        (**self).fingerprint()
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        T::static_fingerprint()
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for &T {
    fn fingerprint(&self) -> TypeFingerprint {
        (**self).fingerprint()
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        T::static_fingerprint()
    }
}

/// Fingerprints the wrapped value by its Rust type name, for types without a
/// structural [`Fingerprint`] impl.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opaque<T>(pub T);

impl<T: 'static> Fingerprint for Opaque<T> {
    fn fingerprint(&self) -> TypeFingerprint {
        TypeFingerprint::named::<T>()
    }

    fn static_fingerprint() -> Option<TypeFingerprint> {
        Some(TypeFingerprint::named::<T>())
    }
}

/// A dynamically typed value.
///
/// Models code whose variables may change representation at runtime, such as
/// an accumulator that starts as an integer and becomes a float.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Nothing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Value>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }
}

impl Fingerprint for Value {
    fn fingerprint(&self) -> TypeFingerprint {
        match self {
            Value::Nothing => TypeFingerprint::NOTHING,
            Value::Bool(_) => TypeFingerprint::BOOL,
            Value::Int(_) => TypeFingerprint::I64,
            Value::Float(_) => TypeFingerprint::F64,
            Value::Str(_) => TypeFingerprint::STR,
            Value::Seq(items) => items.as_slice().fingerprint(),
        }
    }
}

/// Numeric addition with promotion: int + int stays int (wrapping), anything
/// involving a float is a float, non-numeric operands give `Nothing`.
impl Add for Value {
    type Output = Value;

    fn add(self, rhs: Value) -> Value {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            (Value::Int(a), Value::Float(b)) => Value::Float(a as f64 + b),
            (Value::Float(a), Value::Int(b)) => Value::Float(a + b as f64),
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            _ => Value::Nothing,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// Maximum number of arguments fingerprinted per call.
pub const MAX_ARGS: usize = 8;

/// Ordered, inline list of argument fingerprints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FingerprintList {
    items: [TypeFingerprint; MAX_ARGS],
    len: u8,
}

impl FingerprintList {
    pub const fn new() -> Self {
        Self {
            items: [TypeFingerprint::UNIT; MAX_ARGS],
            len: 0,
        }
    }

    /// Appends `fp`; returns `false` when the list is full.
    pub fn push(&mut self, fp: TypeFingerprint) -> bool {
        let len = self.len as usize;
        if len == MAX_ARGS {
            return false;
        }
        self.items[len] = fp;
        self.len += 1;
        true
    }

    pub fn as_slice(&self) -> &[TypeFingerprint] {
        &self.items[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<TypeFingerprint> {
        self.as_slice().get(index).copied()
    }
}

impl Default for FingerprintList {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for FingerprintList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for fp in self.as_slice() {
            seq.serialize_element(fp)?;
        }
        seq.end()
    }
}

/// Argument tuples produced by an argument generator.
///
/// Implemented for `()` and tuples of up to [`MAX_ARGS`] fingerprintable values.
pub trait ArgList {
    fn fingerprints(&self) -> FingerprintList;
}

impl ArgList for () {
    fn fingerprints(&self) -> FingerprintList {
        FingerprintList::new()
    }
}

macro_rules! tuple_args {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: Fingerprint),+> ArgList for ($($ty,)+) {
            fn fingerprints(&self) -> FingerprintList {
                let ($($var,)+) = self;
                let mut list = FingerprintList::new();
                $( list.push($var.fingerprint()); )+
                list
            }
        }
    };
}

tuple_args!(A a);
tuple_args!(A a, B b);
tuple_args!(A a, B b, C c);
tuple_args!(A a, B b, C c, D d);
tuple_args!(A a, B b, C c, D d, E e);
tuple_args!(A a, B b, C c, D d, E e, F f);
tuple_args!(A a, B b, C c, D d, E e, F f, G g);
tuple_args!(A a, B b, C c, D d, E e, F f, G g, H h);
