//! Custom serde Serializer that walks a record and emits one entry per leaf,
//! keyed by its dotted path.
//!
//! This is the reflection step of schema binding: serializing the record's
//! initial value reveals every leaf, its path, and the value that becomes the
//! key's default. `Option::None` leaves are kept (with no value) so optional
//! fields still get a key.

use serde::ser::{self, Serialize};
use toml::Value;

use crate::duration;

/// One leaf of a flattened record.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Dotted path built from field names, spelled exactly as serde emits them.
    pub path: String,
    /// `None` for `Option::None` leaves.
    pub value: Option<Value>,
    /// The leaf was written through [`flagfig::Duration`](crate::Duration).
    pub is_duration: bool,
    /// The leaf sits directly under an `Option`, whether `Some` or `None`.
    pub is_optional: bool,
}

/// Flatten a `Serialize` record into its leaves, in field order.
///
/// Structs and maps are recursed into, building dotted paths:
/// `Outer { database: Inner { url: "pg://" } }` → `database.url = "pg://"`.
/// Sequences are leaves (their value is an array).
///
/// The top level must be a struct or map; anything else is
/// [`FlattenError::NotARecord`].
pub fn flatten<S: Serialize + ?Sized>(source: &S) -> Result<Vec<Leaf>, FlattenError> {
    let mut out = Vec::new();
    let serializer = FlattenSerializer {
        prefix: String::new(),
        out: &mut out,
        is_duration: false,
        is_optional: false,
    };
    source.serialize(serializer)?;
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlattenError {
    /// The top-level value is not record-shaped; carries what was found.
    NotARecord(&'static str),
    Custom(String),
}

impl std::fmt::Display for FlattenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlattenError::NotARecord(found) => write!(f, "expected a record, found {found}"),
            FlattenError::Custom(msg) => write!(f, "flatten error: {msg}"),
        }
    }
}

impl std::error::Error for FlattenError {}

impl ser::Error for FlattenError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        FlattenError::Custom(msg.to_string())
    }
}

fn non_string_key() -> FlattenError {
    FlattenError::Custom("map keys must be strings".into())
}

struct FlattenSerializer<'a> {
    prefix: String,
    out: &'a mut Vec<Leaf>,
    is_duration: bool,
    is_optional: bool,
}

impl<'a> FlattenSerializer<'a> {
    fn at_root(&self) -> bool {
        self.prefix.is_empty()
    }

    fn emit(self, value: Option<Value>, found: &'static str) -> Result<(), FlattenError> {
        if self.at_root() {
            return Err(FlattenError::NotARecord(found));
        }
        self.out.push(Leaf {
            path: self.prefix,
            is_optional: self.is_optional || value.is_none(),
            value,
            is_duration: self.is_duration,
        });
        Ok(())
    }
}

impl<'a> ser::Serializer for FlattenSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;
    type SerializeSeq = FlattenSeqSerializer<'a>;
    type SerializeTuple = FlattenSeqSerializer<'a>;
    type SerializeTupleStruct = FlattenSeqSerializer<'a>;
    type SerializeTupleVariant = FlattenSeqSerializer<'a>;
    type SerializeMap = FlattenMapSerializer<'a>;
    type SerializeStruct = FlattenStructSerializer<'a>;
    type SerializeStructVariant = FlattenStructSerializer<'a>;

    fn serialize_bool(self, v: bool) -> Result<(), Self::Error> {
        self.emit(Some(Value::Boolean(v)), "a boolean")
    }

    fn serialize_i8(self, v: i8) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i16(self, v: i16) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i32(self, v: i32) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_i64(self, v: i64) -> Result<(), Self::Error> {
        self.emit(Some(Value::Integer(v)), "an integer")
    }

    fn serialize_u8(self, v: u8) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u16(self, v: u16) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u32(self, v: u32) -> Result<(), Self::Error> {
        self.serialize_i64(v as i64)
    }

    fn serialize_u64(self, v: u64) -> Result<(), Self::Error> {
        let v = i64::try_from(v)
            .map_err(|_| FlattenError::Custom(format!("{v} does not fit in a signed integer")))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<(), Self::Error> {
        self.serialize_f64(v as f64)
    }

    fn serialize_f64(self, v: f64) -> Result<(), Self::Error> {
        self.emit(Some(Value::Float(v)), "a float")
    }

    fn serialize_char(self, v: char) -> Result<(), Self::Error> {
        self.serialize_str(&v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<(), Self::Error> {
        self.emit(Some(Value::String(v.to_string())), "a string")
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), Self::Error> {
        Err(FlattenError::Custom("bytes not supported".into()))
    }

    fn serialize_none(self) -> Result<(), Self::Error> {
        self.emit(None, "an empty option")
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<(), Self::Error> {
        value.serialize(FlattenSerializer {
            is_optional: true,
            ..self
        })
    }

    fn serialize_unit(self) -> Result<(), Self::Error> {
        if self.at_root() {
            return Err(FlattenError::NotARecord("a unit value"));
        }
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), Self::Error> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<(), Self::Error> {
        self.serialize_str(variant)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        let is_duration = self.is_duration || name == duration::MARKER;
        value.serialize(FlattenSerializer {
            is_duration,
            ..self
        })
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        if self.at_root() {
            return Err(FlattenError::NotARecord("a sequence"));
        }
        Ok(FlattenSeqSerializer {
            prefix: self.prefix,
            out: self.out,
            items: Vec::with_capacity(len.unwrap_or(0)),
            is_optional: self.is_optional,
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(FlattenMapSerializer {
            prefix: self.prefix,
            out: self.out,
            current_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(FlattenStructSerializer {
            prefix: self.prefix,
            out: self.out,
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(FlattenStructSerializer {
            prefix: self.prefix,
            out: self.out,
        })
    }
}

fn dotted(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

// --- SerializeStruct ---

struct FlattenStructSerializer<'a> {
    prefix: String,
    out: &'a mut Vec<Leaf>,
}

impl<'a> ser::SerializeStruct for FlattenStructSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        value.serialize(FlattenSerializer {
            prefix: dotted(&self.prefix, key),
            out: self.out,
            is_duration: false,
            is_optional: false,
        })
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<'a> ser::SerializeStructVariant for FlattenStructSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        ser::SerializeStruct::serialize_field(self, key, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// --- SerializeMap ---

struct FlattenMapSerializer<'a> {
    prefix: String,
    out: &'a mut Vec<Leaf>,
    current_key: Option<String>,
}

impl<'a> ser::SerializeMap for FlattenMapSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        self.current_key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| FlattenError::Custom("map value without a key".into()))?;
        value.serialize(FlattenSerializer {
            prefix: dotted(&self.prefix, &key),
            out: self.out,
            is_duration: false,
            is_optional: false,
        })
    }

    fn end(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

// --- SerializeSeq (for Vec/array fields) ---

struct FlattenSeqSerializer<'a> {
    prefix: String,
    out: &'a mut Vec<Leaf>,
    items: Vec<Value>,
    is_optional: bool,
}

impl<'a> ser::SerializeSeq for FlattenSeqSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let v = Value::try_from(value)
            .map_err(|e| FlattenError::Custom(format!("array element: {e}")))?;
        self.items.push(v);
        Ok(())
    }

    fn end(self) -> Result<(), Self::Error> {
        self.out.push(Leaf {
            path: self.prefix,
            value: Some(Value::Array(self.items)),
            is_duration: false,
            is_optional: self.is_optional,
        });
        Ok(())
    }
}

impl<'a> ser::SerializeTuple for FlattenSeqSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl<'a> ser::SerializeTupleStruct for FlattenSeqSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl<'a> ser::SerializeTupleVariant for FlattenSeqSerializer<'a> {
    type Ok = ();
    type Error = FlattenError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<(), Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

// --- Key serializer (extracts string keys from map keys) ---

struct KeySerializer;

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = FlattenError;
    type SerializeSeq = ser::Impossible<String, FlattenError>;
    type SerializeTuple = ser::Impossible<String, FlattenError>;
    type SerializeTupleStruct = ser::Impossible<String, FlattenError>;
    type SerializeTupleVariant = ser::Impossible<String, FlattenError>;
    type SerializeMap = ser::Impossible<String, FlattenError>;
    type SerializeStruct = ser::Impossible<String, FlattenError>;
    type SerializeStructVariant = ser::Impossible<String, FlattenError>;

    fn serialize_str(self, v: &str) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_char(self, v: char) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_unit_variant(
        self,
        _: &'static str,
        _: u32,
        v: &'static str,
    ) -> Result<String, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        v: &T,
    ) -> Result<String, Self::Error> {
        v.serialize(self)
    }

    fn serialize_bool(self, _: bool) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_i8(self, _: i8) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_i16(self, _: i16) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_i32(self, _: i32) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_i64(self, _: i64) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_u8(self, _: u8) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_u16(self, _: u16) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_u32(self, _: u32) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_u64(self, _: u64) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_f32(self, _: f32) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_f64(self, _: f64) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_bytes(self, _: &[u8]) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_none(self) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_some<T: Serialize + ?Sized>(self, _: &T) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_unit(self) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_unit_struct(self, _: &'static str) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(non_string_key())
    }
    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(non_string_key())
    }
}
