//! Non-finite float detection.
//!
//! serde_json は NaN / ±inf を黙って `null` にするため、encode 前に値を一度
//! 走査して見つけます。

use std::fmt;

use serde::Serialize;
use serde::ser::{self, Serializer};

#[derive(Debug)]
pub(crate) enum Walk {
    NonFinite(f64),
    Other(String),
}

impl fmt::Display for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Walk::NonFinite(value) => write!(f, "non-finite float {value}"),
            Walk::Other(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Walk {}

impl ser::Error for Walk {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Walk::Other(msg.to_string())
    }
}

/// The first NaN or infinity anywhere inside `value`.
///
/// Failures of the value's own `Serialize` impl are not reported here; the
/// real encode surfaces them.
pub(crate) fn find_non_finite<T: Serialize + ?Sized>(value: &T) -> Option<f64> {
    match value.serialize(FloatWalker) {
        Err(Walk::NonFinite(v)) => Some(v),
        _ => None,
    }
}

#[derive(Clone, Copy)]
struct FloatWalker;

type Step = Result<(), Walk>;

impl Serializer for FloatWalker {
    type Ok = ();
    type Error = Walk;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, _v: bool) -> Step {
        Ok(())
    }
    fn serialize_i8(self, _v: i8) -> Step {
        Ok(())
    }
    fn serialize_i16(self, _v: i16) -> Step {
        Ok(())
    }
    fn serialize_i32(self, _v: i32) -> Step {
        Ok(())
    }
    fn serialize_i64(self, _v: i64) -> Step {
        Ok(())
    }
    fn serialize_i128(self, _v: i128) -> Step {
        Ok(())
    }
    fn serialize_u8(self, _v: u8) -> Step {
        Ok(())
    }
    fn serialize_u16(self, _v: u16) -> Step {
        Ok(())
    }
    fn serialize_u32(self, _v: u32) -> Step {
        Ok(())
    }
    fn serialize_u64(self, _v: u64) -> Step {
        Ok(())
    }
    fn serialize_u128(self, _v: u128) -> Step {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Step {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Step {
        if v.is_finite() {
            Ok(())
        } else {
            Err(Walk::NonFinite(v))
        }
    }

    fn serialize_char(self, _v: char) -> Step {
        Ok(())
    }
    fn serialize_str(self, _v: &str) -> Step {
        Ok(())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Step {
        Ok(())
    }
    fn serialize_none(self) -> Step {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Step {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Step {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Step {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Step {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Step {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Step {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, Walk> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self, Walk> {
        Ok(self)
    }
}

impl ser::SerializeSeq for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeTuple for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeMap for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Step {
        key.serialize(FloatWalker)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeStruct for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FloatWalker {
    type Ok = ();
    type Error = Walk;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _key: &'static str, value: &T) -> Step {
        value.serialize(FloatWalker)
    }

    fn end(self) -> Step {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeMap;

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    fn top_level_non_finite_is_found(#[case] value: f64) {
        assert!(find_non_finite(&value).is_some());
    }

    #[test]
    fn nested_non_finite_is_found() {
        let mut map = BTreeMap::new();
        map.insert("ratio", vec![Some(0.5), Some(f64::INFINITY)]);
        assert_eq!(find_non_finite(&map), Some(f64::INFINITY));
        assert!(find_non_finite(&(1, f32::NAN)).is_some());
    }

    #[test]
    fn finite_values_pass() {
        assert_eq!(find_non_finite(&vec![1.5, -0.0, 3e300]), None);
        assert_eq!(find_non_finite("text"), None);
        assert_eq!(find_non_finite(&serde_json::json!({"a": [1, 2.5]})), None);
    }
}
