//! Finite Number Check
//!
//! JSON has no NaN or infinity; `serde_json` writes them as `null`, which
//! would make `f(NaN)`, `f(inf)` and `f(None)` indistinguishable. This module
//! walks a value through a no-op serializer that fails on non-finite floats.

use serde::ser::{self, Error as _, Serialize};

/// Fails when `value` contains a NaN or infinite float at any depth.
pub(crate) fn ensure_finite<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    value.serialize(FiniteCheck)
}

fn check_float(value: f64) -> serde_json::Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(serde_json::Error::custom(format!(
            "non-finite float {} has no JSON representation",
            value
        )))
    }
}

// == Serializer ==
struct FiniteCheck;

type Result<T = ()> = serde_json::Result<T>;

impl ser::Serializer for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;
    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_f32(self, v: f32) -> Result {
        check_float(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result {
        check_float(v)
    }

    fn serialize_bool(self, _: bool) -> Result {
        Ok(())
    }

    fn serialize_i8(self, _: i8) -> Result {
        Ok(())
    }

    fn serialize_i16(self, _: i16) -> Result {
        Ok(())
    }

    fn serialize_i32(self, _: i32) -> Result {
        Ok(())
    }

    fn serialize_i64(self, _: i64) -> Result {
        Ok(())
    }

    fn serialize_i128(self, _: i128) -> Result {
        Ok(())
    }

    fn serialize_u8(self, _: u8) -> Result {
        Ok(())
    }

    fn serialize_u16(self, _: u16) -> Result {
        Ok(())
    }

    fn serialize_u32(self, _: u32) -> Result {
        Ok(())
    }

    fn serialize_u64(self, _: u64) -> Result {
        Ok(())
    }

    fn serialize_u128(self, _: u128) -> Result {
        Ok(())
    }

    fn serialize_char(self, _: char) -> Result {
        Ok(())
    }

    fn serialize_str(self, _: &str) -> Result {
        Ok(())
    }

    fn serialize_bytes(self, _: &[u8]) -> Result {
        Ok(())
    }

    fn serialize_none(self) -> Result {
        Ok(())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result {
        Ok(())
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result {
        Ok(())
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> Result {
        Ok(())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        value: &T,
    ) -> Result {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> Result {
        value.serialize(self)
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple(self, _: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self> {
        Ok(self)
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self> {
        Ok(self)
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self> {
        Ok(self)
    }
}

// == Compound Values ==
impl ser::SerializeSeq for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeTuple for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeMap for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result {
        key.serialize(FiniteCheck)
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeStruct for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

impl ser::SerializeStructVariant for FiniteCheck {
    type Ok = ();
    type Error = serde_json::Error;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, _: &'static str, value: &T) -> Result {
        value.serialize(FiniteCheck)
    }

    fn end(self) -> Result {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(serde::Serialize)]
    struct Reading {
        sensor: String,
        values: Vec<Option<f32>>,
    }

    #[test]
    fn test_finite_values_pass() {
        assert!(ensure_finite(&1.5f64).is_ok());
        assert!(ensure_finite(&None::<f64>).is_ok());
        assert!(ensure_finite(&("text", 3u8, vec![0.0f32, -2.5])).is_ok());
    }

    #[test]
    fn test_top_level_non_finite_fails() {
        assert!(ensure_finite(&f64::NAN).is_err());
        assert!(ensure_finite(&f64::INFINITY).is_err());
        assert!(ensure_finite(&f32::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_nested_non_finite_fails() {
        let reading = Reading {
            sensor: "t1".to_string(),
            values: vec![Some(1.0), Some(f32::NAN)],
        };
        assert!(ensure_finite(&reading).is_err());

        let mut map = BTreeMap::new();
        map.insert("x", Some(f64::INFINITY));
        assert!(ensure_finite(&map).is_err());
    }
}
