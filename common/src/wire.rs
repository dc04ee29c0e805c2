//! Lenient decoders for numeric fields that the backend sometimes sends as
//! strings (aggregates straight out of SQL).

use std::fmt;

use serde::de::{self, Visitor};
use serde::Deserializer;

pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    deserializer.deserialize_any(CountVisitor)
}

struct CountVisitor;

impl Visitor<'_> for CountVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative count as a number or numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative count: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
        if v.is_finite() && v >= 0.0 {
            Ok(v.round() as u64)
        } else {
            Err(E::custom(format!("invalid count: {v}")))
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        let v = v.trim();
        if let Ok(n) = v.parse::<u64>() {
            return Ok(n);
        }
        v.parse::<f64>()
            .map_err(|_| E::custom(format!("invalid count: {v:?}")))
            .and_then(|f| self.visit_f64(f))
    }

    fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
        Ok(0)
    }
}
