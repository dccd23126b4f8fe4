//! JSON forms for `f64` fields that may legitimately hold a non-finite value.
//!
//! `serde_json` writes `NaN` and `±inf` as `null` and refuses to read them
//! back. Finite values stay plain numbers; non-finite ones are written as the
//! strings `"NaN"`, `"inf"` and `"-inf"`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

fn decode<E: serde::de::Error>(repr: Repr) -> Result<f64, E> {
    match repr {
        Repr::Number(value) => Ok(value),
        Repr::Text(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            other => Err(E::custom(format!("`{other}` is not a float"))),
        },
    }
}

struct Wire(f64);

impl Serialize for Wire {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_finite() {
            s.serialize_f64(value)
        } else if value.is_nan() {
            s.serialize_str("NaN")
        } else if value > 0.0 {
            s.serialize_str("inf")
        } else {
            s.serialize_str("-inf")
        }
    }
}

pub mod lossless {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        Wire(*value).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        decode(Repr::deserialize(d)?)
    }
}

pub mod lossless_map {
    use super::*;

    pub fn serialize<K, S>(map: &BTreeMap<K, f64>, s: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        S: Serializer,
    {
        s.collect_map(map.iter().map(|(k, v)| (k, Wire(*v))))
    }

    pub fn deserialize<'de, K, D>(d: D) -> Result<BTreeMap<K, f64>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        BTreeMap::<K, Repr>::deserialize(d)?
            .into_iter()
            .map(|(k, repr)| Ok((k, decode::<D::Error>(repr)?)))
            .collect()
    }
}

