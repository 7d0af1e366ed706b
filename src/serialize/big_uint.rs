//! Serde helpers for `BigUint` fields, used as `#[serde(with = "crate::serialize::big_uint")]`.
//!
//! Values are written as upper-case hex strings.  Reading also accepts a plain JSON integer,
//! which is convenient for small hand-written fixtures.

use num::{BigUint, Num};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.to_str_radix(16).to_uppercase().serialize(serializer)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrUint {
    Hex(String),
    Uint(u64),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
where
    D: Deserializer<'de>,
{
    match HexOrUint::deserialize(deserializer)? {
        HexOrUint::Hex(s) => BigUint::from_str_radix(&s, 16).map_err(de::Error::custom),
        HexOrUint::Uint(u) => Ok(BigUint::from(u)),
    }
}
