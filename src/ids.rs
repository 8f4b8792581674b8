//! Entity identifiers.
//!
//! Every stored document is keyed by twelve random bytes rendered as 24
//! lowercase hex characters. Identifiers arriving from the outside are parsed
//! once at the boundary so the services never see a malformed key.

use std::fmt;
use std::str::FromStr;

use rand_core::{OsRng, RngCore};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ApiError;

const ID_BYTES: usize = 12;
const ID_LEN: usize = ID_BYTES * 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; ID_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let mut out = String::with_capacity(ID_LEN);
        for byte in bytes {
            out.push_str(&format!("{byte:02x}"));
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_well_formed(value: &str) -> bool {
        value.len() == ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Parses an optional path/query value, failing with `InvalidInput` when
    /// it is absent or blank and when it is not a well-formed id.
    pub fn require(value: Option<&str>, what: &str) -> Result<Self, ApiError> {
        match value.map(str::trim) {
            None | Some("") => Err(ApiError::invalid(format!("{what} is required"))),
            Some(raw) => raw
                .parse()
                .map_err(|_| ApiError::invalid(format!("{what} is malformed"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedId;

impl fmt::Display for MalformedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed id")
    }
}

impl std::error::Error for MalformedId {}

impl FromStr for EntityId {
    type Err = MalformedId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_well_formed(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(MalformedId)
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for EntityId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse()
            .map_err(|err: MalformedId| FromSqlError::Other(Box::new(err)))
    }
}
