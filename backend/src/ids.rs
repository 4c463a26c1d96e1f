//! Utility functions to generate and parse identifiers.
//!
//! An identifier is a Base-62 encoded UUID. It has a prefix that tells us the type of object it
//! identifies.
//!
//! For example, here is an identifier for a project:
//! ```ignore
//! "p_8iCDGZ8pK9fAGxySBWh79A"
//! ```
//!
//! And here is one for a signup:
//! ```ignore
//! "s_QCar3LwOwBPIeKonywpCpB"
//! ```
//!
//! Type prefixes make it easier to figure out the type of something that appears in the logs.

use std::collections::HashMap;
use std::convert::TryInto;
use std::fmt;

use base_62::base62;
use enum_iterator::IntoEnumIterator;
use lazy_static::lazy_static;
use uuid::Uuid;

/// The type of object an identifier identifies.
#[derive(Clone, Copy, Debug, IntoEnumIterator, PartialEq, Eq, Hash)]
pub enum IdType {
    Event,
    Project,
    Signup,
    User,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Id {
    pub id_type: IdType,
    id_str: String,
}

impl Id {
    pub fn new(id_type: IdType) -> Self {
        let encoded = encode_uuid(&Uuid::new_v4());
        let id_str = format!("{}_{}", id_type.as_str(), encoded);
        Self { id_type, id_str }
    }

    /// Parse the id, if we can.
    pub fn parse(id_str: &str) -> Option<Self> {
        let idx = id_str.find('_')?;
        let (prefix, suffix) = id_str.split_at(idx);
        let suffix = &suffix[1..];

        let id_type = IdType::from_prefix(prefix)?;
        decode_uuid(suffix)?;

        Some(Self {
            id_type,
            id_str: String::from(id_str),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id_str
    }

    pub fn into_string(self) -> String {
        self.id_str
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id_str)
    }
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            IdType::Event => "e",
            IdType::Project => "p",
            IdType::Signup => "s",
            IdType::User => "u",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<IdType> {
        ID_PREFIX_TO_TYPE.get(prefix).copied()
    }
}

lazy_static! {
    static ref ID_PREFIX_TO_TYPE: HashMap<&'static str, IdType> = IdType::into_enum_iter()
        .map(|id_type| (id_type.as_str(), id_type))
        .collect();
}

/// Shorthand for `Id::new(id_type).into_string()`.
pub fn new_id(id_type: IdType) -> String {
    Id::new(id_type).into_string()
}

pub fn encode_uuid(uuid: &Uuid) -> String {
    base62::encode(uuid.as_bytes())
}

pub fn decode_uuid(encoded: &str) -> Option<Uuid> {
    let decoded = base62::decode(encoded).ok()?;
    let bytes: [u8; 16] = decoded.try_into().ok()?;
    Some(Uuid::from_bytes(bytes))
}
