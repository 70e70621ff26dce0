use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::Error;

pub trait TypedIdMarker {
    fn tag() -> &'static str;
}

/// An opaque record identifier tagged with the kind of record it refers to.
///
/// Generated ids look like `CPN-16E77539-8873-4C8A-BCA3-2036010474AD`, but any
/// non-empty string is accepted when reading so that ids written by other
/// tools are kept verbatim.
pub struct TypedId<T: TypedIdMarker>(String, PhantomData<T>);

impl<T: TypedIdMarker> TypedId<T> {
    pub fn new() -> TypedId<T> {
        let uuid = Uuid::new_v4().to_string().to_uppercase();
        TypedId(format!("{}-{}", T::tag(), uuid), PhantomData)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses an id captured from a request path.
    pub fn from_path(raw: String) -> Result<TypedId<T>, Error> {
        raw.parse().map_err(|_| Error::InvalidId { id: raw })
    }
}

impl<T: TypedIdMarker> Default for TypedId<T> {
    fn default() -> TypedId<T> {
        TypedId::new()
    }
}

impl<T: TypedIdMarker> Clone for TypedId<T> {
    fn clone(&self) -> TypedId<T> {
        TypedId(self.0.clone(), PhantomData)
    }
}

impl<T: TypedIdMarker> PartialEq for TypedId<T> {
    fn eq(&self, other: &TypedId<T>) -> bool {
        self.0 == other.0
    }
}

impl<T: TypedIdMarker> Eq for TypedId<T> {}

impl<T: TypedIdMarker> Hash for TypedId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T: TypedIdMarker> Display for TypedId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(&self.0)
    }
}

impl<T: TypedIdMarker> Debug for TypedId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        Display::fmt(self, f)
    }
}

impl<T: TypedIdMarker> FromStr for TypedId<T> {
    type Err = TypedIdParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TypedIdParseError::Empty);
        }

        Ok(TypedId(s.to_owned(), PhantomData))
    }
}

impl<T: TypedIdMarker> Serialize for TypedId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de, T: TypedIdMarker> Deserialize<'de> for TypedId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TypedIdVisitor(PhantomData))
    }
}

struct TypedIdVisitor<T>(PhantomData<T>);

impl<'de, T: TypedIdMarker> Visitor<'de> for TypedIdVisitor<T> {
    type Value = TypedId<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-empty string or numeric identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        TypedId::from_str(v).map_err(E::custom)
    }

    // legacy records were keyed by timestamps
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(TypedId(v.to_string(), PhantomData))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(TypedId(v.to_string(), PhantomData))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(TypedId(v.to_string(), PhantomData))
    }
}

#[derive(Copy, Clone, Debug)]
pub enum TypedIdParseError {
    Empty,
}

impl Display for TypedIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;

    impl TypedIdMarker for Thing {
        fn tag() -> &'static str {
            "THG"
        }
    }

    #[test]
    fn generated_ids_carry_the_tag() {
        let id = TypedId::<Thing>::new();
        assert!(id.as_str().starts_with("THG-"));
        assert_ne!(id, TypedId::<Thing>::new());
    }

    #[test]
    fn foreign_ids_are_kept_verbatim() {
        let id: TypedId<Thing> = serde_json::from_str("\"c1\"").unwrap();
        assert_eq!(id.as_str(), "c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"c1\"");
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let id: TypedId<Thing> = serde_json::from_str("1700000000123").unwrap();
        assert_eq!(id.as_str(), "1700000000123");
    }

    #[test]
    fn empty_ids_are_rejected() {
        assert!(serde_json::from_str::<TypedId<Thing>>("\"  \"").is_err());
        assert!("".parse::<TypedId<Thing>>().is_err());
    }
}
