//! JSON decoding options.
//!
//! Property names are matched case-insensitively by default, so a payload
//! with `"Name"` fills a field declared as `name`. Matching is done by a thin
//! deserializer over [`serde_json::Value`] that rewrites object keys to the
//! field names the target struct declares. An exact match always wins over a
//! case-folded one.

use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};
use serde::{forward_to_deserialize_any, Deserializer};
use serde_json::Value;

use crate::error::{Error, Result};

/// Options for [`Response::read_json_with`](crate::Response::read_json_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    pub case_insensitive: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self { case_insensitive: true }
    }
}

impl JsonOptions {
    /// Match property names exactly, as plain `serde_json` does.
    pub fn case_sensitive() -> Self {
        Self {
            case_insensitive: false,
        }
    }
}

pub(crate) fn from_slice<T: DeserializeOwned>(data: &[u8], options: &JsonOptions) -> Result<T> {
    let decoded = if options.case_insensitive {
        serde_json::from_slice::<Value>(data).and_then(|value| T::deserialize(CaseInsensitive(value)))
    } else {
        serde_json::from_slice::<T>(data)
    };
    decoded.map_err(|e| Error::Deserialization(e.to_string()))
}

struct CaseInsensitive(Value);

impl<'de> Deserializer<'de> for CaseInsensitive {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Array(items) => visitor.visit_seq(Elements(items.into_iter())),
            Value::Object(map) => visitor.visit_map(Entries {
                iter: map.into_iter(),
                value: None,
            }),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(CaseInsensitive(other)),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        match self.0 {
            Value::Object(map) => {
                let entries: Vec<(String, Value)> = map
                    .into_iter()
                    .map(|(key, value)| (canonical_key(key, fields), value))
                    .collect();
                visitor.visit_map(Entries {
                    iter: entries.into_iter(),
                    value: None,
                })
            }
            other => CaseInsensitive(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> std::result::Result<V::Value, Self::Error> {
        self.0.deserialize_enum(name, variants, visitor)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map identifier
        ignored_any
    }
}

fn canonical_key(key: String, fields: &'static [&'static str]) -> String {
    if fields.contains(&key.as_str()) {
        return key;
    }
    match fields.iter().find(|field| field.eq_ignore_ascii_case(&key)) {
        Some(field) => (*field).to_string(),
        None => key,
    }
}

struct Elements(std::vec::IntoIter<Value>);

impl<'de> de::SeqAccess<'de> for Elements {
    type Error = serde_json::Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> std::result::Result<Option<T::Value>, Self::Error> {
        self.0.next().map(|value| seed.deserialize(CaseInsensitive(value))).transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct Entries<I> {
    iter: I,
    value: Option<Value>,
}

impl<'de, I> de::MapAccess<'de> for Entries<I>
where
    I: Iterator<Item = (String, Value)>,
{
    type Error = serde_json::Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> std::result::Result<Option<K::Value>, Self::Error> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: de::value::StringDeserializer<serde_json::Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> std::result::Result<V::Value, Self::Error> {
        match self.value.take() {
            Some(value) => seed.deserialize(CaseInsensitive(value)),
            None => Err(de::Error::custom("value requested before key")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
        #[serde(default)]
        address: Option<Address>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Address {
        city: String,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Post {
        user_id: u32,
        title: String,
    }

    #[test]
    fn matches_keys_ignoring_case() {
        let user: User = from_slice(br#"{"ID":1,"Name":"Leanne Graham"}"#, &JsonOptions::default()).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "Leanne Graham");
        assert_eq!(user.address, None);
    }

    #[test]
    fn nested_objects_and_arrays_are_matched_too() {
        let raw = br#"{"id":2,"name":"Ervin","Address":{"CITY":"Wisokyburgh","Tags":["a","b"]}}"#;
        let user: User = from_slice(raw, &JsonOptions::default()).unwrap();
        let address = user.address.unwrap();
        assert_eq!(address.city, "Wisokyburgh");
        assert_eq!(address.tags, vec!["a", "b"]);
    }

    #[test]
    fn renamed_fields_match_their_wire_names() {
        let posts: Vec<Post> = from_slice(br#"[{"UserId":7,"TITLE":"t"}]"#, &JsonOptions::default()).unwrap();
        assert_eq!(
            posts,
            vec![Post {
                user_id: 7,
                title: "t".to_string()
            }]
        );
    }

    #[test]
    fn case_sensitive_options_reject_mismatched_keys() {
        let err = from_slice::<User>(br#"{"ID":1,"Name":"x"}"#, &JsonOptions::case_sensitive()).unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn plain_values_deserialize() {
        let map: std::collections::HashMap<String, i64> =
            from_slice(br#"{"A":1,"b":2}"#, &JsonOptions::default()).unwrap();
        assert_eq!(map["A"], 1);
        let number: f64 = from_slice(b"1.5", &JsonOptions::default()).unwrap();
        assert_eq!(number, 1.5);
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let err = from_slice::<User>(b"not json", &JsonOptions::default()).unwrap_err();
        assert!(err.is_serialization());
    }
}
