//! RFC 3339 timestamps on the wire. Deserialization also accepts Unix seconds so archive exports
//! that store epoch integers load without conversion.

use serde::{Deserialize, Deserializer, Serializer};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
	Text(String),
	Unix(i64),
}
impl RawTimestamp {
	fn into_datetime(self) -> Result<OffsetDateTime, String> {
		match self {
			Self::Text(raw) => OffsetDateTime::parse(&raw, &Rfc3339).map_err(|err| err.to_string()),
			Self::Unix(secs) =>
				OffsetDateTime::from_unix_timestamp(secs).map_err(|err| err.to_string()),
		}
	}
}

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	RawTimestamp::deserialize(deserializer)?.into_datetime().map_err(serde::de::Error::custom)
}

pub mod option {
	use serde::{Deserialize, Deserializer, Serializer};
	use time::OffsetDateTime;

	use super::RawTimestamp;

	pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => super::serialize(value, serializer),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<RawTimestamp>::deserialize(deserializer)? {
			Some(raw) => raw.into_datetime().map(Some).map_err(serde::de::Error::custom),
			None => Ok(None),
		}
	}
}
