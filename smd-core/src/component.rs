//! The Component resource: hardware inventory/state entry.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::resource::Resource;
use crate::validation::{Validate, Violation};

/// Kind tag of the Component resource.
pub const COMPONENT_KIND: &str = "Component";

/// Maximum length of `ComponentSpec::description`, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// A Component envelope.
pub type Component = Resource<ComponentSpec, ComponentStatus>;

// ============================================================================
// SPEC / STATUS
// ============================================================================

/// Desired state of a Component.
///
/// Wire names follow the HSM v2 `Components` schema. `ID` and `Type` are always
/// emitted; every other field is omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct ComponentSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Caller-supplied domain identifier, usually an xname.
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Type")]
    pub component_type: String,

    #[serde(rename = "State", skip_serializing_if = "String::is_empty")]
    pub state: String,

    #[serde(rename = "Flag", skip_serializing_if = "String::is_empty")]
    pub flag: String,

    #[serde(rename = "Enabled", skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(rename = "SoftwareStatus", skip_serializing_if = "String::is_empty")]
    pub software_status: String,

    #[serde(rename = "Role", skip_serializing_if = "String::is_empty")]
    pub role: String,

    #[serde(rename = "SubRole", skip_serializing_if = "String::is_empty")]
    pub sub_role: String,

    #[serde(rename = "NID", skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i64>))]
    pub nid: Option<Nid>,

    #[serde(rename = "Subtype", skip_serializing_if = "String::is_empty")]
    pub subtype: String,

    #[serde(rename = "NetType", skip_serializing_if = "String::is_empty")]
    pub net_type: String,

    #[serde(rename = "Arch", skip_serializing_if = "String::is_empty")]
    pub arch: String,

    #[serde(rename = "Class", skip_serializing_if = "String::is_empty")]
    pub class: String,

    #[serde(rename = "ReservationDisabled", skip_serializing_if = "is_false")]
    pub reservation_disabled: bool,

    #[serde(rename = "Locked", skip_serializing_if = "is_false")]
    pub locked: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Validate for ComponentSpec {
    fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        let len = self.description.chars().count();
        if len > DESCRIPTION_MAX_CHARS {
            violations.push(Violation::new(
                "description",
                format!("max={}", DESCRIPTION_MAX_CHARS),
                format!(
                    "description is {} characters long, at most {} allowed",
                    len, DESCRIPTION_MAX_CHARS
                ),
            ));
        }
        violations
    }
}

/// Observed state of a Component. Only written through the status path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default)]
    pub ready: bool,
}

// ============================================================================
// NID
// ============================================================================

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid number")]
pub struct NidError(pub String);

/// Node ID kept as the exact JSON number text it arrived with (`1.50`,
/// `123456789012345678901234`, `1e3`). Decoding and encoding both go
/// through `serde_json::Number` with `arbitrary_precision`, so the digits
/// survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nid(String);

impl Nid {
    pub fn parse(text: &str) -> Result<Self, NidError> {
        let text = text.trim();
        match serde_json::from_str::<serde_json::Number>(text) {
            Ok(number) => Ok(Self(number.to_string())),
            Err(_) => Err(NidError(text.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    fn to_number(&self) -> Result<serde_json::Number, NidError> {
        serde_json::from_str(&self.0).map_err(|_| NidError(self.0.clone()))
    }
}

impl From<i64> for Nid {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<serde_json::Number> for Nid {
    fn from(value: serde_json::Number) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Nid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Nid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_number()
            .map_err(<S::Error as serde::ser::Error>::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Nid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NidVisitor;

        impl<'de> Visitor<'de> for NidVisitor {
            type Value = Nid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or a numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Nid, E> {
                Ok(Nid(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Nid, E> {
                Ok(Nid(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Nid, E> {
                serde_json::Number::from_f64(v)
                    .map(Nid::from)
                    .ok_or_else(|| E::custom("NID must be finite"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Nid, E> {
                Nid::parse(v).map_err(E::custom)
            }

            // serde_json hands arbitrary-precision numbers over as a
            // single-entry map that only `Number` knows how to read.
            fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<Nid, A::Error> {
                serde_json::Number::deserialize(de::value::MapAccessDeserializer::new(map))
                    .map(Nid::from)
            }
        }

        deserializer.deserialize_any(NidVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_wire_names() -> Result<(), serde_json::Error> {
        let spec = ComponentSpec {
            id: "x0c0s1b0n0".into(),
            component_type: "Node".into(),
            software_status: "AdminStatus".into(),
            enabled: Some(true),
            nid: Some(Nid::from(1)),
            locked: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&spec)?;
        assert_eq!(
            json,
            json!({
                "ID": "x0c0s1b0n0",
                "Type": "Node",
                "Enabled": true,
                "SoftwareStatus": "AdminStatus",
                "NID": 1,
                "Locked": true
            })
        );
        Ok(())
    }

    #[test]
    fn test_spec_missing_fields_default() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec = serde_json::from_value(json!({"State": "On"}))?;
        assert_eq!(spec.state, "On");
        assert_eq!(spec.id, "");
        assert_eq!(spec.component_type, "");
        assert_eq!(spec.enabled, None);
        assert!(!spec.locked);
        Ok(())
    }

    #[test]
    fn test_description_limit() {
        let mut spec = ComponentSpec {
            description: "é".repeat(DESCRIPTION_MAX_CHARS),
            ..Default::default()
        };
        assert!(spec.validate().is_empty());

        spec.description.push('x');
        let violations = spec.validate();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "description");
        assert_eq!(violations[0].constraint, "max=200");
    }

    #[test]
    fn test_nid_keeps_large_integers_exact() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec = serde_json::from_str(r#"{"NID": 18446744073709551615}"#)?;
        assert_eq!(spec.nid.as_ref().map(Nid::as_str), Some("18446744073709551615"));
        let out = serde_json::to_string(&spec)?;
        assert!(out.contains(r#""NID":18446744073709551615"#));
        Ok(())
    }

    #[test]
    fn test_nid_accepts_numeric_string() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec = serde_json::from_str(r#"{"NID": "42"}"#)?;
        assert_eq!(spec.nid.and_then(|n| n.as_i64()), Some(42));
        Ok(())
    }

    #[test]
    fn test_nid_rejects_garbage() {
        assert!(serde_json::from_str::<ComponentSpec>(r#"{"NID": "forty-two"}"#).is_err());
        assert!(serde_json::from_str::<ComponentSpec>(r#"{"NID": true}"#).is_err());
    }

    #[test]
    fn test_nid_parse_follows_json_number_grammar() {
        for ok in ["0", "-1", "12", "1.5", "1e9", "-0.25e-3"] {
            assert_eq!(Nid::parse(ok).map(|n| n.to_string()), Ok(ok.to_string()));
        }
        for bad in ["", "-", "01", "1.", ".5", "1e", "0x10", "1 2"] {
            assert!(Nid::parse(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_nid_beyond_u64_keeps_digits() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec =
            serde_json::from_str(r#"{"NID": 123456789012345678901234}"#)?;
        assert_eq!(
            spec.nid.as_ref().map(Nid::as_str),
            Some("123456789012345678901234")
        );
        let out = serde_json::to_string(&spec)?;
        assert!(out.contains(r#""NID":123456789012345678901234"#), "{out}");
        Ok(())
    }

    #[test]
    fn test_nid_keeps_fraction_digits() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec = serde_json::from_str(r#"{"NID": 1.50}"#)?;
        assert_eq!(spec.nid.as_ref().map(Nid::as_str), Some("1.50"));
        let out = serde_json::to_string(&spec)?;
        assert!(out.contains(r#""NID":1.50"#), "{out}");
        Ok(())
    }

    #[test]
    fn test_nid_numeric_string_is_emitted_as_number() -> Result<(), serde_json::Error> {
        let spec: ComponentSpec = serde_json::from_str(r#"{"NID": "1e3"}"#)?;
        let out = serde_json::to_string(&spec)?;
        assert_eq!(out, r#"{"ID":"","Type":"","NID":1e3}"#);
        Ok(())
    }

    #[test]
    fn test_status_ready_defaults_false() -> Result<(), serde_json::Error> {
        let status: ComponentStatus = serde_json::from_value(json!({}))?;
        assert!(!status.ready);
        assert_eq!(serde_json::to_value(&status)?, json!({"ready": false}));
        Ok(())
    }
}
