//! JSON payload envelope for published option values.
//!
//! ```json
//! { "key": "layer_height", "value": 0.2, "type": "float",
//!   "meta": { "label": "Layer height", "category": "Quality", "tooltip": "...",
//!             "unit": "mm", "min": 0 } }
//! ```
//!
//! `meta` is present only when the schema knows the key. Floats are rounded
//! to six significant digits. A float that JSON cannot express renders as
//! `"value": null, "type": "error"`.

use serde_json::{json, Map, Value};
use slicebridge_core::{OptionMetadata, OptionValue};

/// Significant digits kept when rendering floats.
pub const FLOAT_PRECISION: i32 = 6;

/// Render the envelope of `key` as a JSON string.
pub fn encode(key: &str, value: &OptionValue, meta: Option<&OptionMetadata>) -> String {
    to_json(key, value, meta).to_string()
}

/// Build the envelope of `key` as a JSON value.
pub fn to_json(key: &str, value: &OptionValue, meta: Option<&OptionMetadata>) -> Value {
    let mut envelope = Map::new();
    envelope.insert("key".to_string(), Value::String(key.to_string()));

    let (rendered, type_name) = match render_value(value) {
        Some(rendered) => (rendered, value.type_name()),
        None => (Value::Null, "error"),
    };
    envelope.insert("value".to_string(), rendered);
    envelope.insert("type".to_string(), Value::String(type_name.to_string()));

    if let Some(meta) = meta {
        envelope.insert("meta".to_string(), render_meta(meta));
    }
    Value::Object(envelope)
}

/// Envelope announcing the name of a published preset.
///
/// Filament presets carry the extruder they are loaded in.
pub fn preset_name(name: &str, extruder: Option<usize>) -> String {
    let mut envelope = Map::new();
    envelope.insert("key".to_string(), json!("preset_name"));
    envelope.insert("value".to_string(), json!(name));
    envelope.insert("type".to_string(), json!("string"));
    if let Some(idx) = extruder {
        envelope.insert("extruder".to_string(), json!(idx));
    }
    Value::Object(envelope).to_string()
}

/// Parse an envelope back into its key and typed value.
///
/// Float-or-percent values come back as plain strings. `null` values
/// (`"unknown"` and `"error"`) come back as [`OptionValue::Unknown`].
pub fn decode(payload: &str) -> Option<(String, OptionValue)> {
    let envelope: Value = serde_json::from_str(payload).ok()?;
    let key = envelope.get("key")?.as_str()?.to_string();
    let value = envelope.get("value")?;
    let parsed = match envelope.get("type")?.as_str()? {
        "bool" => OptionValue::Bool(value.as_bool()?),
        "int" => OptionValue::Int(value.as_i64()?),
        "float" => OptionValue::Float(value.as_f64()?),
        "string" => OptionValue::String(value.as_str()?.to_string()),
        "strings" => OptionValue::Strings(
            value
                .as_array()?
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<_>>()?,
        ),
        "floats" => OptionValue::Floats(
            value
                .as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<_>>()?,
        ),
        "ints" => OptionValue::Ints(
            value
                .as_array()?
                .iter()
                .map(Value::as_i64)
                .collect::<Option<_>>()?,
        ),
        "unknown" | "error" => OptionValue::Unknown,
        _ => return None,
    };
    Some((key, parsed))
}

/// Round `value` to [`FLOAT_PRECISION`] significant digits.
pub fn round_float(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let shift = FLOAT_PRECISION - 1 - magnitude;
    let rounded = if shift >= 0 {
        let factor = 10f64.powi(shift);
        (value * factor).round() / factor
    } else {
        let divisor = 10f64.powi(-shift);
        (value / divisor).round() * divisor
    };
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn render_float(value: f64) -> Option<Value> {
    serde_json::Number::from_f64(round_float(value)).map(Value::Number)
}

fn render_value(value: &OptionValue) -> Option<Value> {
    match value {
        OptionValue::Bool(v) => Some(Value::Bool(*v)),
        OptionValue::Int(v) => Some(json!(v)),
        OptionValue::Float(v) => render_float(*v),
        OptionValue::String(v) | OptionValue::FloatOrPercent(v) => Some(json!(v)),
        OptionValue::Strings(v) => Some(json!(v)),
        OptionValue::Floats(v) => v
            .iter()
            .map(|x| render_float(*x))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        OptionValue::Ints(v) => Some(json!(v)),
        OptionValue::Unknown => Some(Value::Null),
    }
}

fn render_meta(meta: &OptionMetadata) -> Value {
    let mut out = Map::new();
    out.insert("label".to_string(), json!(meta.label));
    out.insert("category".to_string(), json!(meta.category));
    out.insert("tooltip".to_string(), json!(meta.tooltip));

    if let Some(unit) = meta.unit.as_deref().filter(|u| !u.is_empty()) {
        out.insert("unit".to_string(), json!(unit));
    }
    if let Some(min) = meta.min.and_then(render_float) {
        out.insert("min".to_string(), min);
    }
    if let Some(max) = meta.max.and_then(render_float) {
        out.insert("max".to_string(), max);
    }
    if let Some(keys) = meta.enum_keys.as_ref().filter(|k| !k.is_empty()) {
        let options: Vec<Value> = keys
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        out.insert("options".to_string(), Value::Array(options));
    }
    if !meta.enum_values.is_empty() {
        out.insert("enum_values".to_string(), json!(meta.enum_values));
    }
    if !meta.enum_labels.is_empty() {
        out.insert("enum_labels".to_string(), json!(meta.enum_labels));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_envelope() {
        let payload = encode("layer_height", &OptionValue::Float(0.2), None);
        assert_eq!(
            payload,
            r#"{"key":"layer_height","value":0.2,"type":"float"}"#
        );
    }

    #[test]
    fn test_float_precision() {
        assert_eq!(round_float(0.123456789), 0.123457);
        assert_eq!(round_float(1234567.0), 1234570.0);
        assert_eq!(round_float(-2.5), -2.5);
    }

    #[test]
    fn test_non_finite_float_is_error() {
        let payload = encode("x", &OptionValue::Float(f64::NAN), None);
        assert_eq!(payload, r#"{"key":"x","value":null,"type":"error"}"#);

        let payload = encode("x", &OptionValue::Floats(vec![1.0, f64::INFINITY]), None);
        assert!(payload.contains(r#""type":"error""#));
    }

    #[test]
    fn test_unknown_value() {
        let payload = encode("x", &OptionValue::Unknown, None);
        assert_eq!(payload, r#"{"key":"x","value":null,"type":"unknown"}"#);
    }

    #[test]
    fn test_float_or_percent_is_string() {
        let payload = encode("w", &OptionValue::FloatOrPercent("50%".into()), None);
        assert_eq!(payload, r#"{"key":"w","value":"50%","type":"string"}"#);
    }

    #[test]
    fn test_string_escaping() {
        let payload = encode("g", &OptionValue::String("G28\n\"home\"\t\\".into()), None);
        assert!(payload.contains(r#""value":"G28\n\"home\"\t\\""#));
        let (_, value) = decode(&payload).unwrap();
        assert_eq!(value, OptionValue::String("G28\n\"home\"\t\\".into()));
    }

    #[test]
    fn test_meta_rendering() {
        let mut keys = std::collections::BTreeMap::new();
        keys.insert("aligned".to_string(), 1);
        keys.insert("nearest".to_string(), 0);
        let meta = OptionMetadata {
            enum_keys: Some(keys),
            enum_values: vec!["nearest".into(), "aligned".into()],
            ..OptionMetadata::new("Seam position", "Quality")
                .with_unit("mm")
                .with_bounds(Some(0.0), None)
        };

        let value: Value =
            serde_json::from_str(&encode("seam_position", &OptionValue::Int(1), Some(&meta)))
                .unwrap();
        let meta = &value["meta"];
        assert_eq!(meta["label"], "Seam position");
        assert_eq!(meta["unit"], "mm");
        assert_eq!(meta["min"], 0.0);
        assert!(meta.get("max").is_none());
        assert!(meta.get("enum_labels").is_none());
        assert_eq!(meta["options"][0]["key"], "aligned");
        assert_eq!(meta["options"][0]["value"], 1);
        assert_eq!(meta["enum_values"][1], "aligned");
    }

    #[test]
    fn test_no_meta_without_schema_entry() {
        let value: Value =
            serde_json::from_str(&encode("k", &OptionValue::Bool(true), None)).unwrap();
        assert!(value.get("meta").is_none());
    }

    #[test]
    fn test_preset_name_envelope() {
        assert_eq!(
            preset_name("P1", None),
            r#"{"key":"preset_name","value":"P1","type":"string"}"#
        );
        assert_eq!(
            preset_name("PLA", Some(1)),
            r#"{"key":"preset_name","value":"PLA","type":"string","extruder":1}"#
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not json").is_none());
        assert!(decode(r#"{"key":"k","value":1,"type":"quaternion"}"#).is_none());
        assert!(decode(r#"{"key":"k","value":"x","type":"int"}"#).is_none());
    }
}
