// src/vod.rs
//! Typed views over collection API payloads.
//!
//! Upstream shape: `{ list: [...], total, page, pagecount, class: [...] }`.
//! Every field is optional and numbers frequently arrive as strings, so the
//! payload is read leniently from a `serde_json::Value` instead of derived
//! wholesale.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One title as returned by a collection API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VodRecord {
    #[serde(default, deserialize_with = "id_string")]
    pub vod_id: String,
    #[serde(default, deserialize_with = "id_string")]
    pub vod_name: String,
    #[serde(default, deserialize_with = "id_string")]
    pub vod_pic: String,
    /// Raw multi-source play-list (`name$url#...$$$...`).
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_play_url: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_remarks: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_year: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_area: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_actor: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_content: Option<String>,
    #[serde(default, deserialize_with = "opt_string", skip_serializing_if = "Option::is_none")]
    pub vod_time: Option<String>,

    /// Set when the record came through an aggregate query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    /// Everything else the upstream sent, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VodRecord {
    pub fn tagged(mut self, key: &str, name: &str) -> Self {
        self.source_key = Some(key.to_string());
        self.source_name = Some(name.to_string());
        self
    }
}

/// Category entry from the `class` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VodClass {
    #[serde(default, deserialize_with = "id_u32")]
    pub type_id: u32,
    #[serde(default)]
    pub type_name: String,
    #[serde(default, deserialize_with = "opt_u32", skip_serializing_if = "Option::is_none")]
    pub type_pid: Option<u32>,
}

/// Normalized upstream payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VodPage {
    pub list: Vec<VodRecord>,
    pub total: Option<u64>,
    pub page: Option<u32>,
    pub pagecount: Option<u32>,
    pub class: Vec<VodClass>,
}

impl VodPage {
    /// Never fails: missing fields default, unreadable entries are skipped.
    pub fn from_value(v: &Value) -> Self {
        let Some(obj) = v.as_object() else {
            tracing::debug!("payload is not a JSON object");
            return Self::default();
        };
        Self {
            list: entries(obj.get("list"), "list"),
            total: obj.get("total").and_then(coerce_u64),
            page: obj.get("page").and_then(coerce_u32),
            pagecount: obj.get("pagecount").and_then(coerce_u32),
            class: entries(obj.get("class"), "class"),
        }
    }
}

fn entries<T: for<'de> Deserialize<'de>>(v: Option<&Value>, field: &str) -> Vec<T> {
    let Some(items) = v.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match T::deserialize(item) {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::debug!(field, error = %e, "skipping unreadable entry");
                None
            }
        })
        .collect()
}

/// Accepts `12`, `"12"`, `" 12 "`, `12.0`.
pub fn coerce_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn coerce_u32(v: &Value) -> Option<u32> {
    coerce_u64(v).and_then(|n| u32::try_from(n).ok())
}

fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Strings stay strings, numbers are rendered, null/absent is `None`.
fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(coerce_u32(&Value::deserialize(d)?))
}

fn id_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(coerce_u32(&Value::deserialize(d)?).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_fields_are_coerced_and_defaulted() {
        let v = json!({
            "list": [
                {"vod_id": 41, "vod_name": "A", "vod_pic": "p", "vod_play_url": "x$y"},
                {"vod_id": "42", "vod_name": "B", "vod_lang": "国语"},
                "garbage"
            ],
            "total": "140",
            "page": "2",
            "pagecount": 7
        });
        let p = VodPage::from_value(&v);
        assert_eq!(p.list.len(), 2);
        assert_eq!(p.list[0].vod_id, "41");
        assert_eq!(p.list[1].vod_id, "42");
        assert_eq!(p.list[1].extra["vod_lang"], "国语");
        assert_eq!(p.total, Some(140));
        assert_eq!(p.page, Some(2));
        assert_eq!(p.pagecount, Some(7));
        assert!(p.class.is_empty());
    }

    #[test]
    fn non_object_payload_is_empty() {
        assert_eq!(VodPage::from_value(&json!([1, 2])), VodPage::default());
        assert_eq!(VodPage::from_value(&json!({})), VodPage::default());
    }

    #[test]
    fn class_table_parses_string_ids() {
        let v = json!({"class": [{"type_id": "1", "type_name": "电影"}, {"type_id": 2, "type_name": "连续剧", "type_pid": "0"}]});
        let p = VodPage::from_value(&v);
        assert_eq!(p.class[0].type_id, 1);
        assert_eq!(p.class[1].type_pid, Some(0));
    }

    #[test]
    fn tagging_survives_serialization() {
        let r = VodRecord {
            vod_id: "1".into(),
            ..Default::default()
        }
        .tagged("liangzi", "量子资源");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["source_key"], "liangzi");
        assert_eq!(v["source_name"], "量子资源");
    }
}
