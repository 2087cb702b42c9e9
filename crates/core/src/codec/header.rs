//! The JSON metadata line embedded at the top of saved scripts.
//!
//! Writing goes through typed structs so the key order is deterministic and
//! a second save of an unchanged document is byte-identical. Reading walks a
//! loose `serde_json::Value` instead: unknown fields are ignored and
//! malformed item entries are skipped, but a selector without `group` or
//! `items` fails the whole load.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, SerializeTuple, Serializer};
use serde_json::Value;

use crate::document::State;
use crate::document::node::{ItemKind, Param};
use crate::error::{Error, Result};

pub(crate) const METADATA_PREFIX: &str = "--[==[PTK:";
pub(crate) const METADATA_SUFFIX: &str = "]==]";

/// Serialise the metadata line, `--[==[PTK:<json>]==]\n`, embedding the body
/// checksum. Fails with [`Error::ForbiddenSequence`] if the JSON itself would
/// contain the comment terminator.
pub(crate) fn metadata_line(state: &State, checksum: u64) -> Result<String> {
    let header = Header {
        version: state.version,
        checksum: format!("{checksum:016x}"),
        selectors: state
            .selectors
            .iter()
            .map(|sel| HeaderSelector {
                group: &sel.name,
                items: sel
                    .items
                    .iter()
                    .map(|item| match &item.kind {
                        ItemKind::Value { value } => HeaderItem::Value {
                            name: &item.name,
                            value,
                        },
                        ItemKind::Animation {
                            script_name,
                            params,
                        } => HeaderItem::Animation {
                            script: script_name,
                            n: &item.name,
                            params,
                        },
                    })
                    .collect(),
            })
            .collect(),
        psd: &state.psd_path,
        label: &state.label,
        exclusive_support_default: state.exclusive_support_default,
        information: state
            .information
            .as_deref()
            .filter(|text| !text.is_empty()),
        default_character_id: state
            .default_character_id
            .as_deref()
            .filter(|id| !id.is_empty()),
    };
    let json = serde_json::to_string(&header)?;
    if json.contains(METADATA_SUFFIX) {
        return Err(Error::ForbiddenSequence);
    }
    Ok(format!("{METADATA_PREFIX}{json}{METADATA_SUFFIX}\n"))
}

#[derive(serde::Serialize)]
struct Header<'a> {
    version: i32,
    checksum: String,
    selectors: Vec<HeaderSelector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    psd: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    label: &'a str,
    #[serde(skip_serializing_if = "skip_when_true")]
    exclusive_support_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    information: Option<&'a str>,
    #[serde(rename = "defaultCharacterId", skip_serializing_if = "Option::is_none")]
    default_character_id: Option<&'a str>,
}

fn skip_when_true(value: &bool) -> bool {
    *value
}

#[derive(serde::Serialize)]
struct HeaderSelector<'a> {
    group: &'a str,
    items: Vec<HeaderItem<'a>>,
}

/// Value items serialise as a `[name, value]` pair, animation items as an
/// object with `script`, `n`, and `params` keys.
enum HeaderItem<'a> {
    Value {
        name: &'a str,
        value: &'a str,
    },
    Animation {
        script: &'a str,
        n: &'a str,
        params: &'a [Param],
    },
}

impl Serialize for HeaderItem<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            HeaderItem::Value { name, value } => {
                let mut tuple = serializer.serialize_tuple(2)?;
                tuple.serialize_element(name)?;
                tuple.serialize_element(value)?;
                tuple.end()
            }
            HeaderItem::Animation { script, n, params } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("script", script)?;
                map.serialize_entry("n", n)?;
                map.serialize_entry("params", &ParamPairs(params))?;
                map.end()
            }
        }
    }
}

struct ParamPairs<'a>(&'a [Param]);

impl Serialize for ParamPairs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for param in self.0 {
            seq.serialize_element(&(&param.key, &param.value))?;
        }
        seq.end()
    }
}

/// The metadata of a loaded script, before ids are assigned.
#[derive(Debug)]
pub(crate) struct ParsedHeader {
    pub version: i32,
    pub stored_checksum: u64,
    pub psd_path: String,
    pub label: Option<String>,
    pub exclusive_support_default: bool,
    pub information: Option<String>,
    pub default_character_id: Option<String>,
    pub selectors: Vec<ParsedSelector>,
}

#[derive(Debug)]
pub(crate) struct ParsedSelector {
    pub group: String,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug)]
pub(crate) enum ParsedItem {
    Value {
        name: String,
        value: String,
    },
    Animation {
        script_name: String,
        name: String,
        params: Vec<(String, String)>,
    },
}

pub(crate) fn parse_metadata(json: &str) -> Result<ParsedHeader> {
    let root: Value = serde_json::from_str(json)
        .map_err(|_| Error::InvalidFormat("metadata is not valid JSON"))?;
    let obj = root
        .as_object()
        .ok_or(Error::InvalidFormat("metadata root is not an object"))?;

    let version = obj
        .get("version")
        .and_then(Value::as_i64)
        .unwrap_or(1) as i32;
    let stored_checksum = obj
        .get("checksum")
        .and_then(Value::as_str)
        .map(parse_checksum)
        .unwrap_or(0);
    let psd_path = string_field(obj, "psd").unwrap_or_default();
    let label = string_field(obj, "label");
    let exclusive_support_default = obj
        .get("exclusive_support_default")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let information = string_field(obj, "information");
    let default_character_id = string_field(obj, "defaultCharacterId");

    let mut selectors = Vec::new();
    if let Some(entries) = obj.get("selectors").and_then(Value::as_array) {
        for entry in entries {
            selectors.push(parse_selector(entry)?);
        }
    }

    Ok(ParsedHeader {
        version,
        stored_checksum,
        psd_path,
        label,
        exclusive_support_default,
        information,
        default_character_id,
        selectors,
    })
}

fn string_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Parse the leading hex digits of a stored checksum; anything unparsable
/// reads as zero.
fn parse_checksum(text: &str) -> u64 {
    let digits: String = text
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .take(16)
        .collect();
    u64::from_str_radix(&digits, 16).unwrap_or(0)
}

fn parse_selector(entry: &Value) -> Result<ParsedSelector> {
    let obj = entry
        .as_object()
        .ok_or(Error::InvalidFormat("selector entry is not an object"))?;
    let group = obj
        .get("group")
        .and_then(Value::as_str)
        .ok_or(Error::InvalidFormat("selector entry has no group"))?
        .to_owned();
    let entries = obj
        .get("items")
        .and_then(Value::as_array)
        .ok_or(Error::InvalidFormat("selector entry has no items"))?;

    let mut items = Vec::new();
    for item in entries {
        match item {
            Value::Object(fields) => {
                // Objects without a script name are an unknown shape; skip.
                let Some(script_name) = fields.get("script").and_then(Value::as_str) else {
                    continue;
                };
                let name = fields
                    .get("n")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                let mut params = Vec::new();
                if let Some(pairs) = fields.get("params").and_then(Value::as_array) {
                    for pair in pairs {
                        if let Some([key, value]) = pair.as_array().map(Vec::as_slice) {
                            if let (Some(key), Some(value)) = (key.as_str(), value.as_str()) {
                                params.push((key.to_owned(), value.to_owned()));
                            }
                        }
                    }
                }
                items.push(ParsedItem::Animation {
                    script_name: script_name.to_owned(),
                    name,
                    params,
                });
            }
            Value::Array(pair) if pair.len() == 2 => {
                if let (Some(name), Some(value)) = (pair[0].as_str(), pair[1].as_str()) {
                    items.push(ParsedItem::Value {
                        name: name.to_owned(),
                        value: value.to_owned(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(ParsedSelector { group, items })
}
