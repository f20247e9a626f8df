use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// IIIF language map: language tag (or "none") → list of values.
pub type LanguageMap = BTreeMap<String, Vec<String>>;

/// Build a single-language map in one call.
pub fn language_map(lang: &str, values: Vec<String>) -> LanguageMap {
    let mut map = LanguageMap::new();
    map.insert(lang.to_string(), values);
    map
}

// ── Manifest ──────────────────────────────────────────────────────────────────

/// A IIIF Presentation v3 manifest as this worker emits it.
///
/// There is deliberately no `items` field: canvases are synthesised by the
/// IIIF cloud service from `paintedResources`, which is always present even
/// when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "type")]
    pub kind: String,
    pub provider: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<LanguageMap>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<Vec<Homepage>>,
    #[serde(rename = "publicId", skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(rename = "paintedResources", default)]
    pub painted_resources: Vec<PaintedResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Homepage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub language: Vec<String>,
    pub label: LanguageMap,
}

// ── Painted resources ─────────────────────────────────────────────────────────

/// One asset painted onto a cloud-service-synthesised canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintedResource {
    #[serde(rename = "canvasPainting")]
    pub canvas_painting: CanvasPainting,
    pub asset: Asset,
    /// Set to `true` only when the downstream service must reprocess the
    /// binary; left absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reingest: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasPainting {
    #[serde(rename = "canvasId")]
    pub canvas_id: String,
    /// 0-based position across the whole manifest traversal.
    #[serde(rename = "canvasOrder")]
    pub canvas_order: u32,
    pub label: LanguageMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub space: u32,
    pub origin: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painted(order: u32) -> PaintedResource {
        PaintedResource {
            canvas_painting: CanvasPainting {
                canvas_id: format!("https://cs.example/2/canvases/p_{order}.jpg"),
                canvas_order: order,
                label: language_map("en", vec![format!("{order}.jpg")]),
            },
            asset: Asset {
                id: format!("p_{order}.jpg"),
                media_type: "image/jpeg".into(),
                space: 5,
                origin: format!("s3://bucket/ag/{order}.jpg"),
            },
            reingest: None,
        }
    }

    #[test]
    fn manifest_serialises_without_items() {
        let manifest = Manifest {
            kind: "Manifest".into(),
            provider: vec![],
            label: Some(language_map("en", vec!["A title".into()])),
            metadata: vec![],
            rights: None,
            homepage: None,
            public_id: Some("https://cs.example/2/cc/abcd".into()),
            painted_resources: vec![painted(0)],
        };
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value.get("items").is_none());
        assert_eq!(value["type"], "Manifest");
        assert_eq!(value["publicId"], "https://cs.example/2/cc/abcd");
        assert_eq!(value["paintedResources"][0]["canvasPainting"]["canvasOrder"], 0);
    }

    #[test]
    fn painted_resources_key_present_when_empty() {
        let manifest = Manifest {
            kind: "Manifest".into(),
            provider: vec![],
            label: None,
            metadata: vec![],
            rights: None,
            homepage: None,
            public_id: None,
            painted_resources: vec![],
        };
        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value["paintedResources"].as_array().unwrap().is_empty());
    }

    #[test]
    fn reingest_flag_absent_unless_set() {
        let mut pr = painted(3);
        let value = serde_json::to_value(&pr).unwrap();
        assert!(value.get("reingest").is_none());

        pr.reingest = Some(true);
        let value = serde_json::to_value(&pr).unwrap();
        assert_eq!(value["reingest"], true);
    }
}
