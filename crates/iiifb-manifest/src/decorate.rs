use iiifb_domain::{Homepage, LanguageMap, Manifest, MetadataEntry, language_map};
use serde_json::Value;

use crate::error::BuildError;

/// Shown when the catalogue record carries no usable title.
const NO_TITLE: &str = "[NO TITLE]";

/// Catalogue keys copied into `metadata[]`, with the language tag each value
/// is published under. Untranslated identifiers and measurements use "none".
const METADATA_KEYS: &[(&str, &str)] = &[
    ("Shelfmark", "none"),
    ("Object Number", "none"),
    ("Date", "none"),
    ("Description", "en"),
    ("Dimensions", "none"),
    ("Notes", "en"),
    ("Collections", "en"),
    ("Credit Line", "none"),
    ("Attribution", "en"),
    ("Medium", "en"),
    ("Technique", "en"),
    ("Support", "en"),
    ("Creators", "en"),
];

/// Phase A of manifest assembly: label, metadata entries, rights and
/// homepage from the catalogue's descriptive metadata document.
pub fn add_descriptive_metadata(
    manifest: &mut Manifest,
    descriptive_metadata: &Value,
) -> Result<(), BuildError> {
    let data = descriptive_metadata.get("data").ok_or(BuildError::NoData)?;

    let title = data["Title"]
        .as_str()
        .or_else(|| data["title"].as_str())
        .unwrap_or(NO_TITLE)
        .to_string();
    manifest.label = Some(language_map("en", vec![title.clone()]));

    for (key, lang) in METADATA_KEYS {
        if let Some(entry) = metadata_entry(data, key, lang) {
            manifest.metadata.push(entry);
        }
    }

    match &data["Rights"] {
        Value::Array(rights) => {
            if let Some(first) = rights.first().and_then(Value::as_str) {
                manifest.rights = Some(first.to_string());
            }
        }
        Value::String(rights) if !rights.is_empty() => {
            manifest.rights = Some(rights.clone());
        }
        _ => {}
    }

    if let Some(homepage) = data["Homepage"].as_str() {
        manifest.homepage = Some(vec![Homepage {
            id: homepage.to_string(),
            kind: "Text".into(),
            format: "text/html".into(),
            language: vec!["en".into()],
            label: language_map("en", vec![format!("Homepage for {title}")]),
        }]);
    }

    Ok(())
}

/// One metadata entry for `key`, or None when the key is missing or the
/// value is an empty list.
fn metadata_entry(data: &Value, key: &str, lang: &str) -> Option<MetadataEntry> {
    let value = data.get(key)?;
    let values: Vec<String> = match value {
        Value::Array(items) => items.iter().map(scalar_to_string).collect(),
        Value::Null => return None,
        scalar => vec![scalar_to_string(scalar)],
    };
    if values.is_empty() {
        return None;
    }

    let mut value_map = LanguageMap::new();
    value_map.insert(lang.to_string(), values);
    Some(MetadataEntry {
        label: language_map("en", vec![key.to_string()]),
        value: value_map,
    })
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boilerplate::boilerplate_manifest;
    use serde_json::json;

    fn decorate(data: Value) -> Manifest {
        let mut manifest = boilerplate_manifest();
        add_descriptive_metadata(&mut manifest, &json!({ "data": data })).unwrap();
        manifest
    }

    #[test]
    fn title_sets_label() {
        let manifest = decorate(json!({ "Title": "A painting" }));
        assert_eq!(manifest.label.unwrap()["en"], vec!["A painting"]);
    }

    #[test]
    fn lowercase_title_is_tolerated() {
        let manifest = decorate(json!({ "title": "lower title" }));
        assert_eq!(manifest.label.unwrap()["en"], vec!["lower title"]);
    }

    #[test]
    fn missing_title_uses_placeholder() {
        let manifest = decorate(json!({ "Shelfmark": "MS 1" }));
        assert_eq!(manifest.label.unwrap()["en"], vec!["[NO TITLE]"]);
    }

    #[test]
    fn no_data_element_is_an_error() {
        let mut manifest = boilerplate_manifest();
        let err = add_descriptive_metadata(&mut manifest, &json!({})).unwrap_err();
        assert!(matches!(err, BuildError::NoData));
    }

    #[test]
    fn metadata_entries_use_fixed_language_tags() {
        let manifest = decorate(json!({
            "Title": "T",
            "Shelfmark": "MS 102",
            "Description": "An illuminated manuscript",
        }));
        let shelfmark = manifest
            .metadata
            .iter()
            .find(|m| m.label["en"] == vec!["Shelfmark"])
            .unwrap();
        assert_eq!(shelfmark.value["none"], vec!["MS 102"]);

        let description = manifest
            .metadata
            .iter()
            .find(|m| m.label["en"] == vec!["Description"])
            .unwrap();
        assert_eq!(description.value["en"], vec!["An illuminated manuscript"]);
    }

    #[test]
    fn array_values_are_used_verbatim() {
        let manifest = decorate(json!({
            "Title": "T",
            "Creators": ["First Artist", "Second Artist"],
        }));
        let creators = manifest
            .metadata
            .iter()
            .find(|m| m.label["en"] == vec!["Creators"])
            .unwrap();
        assert_eq!(creators.value["en"], vec!["First Artist", "Second Artist"]);
    }

    #[test]
    fn missing_and_empty_keys_are_skipped() {
        let manifest = decorate(json!({
            "Title": "T",
            "Collections": [],
        }));
        assert!(manifest.metadata.is_empty());
    }

    #[test]
    fn rights_takes_first_array_element() {
        let manifest = decorate(json!({
            "Title": "T",
            "Rights": ["https://creativecommons.org/licenses/by/4.0/", "ignored"],
        }));
        assert_eq!(
            manifest.rights.as_deref(),
            Some("https://creativecommons.org/licenses/by/4.0/")
        );
    }

    #[test]
    fn empty_rights_is_skipped() {
        let manifest = decorate(json!({ "Title": "T", "Rights": [] }));
        assert!(manifest.rights.is_none());
    }

    #[test]
    fn homepage_is_synthesised_with_title() {
        let manifest = decorate(json!({
            "Title": "A painting",
            "Homepage": "https://explore.library.leeds.ac.uk/special-collections/12",
        }));
        let homepage = manifest.homepage.unwrap();
        assert_eq!(homepage.len(), 1);
        assert_eq!(homepage[0].kind, "Text");
        assert_eq!(homepage[0].format, "text/html");
        assert_eq!(homepage[0].language, vec!["en"]);
        assert_eq!(homepage[0].label["en"], vec!["Homepage for A painting"]);
    }
}
