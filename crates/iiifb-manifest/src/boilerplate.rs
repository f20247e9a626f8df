use iiifb_domain::Manifest;
use serde_json::json;

/// Static starting point for every emitted manifest. Descriptive metadata
/// and painted resources are layered on top.
pub fn boilerplate_manifest() -> Manifest {
    Manifest {
        kind: "Manifest".into(),
        provider: vec![json!({
            "id": "https://library.leeds.ac.uk/info/1600/about",
            "type": "Agent",
            "label": { "en": ["University of Leeds"] },
            "homepage": [
                {
                    "id": "https://library.leeds.ac.uk/",
                    "type": "Text",
                    "label": { "en": ["Leeds University Library Homepage"] },
                    "format": "text/html"
                }
            ],
            "logo": [
                {
                    "id": "https://resources.library.leeds.ac.uk/logo/black.png",
                    "type": "Image",
                    "format": "image/png",
                    "height": 61,
                    "width": 300
                }
            ]
        })],
        label: None,
        metadata: Vec::new(),
        rights: None,
        homepage: None,
        public_id: None,
        painted_resources: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boilerplate_has_provider_and_nothing_else() {
        let manifest = boilerplate_manifest();
        assert_eq!(manifest.kind, "Manifest");
        assert_eq!(manifest.provider.len(), 1);
        assert_eq!(manifest.provider[0]["type"], "Agent");
        assert!(manifest.label.is_none());
        assert!(manifest.metadata.is_empty());
        assert!(manifest.painted_resources.is_empty());
    }
}
