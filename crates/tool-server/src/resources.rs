//! Published UI resources.
//!
//! Each definition is parsed into a typed [`UiResourceDefinition`] once at
//! startup and re-serialized to compact JSON, so every read of the same id
//! returns identical bytes.

use std::collections::BTreeMap;

use orderchat_core::tool::{ResourceContents, ResourceDescriptor};
use orderchat_core::ui::UiResourceDefinition;
use orderchat_core::{ui_resource_id, ui_resource_uri};

pub const ORDER_TABLE: &str = "order_table";
pub const ORDER_DETAIL: &str = "order_detail";

const MIME_TYPE: &str = "application/json";

const BUILTIN: &[(&str, &str)] = &[
    (ORDER_TABLE, include_str!("ui_resources/order_table.json")),
    (ORDER_DETAIL, include_str!("ui_resources/order_detail.json")),
];

struct Entry {
    definition: UiResourceDefinition,
    text: String,
}

/// The immutable set of UI resources the server publishes.
pub struct UiResourceCatalog {
    entries: BTreeMap<String, Entry>,
}

impl UiResourceCatalog {
    /// The order table and order detail layouts.
    pub fn builtin() -> Result<Self, serde_json::Error> {
        let mut entries = BTreeMap::new();
        for (id, raw) in BUILTIN {
            let definition: UiResourceDefinition = serde_json::from_str(raw)?;
            let text = serde_json::to_string(&definition)?;
            entries.insert((*id).to_string(), Entry { definition, text });
        }
        Ok(Self { entries })
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&UiResourceDefinition> {
        self.entries.get(id).map(|e| &e.definition)
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        self.entries
            .keys()
            .map(|id| ResourceDescriptor {
                uri: ui_resource_uri(id),
                name: id.clone(),
                description: format!("UI schema for {id}"),
                mime_type: MIME_TYPE.into(),
            })
            .collect()
    }

    /// Contents of `uri`, or `None` when nothing is published there.
    pub fn read(&self, uri: &str) -> Option<ResourceContents> {
        let id = ui_resource_id(uri)?;
        let entry = self.entries.get(id)?;
        Some(ResourceContents {
            uri: uri.to_string(),
            mime_type: Some(MIME_TYPE.into()),
            text: Some(entry.text.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderchat_core::ui::TableAction;

    #[test]
    fn builtin_definitions_parse() {
        let catalog = UiResourceCatalog::builtin().unwrap();
        assert_eq!(catalog.ids(), vec!["order_detail", "order_table"]);

        match catalog.get(ORDER_TABLE).unwrap() {
            UiResourceDefinition::Table {
                columns, actions, ..
            } => {
                assert_eq!(columns.len(), 3);
                assert_eq!(columns[1].badge, Some(true));
                assert_eq!(
                    actions.as_deref().unwrap()[0],
                    TableAction {
                        label: "View detail".into(),
                        action: "get_order_detail".into(),
                        params: Some(vec!["id".into()]),
                    }
                );
            }
            other => panic!("expected table, got {other:?}"),
        }
        assert_eq!(catalog.get(ORDER_DETAIL).unwrap().title(), "Order detail");
    }

    #[test]
    fn reads_are_byte_stable() {
        let catalog = UiResourceCatalog::builtin().unwrap();
        let first = catalog.read("ui-resource://order_table").unwrap();
        let second = catalog.read("ui-resource://order_table").unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.mime_type.as_deref(), Some("application/json"));

        let parsed: UiResourceDefinition =
            serde_json::from_str(first.text.as_deref().unwrap()).unwrap();
        assert_eq!(parsed.id(), "order_table");
    }

    #[test]
    fn unknown_or_malformed_uris_are_absent() {
        let catalog = UiResourceCatalog::builtin().unwrap();
        assert!(catalog.read("ui-resource://nope").is_none());
        assert!(catalog.read("ui-resource://").is_none());
        assert!(catalog.read("file:///etc/passwd").is_none());
    }

    #[test]
    fn listing_uses_resource_uris() {
        let catalog = UiResourceCatalog::builtin().unwrap();
        let listed = catalog.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].uri, "ui-resource://order_table");
        assert_eq!(listed[1].mime_type, "application/json");
    }
}
