//! Reading items out of an MSBuild project file.
//!
//! Every element directly below an `<ItemGroup>` is an item. Its metadata
//! can be written as XML attributes or as child elements; both forms are
//! collected, attributes first, each in document order.

use std::{fs, path::Path};

use roxmltree::{Document, Node};
use tracing::trace;

use crate::{
    error::{DacfetchError, ErrorContext},
    DacfetchResult,
};

/// One item declared in a project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorItem {
    item_type: String,
    attributes: Vec<(String, String)>,
}

impl DescriptorItem {
    pub fn new(item_type: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self {
            item_type: item_type.into(),
            attributes,
        }
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Value of the first attribute or metadata element named `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }
}

/// Reads all items of the project file at `path`.
pub fn read_items(path: &Path) -> DacfetchResult<Vec<DescriptorItem>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading project file {}", path.display()))?;
    parse_items(path, &content)
}

/// Parses items from project file text. `path` is only used in errors.
pub fn parse_items(path: &Path, content: &str) -> DacfetchResult<Vec<DescriptorItem>> {
    let document = Document::parse(content).map_err(|err| {
        DacfetchError::InvalidDescriptor {
            path: path.to_path_buf(),
            source: err,
        }
    })?;

    let items = document
        .descendants()
        .filter(|node| node.has_tag_name("ItemGroup"))
        .flat_map(|group| group.children().filter(Node::is_element))
        .map(item_from_node)
        .collect::<Vec<_>>();

    trace!(count = items.len(), "read project items");
    Ok(items)
}

fn item_from_node(node: Node) -> DescriptorItem {
    let mut attributes = node
        .attributes()
        .map(|attr| (attr.name().to_string(), attr.value().to_string()))
        .collect::<Vec<_>>();

    for metadata in node.children().filter(Node::is_element) {
        let value = metadata.text().unwrap_or_default().trim().to_string();
        attributes.push((metadata.tag_name().name().to_string(), value));
    }

    DescriptorItem::new(node.tag_name().name(), attributes)
}
