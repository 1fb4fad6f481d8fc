//! Typed outline: Workbook → Sheet → Topic.
//!
//! [`build`] is a purely structural transform over a decoded
//! [`GenericNodeTree`]: it numbers depths from the central topic, keeps
//! sibling order, and copies markers, labels and notes onto each [`Topic`]
//! without interpreting them.

use std::collections::BTreeMap;

use crate::content::{ContentFormat, GenericNode, GenericNodeTree};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workbook {
    pub format: ContentFormat,
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn topic_count(&self) -> usize {
        self.sheets.iter().map(|s| s.root.descendants().count()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub title: String,
    /// The central topic; depth 0.
    pub root: Topic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    pub ordinal: usize,
    pub depth: usize,
    pub children: Vec<Topic>,
    pub labels: Vec<String>,
    pub markers: Vec<String>,
    pub note: Option<String>,
    pub link: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl Topic {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// This topic and everything below it, in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

/// Pre-order traversal over a topic subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a Topic>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Topic;

    fn next(&mut self) -> Option<Self::Item> {
        let topic = self.stack.pop()?;
        self.stack.extend(topic.children.iter().rev());
        Some(topic)
    }
}

/// Turn a decoded tree into a [`Workbook`]. Sheets without a central topic
/// are dropped, so a container with no topics yields an empty workbook.
pub fn build(tree: GenericNodeTree) -> Workbook {
    let sheets = tree
        .sheets
        .into_iter()
        .filter_map(|sheet| {
            let root = sheet.root?;
            Some(Sheet {
                title: sheet.title,
                root: build_topic(root, 0, 0),
            })
        })
        .collect();

    Workbook {
        format: tree.format,
        sheets,
    }
}

fn build_topic(node: GenericNode, ordinal: usize, depth: usize) -> Topic {
    let children = node
        .children
        .into_iter()
        .enumerate()
        .map(|(i, child)| build_topic(child, i, depth + 1))
        .collect();

    let mut labels: Vec<String> = Vec::with_capacity(node.labels.len());
    for label in node.labels {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    Topic {
        title: node.title,
        ordinal,
        depth,
        children,
        labels,
        markers: node.markers,
        note: node.note,
        link: node.link,
        attributes: node.attributes,
    }
}
