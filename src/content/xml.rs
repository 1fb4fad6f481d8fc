//! Legacy `content.xml` decoding (the `xmap-content` document).
//!
//! ```text
//! <xmap-content>
//!   <sheet>
//!     <topic xlink:href="...">
//!       <title>..</title>
//!       <marker-refs><marker-ref marker-id="priority-1"/></marker-refs>
//!       <labels><label>..</label></labels>
//!       <notes><plain>..</plain></notes>
//!       <children><topics type="attached"><topic>..</topic></topics></children>
//!     </topic>
//!     <title>Sheet 1</title>
//!   </sheet>
//! </xmap-content>
//! ```

use roxmltree::{Document, Node};

use super::{GenericNode, GenericSheet, clean_text};
use crate::archive::XML_CONTENT;
use crate::error::{Error, Result};

pub(super) fn parse(text: &str) -> Result<Vec<GenericSheet>> {
    let doc = Document::parse(text).map_err(|e| {
        let pos = e.pos();
        Error::MalformedContent {
            member: XML_CONTENT.to_string(),
            message: e.to_string(),
            line: Some(pos.row),
            column: Some(pos.col),
        }
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "xmap-content" {
        return Err(Error::malformed(
            XML_CONTENT,
            format!(
                "root element is <{}>, expected <xmap-content>",
                root.tag_name().name()
            ),
        ));
    }

    Ok(elements(root, "sheet").map(parse_sheet).collect())
}

fn parse_sheet(sheet: Node<'_, '_>) -> GenericSheet {
    GenericSheet {
        title: child(sheet, "title").map(text_of).unwrap_or_default(),
        root: child(sheet, "topic").map(|topic| parse_topic(topic, 0)),
    }
}

fn parse_topic(topic: Node<'_, '_>, ordinal: usize) -> GenericNode {
    let children = child(topic, "children")
        .into_iter()
        .flat_map(|c| elements(c, "topics"))
        .filter(|topics| topics.attribute("type").is_none_or(|t| t == "attached"))
        .flat_map(|topics| elements(topics, "topic"))
        .enumerate()
        .map(|(i, child)| parse_topic(child, i))
        .collect();

    let markers = child(topic, "marker-refs")
        .into_iter()
        .flat_map(|refs| elements(refs, "marker-ref"))
        .filter_map(|r| r.attribute("marker-id"))
        .map(clean_text)
        .filter(|id| !id.is_empty())
        .collect();

    let labels = child(topic, "labels")
        .into_iter()
        .flat_map(|labels| elements(labels, "label"))
        .map(text_of)
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .collect();

    let note = child(topic, "notes")
        .and_then(|notes| child(notes, "plain"))
        .map(text_of)
        .filter(|note| !note.is_empty());

    let mut link = None;
    let mut attributes = std::collections::BTreeMap::new();
    for attr in topic.attributes() {
        if attr.name() == "href" {
            link = Some(clean_text(attr.value()));
        } else {
            attributes.insert(attr.name().to_string(), clean_text(attr.value()));
        }
    }

    GenericNode {
        title: child(topic, "title").map(text_of).unwrap_or_default(),
        ordinal,
        children,
        markers,
        labels,
        note,
        link,
        attributes,
    }
}

fn elements<'a, 'input: 'a>(
    parent: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    parent
        .children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn child<'a, 'input: 'a>(parent: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    elements(parent, name).next()
}

/// All text below `node`, concatenated in document order.
fn text_of(node: Node<'_, '_>) -> String {
    let raw: String = node
        .descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    clean_text(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<xmap-content xmlns="urn:xmind:xmap:xmlns:content:2.0"
              xmlns:xlink="http://www.w3.org/1999/xlink" version="2.0">
  <sheet id="s1">
    <topic id="t0" structure-class="org.xmind.ui.map.unbalanced">
      <title>App</title>
      <children>
        <topics type="attached">
          <topic id="t1" xlink:href="https://example.com/login">
            <title>Login</title>
          </topic>
          <topic id="t2"><title>Logout</title></topic>
        </topics>
        <topics type="detached">
          <topic id="t3"><title>Floating</title></topic>
        </topics>
      </children>
    </topic>
    <title>Sheet 1</title>
  </sheet>
  <sheet id="s2"><title>Empty page</title></sheet>
</xmap-content>"#;

    #[test]
    fn reads_attached_topics_in_order() {
        let sheets = parse(LEGACY).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].title, "Sheet 1");
        assert!(sheets[1].root.is_none());

        let root = sheets[0].root.as_ref().unwrap();
        assert_eq!(root.title, "App");
        assert_eq!(
            root.attributes.get("structure-class").map(String::as_str),
            Some("org.xmind.ui.map.unbalanced")
        );
        let titles: Vec<_> = root.children.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Login", "Logout"]);
        assert_eq!(root.children[1].ordinal, 1);
        assert_eq!(root.children[0].link.as_deref(), Some("https://example.com/login"));
        assert!(!root.children[0].attributes.contains_key("href"));
    }

    #[test]
    fn multi_line_notes_are_kept_whole() {
        let xml = r#"<xmap-content><sheet><topic><title>Case</title>
            <notes><plain>line one
line two</plain></notes></topic></sheet></xmap-content>"#;
        let sheets = parse(xml).unwrap();
        let root = sheets[0].root.as_ref().unwrap();
        assert_eq!(root.note.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn rejects_foreign_documents() {
        assert!(matches!(
            parse("<html><body/></html>"),
            Err(Error::MalformedContent { .. })
        ));
        match parse("<xmap-content><sheet></xmap-content>") {
            Err(Error::MalformedContent { line, column, .. }) => {
                assert_eq!(line, Some(1));
                assert!(column.is_some());
            }
            other => panic!("expected malformed content, got {other:?}"),
        }
    }
}
