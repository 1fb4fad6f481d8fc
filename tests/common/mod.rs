//! Workbook fixtures built with the `zip` crate, independent of the reader
//! under test.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Zip the given members, deflated, in order.
pub fn container(members: &[(&str, &str)]) -> Vec<u8> {
    container_with(members, deflated())
}

/// Like [`container`], but every member carries ZIP64 extra fields.
pub fn zip64_container(members: &[(&str, &str)]) -> Vec<u8> {
    container_with(members, deflated().large_file(true))
}

fn deflated() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn container_with(members: &[(&str, &str)], options: SimpleFileOptions) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn json_workbook(content: &str) -> Vec<u8> {
    container(&[
        ("metadata.json", r#"{"creator":{"name":"Vana"}}"#),
        ("content.json", content),
        ("manifest.json", r#"{"file-entries":{"content.json":{}}}"#),
    ])
}

pub fn xml_workbook(content: &str) -> Vec<u8> {
    container(&[
        ("META-INF/manifest.xml", "<manifest/>"),
        ("content.xml", content),
    ])
}

/// App > Login > Valid login, in the object-notation encoding.
pub const VALID_LOGIN_JSON: &str = r#"[{
  "id": "s1",
  "class": "sheet",
  "title": "Sheet 1",
  "rootTopic": {
    "id": "r",
    "title": "App",
    "children": {"attached": [{
      "id": "suite",
      "title": "Login",
      "children": {"attached": [{
        "id": "case",
        "title": "Valid login",
        "markers": [{"markerId": "priority-1"}],
        "labels": ["Automated"],
        "notes": {"plain": {"content": "user exists"}},
        "children": {"attached": [
          {"id": "a1", "title": "enter credentials",
           "children": {"attached": [{"id": "e1", "title": "see dashboard"}]}},
          {"id": "a2", "title": "log out"}
        ]}
      }]}
    }]}
  }
}]"#;

/// The same outline in the legacy markup encoding.
pub const VALID_LOGIN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<xmap-content xmlns="urn:xmind:xmap:xmlns:content:2.0" version="2.0">
  <sheet id="s1">
    <topic id="r">
      <title>App</title>
      <children><topics type="attached">
        <topic id="suite">
          <title>Login</title>
          <children><topics type="attached">
            <topic id="case">
              <title>Valid login</title>
              <marker-refs><marker-ref marker-id="priority-1"/></marker-refs>
              <labels><label>Automated</label></labels>
              <notes><plain>user exists</plain></notes>
              <children><topics type="attached">
                <topic id="a1">
                  <title>enter credentials</title>
                  <children><topics type="attached">
                    <topic id="e1"><title>see dashboard</title></topic>
                  </topics></children>
                </topic>
                <topic id="a2"><title>log out</title></topic>
              </topics></children>
            </topic>
          </topics></children>
        </topic>
      </topics></children>
    </topic>
    <title>Sheet 1</title>
  </sheet>
</xmap-content>"#;

/// A JSON workbook whose single case has `n` leaf steps, `step 1` .. `step n`.
pub fn numbered_steps_json(n: usize) -> String {
    let steps: Vec<String> = (1..=n)
        .map(|i| format!(r#"{{"title": "step {i}"}}"#))
        .collect();
    format!(
        r#"{{"sheets": [{{"title": "S", "rootTopic": {{"title": "App", "children": {{"attached": [
            {{"title": "Suite", "children": {{"attached": [
                {{"title": "Long case", "children": {{"attached": [{}]}}}}
            ]}}}}
        ]}}}}}}]}}"#,
        steps.join(",")
    )
}
