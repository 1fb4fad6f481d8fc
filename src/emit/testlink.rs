//! TestLink XML import.
//!
//! ```text
//! <testsuites>
//!   <testsuite name="Login">
//!     <testcase name="Valid login">
//!       <preconditions>..</preconditions>
//!       <importance>3</importance>
//!       <execution_type>2</execution_type>
//!       <steps>
//!         <step>
//!           <step_number>1</step_number>
//!           <actions>..</actions>
//!           <expectedresults>..</expectedresults>
//!           <execution_type>2</execution_type>
//!         </step>
//!       </steps>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! Suites nest by suite path and keep first-appearance order. Cases without a
//! suite sit directly under the root.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{Cursor, Write};

use super::EmitError;
use crate::extract::{ExecutionType, Priority, TestCase};

/// Suite tree in first-appearance order.
#[derive(Default)]
struct SuiteNode<'a> {
    name: &'a str,
    suites: Vec<SuiteNode<'a>>,
    cases: Vec<&'a TestCase>,
}

impl<'a> SuiteNode<'a> {
    fn insert(&mut self, path: &'a [String], case: &'a TestCase) {
        let Some((head, rest)) = path.split_first() else {
            self.cases.push(case);
            return;
        };
        let idx = match self.suites.iter().position(|s| s.name == head.as_str()) {
            Some(idx) => idx,
            None => {
                self.suites.push(SuiteNode {
                    name: head,
                    ..Default::default()
                });
                self.suites.len() - 1
            }
        };
        self.suites[idx].insert(rest, case);
    }
}

fn importance(priority: Priority) -> u8 {
    match priority {
        Priority::High => 3,
        Priority::Medium => 2,
        Priority::Low => 1,
    }
}

fn execution_code(execution_type: ExecutionType) -> u8 {
    match execution_type {
        ExecutionType::Manual => 1,
        ExecutionType::Automated => 2,
    }
}

pub fn emit(cases: &[TestCase]) -> Result<String, EmitError> {
    let mut root = SuiteNode::default();
    for case in cases {
        root.insert(&case.suite_path, case);
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("testsuites")))?;
    write_suite_body(&mut writer, &root)?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_suite_body<W: Write>(
    writer: &mut Writer<W>,
    suite: &SuiteNode<'_>,
) -> Result<(), EmitError> {
    for case in &suite.cases {
        write_case(writer, case)?;
    }
    for child in &suite.suites {
        let mut start = BytesStart::new("testsuite");
        start.push_attribute(("name", child.name));
        writer.write_event(Event::Start(start))?;
        write_suite_body(writer, child)?;
        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }
    Ok(())
}

fn write_case<W: Write>(writer: &mut Writer<W>, case: &TestCase) -> Result<(), EmitError> {
    let execution = execution_code(case.execution_type).to_string();

    let mut start = BytesStart::new("testcase");
    start.push_attribute(("name", case.title.as_str()));
    writer.write_event(Event::Start(start))?;

    text_element(writer, "preconditions", &case.precondition)?;
    text_element(writer, "importance", &importance(case.priority).to_string())?;
    text_element(writer, "execution_type", &execution)?;

    writer.write_event(Event::Start(BytesStart::new("steps")))?;
    for step in &case.steps {
        writer.write_event(Event::Start(BytesStart::new("step")))?;
        text_element(writer, "step_number", &step.number.to_string())?;
        text_element(writer, "actions", &step.action)?;
        text_element(writer, "expectedresults", &step.expected)?;
        text_element(writer, "execution_type", &execution)?;
        writer.write_event(Event::End(BytesEnd::new("step")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("steps")))?;

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), EmitError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::fixtures::case;

    #[test]
    fn one_testcase_element_per_case_with_matching_steps() {
        let mut nested = case("Deep", "Account", &[("a", "b")]);
        nested.suite_path.push("Settings".into());
        let cases = [
            case(
                "Valid login",
                "Login",
                &[("enter <credentials>", "see dashboard"), ("log out", "")],
            ),
            case("Wrong password", "Login", &[("type & submit", "error")]),
            nested,
        ];
        let xml = emit(&cases).unwrap();

        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "testsuites");

        let testcases: Vec<_> = doc
            .descendants()
            .filter(|n| n.has_tag_name("testcase"))
            .collect();
        assert_eq!(testcases.len(), 3);

        let step_counts: Vec<_> = testcases
            .iter()
            .map(|tc| {
                tc.children()
                    .filter(|n| n.has_tag_name("steps"))
                    .flat_map(|s| s.children())
                    .filter(|n| n.has_tag_name("step"))
                    .count()
            })
            .collect();
        assert_eq!(step_counts, [2, 1, 1]);

        let login = doc
            .descendants()
            .find(|n| n.has_tag_name("testsuite") && n.attribute("name") == Some("Login"))
            .unwrap();
        assert_eq!(login.children().filter(|n| n.has_tag_name("testcase")).count(), 2);

        let first_action = doc.descendants().find(|n| n.has_tag_name("actions")).unwrap();
        assert_eq!(first_action.text(), Some("enter <credentials>"));
        let importance = doc.descendants().find(|n| n.has_tag_name("importance")).unwrap();
        assert_eq!(importance.text(), Some("3"));

        let settings = doc
            .descendants()
            .find(|n| n.attribute("name") == Some("Settings"))
            .unwrap();
        assert_eq!(settings.parent_element().unwrap().attribute("name"), Some("Account"));
    }
}
