//! BPMN-flavoured XML interchange for process definitions.
//!
//! The store attaches the serialized form to each deployment as an opaque
//! resource; `read_definition(write_definition(d))` is structurally equal to
//! `d`. Unknown elements are skipped on the way in, so documents produced by
//! other tooling can still be read as long as the linear subset is present.

use crate::error::{Error, Result};
use crate::model::{NodeKind, ProcessDefinition, ProcessDefinitionBuilder};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};

const DEFINITIONS: &[u8] = b"definitions";
const PROCESS: &[u8] = b"process";
const START_EVENT: &[u8] = b"startEvent";
const USER_TASK: &[u8] = b"userTask";
const END_EVENT: &[u8] = b"endEvent";
const SEQUENCE_FLOW: &[u8] = b"sequenceFlow";

/// Serialize a definition to an XML byte stream.
pub fn write_definition(definition: &ProcessDefinition) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Start(BytesStart::new("definitions")))?;

    let mut process = BytesStart::new("process");
    process.push_attribute(("id", definition.id()));
    process.push_attribute(("version", definition.version().to_string().as_str()));
    writer.write_event(Event::Start(process))?;

    for node in definition.nodes() {
        let mut element = match &node.kind {
            NodeKind::Start => BytesStart::new("startEvent"),
            NodeKind::End => BytesStart::new("endEvent"),
            NodeKind::UserTask { name, assignee } => {
                let mut element = BytesStart::new("userTask");
                element.push_attribute(("name", name.as_str()));
                if let Some(assignee) = assignee {
                    element.push_attribute(("assignee", assignee.as_str()));
                }
                element
            }
        };
        element.push_attribute(("id", node.id.as_str()));
        writer.write_event(Event::Empty(element))?;
    }

    for flow in definition.flows() {
        let mut element = BytesStart::new("sequenceFlow");
        element.push_attribute(("sourceRef", flow.source.as_str()));
        element.push_attribute(("targetRef", flow.target.as_str()));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new("process")))?;
    writer.write_event(Event::End(BytesEnd::new("definitions")))?;
    Ok(writer.into_inner())
}

/// Read a definition back from XML. The graph is validated exactly as if it
/// had been assembled through the builder.
pub fn read_definition(input: &str) -> Result<ProcessDefinition> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut current: Option<(ProcessDefinitionBuilder, u32)> = None;
    let mut definition = None;

    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) => match element.name().as_ref() {
                PROCESS => {
                    let id = required(&element, "id")?;
                    let version = match attribute(&element, "version")? {
                        Some(value) => value.parse().map_err(|_| {
                            Error::Definition(format!("bad process version \"{value}\""))
                        })?,
                        None => 0,
                    };
                    current = Some((ProcessDefinition::builder(id), version));
                }
                START_EVENT => {
                    let id = required(&element, "id")?;
                    current = apply(current, |builder| builder.start_event(id))?;
                }
                END_EVENT => {
                    let id = required(&element, "id")?;
                    current = apply(current, |builder| builder.end_event(id))?;
                }
                USER_TASK => {
                    let id = required(&element, "id")?;
                    let name = required(&element, "name")?;
                    let assignee = attribute(&element, "assignee")?;
                    current = apply(current, |builder| {
                        builder.user_task(id, name, assignee.as_deref())
                    })?;
                }
                SEQUENCE_FLOW => {
                    let source = required(&element, "sourceRef")?;
                    let target = required(&element, "targetRef")?;
                    current = apply(current, |builder| builder.flow(source, target))?;
                }
                DEFINITIONS => {}
                // Foreign vocabulary (extensions, diagram interchange) is skipped.
                _ => {}
            },
            Event::End(element) if element.name().as_ref() == PROCESS => {
                let (builder, version) = current
                    .take()
                    .ok_or_else(|| Error::Definition("unexpected </process>".into()))?;
                definition = Some(builder.build()?.with_version(version));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    definition.ok_or_else(|| Error::Definition("document contains no process".into()))
}

fn apply(
    current: Option<(ProcessDefinitionBuilder, u32)>,
    f: impl FnOnce(ProcessDefinitionBuilder) -> ProcessDefinitionBuilder,
) -> Result<Option<(ProcessDefinitionBuilder, u32)>> {
    let (builder, version) =
        current.ok_or_else(|| Error::Definition("flow element outside <process>".into()))?;
    Ok(Some((f(builder), version)))
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>> {
    Ok(match element.try_get_attribute(name)? {
        Some(attribute) => {
            let value = attribute.unescape_value().map_err(quick_xml::Error::from)?;
            Some(value.into_owned())
        }
        None => None,
    })
}

fn required(element: &BytesStart, name: &str) -> Result<String> {
    attribute(element, name)?.ok_or_else(|| {
        Error::Definition(format!(
            "<{}> is missing the {name} attribute",
            String::from_utf8_lossy(element.name().as_ref())
        ))
    })
}
