//! SVG export of a process definition.
//!
//! Nodes are laid out left to right in flow order from the start event, one
//! horizontal lane, so the same definition always renders the same bytes.
//! Execution never looks at this module; it only produces export artifacts.

use crate::error::Result;
use crate::model::{NodeKind, ProcessDefinition};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::collections::VecDeque;

const SLOT_WIDTH: u32 = 160;
const LANE_Y: u32 = 70;
const EVENT_RADIUS: u32 = 18;
const TASK_WIDTH: u32 = 110;
const TASK_HEIGHT: u32 = 64;

/// Render a definition to SVG bytes.
pub fn render_svg(definition: &ProcessDefinition) -> Result<Vec<u8>> {
    let order = flow_order(definition);
    let center = |slot: usize| 40 + SLOT_WIDTH / 2 + slot as u32 * SLOT_WIDTH;

    // slot per node index
    let mut slots = vec![0usize; definition.nodes().len()];
    for (slot, &index) in order.iter().enumerate() {
        slots[index] = slot;
    }

    let width = 80 + order.len() as u32 * SLOT_WIDTH;
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("width", width.to_string().as_str()));
    svg.push_attribute(("height", (2 * LANE_Y).to_string().as_str()));
    writer.write_event(Event::Start(svg))?;
    write_arrow_marker(&mut writer)?;

    for flow in definition.flows() {
        let (Some(source), Some(target)) = (
            definition.node_index(&flow.source),
            definition.node_index(&flow.target),
        ) else {
            continue;
        };
        let x1 = center(slots[source]) + half_width(&definition.nodes()[source].kind);
        let x2 = center(slots[target]) - half_width(&definition.nodes()[target].kind) - 6;

        let mut line = BytesStart::new("line");
        for (key, value) in [("x1", x1), ("y1", LANE_Y), ("x2", x2), ("y2", LANE_Y)] {
            line.push_attribute((key, value.to_string().as_str()));
        }
        line.push_attribute(("stroke", "#444"));
        line.push_attribute(("marker-end", "url(#arrow)"));
        writer.write_event(Event::Empty(line))?;
    }

    for (index, node) in definition.nodes().iter().enumerate() {
        let cx = center(slots[index]);
        match &node.kind {
            NodeKind::Start | NodeKind::End => {
                let mut circle = BytesStart::new("circle");
                circle.push_attribute(("cx", cx.to_string().as_str()));
                circle.push_attribute(("cy", LANE_Y.to_string().as_str()));
                circle.push_attribute(("r", EVENT_RADIUS.to_string().as_str()));
                circle.push_attribute(("fill", "#fff"));
                circle.push_attribute(("stroke", "#222"));
                // End events get the conventional thick border.
                let stroke = if node.kind.is_end() { "4" } else { "2" };
                circle.push_attribute(("stroke-width", stroke));
                writer.write_event(Event::Empty(circle))?;
            }
            NodeKind::UserTask { name, .. } => {
                let mut rect = BytesStart::new("rect");
                rect.push_attribute(("x", (cx - TASK_WIDTH / 2).to_string().as_str()));
                rect.push_attribute(("y", (LANE_Y - TASK_HEIGHT / 2).to_string().as_str()));
                rect.push_attribute(("width", TASK_WIDTH.to_string().as_str()));
                rect.push_attribute(("height", TASK_HEIGHT.to_string().as_str()));
                rect.push_attribute(("rx", "10"));
                rect.push_attribute(("fill", "#fff"));
                rect.push_attribute(("stroke", "#222"));
                rect.push_attribute(("stroke-width", "2"));
                writer.write_event(Event::Empty(rect))?;
                write_label(&mut writer, cx, LANE_Y + 5, name)?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new("svg")))?;
    Ok(writer.into_inner())
}

fn half_width(kind: &NodeKind) -> u32 {
    match kind {
        NodeKind::Start | NodeKind::End => EVENT_RADIUS,
        NodeKind::UserTask { .. } => TASK_WIDTH / 2,
    }
}

fn write_label(writer: &mut Writer<Vec<u8>>, x: u32, y: u32, label: &str) -> Result<()> {
    let mut text = BytesStart::new("text");
    text.push_attribute(("x", x.to_string().as_str()));
    text.push_attribute(("y", y.to_string().as_str()));
    text.push_attribute(("text-anchor", "middle"));
    text.push_attribute(("font-family", "sans-serif"));
    text.push_attribute(("font-size", "13"));
    writer.write_event(Event::Start(text))?;
    writer.write_event(Event::Text(BytesText::new(label)))?;
    writer.write_event(Event::End(BytesEnd::new("text")))?;
    Ok(())
}

fn write_arrow_marker(writer: &mut Writer<Vec<u8>>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("defs")))?;
    let mut marker = BytesStart::new("marker");
    for (key, value) in [
        ("id", "arrow"),
        ("markerWidth", "8"),
        ("markerHeight", "8"),
        ("refX", "6"),
        ("refY", "4"),
        ("orient", "auto"),
    ] {
        marker.push_attribute((key, value));
    }
    writer.write_event(Event::Start(marker))?;
    let mut path = BytesStart::new("path");
    path.push_attribute(("d", "M0,0 L8,4 L0,8 z"));
    path.push_attribute(("fill", "#444"));
    writer.write_event(Event::Empty(path))?;
    writer.write_event(Event::End(BytesEnd::new("marker")))?;
    writer.write_event(Event::End(BytesEnd::new("defs")))?;
    Ok(())
}

// Breadth-first from the start event; anything a broken-but-valid graph
// leaves unvisited is appended in definition order so every node gets a slot.
fn flow_order(definition: &ProcessDefinition) -> Vec<usize> {
    let mut order = Vec::with_capacity(definition.nodes().len());
    let mut seen = vec![false; definition.nodes().len()];
    let mut queue = VecDeque::from([definition.start()]);
    while let Some(index) = queue.pop_front() {
        if std::mem::replace(&mut seen[index], true) {
            continue;
        }
        order.push(index);
        queue.extend(definition.outgoing(index));
    }
    for index in 0..definition.nodes().len() {
        if !seen[index] {
            order.push(index);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_shape_per_node() {
        let definition = ProcessDefinition::builder("my-process")
            .start_event("start")
            .user_task("task1", "First task", Some("fred"))
            .user_task("task2", "Second task", Some("john"))
            .end_event("end")
            .flow("start", "task1")
            .flow("task1", "task2")
            .flow("task2", "end")
            .build()
            .unwrap();

        let svg = String::from_utf8(render_svg(&definition).unwrap()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert_eq!(svg.matches("<rect").count(), 2);
        assert_eq!(svg.matches("<line").count(), 3);
        assert!(svg.contains("First task"));
    }

    #[test]
    fn output_is_deterministic() {
        let build = || {
            ProcessDefinition::builder("p")
                .start_event("s")
                .user_task("t", "T", None)
                .end_event("end")
                .flow("s", "t")
                .flow("t", "end")
                .build()
                .unwrap()
        };
        assert_eq!(render_svg(&build()).unwrap(), render_svg(&build()).unwrap());
    }
}
