//! Harmony labels embedded in MusicXML, located by measure number and
//! offset (in quarter notes) from the start of the measure.

use roxmltree::{Document, Node};

use crate::error::DataError;
use crate::model::Fraction;

/// One harmony annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarmonyLabel {
    /// Measure number as printed (leading digits of the `number` attribute)
    pub measure: i64,
    /// Position within the measure, in quarter notes
    pub offset: Fraction,
    /// Label text, e.g. "V65"
    pub label: String,
}

/// Collect every `<harmony>` label of a score-partwise document, part after
/// part, in document order.
pub fn harmony_labels(xml: &str) -> Result<Vec<HarmonyLabel>, DataError> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| DataError::ParsingError(format!("XML parse error: {e}")))?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(DataError::ParsingError(format!(
            "unsupported root element: '{}'. Only 'score-partwise' is supported.",
            root.tag_name().name()
        )));
    }

    let mut labels = Vec::new();
    for part in children(&root, "part") {
        let mut divisions: i64 = 1;
        for measure in children(&part, "measure") {
            parse_measure(&measure, &mut divisions, &mut labels);
        }
    }
    Ok(labels)
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node, divisions: &mut i64, labels: &mut Vec<HarmonyLabel>) {
    let number = node.attribute("number").map_or(0, measure_number);
    // current position in divisions
    let mut position: i64 = 0;

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => {
                if let Some(d) = child_i64(&child, "divisions").filter(|d| *d > 0) {
                    *divisions = d;
                }
            }
            "note" => {
                let is_chord = has_child(&child, "chord");
                let is_grace = has_child(&child, "grace");
                if !is_chord && !is_grace {
                    position += child_i64(&child, "duration").unwrap_or(0);
                }
            }
            "backup" => position -= child_i64(&child, "duration").unwrap_or(0),
            "forward" => position += child_i64(&child, "duration").unwrap_or(0),
            "harmony" => {
                let shift = child_i64(&child, "offset").unwrap_or(0);
                if let Some(label) = harmony_text(&child) {
                    labels.push(HarmonyLabel {
                        measure: number,
                        offset: Fraction::new(position + shift, *divisions),
                        label,
                    });
                }
            }
            _ => {}
        }
    }
}

// ─── Harmony ─────────────────────────────────────────────────────────

/// The displayed label: `<kind text="...">`, else the kind's content
/// prefixed by the root step.
fn harmony_text(node: &Node) -> Option<String> {
    let kind = children(node, "kind").next();
    if let Some(text) = kind.and_then(|k| k.attribute("text")) {
        let text = text.trim();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    let root_step = children(node, "root")
        .next()
        .and_then(|r| children(&r, "root-step").next())
        .and_then(|s| s.text())
        .map(str::trim)
        .unwrap_or("");
    let kind_text = kind.and_then(|k| k.text()).map(str::trim).unwrap_or("");
    let label = format!("{root_step}{kind_text}");
    (!label.is_empty()).then_some(label)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn children<'a, 'input>(
    node: &Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

fn has_child(node: &Node, name: &'static str) -> bool {
    children(node, name).next().is_some()
}

fn child_i64(node: &Node, name: &'static str) -> Option<i64> {
    children(node, name).next()?.text()?.trim().parse().ok()
}

/// Leading digits of a measure `number` attribute ("12", "12a", "X1" → 0).
fn measure_number(raw: &str) -> i64 {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
