//! Serialization of described trees back to YAML text

use serde_yaml::Value;

use crate::error::{ConfiguratorError, ConfiguratorResult};
use crate::node::{Format, Mapping, Node, Scalar};

/// YAML value for `node`, or `None` when the node has nothing worth
/// emitting: a blank scalar not marked printable, or an empty collection.
/// Nested mapping keys are sorted.
pub fn to_yaml_value(node: &Node) -> Option<Value> {
    Emitter::default().value(node)
}

/// serde_yaml renders every string containing a newline as a literal
/// block. Raw multi-line scalars are held back as placeholders and spliced
/// into the text double-quoted.
#[derive(Default)]
struct Emitter {
    held: Vec<String>,
}

impl Emitter {
    fn value(&mut self, node: &Node) -> Option<Value> {
        match node {
            Node::Scalar(scalar) => self.scalar(scalar),
            Node::Sequence(sequence) => {
                let items: Vec<Value> = sequence.iter().filter_map(|item| self.value(item)).collect();
                (!items.is_empty()).then_some(Value::Sequence(items))
            }
            Node::Mapping(mapping) => {
                let mut entries: Vec<(&str, Value)> = mapping
                    .iter()
                    .filter_map(|(key, value)| self.value(value).map(|value| (key, value)))
                    .collect();
                if entries.is_empty() {
                    return None;
                }
                entries.sort_by(|a, b| a.0.cmp(b.0));
                Some(Value::Mapping(
                    entries
                        .into_iter()
                        .map(|(key, value)| (Value::String(key.to_string()), value))
                        .collect(),
                ))
            }
        }
    }

    fn scalar(&mut self, scalar: &Scalar) -> Option<Value> {
        if scalar.is_blank() && !scalar.is_printable_when_empty() {
            return None;
        }
        let value = scalar.value();
        let typed = match scalar.format() {
            Format::Number => number(value.trim()),
            Format::Boolean => value.trim().parse::<bool>().ok().map(Value::Bool),
            Format::MultilineString if scalar.is_raw() => Some(self.hold(value)),
            Format::String | Format::MultilineString => None,
        };
        Some(typed.unwrap_or_else(|| Value::String(value.to_string())))
    }

    fn hold(&mut self, value: &str) -> Value {
        let placeholder = Value::String(placeholder(self.held.len()));
        self.held.push(value.to_string());
        placeholder
    }

    fn splice(&self, mut text: String) -> ConfiguratorResult<String> {
        for (index, value) in self.held.iter().enumerate() {
            let quoted = serde_json::to_string(value).map_err(|e| ConfiguratorError::new(e.to_string()))?;
            text = text.replacen(&placeholder(index), &quoted, 1);
        }
        Ok(text)
    }
}

fn placeholder(index: usize) -> String {
    format!("settle.raw.{}.end", index)
}

fn number(value: &str) -> Option<Value> {
    if let Ok(i) = value.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }
    if let Ok(u) = value.parse::<u64>() {
        return Some(Value::Number(u.into()));
    }
    value.parse::<f64>().ok().map(|f| Value::Number(f.into()))
}

/// Emit a document whose root keys keep the order of `entries`
pub fn emit_document(entries: &Mapping) -> ConfiguratorResult<String> {
    let mut emitter = Emitter::default();
    let root: serde_yaml::Mapping = entries
        .iter()
        .filter_map(|(key, value)| emitter.value(value).map(|value| (Value::String(key.to_string()), value)))
        .collect();
    let text = serde_yaml::to_string(&Value::Mapping(root)).map_err(ConfiguratorError::Emit)?;
    emitter.splice(text)
}
