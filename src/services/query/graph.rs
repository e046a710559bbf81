//! Serialisation boundary for queries: the node-graph JSON documents
//! authored by the editor.
//!
//! A document carries a format identifier, typed nodes and connector
//! links. The core reads an immutable snapshot and flattens it into
//! search paths, a compiled rule tree, sort keys and output sinks; the
//! editor owns the graph itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::query::operand::{parse_byte_size, Operand, RegexOperand};
use crate::services::query::predicate::{
    Predicate, PredicateFlags, PredicateOperator, PredicateProperty,
};
use crate::services::query::rule_tree::{CombineOp, RuleNode, RuleTree};
use crate::services::query::sort::SortKey;
use crate::services::search::enumerator::SearchPath;
use crate::types::errors::{CoreError, CoreResult};

pub const FORMAT_IDENTIFIER_BASIC: &str = "bulicommander-search-filter-basic";
pub const FORMAT_IDENTIFIER_ADVANCED: &str = "bulicommander-search-filter-advanced";

/// Node types the core understands; anything else is rejected.
const NODE_TYPES: &[&str] = &[
    "SearchEngine",
    "SearchFromPath",
    "FileFilterRule",
    "ImageFilterRule",
    "FilterOperator",
    "SortRule",
    "OutputEngine",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDocument {
    pub format_identifier: String,
    #[serde(default)]
    pub nodes: Vec<QueryNode>,
    #[serde(default)]
    pub links: Vec<QueryLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryNode {
    pub properties: NodeProperties,
    /// Typed payload; its `type` field selects the node kind.
    pub widget: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connectors: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLink {
    pub connect: LinkEnds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEnds {
    /// `nodeId:connectorId`
    pub from: String,
    pub to: String,
}

/// Where results go after the pipeline; consumed by the external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSink {
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub document_export_info: Value,
}

/// The flattened form the pipeline consumes.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub paths: Vec<SearchPath>,
    pub rule_tree: RuleTree,
    pub sort_keys: Vec<SortKey>,
    pub outputs: Vec<OutputSink>,
}

impl QueryDocument {
    pub fn from_json(json: &str) -> CoreResult<QueryDocument> {
        let document: QueryDocument = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidQuery(format!("malformed query document: {e}")))?;
        if document.format_identifier != FORMAT_IDENTIFIER_BASIC
            && document.format_identifier != FORMAT_IDENTIFIER_ADVANCED
        {
            return Err(CoreError::InvalidQuery(format!(
                "unknown format identifier: {:?}",
                document.format_identifier
            )));
        }
        Ok(document)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::InvalidQuery(format!("unable to serialise query: {e}")))
    }

    /// Flatten the graph: search paths from `SearchFromPath` nodes wired
    /// into the engine, the rule tree rooted at whatever connects into the
    /// engine's filter input, sort keys and output sinks downstream of the
    /// engine's results output.
    pub fn resolve(&self) -> CoreResult<ResolvedQuery> {
        let mut nodes: HashMap<&str, (&str, &QueryNode)> = HashMap::new();
        let mut engine_id: Option<&str> = None;

        for node in &self.nodes {
            let node_type = node
                .widget
                .get("type")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CoreError::InvalidQuery(format!("node {} has no type", node.properties.id))
                })?;
            if !NODE_TYPES.contains(&node_type) {
                return Err(CoreError::InvalidQuery(format!(
                    "unknown node type: {node_type:?}"
                )));
            }
            if node_type == "SearchEngine" {
                engine_id = Some(&node.properties.id);
            }
            nodes.insert(&node.properties.id, (node_type, node));
        }

        let engine_id = engine_id
            .ok_or_else(|| CoreError::InvalidQuery("no SearchEngine node".to_string()))?;

        // Rebuild link relationships keyed by target node.
        let mut filter_inputs: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut path_inputs: Vec<&str> = Vec::new();
        let mut result_links: Vec<(&str, &str)> = Vec::new();

        for link in &self.links {
            let (from_node, from_connector) = split_endpoint(&link.connect.from)?;
            let (to_node, to_connector) = split_endpoint(&link.connect.to)?;

            if to_connector.starts_with("InputFilterRule")
                && from_connector.starts_with("OutputFilterRule")
            {
                let entry = filter_inputs.entry(to_node).or_default();
                if !entry.contains(&from_node) {
                    entry.push(from_node);
                }
            } else if to_connector.starts_with("InputPath")
                && from_connector.starts_with("OutputPath")
            {
                path_inputs.push(from_node);
            } else if from_connector.starts_with("OutputResults")
                || from_connector.starts_with("OutputSortRule")
            {
                result_links.push((from_node, to_node));
            }
        }

        // Search paths.
        let mut paths = Vec::new();
        for node_id in path_inputs {
            let (node_type, node) = nodes
                .get(node_id)
                .ok_or_else(|| CoreError::InvalidQuery(format!("dangling link to {node_id}")))?;
            if *node_type != "SearchFromPath" {
                return Err(CoreError::InvalidQuery(format!(
                    "path input wired to a {node_type} node"
                )));
            }
            let widget: FromPathWidget = parse_widget(&node.widget)?;
            paths.push(widget.into_search_path());
        }

        // Rule tree, rooted at the first filter wired into the engine.
        let rule_tree = match filter_inputs.get(engine_id).and_then(|v| v.first()) {
            Some(start) => {
                let mut visiting = Vec::new();
                match build_rule_node(start, &filter_inputs, &nodes, &mut visiting)? {
                    Some(root) => RuleTree::compile(root)?,
                    None => RuleTree::empty(),
                }
            }
            None => RuleTree::empty(),
        };

        // Sort keys and outputs downstream of the engine's results.
        let mut sort_keys = Vec::new();
        let mut outputs = Vec::new();
        let mut cursor = engine_id;
        let mut hops = 0;
        loop {
            let Some(&(_, to_node)) = result_links.iter().find(|(from, _)| *from == cursor)
            else {
                break;
            };
            let (node_type, node) = nodes
                .get(to_node)
                .ok_or_else(|| CoreError::InvalidQuery(format!("dangling link to {to_node}")))?;
            match *node_type {
                "SortRule" => {
                    let widget: SortRuleWidget = parse_widget(&node.widget)?;
                    sort_keys.extend(widget.rules);
                }
                "OutputEngine" => {
                    let widget: OutputSink = parse_widget(&node.widget)?;
                    outputs.push(widget);
                }
                other => {
                    return Err(CoreError::InvalidQuery(format!(
                        "results wired into a {other} node"
                    )))
                }
            }
            cursor = to_node;
            hops += 1;
            if hops > self.nodes.len() {
                return Err(CoreError::InvalidQuery("result chain has a cycle".to_string()));
            }
        }

        Ok(ResolvedQuery {
            paths,
            rule_tree,
            sort_keys,
            outputs,
        })
    }
}

fn split_endpoint(endpoint: &str) -> CoreResult<(&str, &str)> {
    endpoint
        .rsplit_once(':')
        .ok_or_else(|| CoreError::InvalidQuery(format!("malformed link endpoint: {endpoint:?}")))
}

fn parse_widget<'a, T: Deserialize<'a>>(widget: &'a Value) -> CoreResult<T> {
    T::deserialize(widget).map_err(|e| CoreError::InvalidQuery(format!("bad node payload: {e}")))
}

/// Recursively rebuild a rule node from the filter links. A filter-rule
/// node with no active clause contributes nothing; a combinator whose
/// children all contribute nothing resolves to no constraint.
fn build_rule_node(
    node_id: &str,
    filter_inputs: &HashMap<&str, Vec<&str>>,
    nodes: &HashMap<&str, (&str, &QueryNode)>,
    visiting: &mut Vec<String>,
) -> CoreResult<Option<RuleNode>> {
    if visiting.iter().any(|id| id == node_id) {
        return Err(CoreError::InvalidQuery("filter graph has a cycle".to_string()));
    }

    let (node_type, node) = nodes
        .get(node_id)
        .ok_or_else(|| CoreError::InvalidQuery(format!("dangling link to {node_id}")))?;

    match *node_type {
        "FileFilterRule" => {
            let widget: FileFilterWidget = parse_widget(&node.widget)?;
            Ok(combine_predicates(widget.into_predicates()?))
        }
        "ImageFilterRule" => {
            let widget: ImageFilterWidget = parse_widget(&node.widget)?;
            Ok(combine_predicates(widget.into_predicates()?))
        }
        "FilterOperator" => {
            let op = node
                .widget
                .get("value")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    CoreError::InvalidQuery(format!("operator node {node_id} has no value"))
                })?;
            let op = CombineOp::parse(op)?;

            visiting.push(node_id.to_string());
            let mut children = Vec::new();
            if let Some(inputs) = filter_inputs.get(node_id) {
                for input in inputs {
                    if let Some(child) = build_rule_node(input, filter_inputs, nodes, visiting)? {
                        children.push(child);
                    }
                }
            }
            visiting.pop();

            if children.is_empty() {
                if op == CombineOp::Not {
                    return Err(CoreError::InvalidRule(
                        "'not' takes exactly one child, got 0".to_string(),
                    ));
                }
                return Ok(None);
            }
            Ok(Some(RuleNode::Combinator(op, children)))
        }
        other => Err(CoreError::InvalidQuery(format!(
            "filter input wired to a {other} node"
        ))),
    }
}

fn combine_predicates(predicates: Vec<Predicate>) -> Option<RuleNode> {
    let mut nodes: Vec<RuleNode> = predicates.into_iter().map(RuleNode::Predicate).collect();
    match nodes.len() {
        0 => None,
        1 => Some(nodes.remove(0)),
        _ => Some(RuleNode::Combinator(CombineOp::And, nodes)),
    }
}

// ── Widget payloads ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FromPathWidget {
    path: String,
    #[serde(default)]
    scan_sub_directories: bool,
    #[serde(default)]
    scan_hidden_files: bool,
    #[serde(default)]
    scan_managed_files_only: bool,
    #[serde(default)]
    scan_managed_files_backup: bool,
}

impl FromPathWidget {
    fn into_search_path(self) -> SearchPath {
        SearchPath::new(std::path::Path::new(&self.path))
            .recursive(self.scan_sub_directories)
            .include_hidden(self.scan_hidden_files)
            .include_managed_only(self.scan_managed_files_only)
            .include_backups(self.scan_managed_files_backup)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextClause {
    active: bool,
    #[serde(default)]
    value: String,
    operator: String,
    #[serde(default)]
    ignore_case: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizeClause {
    active: bool,
    #[serde(default)]
    value: f64,
    #[serde(default)]
    value2: f64,
    #[serde(default)]
    unit: String,
    operator: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateClause {
    active: bool,
    #[serde(default)]
    value: f64,
    #[serde(default)]
    value2: f64,
    operator: String,
    #[serde(default)]
    date_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntClause {
    active: bool,
    #[serde(default)]
    value: i64,
    #[serde(default)]
    value2: i64,
    operator: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FloatClause {
    active: bool,
    #[serde(default)]
    value: f64,
    #[serde(default)]
    value2: f64,
    operator: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormatClause {
    active: bool,
    #[serde(default)]
    value: Vec<String>,
    operator: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFilterWidget {
    #[serde(default)]
    file_name: Option<TextClause>,
    #[serde(default)]
    file_path: Option<TextClause>,
    #[serde(default)]
    file_size: Option<SizeClause>,
    #[serde(default)]
    file_date: Option<DateClause>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageFilterWidget {
    #[serde(default)]
    image_format: Option<FormatClause>,
    #[serde(default)]
    image_width: Option<IntClause>,
    #[serde(default)]
    image_height: Option<IntClause>,
    #[serde(default)]
    image_ratio: Option<FloatClause>,
    #[serde(default)]
    image_pixels: Option<FloatClause>,
}

impl FileFilterWidget {
    fn into_predicates(self) -> CoreResult<Vec<Predicate>> {
        let mut predicates = Vec::new();
        if let Some(clause) = self.file_name.filter(|c| c.active) {
            predicates.push(text_predicate(PredicateProperty::FileName, &clause)?);
        }
        if let Some(clause) = self.file_path.filter(|c| c.active) {
            predicates.push(text_predicate(PredicateProperty::FilePath, &clause)?);
        }
        if let Some(clause) = self.file_size.filter(|c| c.active) {
            let operator = PredicateOperator::parse(&clause.operator)?;
            let low = parse_byte_size(&format!("{}{}", clause.value, clause.unit))?;
            let operand = match operator {
                PredicateOperator::Between | PredicateOperator::NotBetween => {
                    let high = parse_byte_size(&format!("{}{}", clause.value2, clause.unit))?;
                    Operand::Range(Box::new(Operand::Int(low)), Box::new(Operand::Int(high)))
                }
                _ => Operand::Int(low),
            };
            predicates.push(Predicate::new(
                PredicateProperty::FileSize,
                operator,
                operand,
                PredicateFlags::default(),
            )?);
        }
        if let Some(clause) = self.file_date.filter(|c| c.active) {
            let operator = PredicateOperator::parse(&clause.operator)?;
            let operand = match operator {
                PredicateOperator::Between | PredicateOperator::NotBetween => Operand::Range(
                    Box::new(Operand::Date(clause.value)),
                    Box::new(Operand::Date(clause.value2)),
                ),
                _ => Operand::Date(clause.value),
            };
            predicates.push(Predicate::new(
                PredicateProperty::FileDate,
                operator,
                operand,
                PredicateFlags {
                    date_only: clause.date_only,
                    ..PredicateFlags::default()
                },
            )?);
        }
        Ok(predicates)
    }
}

impl ImageFilterWidget {
    fn into_predicates(self) -> CoreResult<Vec<Predicate>> {
        let mut predicates = Vec::new();
        if let Some(clause) = self.image_format.filter(|c| c.active && !c.value.is_empty()) {
            predicates.push(format_predicate(&clause)?);
        }
        if let Some(clause) = self.image_width.filter(|c| c.active) {
            predicates.push(int_predicate(PredicateProperty::ImageWidth, &clause)?);
        }
        if let Some(clause) = self.image_height.filter(|c| c.active) {
            predicates.push(int_predicate(PredicateProperty::ImageHeight, &clause)?);
        }
        if let Some(clause) = self.image_ratio.filter(|c| c.active) {
            let operator = PredicateOperator::parse(&clause.operator)?;
            let operand = match operator {
                PredicateOperator::Between | PredicateOperator::NotBetween => Operand::Range(
                    Box::new(Operand::Float(clause.value)),
                    Box::new(Operand::Float(clause.value2)),
                ),
                _ => Operand::Float(clause.value),
            };
            predicates.push(Predicate::new(
                PredicateProperty::ImageRatio,
                operator,
                operand,
                PredicateFlags::default(),
            )?);
        }
        if let Some(clause) = self.image_pixels.filter(|c| c.active) {
            // Authored in megapixels, compared in pixels.
            let operator = PredicateOperator::parse(&clause.operator)?;
            let low = (clause.value * 1_000_000.0).round() as i64;
            let operand = match operator {
                PredicateOperator::Between | PredicateOperator::NotBetween => {
                    let high = (clause.value2 * 1_000_000.0).round() as i64;
                    Operand::Range(Box::new(Operand::Int(low)), Box::new(Operand::Int(high)))
                }
                _ => Operand::Int(low),
            };
            predicates.push(Predicate::new(
                PredicateProperty::ImagePixels,
                operator,
                operand,
                PredicateFlags::default(),
            )?);
        }
        Ok(predicates)
    }
}

/// Name/path clauses compile to regexes: `match` takes the pattern
/// verbatim, `like` escapes then maps `?`/`*`, `=` escapes and anchors.
fn text_predicate(property: PredicateProperty, clause: &TextClause) -> CoreResult<Predicate> {
    let flags = PredicateFlags {
        case_insensitive: clause.ignore_case,
        ..PredicateFlags::default()
    };
    let (operator, regex) = match clause.operator.to_ascii_lowercase().as_str() {
        "match" => (
            PredicateOperator::Match,
            RegexOperand::new(&clause.value, clause.ignore_case)?,
        ),
        "not match" => (
            PredicateOperator::NotMatch,
            RegexOperand::new(&clause.value, clause.ignore_case)?,
        ),
        "like" => (
            PredicateOperator::Match,
            like_regex(&clause.value, clause.ignore_case)?,
        ),
        "not like" => (
            PredicateOperator::NotMatch,
            like_regex(&clause.value, clause.ignore_case)?,
        ),
        "=" => (
            PredicateOperator::Match,
            RegexOperand::from_literal(&clause.value, clause.ignore_case)?,
        ),
        "<>" | "!=" => (
            PredicateOperator::NotMatch,
            RegexOperand::from_literal(&clause.value, clause.ignore_case)?,
        ),
        other => {
            return Err(CoreError::InvalidRule(format!(
                "unknown text operator: {other:?}"
            )))
        }
    };
    Predicate::new(property, operator, Operand::Regex(regex), flags)
}

/// `like` patterns are unanchored substring searches with `?`/`*`
/// wildcards.
fn like_regex(value: &str, ignore_case: bool) -> CoreResult<RegexOperand> {
    let escaped = regex::escape(value).replace(r"\?", ".").replace(r"\*", ".*");
    RegexOperand::new(&escaped, ignore_case)
}

fn int_predicate(property: PredicateProperty, clause: &IntClause) -> CoreResult<Predicate> {
    let operator = PredicateOperator::parse(&clause.operator)?;
    let operand = match operator {
        PredicateOperator::Between | PredicateOperator::NotBetween => Operand::Range(
            Box::new(Operand::Int(clause.value)),
            Box::new(Operand::Int(clause.value2)),
        ),
        _ => Operand::Int(clause.value),
    };
    Predicate::new(property, operator, operand, PredicateFlags::default())
}

fn format_predicate(clause: &FormatClause) -> CoreResult<Predicate> {
    let operator = PredicateOperator::parse(&clause.operator)?;
    let mut formats = Vec::new();
    for value in &clause.value {
        formats.push(Operand::Format(
            crate::services::files::format::FormatTag::parse(value)?,
        ));
    }
    let operand = match operator {
        PredicateOperator::Eq | PredicateOperator::Neq if formats.len() == 1 => formats.remove(0),
        _ => Operand::List(formats),
    };
    Predicate::new(
        PredicateProperty::FileFormat,
        operator,
        operand,
        PredicateFlags::default(),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SortRuleWidget {
    #[serde(default)]
    rules: Vec<SortKey>,
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod tests;
