//! Boolean-combined predicate trees, compiled once per query.

use std::fmt;

use crate::services::files::descriptor::FileDescriptor;
use crate::services::query::predicate::Predicate;
use crate::types::errors::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    And,
    Or,
    Not,
}

impl CombineOp {
    pub fn parse(value: &str) -> CoreResult<CombineOp> {
        match value.to_ascii_lowercase().as_str() {
            "and" => Ok(CombineOp::And),
            "or" => Ok(CombineOp::Or),
            "not" => Ok(CombineOp::Not),
            other => Err(CoreError::InvalidRule(format!(
                "unknown combinator: {other:?}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CombineOp::And => "and",
            CombineOp::Or => "or",
            CombineOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    Predicate(Predicate),
    Combinator(CombineOp, Vec<RuleNode>),
}

impl RuleNode {
    fn eval(&self, file: &FileDescriptor) -> bool {
        match self {
            RuleNode::Predicate(predicate) => predicate.eval(file),
            // AND stops on the first false, OR on the first true.
            RuleNode::Combinator(CombineOp::And, children) => {
                children.iter().all(|child| child.eval(file))
            }
            RuleNode::Combinator(CombineOp::Or, children) => {
                children.iter().any(|child| child.eval(file))
            }
            RuleNode::Combinator(CombineOp::Not, children) => {
                !children.first().map(|child| child.eval(file)).unwrap_or(true)
            }
        }
    }

    fn validate(&self) -> CoreResult<()> {
        match self {
            RuleNode::Predicate(_) => Ok(()),
            RuleNode::Combinator(op, children) => {
                match op {
                    CombineOp::Not => {
                        if children.len() != 1 {
                            return Err(CoreError::InvalidRule(format!(
                                "'not' takes exactly one child, got {}",
                                children.len()
                            )));
                        }
                    }
                    CombineOp::And | CombineOp::Or => {
                        if children.is_empty() {
                            return Err(CoreError::InvalidRule(format!(
                                "'{}' needs at least one child",
                                op.as_str()
                            )));
                        }
                    }
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Predicate(predicate) => write!(f, "{predicate}"),
            RuleNode::Combinator(CombineOp::Not, children) => match children.first() {
                Some(child) => write!(f, "not ({child})"),
                None => write!(f, "not ()"),
            },
            RuleNode::Combinator(op, children) => {
                let rendered: Vec<String> = children.iter().map(|c| format!("({c})")).collect();
                write!(f, "{}", rendered.join(&format!(" {} ", op.as_str())))
            }
        }
    }
}

/// A compiled filter. An empty tree is the identity: it matches every
/// descriptor, directories included.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleTree {
    root: Option<RuleNode>,
}

impl RuleTree {
    /// Matches everything.
    pub fn empty() -> RuleTree {
        RuleTree { root: None }
    }

    /// Compile a tree, validating combinator arity throughout.
    pub fn compile(root: RuleNode) -> CoreResult<RuleTree> {
        root.validate()?;
        Ok(RuleTree { root: Some(root) })
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<&RuleNode> {
        self.root.as_ref()
    }

    pub fn matches(&self, file: &FileDescriptor) -> bool {
        match &self.root {
            Some(root) => root.eval(file),
            None => true,
        }
    }

    /// Human readable rendering for report headers and the progress
    /// console.
    pub fn describe(&self) -> String {
        match &self.root {
            Some(root) => root.to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
#[path = "tests/rule_tree_tests.rs"]
mod tests;
