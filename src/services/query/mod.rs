pub mod graph;
pub mod operand;
pub mod predicate;
pub mod rule_tree;
pub mod sort;

pub use predicate::{Predicate, PredicateFlags, PredicateOperator, PredicateProperty};
pub use rule_tree::{CombineOp, RuleNode, RuleTree};
pub use sort::SortKey;
