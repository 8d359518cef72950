use serde::{Deserialize, Serialize};

use crate::ast::{LogicalOperator, SqlKeyword};

/// One node of a SQL statement's structural tree.
///
/// A clause owns its children, so the structure is a tree by construction:
/// no cycles, no shared parents. `Clone` is a deep copy of the whole subtree
/// with no aliasing to the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlClause {
    /// The keyword of this clause.
    pub keyword: SqlKeyword,
    /// The logical operator of this clause.
    pub logical_operator: LogicalOperator,
    /// Literal expression text, inserted verbatim before the children.
    pub expression: String,
    /// Ordered, owned child clauses.
    pub children: Vec<SqlClause>,
}

impl SqlClause {
    /// Create a clause carrying a keyword.
    pub fn new(keyword: SqlKeyword) -> Self {
        Self {
            keyword,
            ..Self::default()
        }
    }

    /// Create an anonymous clause holding only literal expression text.
    ///
    /// Anonymous clauses (no keyword, no operator) are treated as field or
    /// value list items and joined with commas when rendered.
    pub fn expr(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    /// Set the logical operator of this clause.
    pub fn operator(mut self, operator: LogicalOperator) -> Self {
        self.logical_operator = operator;
        self
    }

    /// Set the literal expression of this clause.
    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Append one child clause.
    pub fn child(mut self, child: SqlClause) -> Self {
        self.children.push(child);
        self
    }

    /// Append a sequence of child clauses in order.
    pub fn with_children(mut self, children: impl IntoIterator<Item = SqlClause>) -> Self {
        self.children.extend(children);
        self
    }

    /// Append each item as an anonymous expression child.
    pub fn items<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.children
            .extend(items.into_iter().map(SqlClause::expr));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_compose() {
        let clause = SqlClause::new(SqlKeyword::Select)
            .items(["id", "name"])
            .child(SqlClause::new(SqlKeyword::From).expression("users"));

        assert_eq!(clause.keyword, SqlKeyword::Select);
        assert_eq!(clause.children.len(), 3);
        assert_eq!(clause.children[0].expression, "id");
        assert_eq!(clause.children[2].keyword, SqlKeyword::From);
    }

    #[test]
    fn test_clone_is_deep() {
        let original = SqlClause::new(SqlKeyword::Where)
            .child(SqlClause::expr("a = 1"))
            .child(SqlClause::expr("b = 2").operator(LogicalOperator::And));

        let mut copy = original.clone();
        copy.children[0].expression = "changed".to_string();

        assert_eq!(original.children[0].expression, "a = 1");
        assert_eq!(copy.children[1], original.children[1]);
    }

    #[test]
    fn test_definition_roundtrip() {
        let json = r#"{
            "keyword": "Where",
            "children": [
                { "expression": "a = 1" },
                { "logical_operator": "And", "expression": "b = 2" }
            ]
        }"#;
        let clause: SqlClause = serde_json::from_str(json).unwrap();
        assert_eq!(clause.keyword, SqlKeyword::Where);
        assert_eq!(clause.children[1].logical_operator, LogicalOperator::And);
        assert_eq!(clause.expression, "");
    }
}
