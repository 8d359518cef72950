//! Clause tree renderer.
//!
//! Turns a structured statement definition into SQL command text. Rendering
//! is total and pure: it never fails, never blocks, and is safe for
//! concurrent read-only use over an immutable tree.

use crate::ast::{LogicalOperator, Sql, SqlClause, SqlKeyword};

/// Trait for converting definition nodes to SQL command text.
pub trait ToSqlText {
    /// Render this node to SQL command text.
    fn to_sql_text(&self) -> String;
}

impl ToSqlText for SqlClause {
    fn to_sql_text(&self) -> String {
        render_clause(self)
    }
}

impl ToSqlText for Sql {
    /// The clause tree render, or the raw `command` verbatim when that
    /// render comes out empty.
    fn to_sql_text(&self) -> String {
        let rendered = self.clause.to_sql_text();
        if rendered.is_empty() {
            self.command.clone().unwrap_or_default()
        } else {
            rendered
        }
    }
}

fn render_clause(clause: &SqlClause) -> String {
    let mut child_text = String::new();
    let mut child_has_operator = false;

    for child in &clause.children {
        let rendered = render_clause(child);
        // A child with no keyword and no operator is an anonymous field or
        // value list item; the comma is the inter-item separator.
        let anonymous = child.keyword == SqlKeyword::None
            && child.logical_operator == LogicalOperator::None;
        if child.logical_operator != LogicalOperator::None {
            child_has_operator = true;
        }
        if anonymous {
            child_text.push_str(", ");
        } else if !child_text.is_empty() {
            child_text.push(' ');
        }
        child_text.push_str(rendered.trim());
    }

    // Commas separate items only; never leading or trailing.
    let children = child_text
        .trim_matches(|c: char| c == ',' || c == ' ')
        .to_string();

    // NOT EXISTS is the one place where both the operator token and the
    // keyword token are emitted, in that order.
    let head = if clause.logical_operator == LogicalOperator::Not
        && clause.keyword == SqlKeyword::Exists
    {
        join_segments(&["NOT", "EXISTS"])
    } else {
        join_segments(&[clause.keyword.token(), clause.logical_operator.token()])
    };

    let expression = clause.expression.trim();

    if clause.keyword.is_bracket_group() {
        let inner = join_segments(&[expression, &children]);
        join_segments(&[&head, &format!("({inner})")])
    } else if child_has_operator {
        join_segments(&[&head, expression, &format!("({children})")])
    } else {
        join_segments(&[&head, expression, &children])
    }
}

/// Join non-empty segments with exactly one space, trimming each.
fn join_segments(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(part);
    }
    out
}
