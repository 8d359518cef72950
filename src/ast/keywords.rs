use serde::{Deserialize, Serialize};

/// The closed set of SQL keywords a clause node can carry.
///
/// `Fields` and the DDL keywords (`Create`, `Drop`, `Alter`, `Grant`) have no
/// rendered token of their own; the DDL keywords exist for the diagnostic
/// keyword scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlKeyword {
    /// No keyword at all.
    #[default]
    None,
    /// SELECT
    Select,
    /// INSERT INTO
    InsertInto,
    /// DELETE FROM
    DeleteFrom,
    /// UPDATE
    Update,
    /// WHERE
    Where,
    /// FROM
    From,
    /// GROUP BY
    GroupBy,
    /// ORDER BY
    OrderBy,
    /// Unkeyworded field list, rendered inside parentheses.
    Fields,
    /// VALUES
    Values,
    /// SET
    Set,
    /// SET with a parenthesised field list.
    SetFields,
    /// `=` between field and value lists.
    EqualValues,
    /// EXISTS
    Exists,
    /// IN
    In,
    /// BEGIN
    Begin,
    /// END
    End,
    /// CREATE (scanner only)
    Create,
    /// DROP (scanner only)
    Drop,
    /// ALTER (scanner only)
    Alter,
    /// GRANT (scanner only)
    Grant,
}

impl SqlKeyword {
    /// The literal token this keyword renders as. Keywords without a
    /// rendering rule map to the empty string.
    pub fn token(self) -> &'static str {
        match self {
            SqlKeyword::Select => "SELECT",
            SqlKeyword::InsertInto => "INSERT INTO",
            SqlKeyword::DeleteFrom => "DELETE FROM",
            SqlKeyword::Update => "UPDATE",
            SqlKeyword::Where => "WHERE",
            SqlKeyword::From => "FROM",
            SqlKeyword::GroupBy => "GROUP BY",
            SqlKeyword::OrderBy => "ORDER BY",
            SqlKeyword::Values => "VALUES",
            SqlKeyword::Set | SqlKeyword::SetFields => "SET",
            SqlKeyword::EqualValues => "=",
            SqlKeyword::Exists => "EXISTS",
            SqlKeyword::In => "IN",
            SqlKeyword::Begin => "BEGIN",
            SqlKeyword::End => "END",
            SqlKeyword::None
            | SqlKeyword::Fields
            | SqlKeyword::Create
            | SqlKeyword::Drop
            | SqlKeyword::Alter
            | SqlKeyword::Grant => "",
        }
    }

    /// Whether a clause with this keyword always wraps its expression and
    /// children in parentheses.
    pub fn is_bracket_group(self) -> bool {
        matches!(
            self,
            SqlKeyword::Exists
                | SqlKeyword::In
                | SqlKeyword::Fields
                | SqlKeyword::SetFields
                | SqlKeyword::Values
                | SqlKeyword::EqualValues
        )
    }
}

/// The logical operator a clause node can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// No logical operator at all.
    #[default]
    None,
    /// AND
    And,
    /// OR
    Or,
    /// NOT
    Not,
}

impl LogicalOperator {
    /// The literal token this operator renders as.
    pub fn token(self) -> &'static str {
        match self {
            LogicalOperator::None => "",
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
            LogicalOperator::Not => "NOT",
        }
    }
}
