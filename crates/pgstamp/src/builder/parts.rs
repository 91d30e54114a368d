use crate::condition::Condition;
use crate::value::Value;

/// One entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    /// Result key. A bare column is keyed by itself; positional entries have none.
    pub alias: Option<String>,
    pub expr: String,
    /// Values for `?` placeholders in `expr`.
    pub params: Vec<Value>,
}

impl SelectColumn {
    pub fn positional(expr: impl Into<String>) -> Self {
        Self {
            alias: None,
            expr: expr.into(),
            params: Vec::new(),
        }
    }

    pub fn aliased(alias: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            expr: expr.into(),
            params: Vec::new(),
        }
    }

    /// The key this entry is reachable under in the normalized list.
    pub fn key(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// NULLS ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            NullsOrder::First => "NULLS FIRST",
            NullsOrder::Last => "NULLS LAST",
        }
    }
}

/// A single ORDER BY item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    pub column: String,
    pub dir: SortDir,
    pub nulls: Option<NullsOrder>,
}

impl OrderItem {
    pub fn new(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            column: column.into(),
            dir,
            nulls: None,
        }
    }

    pub fn nulls(mut self, order: NullsOrder) -> Self {
        self.nulls = Some(order);
        self
    }

    /// Parse `"postDate DESC, id"` into items. A trailing `ASC`/`DESC` word sets the
    /// direction.
    pub fn parse_list(order: &str) -> Vec<OrderItem> {
        order
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| match part.rsplit_once(char::is_whitespace) {
                Some((column, dir)) if dir.eq_ignore_ascii_case("desc") => {
                    OrderItem::new(column.trim(), SortDir::Desc)
                }
                Some((column, dir)) if dir.eq_ignore_ascii_case("asc") => {
                    OrderItem::new(column.trim(), SortDir::Asc)
                }
                _ => OrderItem::new(part, SortDir::Asc),
            })
            .collect()
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub on: Option<Condition>,
}

/// Parts of a SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    /// `None` selects `*`.
    pub select: Option<Vec<SelectColumn>>,
    /// Raw text placed right after `SELECT` (`DISTINCT ON ("sectionId")`).
    pub select_option: Option<String>,
    pub distinct: bool,
    pub from: Vec<String>,
    pub joins: Vec<Join>,
    pub condition: Option<Condition>,
    pub group_by: Vec<String>,
    pub having: Option<Condition>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QuerySpec {
    pub fn from_table(table: impl Into<String>) -> Self {
        Self {
            from: vec![table.into()],
            ..Self::default()
        }
    }
}
