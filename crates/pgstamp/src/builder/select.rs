use super::QueryBuilder;
use super::parts::{QuerySpec, SelectColumn};
use crate::error::DbResult;
use crate::ident::{quote_column_name, quote_name};
use crate::statement::{Binder, Statement};

fn render_select_column(column: &SelectColumn, binder: &mut Binder) -> String {
    let expr = if column.params.is_empty() {
        quote_column_name(&column.expr)
    } else {
        binder.bind_template(&column.expr, &column.params)
    };
    match &column.alias {
        Some(alias) if *alias != column.expr => format!("{expr} AS {}", quote_name(alias)),
        _ => expr,
    }
}

impl QueryBuilder {
    fn select_sql(&self, spec: &QuerySpec, binder: &mut Binder) -> String {
        let mut sql = String::from("SELECT ");
        if spec.distinct {
            sql.push_str("DISTINCT ");
        }
        if let Some(option) = spec.select_option.as_deref().filter(|o| !o.trim().is_empty()) {
            sql.push_str(option.trim());
            sql.push(' ');
        }

        match spec.select.as_deref() {
            Some(columns) if !columns.is_empty() => {
                let list: Vec<String> = columns
                    .iter()
                    .map(|c| render_select_column(c, binder))
                    .collect();
                sql.push_str(&list.join(", "));
            }
            _ => sql.push('*'),
        }

        if !spec.from.is_empty() {
            let tables: Vec<String> = spec.from.iter().map(|t| self.source_table(t)).collect();
            sql.push_str(" FROM ");
            sql.push_str(&tables.join(", "));
        }

        for join in &spec.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&self.source_table(&join.table));
            if let Some(on) = join.on.as_ref().filter(|c| !c.is_falsy()) {
                sql.push_str(" ON ");
                sql.push_str(&on.build(binder));
            }
        }

        if let Some(condition) = spec.condition.as_ref().filter(|c| !c.is_falsy()) {
            sql.push_str(" WHERE ");
            sql.push_str(&condition.build(binder));
        }

        if !spec.group_by.is_empty() {
            let cols: Vec<String> = spec.group_by.iter().map(|c| quote_column_name(c)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if let Some(having) = spec.having.as_ref().filter(|c| !c.is_falsy()) {
            sql.push_str(" HAVING ");
            sql.push_str(&having.build(binder));
        }

        if !spec.order_by.is_empty() {
            let items: Vec<String> = spec
                .order_by
                .iter()
                .map(|item| {
                    let mut s = format!("{} {}", quote_column_name(&item.column), item.dir.as_sql());
                    if let Some(nulls) = item.nulls {
                        s.push(' ');
                        s.push_str(nulls.as_sql());
                    }
                    s
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        if let Some(limit) = spec.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = spec.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }

    pub fn select(&self, spec: &QuerySpec) -> DbResult<Statement> {
        let mut binder = Binder::new();
        let sql = self.select_sql(spec, &mut binder);
        binder.finish(sql)
    }

    /// `SELECT EXISTS(...)`.
    pub fn exists(&self, spec: &QuerySpec) -> DbResult<Statement> {
        let mut binder = Binder::new();
        let inner = self.select_sql(spec, &mut binder);
        binder.finish(format!("SELECT EXISTS({inner})"))
    }

    /// A statement returning `expr` computed over the rows `spec` selects (`COUNT(*)`,
    /// `MAX("postDate")`).
    ///
    /// A plain query has its select list replaced and its ordering and paging dropped.
    /// With DISTINCT, GROUP BY or HAVING the query is wrapped as a subquery instead, since
    /// replacing its select list would change which rows it produces.
    pub fn scalar(&self, spec: &QuerySpec, expr: &str) -> DbResult<Statement> {
        let needs_subquery = spec.distinct || !spec.group_by.is_empty() || spec.having.is_some();
        let mut binder = Binder::new();

        let sql = if needs_subquery {
            let inner = self.select_sql(spec, &mut binder);
            format!("SELECT {expr} FROM ({inner}) \"c\"")
        } else {
            let plain = QuerySpec {
                select: Some(vec![SelectColumn::positional(expr)]),
                select_option: None,
                order_by: Vec::new(),
                limit: None,
                offset: None,
                ..spec.clone()
            };
            self.select_sql(&plain, &mut binder)
        };
        binder.finish(sql)
    }
}
