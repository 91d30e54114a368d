use super::{QueryBuilder, column_ident};
use crate::columns::{ColumnValue, Columns};
use crate::condition::Condition;
use crate::error::{DbError, DbResult};
use crate::ident::{Ident, quote_name};
use crate::schema::TableSchema;
use crate::statement::{Binder, Statement};
use crate::value::Value;

/// What an upsert does when the row already exists.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum UpdateColumns {
    /// Update every inserted column (except the conflict key) from the proposed row.
    #[default]
    Mirror,
    /// Update these columns.
    Set(Columns),
    /// Leave the existing row alone.
    DoNothing,
}

fn render_value(name: &str, value: &ColumnValue, binder: &mut Binder) -> DbResult<String> {
    match value {
        ColumnValue::Value(v) => Ok(binder.push(v.clone())),
        ColumnValue::Expr(e) => Ok(binder.bind_template(&e.sql, &e.params)),
        ColumnValue::List(_) => Err(DbError::validation(format!(
            "column {name} has a list value; lists only work in conditions"
        ))),
    }
}

fn render_assignments(columns: &Columns, binder: &mut Binder) -> DbResult<String> {
    let mut sets = Vec::with_capacity(columns.len());
    for (name, value) in columns.iter() {
        sets.push(format!(
            "{} = {}",
            column_ident(name)?,
            render_value(name, value, binder)?
        ));
    }
    Ok(sets.join(", "))
}

fn render_where(condition: Option<&Condition>, binder: &mut Binder) -> String {
    match condition {
        Some(c) if !c.is_falsy() => format!(" WHERE {}", c.build(binder)),
        _ => String::new(),
    }
}

/// First key (primary key, then unique keys) fully covered by the inserted columns.
fn conflict_target<'a>(schema: &'a TableSchema, columns: &Columns) -> Option<&'a [String]> {
    schema
        .keys()
        .find(|key| key.iter().all(|col| columns.contains(col)))
}

impl QueryBuilder {
    fn insert_sql(&self, table: &str, columns: &Columns, binder: &mut Binder) -> DbResult<String> {
        let table = self.target_table(table)?;
        if columns.is_empty() {
            return Ok(format!("INSERT INTO {table} DEFAULT VALUES"));
        }
        let mut names = Vec::with_capacity(columns.len());
        let mut values = Vec::with_capacity(columns.len());
        for (name, value) in columns.iter() {
            names.push(column_ident(name)?);
            values.push(render_value(name, value, binder)?);
        }
        Ok(format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            values.join(", ")
        ))
    }

    /// `INSERT INTO "t" ("a", "b") VALUES ($1, $2)`; `DEFAULT VALUES` when `columns` is
    /// empty.
    pub fn insert(&self, table: &str, columns: &Columns) -> DbResult<Statement> {
        let mut binder = Binder::new();
        let sql = self.insert_sql(table, columns, &mut binder)?;
        binder.finish(sql)
    }

    /// Multi-row insert. Every row must have one value per column.
    pub fn batch_insert(
        &self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> DbResult<Statement> {
        if rows.is_empty() {
            return Err(DbError::validation("batch insert requires at least one row"));
        }
        if columns.is_empty() {
            return Err(DbError::validation("batch insert requires at least one column"));
        }
        let table = self.target_table(table)?;
        let names = columns
            .iter()
            .map(|c| column_ident(c))
            .collect::<DbResult<Vec<_>>>()?;

        let mut binder = Binder::new();
        let mut tuples = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DbError::validation(format!(
                    "batch insert row {i} has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
            let values: Vec<String> = row.iter().map(|v| binder.push(v.clone())).collect();
            tuples.push(format!("({})", values.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {table} ({}) VALUES {}",
            names.join(", "),
            tuples.join(", ")
        );
        binder.finish(sql)
    }

    /// `INSERT ... ON CONFLICT (key) DO UPDATE SET ...`.
    ///
    /// The conflict key is the first primary or unique key of `schema` whose columns are
    /// all inserted. Without one the statement is a plain insert, except for
    /// [`UpdateColumns::DoNothing`], which Postgres accepts without a key.
    pub fn upsert(
        &self,
        table: &str,
        schema: Option<&TableSchema>,
        insert: &Columns,
        update: &UpdateColumns,
        params: &[Value],
    ) -> DbResult<Statement> {
        let mut binder = Binder::with_pending(params);
        let mut sql = self.insert_sql(table, insert, &mut binder)?;
        let target = schema.and_then(|s| conflict_target(s, insert));

        let Some(target) = target else {
            if *update == UpdateColumns::DoNothing {
                sql.push_str(" ON CONFLICT DO NOTHING");
            }
            return binder.finish(sql);
        };

        let key = target
            .iter()
            .map(|c| quote_name(c))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(" ON CONFLICT ({key}) "));

        let sets = match update {
            UpdateColumns::DoNothing => String::new(),
            UpdateColumns::Mirror => {
                let mut sets = Vec::new();
                for name in insert.names().filter(|n| !target.iter().any(|k| k == n)) {
                    let col = column_ident(name)?;
                    sets.push(format!("{col} = EXCLUDED.{col}"));
                }
                sets.join(", ")
            }
            UpdateColumns::Set(columns) => render_assignments(columns, &mut binder)?,
        };

        if sets.is_empty() {
            sql.push_str("DO NOTHING");
        } else {
            sql.push_str("DO UPDATE SET ");
            sql.push_str(&sets);
        }
        binder.finish(sql)
    }

    /// `UPDATE "t" SET ... [WHERE ...]`. SET must not be empty.
    pub fn update(
        &self,
        table: &str,
        columns: &Columns,
        condition: Option<&Condition>,
        params: &[Value],
    ) -> DbResult<Statement> {
        if columns.is_empty() {
            return Err(DbError::validation("UPDATE requires at least one column to set"));
        }
        let table = self.target_table(table)?;
        let mut binder = Binder::with_pending(params);
        let sets = render_assignments(columns, &mut binder)?;
        let mut sql = format!("UPDATE {table} SET {sets}");
        sql.push_str(&render_where(condition, &mut binder));
        binder.finish(sql)
    }

    /// `DELETE FROM "t" [WHERE ...]`.
    pub fn delete(
        &self,
        table: &str,
        condition: Option<&Condition>,
        params: &[Value],
    ) -> DbResult<Statement> {
        let table = self.target_table(table)?;
        let mut binder = Binder::with_pending(params);
        let mut sql = format!("DELETE FROM {table}");
        sql.push_str(&render_where(condition, &mut binder));
        binder.finish(sql)
    }

    /// Delete rows that repeat the values of `columns`, keeping the row with the highest
    /// `pk` in each group. `NULL`s count as equal.
    pub fn delete_duplicates(
        &self,
        table: &str,
        columns: &[&str],
        pk: &str,
    ) -> DbResult<Statement> {
        if columns.is_empty() {
            return Err(DbError::validation(
                "deleting duplicates requires at least one column",
            ));
        }
        let table = self.target_table(table)?;
        let pk = column_ident(pk)?;
        let partition = columns
            .iter()
            .map(|c| column_ident(c))
            .collect::<DbResult<Vec<_>>>()?
            .join(", ");

        Ok(Statement::raw(format!(
            "DELETE FROM {table} WHERE {pk} IN (\
             SELECT {pk} FROM (\
             SELECT {pk}, ROW_NUMBER() OVER (PARTITION BY {partition} ORDER BY {pk} DESC) AS \"rownum\" \
             FROM {table}) \"d\" \
             WHERE \"d\".\"rownum\" > 1)"
        )))
    }

    /// `UPDATE "t" SET "c" = REPLACE("c", find, replace) [WHERE ...]`.
    pub fn replace(
        &self,
        table: &str,
        column: &str,
        find: &str,
        replace: &str,
        condition: Option<&Condition>,
        params: &[Value],
    ) -> DbResult<Statement> {
        let table = self.target_table(table)?;
        let column = column_ident(column)?;
        let mut binder = Binder::with_pending(params);
        let find = binder.push(find);
        let replace = binder.push(replace);
        let mut sql = format!("UPDATE {table} SET {column} = REPLACE({column}, {find}, {replace})");
        sql.push_str(&render_where(condition, &mut binder));
        binder.finish(sql)
    }

    pub fn drop_table_if_exists(&self, table: &str) -> DbResult<Statement> {
        Ok(Statement::raw(format!(
            "DROP TABLE IF EXISTS {}",
            self.target_table(table)?
        )))
    }

    /// `ALTER SEQUENCE "old" RENAME TO "new"`. The new name stays in the old schema.
    pub fn rename_sequence(&self, old_name: &str, new_name: &str) -> DbResult<Statement> {
        let old = self.target_table(old_name)?;
        let new = Ident::parse(&self.table_name(new_name))?;
        Ok(Statement::raw(format!(
            "ALTER SEQUENCE {old} RENAME TO {}",
            quote_name(new.name())
        )))
    }
}
