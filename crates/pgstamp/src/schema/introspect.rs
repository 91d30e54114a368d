use super::{ColumnSchema, TableSchema};
use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use crate::statement::Statement;
use crate::transport::Transport;
use crate::value::Value;

const COLUMNS_SQL: &str = r#"
SELECT
  a.attname::text AS column_name,
  pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type,
  a.attnotnull AS not_null
FROM pg_catalog.pg_attribute a
WHERE a.attrelid = to_regclass($1::text)
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

const KEYS_SQL: &str = r#"
SELECT
  i.indisprimary AS is_primary,
  array_to_json(array_agg(a.attname::text ORDER BY k.ord)) AS key_columns
FROM pg_catalog.pg_index i
CROSS JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_catalog.pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = k.attnum
WHERE i.indrelid = to_regclass($1::text)
  AND i.indisunique
  AND i.indpred IS NULL
  AND NOT (0 = ANY(i.indkey::int2[]))
GROUP BY i.indexrelid, i.indisprimary
ORDER BY i.indisprimary DESC, i.indexrelid
"#;

/// Load a table's columns, primary key and unique keys from `pg_catalog`.
///
/// `table` may be schema-qualified; unqualified names resolve through the `search_path`.
/// Returns `None` when the table does not exist.
pub async fn load_table_schema<C: Transport>(
    client: &C,
    table: &str,
) -> DbResult<Option<TableSchema>> {
    let ident = Ident::parse(table)?;
    let regclass = Value::Text(ident.to_sql());

    let rows = client
        .fetch(&Statement::new(COLUMNS_SQL, vec![regclass.clone()]))
        .await?
        .into_result()?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut schema = TableSchema::new(ident.name());
    for row in &rows {
        schema.columns.push(ColumnSchema {
            name: row.try_get_column("column_name")?,
            data_type: row.try_get_column("data_type")?,
            is_primary_key: false,
            not_null: row.try_get_column("not_null")?,
        });
    }

    let keys = client
        .fetch(&Statement::new(KEYS_SQL, vec![regclass]))
        .await?
        .into_result()?;
    for row in &keys {
        let is_primary: bool = row.try_get_column("is_primary")?;
        let json: serde_json::Value = row.try_get_column("key_columns")?;
        let columns: Vec<String> = serde_json::from_value(json)
            .map_err(|e| DbError::decode("key_columns", e.to_string()))?;
        if is_primary {
            schema.primary_key = columns;
        } else {
            schema.unique_keys.push(columns);
        }
    }
    for col in &mut schema.columns {
        col.is_primary_key = schema.primary_key.contains(&col.name);
    }

    tracing::debug!(
        target: "pgstamp",
        table = %table,
        columns = schema.columns.len(),
        unique_keys = schema.unique_keys.len(),
        "loaded table schema"
    );
    Ok(Some(schema))
}
