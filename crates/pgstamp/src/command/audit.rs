//! Audit column stamping.
//!
//! Tables may carry up to three audit columns: a creation timestamp, an update timestamp
//! and a stable `uid`. Each is stamped only when the table has it and the caller did not
//! supply a value.

use crate::builder::UpdateColumns;
use crate::columns::Columns;
use crate::schema::TableSchema;
use crate::value::Value;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audit column names.
///
/// Set a name to `None` to never stamp that column. Deserializes from a settings file;
/// missing keys keep their defaults and an explicit `null` turns a column off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub date_created: Option<String>,
    pub date_updated: Option<String>,
    pub uid: Option<String>,
    /// Column written by soft-delete and restore.
    pub date_deleted: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            date_created: Some("dateCreated".into()),
            date_updated: Some("dateUpdated".into()),
            uid: Some("uid".into()),
            date_deleted: "dateDeleted".into(),
        }
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No audit columns at all. Soft-delete still uses `dateDeleted`.
    pub fn disabled() -> Self {
        Self {
            date_created: None,
            date_updated: None,
            uid: None,
            ..Self::default()
        }
    }

    pub fn with_date_created(mut self, column: impl Into<String>) -> Self {
        self.date_created = Some(column.into());
        self
    }

    pub fn with_date_updated(mut self, column: impl Into<String>) -> Self {
        self.date_updated = Some(column.into());
        self
    }

    pub fn with_uid(mut self, column: impl Into<String>) -> Self {
        self.uid = Some(column.into());
        self
    }

    pub fn with_date_deleted(mut self, column: impl Into<String>) -> Self {
        self.date_deleted = column.into();
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.date_created.is_none() && self.date_updated.is_none() && self.uid.is_none()
    }

    /// Audit columns `schema` has, in stamping order.
    fn present<'a>(&'a self, schema: &TableSchema) -> Present<'a> {
        let pick = |name: &'a Option<String>| name.as_deref().filter(|n| schema.has_column(n));
        Present {
            date_created: pick(&self.date_created),
            date_updated: pick(&self.date_updated),
            uid: pick(&self.uid),
        }
    }

    /// Fill blank (absent, `NULL` or empty) audit columns of a single-row insert.
    pub fn stamp_insert(&self, schema: &TableSchema, columns: &mut Columns, now: NaiveDateTime) {
        let present = self.present(schema);
        for (name, value) in present.defaults(now) {
            if columns.set_if_blank(name, value) {
                tracing::debug!(target: "pgstamp", table = %schema.name, column = name, "stamped audit column");
            }
        }
    }

    /// Set the update timestamp unless the caller gave one.
    pub fn stamp_update(&self, schema: &TableSchema, columns: &mut Columns, now: NaiveDateTime) {
        if let Some(name) = self.present(schema).date_updated {
            if columns.set_if_unset(name, now) {
                tracing::debug!(target: "pgstamp", table = %schema.name, column = name, "stamped audit column");
            }
        }
    }

    /// Fill unset (absent or `NULL`) audit columns on both sides of an upsert.
    ///
    /// The update side of [`UpdateColumns::Mirror`] follows the insert side;
    /// [`UpdateColumns::DoNothing`] is left alone.
    pub fn stamp_upsert(
        &self,
        schema: &TableSchema,
        insert: &mut Columns,
        update: &mut UpdateColumns,
        now: NaiveDateTime,
    ) {
        let defaults = self.present(schema).defaults(now);
        for (name, value) in defaults {
            insert.set_if_unset(name, value.clone());
            if let UpdateColumns::Set(update) = update {
                update.set_if_unset(name, value);
            }
        }
    }

    /// Append audit columns to a multi-row insert.
    ///
    /// Every row shares one timestamp; each row gets its own `uid`. Columns the caller
    /// already lists are left to the caller.
    pub fn stamp_batch(
        &self,
        schema: &TableSchema,
        columns: &mut Vec<String>,
        rows: &mut [Vec<Value>],
        now: NaiveDateTime,
    ) {
        let present = self.present(schema);
        let listed = |name: &str| columns.iter().any(|c| c == name);
        let date_created = present.date_created.filter(|n| !listed(n));
        let date_updated = present.date_updated.filter(|n| !listed(n));
        let uid = present.uid.filter(|n| !listed(n));

        for name in [date_created, date_updated, uid].into_iter().flatten() {
            columns.push(name.to_string());
        }
        for row in rows.iter_mut() {
            if date_created.is_some() {
                row.push(Value::Timestamp(now));
            }
            if date_updated.is_some() {
                row.push(Value::Timestamp(now));
            }
            if uid.is_some() {
                row.push(Value::Text(new_uid()));
            }
        }
    }
}

struct Present<'a> {
    date_created: Option<&'a str>,
    date_updated: Option<&'a str>,
    uid: Option<&'a str>,
}

impl<'a> Present<'a> {
    /// Default values for the present columns. One `uid` per call.
    fn defaults(&self, now: NaiveDateTime) -> Vec<(&'a str, Value)> {
        let mut out = Vec::with_capacity(3);
        if let Some(name) = self.date_created {
            out.push((name, Value::Timestamp(now)));
        }
        if let Some(name) = self.date_updated {
            out.push((name, Value::Timestamp(now)));
        }
        if let Some(name) = self.uid {
            out.push((name, Value::Text(new_uid())));
        }
        out
    }
}

/// Current UTC time, truncated to whole seconds.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

/// A fresh v4 UUID in its hyphenated text form.
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns;

    fn audited() -> TableSchema {
        TableSchema::new("entries").with_columns(&[
            "id",
            "title",
            "dateCreated",
            "dateUpdated",
            "uid",
        ])
    }

    #[test]
    fn config_from_settings() {
        let config: AuditConfig =
            serde_json::from_str(r#"{"uid": null, "date_deleted": "trashedAt"}"#).unwrap();
        assert_eq!(config.date_created.as_deref(), Some("dateCreated"));
        assert_eq!(config.uid, None);
        assert_eq!(config.date_deleted, "trashedAt");
    }

    #[test]
    fn insert_fills_blank_columns_only() {
        let now = now();
        let mut cols = columns! { "title" => "x", "uid" => "fixed", "dateCreated" => "" };
        AuditConfig::default().stamp_insert(&audited(), &mut cols, now);
        assert_eq!(cols.get("uid").and_then(|v| v.as_value()), Some(&Value::from("fixed")));
        assert_eq!(
            cols.get("dateCreated").and_then(|v| v.as_value()),
            Some(&Value::Timestamp(now))
        );
        assert!(cols.contains("dateUpdated"));
    }

    #[test]
    fn table_without_audit_columns_is_untouched() {
        let schema = TableSchema::new("tags").with_columns(&["id", "name"]);
        let mut cols = columns! { "name" => "x" };
        AuditConfig::default().stamp_insert(&schema, &mut cols, now());
        assert_eq!(cols, columns! { "name" => "x" });
    }

    #[test]
    fn custom_column_names() {
        let schema = TableSchema::new("logs").with_columns(&["created_at", "updated_at"]);
        let config = AuditConfig::disabled()
            .with_date_created("created_at")
            .with_date_updated("updated_at");
        let mut cols = Columns::new();
        config.stamp_insert(&schema, &mut cols, now());
        assert_eq!(cols.names().collect::<Vec<_>>(), vec!["created_at", "updated_at"]);
    }

    #[test]
    fn update_respects_supplied_value() {
        let supplied = NaiveDateTime::default();
        let mut cols = columns! { "dateUpdated" => supplied };
        AuditConfig::default().stamp_update(&audited(), &mut cols, now());
        assert_eq!(
            cols.get("dateUpdated").and_then(|v| v.as_value()),
            Some(&Value::Timestamp(supplied))
        );
    }

    #[test]
    fn upsert_shares_defaults_between_sides() {
        let now = now();
        let mut insert = columns! { "title" => "x" };
        let mut update = UpdateColumns::Set(columns! { "title" => "y" });
        AuditConfig::default().stamp_upsert(&audited(), &mut insert, &mut update, now);
        let UpdateColumns::Set(update) = update else {
            panic!("expected Set");
        };
        assert_eq!(insert.get("uid"), update.get("uid"));
        assert_eq!(
            update.get("dateUpdated").and_then(|v| v.as_value()),
            Some(&Value::Timestamp(now))
        );
    }

    #[test]
    fn batch_shares_timestamp_with_unique_uids() {
        let now = now();
        let mut columns = vec!["title".to_string()];
        let mut rows = vec![vec![Value::from("a")], vec![Value::from("b")], vec![Value::from("c")]];
        AuditConfig::default().stamp_batch(&audited(), &mut columns, &mut rows, now);

        assert_eq!(columns, vec!["title", "dateCreated", "dateUpdated", "uid"]);
        for row in &rows {
            assert_eq!(row[1], Value::Timestamp(now));
            assert_eq!(row[2], Value::Timestamp(now));
        }
        let mut uids: Vec<String> = rows.iter().map(|r| r[3].to_string()).collect();
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), 3);
    }

    #[test]
    fn batch_skips_listed_columns() {
        let mut columns = vec!["uid".to_string()];
        let mut rows = vec![vec![Value::from("mine")]];
        AuditConfig::default().stamp_batch(&audited(), &mut columns, &mut rows, now());
        assert_eq!(columns, vec!["uid", "dateCreated", "dateUpdated"]);
        assert_eq!(rows[0][0], Value::from("mine"));
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn now_has_no_fraction() {
        use chrono::Timelike;
        assert_eq!(now().nanosecond(), 0);
    }
}
