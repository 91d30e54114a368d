use super::*;
use crate::columns;
use crate::columns::Columns;
use crate::db::Db;
use crate::row::Row;
use crate::schema::SchemaRegistry;
use crate::testing::MockTransport;
use crate::value::Value;

fn db() -> Db<MockTransport, SchemaRegistry> {
    Db::new(MockTransport::new(), SchemaRegistry::new())
}

fn row(pairs: &[(&str, Value)]) -> Row {
    Row::from_pairs(pairs.iter().cloned())
}

#[test]
fn falsy_where_is_dropped() {
    let q = Query::new().from("entries").where_(None::<Condition>);
    assert_eq!(
        q.raw_sql(&db()).unwrap(),
        r#"SELECT * FROM "entries""#
    );

    let q = Query::new().from("entries").where_("x=1").and_where("").and_where(Columns::new());
    assert_eq!(
        q.raw_sql(&db()).unwrap(),
        r#"SELECT * FROM "entries" WHERE x=1"#
    );
}

#[test]
fn and_or_where_combine() {
    let q = Query::new()
        .from("entries")
        .and_where(Condition::eq("sectionId", 1))
        .and_where(columns! { "enabled" => true })
        .or_where("\"id\" = 4");
    assert_eq!(
        q.raw_sql(&db()).unwrap(),
        r#"SELECT * FROM "entries" WHERE ("sectionId" = 1 AND "enabled" = TRUE) OR ("id" = 4)"#
    );
}

#[test]
fn where_with_falsy_clears() {
    let q = Query::new().where_("a = 1").where_("");
    assert!(q.condition().is_none());
}

#[test]
fn select_normalization() {
    let q = Query::new().select("id, title AS t");
    let cols = q.select_columns().unwrap();
    assert_eq!(cols[0].key(), Some("id"));
    assert_eq!(cols[0].expr, "id");
    assert_eq!(cols[1].key(), Some("t"));
    assert_eq!(cols[1].expr, "title");

    let q = q.add_select("slug");
    assert_eq!(q.select_columns().unwrap().len(), 3);

    let q = Query::new().add_select("COUNT(*)");
    assert_eq!(q.select_columns().unwrap()[0].key(), None);
}

#[test]
fn is_joined_matches_prefix() {
    let q = Query::new()
        .from("entries")
        .left_join("users u", "u.id = entries.\"authorId\"");
    assert!(q.is_joined("users"));
    assert!(q.is_joined("users u"));
    assert!(!q.is_joined("sections"));
}

#[tokio::test]
async fn all_degrades_on_abort() {
    let db = db();
    db.client().push_rows(vec![row(&[("id", Value::Int(1))])]);
    let q = Query::new().from("entries");
    assert_eq!(q.all(&db).await.unwrap().len(), 1);

    db.client().abort_with("maintenance");
    assert!(q.all(&db).await.unwrap().is_empty());
    assert!(q.column(&db).await.unwrap().is_empty());
    assert!(!q.exists(&db).await.unwrap());
    assert!(q.pairs(&db).await.unwrap().is_empty());
    assert_eq!(q.count(&db).await.unwrap(), 0);
    assert_eq!(q.max("id", &db).await.unwrap(), None);
}

#[tokio::test]
async fn errors_are_not_swallowed() {
    let db = db();
    db.client().fail_next("connection reset");
    let err = Query::new().from("entries").all(&db).await.unwrap_err();
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn one_forces_and_restores_limit() {
    let db = db();
    db.client().push_rows(vec![row(&[("id", Value::Int(9))])]);
    let mut q = Query::new().from("entries").limit(20);

    let first = q.one(&db).await.unwrap().unwrap();
    assert_eq!(first.get("id"), Some(&Value::Int(9)));
    assert_eq!(db.client().last_sql().unwrap(), r#"SELECT * FROM "entries" LIMIT 1"#);
    assert_eq!(q.limit_value(), Some(20));

    db.client().abort_with("nope");
    assert!(q.one(&db).await.unwrap().is_none());
    assert!(q.scalar(&db).await.unwrap().is_none());
    assert_eq!(q.limit_value(), Some(20));
}

#[tokio::test]
async fn scalar_returns_first_column() {
    let db = db();
    db.client()
        .push_rows(vec![row(&[("title", Value::from("Hi")), ("id", Value::Int(3))])]);
    let mut q = Query::new().select("title, id").from("entries");
    assert_eq!(q.scalar(&db).await.unwrap(), Some(Value::from("Hi")));
    assert_eq!(q.limit_value(), None);
}

#[tokio::test]
async fn nth_offsets_from_current_offset() {
    let db = db();
    let mut q = Query::new().from("entries").offset(5);
    assert!(q.nth(2, &db).await.unwrap().is_none());
    assert_eq!(
        db.client().last_sql().unwrap(),
        r#"SELECT * FROM "entries" LIMIT 1 OFFSET 7"#
    );
    assert_eq!(q.offset_value(), Some(5));
    assert_eq!(q.limit_value(), None);
}

#[tokio::test]
async fn nth_past_bigint_range_is_rejected() {
    let db = db();
    let mut q = Query::new().from("entries").offset(u64::MAX - 1);
    let err = q.nth(5, &db).await.unwrap_err();
    assert!(matches!(err, crate::DbError::Validation(_)));

    let mut q = Query::new().from("entries").offset(i64::MAX as u64);
    assert!(q.nth(1, &db).await.is_err());
    assert!(db.client().statements().is_empty());
    assert_eq!(q.offset_value(), Some(i64::MAX as u64));
}

#[tokio::test]
async fn pairs_maps_first_to_second_column() {
    let db = db();
    db.client().push_rows(vec![
        row(&[("a", Value::Int(1)), ("b", Value::from("x"))]),
        row(&[("a", Value::Int(2)), ("b", Value::from("y"))]),
    ]);
    let pairs = Query::new().select("a, b").from("t").pairs(&db).await.unwrap();
    assert_eq!(pairs.get(1), Some(&Value::from("x")));
    assert_eq!(pairs.get(2), Some(&Value::from("y")));

    db.client().push_rows(vec![row(&[("a", Value::Int(1))])]);
    let err = Query::new().select("a").from("t").pairs(&db).await.unwrap_err();
    assert!(matches!(err, crate::DbError::InsufficientColumns { found: 1 }));

    let pairs = Query::new().from("t").pairs(&db).await.unwrap();
    assert!(pairs.is_empty());
}

#[tokio::test]
async fn count_uses_scalar_statement() {
    let db = db();
    db.client().push_rows(vec![row(&[("count", Value::Int(42))])]);
    let q = Query::new()
        .from("entries")
        .where_(Condition::eq("sectionId", 2))
        .order_by("postDate DESC")
        .limit(10);
    assert_eq!(q.count(&db).await.unwrap(), 42);
    assert_eq!(
        db.client().last_sql().unwrap(),
        r#"SELECT COUNT(*) FROM "entries" WHERE "sectionId" = $1"#
    );
}

#[tokio::test]
async fn exists_reads_boolean() {
    let db = db();
    db.client().push_rows(vec![row(&[("exists", Value::Bool(true))])]);
    assert!(Query::new().from("entries").exists(&db).await.unwrap());
    assert_eq!(
        db.client().last_sql().unwrap(),
        r#"SELECT EXISTS(SELECT * FROM "entries")"#
    );
}

#[tokio::test]
async fn aborted_query_skips_transport() {
    let db = db();
    let q = Query::new().from("entries").abort_with("no sites");
    assert!(q.all(&db).await.unwrap().is_empty());
    assert!(db.client().statements().is_empty());
}

#[test]
fn raw_sql_inlines_params() {
    let q = Query::new()
        .select("id")
        .from("entries")
        .where_(Condition::eq("slug", "it's"));
    assert_eq!(
        q.raw_sql(&db()).unwrap(),
        r#"SELECT "id" FROM "entries" WHERE "slug" = 'it''s'"#
    );
}
