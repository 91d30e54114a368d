use super::*;
use crate::columns;
use crate::columns::{Columns, Expression};
use crate::condition::Condition;
use crate::schema::TableSchema;
use crate::value::Value;

fn qb() -> QueryBuilder {
    QueryBuilder::new()
}

#[test]
fn test_insert() {
    let stmt = qb()
        .insert("entries", &columns! { "title" => "Hello", "authorId" => 3 })
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "entries" ("title", "authorId") VALUES ($1, $2)"#
    );
    assert_eq!(stmt.params(), &[Value::from("Hello"), Value::Int(3)]);
}

#[test]
fn test_insert_default_values() {
    let stmt = qb().insert("entries", &Columns::new()).unwrap();
    assert_eq!(stmt.sql(), r#"INSERT INTO "entries" DEFAULT VALUES"#);
}

#[test]
fn test_insert_expression() {
    let cols = Columns::new()
        .with("title", "x")
        .set_expr("postDate", Expression::raw("NOW()"));
    let stmt = qb().insert("entries", &cols).unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "entries" ("title", "postDate") VALUES ($1, NOW())"#
    );
}

#[test]
fn test_insert_rejects_bad_identifier() {
    let err = qb()
        .insert("entries; DROP TABLE x", &columns! { "a" => 1 })
        .unwrap_err();
    assert!(matches!(err, crate::DbError::Validation(_)));
}

#[test]
fn test_table_prefix() {
    let qb = QueryBuilder::new().with_table_prefix("craft_");
    assert_eq!(qb.table_name("{{%entries}}"), "craft_entries");
    assert_eq!(qb.table_name("{{entries}}"), "entries");
    assert_eq!(qb.schema_name("{{%entries}} e"), "craft_entries");
    assert_eq!(qb.schema_name("archive.{{%entries}} AS e"), "archive.craft_entries");
    let stmt = qb.insert("{{%entries}}", &columns! { "a" => 1 }).unwrap();
    assert_eq!(stmt.sql(), r#"INSERT INTO "craft_entries" ("a") VALUES ($1)"#);
}

#[test]
fn test_schema_name_keeps_qualifier() {
    assert_eq!(qb().schema_name("archive.entries"), "archive.entries");
    assert_eq!(qb().schema_name(r#""archive"."entries" a"#), "archive.entries");
    assert_eq!(qb().schema_name(r#"public."My Table""#), r#"public."My Table""#);
    assert_eq!(qb().schema_name("entries"), "entries");
}

#[test]
fn test_insert_rejects_list_value() {
    let cols = Columns::new().set_list("id", [1, 2]);
    let err = qb().insert("entries", &cols).unwrap_err();
    assert!(matches!(err, crate::DbError::Validation(_)));
    let err = qb().update("entries", &cols, None, &[]).unwrap_err();
    assert!(err.to_string().contains("list"));
}

#[test]
fn test_batch_insert() {
    let stmt = qb()
        .batch_insert(
            "tags",
            &["name".to_string(), "groupId".to_string()],
            &[
                vec![Value::from("a"), Value::Int(1)],
                vec![Value::from("b"), Value::Int(1)],
            ],
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "tags" ("name", "groupId") VALUES ($1, $2), ($3, $4)"#
    );
    assert_eq!(stmt.params().len(), 4);
}

#[test]
fn test_batch_insert_row_length_mismatch() {
    let err = qb()
        .batch_insert("tags", &["name".to_string()], &[vec![Value::from("a"), Value::Int(1)]])
        .unwrap_err();
    assert!(err.to_string().contains("row 0"));
    assert!(qb().batch_insert("tags", &["name".to_string()], &[]).is_err());
}

fn users_schema() -> TableSchema {
    TableSchema::new("users")
        .with_columns(&["id", "email", "name"])
        .with_primary_key(&["id"])
        .with_unique_key(&["email"])
}

#[test]
fn test_upsert_mirror_uses_first_covered_key() {
    let schema = users_schema();
    let stmt = qb()
        .upsert(
            "users",
            Some(&schema),
            &columns! { "email" => "a@b.c", "name" => "A" },
            &UpdateColumns::Mirror,
            &[],
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "users" ("email", "name") VALUES ($1, $2) ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name""#
    );
}

#[test]
fn test_upsert_set_binds_values() {
    let schema = users_schema();
    let stmt = qb()
        .upsert(
            "users",
            Some(&schema),
            &columns! { "id" => 1, "name" => "A" },
            &UpdateColumns::Set(columns! { "name" => "B" }),
            &[],
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "users" ("id", "name") VALUES ($1, $2) ON CONFLICT ("id") DO UPDATE SET "name" = $3"#
    );
    assert_eq!(stmt.params()[2], Value::from("B"));
}

#[test]
fn test_upsert_do_nothing() {
    let schema = users_schema();
    let stmt = qb()
        .upsert(
            "users",
            Some(&schema),
            &columns! { "id" => 1 },
            &UpdateColumns::DoNothing,
            &[],
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "users" ("id") VALUES ($1) ON CONFLICT ("id") DO NOTHING"#
    );

    let stmt = qb()
        .upsert("users", None, &columns! { "id" => 1 }, &UpdateColumns::DoNothing, &[])
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"INSERT INTO "users" ("id") VALUES ($1) ON CONFLICT DO NOTHING"#
    );
}

#[test]
fn test_upsert_without_key_is_plain_insert() {
    let stmt = qb()
        .upsert("users", None, &columns! { "name" => "A" }, &UpdateColumns::Mirror, &[])
        .unwrap();
    assert_eq!(stmt.sql(), r#"INSERT INTO "users" ("name") VALUES ($1)"#);
}

#[test]
fn test_update_with_statement_params() {
    let cond = Condition::raw("\"id\" = ?");
    let stmt = qb()
        .update(
            "entries",
            &columns! { "title" => "New" },
            Some(&cond),
            &[Value::Int(7)],
        )
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"UPDATE "entries" SET "title" = $1 WHERE "id" = $2"#
    );
    assert_eq!(stmt.params(), &[Value::from("New"), Value::Int(7)]);
}

#[test]
fn test_update_requires_set() {
    assert!(qb().update("entries", &Columns::new(), None, &[]).is_err());
}

#[test]
fn test_update_unbound_params_error() {
    let err = qb()
        .update("entries", &columns! { "a" => 1 }, None, &[Value::Int(1)])
        .unwrap_err();
    assert!(err.to_string().contains("not bound"));
}

#[test]
fn test_delete() {
    let cond = Condition::eq("id", 3);
    let stmt = qb().delete("entries", Some(&cond), &[]).unwrap();
    assert_eq!(stmt.sql(), r#"DELETE FROM "entries" WHERE "id" = $1"#);
    let stmt = qb().delete("entries", None, &[]).unwrap();
    assert_eq!(stmt.sql(), r#"DELETE FROM "entries""#);
}

#[test]
fn test_delete_duplicates() {
    let stmt = qb()
        .delete_duplicates("relations", &["sourceId", "targetId"], "id")
        .unwrap();
    assert_eq!(
        stmt.sql(),
        concat!(
            r#"DELETE FROM "relations" WHERE "id" IN (SELECT "id" FROM (SELECT "id", "#,
            r#"ROW_NUMBER() OVER (PARTITION BY "sourceId", "targetId" ORDER BY "id" DESC) AS "rownum" "#,
            r#"FROM "relations") "d" WHERE "d"."rownum" > 1)"#
        )
    );
    assert!(qb().delete_duplicates("relations", &[], "id").is_err());
}

#[test]
fn test_replace() {
    let cond = Condition::eq("fieldId", 4);
    let stmt = qb()
        .replace("content", "body", "{old}", "{new}", Some(&cond), &[])
        .unwrap();
    assert_eq!(
        stmt.sql(),
        r#"UPDATE "content" SET "body" = REPLACE("body", $1, $2) WHERE "fieldId" = $3"#
    );
}

#[test]
fn test_ddl() {
    assert_eq!(
        qb().drop_table_if_exists("tmp_entries").unwrap().sql(),
        r#"DROP TABLE IF EXISTS "tmp_entries""#
    );
    assert_eq!(
        qb().rename_sequence("public.old_seq", "new_seq").unwrap().sql(),
        r#"ALTER SEQUENCE "public"."old_seq" RENAME TO "new_seq""#
    );
}

#[test]
fn test_simple_select() {
    let stmt = qb().select(&QuerySpec::from_table("users")).unwrap();
    assert_eq!(stmt.sql(), r#"SELECT * FROM "users""#);
}

#[test]
fn test_full_select() {
    let spec = QuerySpec {
        select: Some(vec![
            SelectColumn::aliased("id", "id"),
            SelectColumn::aliased("t", "e.title"),
            SelectColumn::positional("COUNT(*)"),
        ]),
        from: vec!["entries e".into()],
        joins: vec![Join {
            kind: JoinKind::Left,
            table: "users u".into(),
            on: Some(Condition::raw("u.id = e.\"authorId\"")),
        }],
        condition: Some(Condition::eq("e.sectionId", 2)),
        group_by: vec!["e.id".into()],
        having: Some(Condition::gt("COUNT(*)", 1)),
        order_by: vec![OrderItem::new("e.postDate", SortDir::Desc).nulls(NullsOrder::Last)],
        limit: Some(10),
        offset: Some(20),
        ..QuerySpec::default()
    };
    let stmt = qb().select(&spec).unwrap();
    assert_eq!(
        stmt.sql(),
        concat!(
            r#"SELECT "id", "e"."title" AS "t", COUNT(*) FROM "entries" "e" "#,
            r#"LEFT JOIN "users" "u" ON u.id = e."authorId" "#,
            r#"WHERE "e"."sectionId" = $1 GROUP BY "e"."id" HAVING COUNT(*) > $2 "#,
            r#"ORDER BY "e"."postDate" DESC NULLS LAST LIMIT 10 OFFSET 20"#
        )
    );
    assert_eq!(stmt.params().len(), 2);
}

#[test]
fn test_order_parse_list() {
    let items = OrderItem::parse_list("postDate DESC, id,  title asc");
    assert_eq!(
        items,
        vec![
            OrderItem::new("postDate", SortDir::Desc),
            OrderItem::new("id", SortDir::Asc),
            OrderItem::new("title", SortDir::Asc),
        ]
    );
}

#[test]
fn test_exists() {
    let mut spec = QuerySpec::from_table("users");
    spec.condition = Some(Condition::eq("status", "active"));
    let stmt = qb().exists(&spec).unwrap();
    assert_eq!(
        stmt.sql(),
        r#"SELECT EXISTS(SELECT * FROM "users" WHERE "status" = $1)"#
    );
}

#[test]
fn test_scalar_replaces_select_list() {
    let mut spec = QuerySpec::from_table("users");
    spec.select = Some(vec![SelectColumn::aliased("id", "id")]);
    spec.order_by = OrderItem::parse_list("id");
    spec.limit = Some(5);
    let stmt = qb().scalar(&spec, "COUNT(*)").unwrap();
    assert_eq!(stmt.sql(), r#"SELECT COUNT(*) FROM "users""#);
}

#[test]
fn test_scalar_wraps_grouped_query() {
    let mut spec = QuerySpec::from_table("entries");
    spec.select = Some(vec![SelectColumn::aliased("sectionId", "sectionId")]);
    spec.group_by = vec!["sectionId".into()];
    let stmt = qb().scalar(&spec, "COUNT(*)").unwrap();
    assert_eq!(
        stmt.sql(),
        r#"SELECT COUNT(*) FROM (SELECT "sectionId" FROM "entries" GROUP BY "sectionId") "c""#
    );
}

#[test]
fn test_select_option_and_distinct() {
    let spec = QuerySpec {
        distinct: true,
        select_option: Some("/* hint */".into()),
        ..QuerySpec::from_table("users")
    };
    assert_eq!(
        qb().select(&spec).unwrap().sql(),
        r#"SELECT DISTINCT /* hint */ * FROM "users""#
    );
}
