use pgstamp::prelude::*;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

#[tokio::test]
async fn audited_roundtrip() -> DbResult<()> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping audited_roundtrip");
            return Ok(());
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(DbError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let table = format!("pgstamp_entries_{}_{}", std::process::id(), nanos);

    client
        .batch_execute(&format!(
            r#"CREATE TABLE "{table}" (
                "id" serial PRIMARY KEY,
                "slug" text NOT NULL UNIQUE,
                "title" text,
                "dateCreated" timestamp NOT NULL,
                "dateUpdated" timestamp NOT NULL,
                "dateDeleted" timestamp NULL,
                "uid" text NOT NULL
            )"#
        ))
        .await
        .map_err(DbError::from_db_error)?;

    let result = roundtrip(&client, &table).await;

    client
        .batch_execute(&format!(r#"DROP TABLE IF EXISTS "{table}""#))
        .await
        .map_err(DbError::from_db_error)?;
    result
}

async fn roundtrip(client: &tokio_postgres::Client, table: &str) -> DbResult<()> {
    let db = Db::new(client, CachedSchema::new(client));

    db.command()
        .batch_insert(
            table,
            &["slug", "title"],
            vec![
                vec![Value::from("one"), Value::from("One")],
                vec![Value::from("two"), Value::from("Two")],
            ],
        )
        .await?
        .execute()
        .await?;

    db.command()
        .upsert(
            table,
            columns! { "slug" => "one", "title" => "Uno" },
            UpdateColumns::Mirror,
            &[],
        )
        .await?
        .execute()
        .await?;

    let titles = db
        .query()
        .select("slug, title")
        .from(table)
        .order_by("slug")
        .pairs(&db)
        .await?;
    assert_eq!(titles.get("one"), Some(&Value::from("Uno")));
    assert_eq!(titles.get("two"), Some(&Value::from("Two")));

    db.command()
        .soft_delete(table, Condition::eq("slug", "two"), &[])
        .await?
        .execute()
        .await?;
    let live = db
        .query()
        .from(table)
        .where_(Condition::is_null("dateDeleted"))
        .count(&db)
        .await?;
    assert_eq!(live, 1);

    let uids = db.query().select("uid").from(table).column(&db).await?;
    assert_eq!(uids.len(), 2);
    assert_ne!(uids[0], uids[1]);
    Ok(())
}
