//! Round trips against a live PostgreSQL server. Skipped unless `REGISTRAR_PG_TESTS` is set;
//! connection settings come from the usual `DB_*` variables.

use registrar::model::{Table, TableSpec};
use registrar::{db, Connection, Fields, Settings};
use serde_json::{json, Value};
use std::sync::Arc;

const FEES: TableSpec = TableSpec::new("registrar_test_fees").with_casts(&[("amount", "numeric"), ("due_on", "date")]);

async fn postgres() -> Option<Arc<dyn Connection>> {
    std::env::var("REGISTRAR_PG_TESTS").ok()?;
    let settings = Settings::from_lookup(|key| match key {
        "DB_DRIVER" => Some("postgres".to_string()),
        _ => std::env::var(key).ok(),
    })
    .unwrap();
    let conn = db::connect(&settings.database).await.unwrap();
    conn.execute("DROP TABLE IF EXISTS registrar_test_fees", &[]).await.unwrap();
    conn.execute(
        "CREATE TABLE registrar_test_fees (
            id BIGSERIAL PRIMARY KEY,
            student TEXT NOT NULL,
            amount NUMERIC(10,2) NOT NULL,
            due_on DATE
        )",
        &[],
    )
    .await
    .unwrap();
    Some(conn)
}

fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[tokio::test]
async fn numeric_and_date_columns_read_back_as_written() {
    let Some(conn) = postgres().await else {
        return;
    };
    let fees = Table::new(Arc::clone(&conn), FEES);
    let submitted = fields(&[
        ("student", json!("Ada")),
        ("amount", json!("12.50")),
        ("due_on", json!("2024-09-01")),
    ]);
    let id = fees.create(&submitted).await.unwrap();

    let row = fees.find(&id).await.unwrap().unwrap();
    for (column, value) in &submitted {
        assert_eq!(row.get(column), Some(value), "column {}", column);
    }

    // unchanged values and a missing id both report false
    assert!(!fees.update(&id, &fields(&[("amount", json!("12.50"))])).await.unwrap());
    assert!(!fees.update(&json!(-1), &fields(&[("amount", json!("1.00"))])).await.unwrap());
    assert!(fees.update(&id, &fields(&[("amount", json!("13.00"))])).await.unwrap());
    assert_eq!(fees.find(&id).await.unwrap().unwrap().str("amount"), Some("13.00"));

    conn.execute("DROP TABLE registrar_test_fees", &[]).await.unwrap();
}
