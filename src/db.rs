use crate::model::{NewMutation, QueuedMutation};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability: queued mutations must survive
    // abrupt process death.
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/` and create the parent
/// directory. In-memory URLs and non-sqlite schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let expanded = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&expanded).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{expanded}?{q}"),
        None => format!("sqlite://{expanded}"),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_mutation(pool: &Pool, new: &NewMutation) -> Result<i64> {
    let body = match &new.body {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    };
    let rec = sqlx::query(
        "INSERT INTO queued_mutations (client_ref, url, method, body, created_at) VALUES (?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(new.client_ref.to_string())
    .bind(&new.url)
    .bind(&new.method)
    .bind(body)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;
    Ok(rec.get("id"))
}

/// All stored records, in ascending `id` order so replay preserves causal
/// ordering of dependent mutations against the same resource.
#[instrument(skip_all)]
pub async fn list_mutations(pool: &Pool) -> Result<Vec<QueuedMutation>> {
    let rows = sqlx::query(
        "SELECT id, client_ref, url, method, body, created_at FROM queued_mutations ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let client_ref: String = row.get("client_ref");
            let body = match row.get::<Option<String>, _>("body") {
                Some(raw) => Some(serde_json::from_str(&raw)?),
                None => None,
            };
            Ok(QueuedMutation {
                id: row.get("id"),
                client_ref: Uuid::parse_str(&client_ref)?,
                url: row.get("url"),
                method: row.get("method"),
                body,
                created_at: row.get::<DateTime<Utc>, _>("created_at"),
            })
        })
        .collect()
}

/// Deleting an id that is not present is a no-op, not an error.
#[instrument(skip_all)]
pub async fn delete_mutation(pool: &Pool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM queued_mutations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Existence check without materializing the collection.
#[instrument(skip_all)]
pub async fn has_pending(pool: &Pool) -> Result<bool> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM queued_mutations)")
        .fetch_one(pool)
        .await?;
    Ok(exists != 0)
}

pub async fn get_flag(pool: &Pool, key: &str) -> Result<bool> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(matches!(value.as_deref(), Some("true")))
}

pub async fn set_flag(pool: &Pool, key: &str, value: bool) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(if value { "true" } else { "false" })
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn setup_pool() -> Pool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn insert_assigns_id_and_created_at() {
        let pool = setup_pool().await;
        let new = NewMutation::new(
            "POST",
            "/api/reports/daily/",
            Some(json!({"date": "2025-07-21", "hours": 8})),
        );
        let id = insert_mutation(&pool, &new).await.unwrap();
        assert!(id > 0);

        let records = list_mutations(&pool).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].client_ref, new.client_ref);
        assert_eq!(records[0].method, "POST");
        assert_eq!(records[0].body, Some(json!({"date": "2025-07-21", "hours": 8})));
    }

    #[tokio::test]
    async fn list_orders_by_id() {
        let pool = setup_pool().await;
        for i in 0..3 {
            let new = NewMutation::new("POST", &format!("/api/reports/{i}/"), None);
            insert_mutation(&pool, &new).await.unwrap();
        }
        let records = list_mutations(&pool).await.unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn delete_missing_id_is_noop() {
        let pool = setup_pool().await;
        delete_mutation(&pool, 9999).await.unwrap();

        let new = NewMutation::new("PUT", "/api/profile/", None);
        let id = insert_mutation(&pool, &new).await.unwrap();
        delete_mutation(&pool, id).await.unwrap();
        // Second delete of the same id is also a no-op.
        delete_mutation(&pool, id).await.unwrap();
        assert!(!has_pending(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let pool = setup_pool().await;
        let a = insert_mutation(&pool, &NewMutation::new("POST", "/api/reports/", None))
            .await
            .unwrap();
        let b = insert_mutation(&pool, &NewMutation::new("POST", "/api/reports/", None))
            .await
            .unwrap();
        delete_mutation(&pool, b).await.unwrap();
        let c = insert_mutation(&pool, &NewMutation::new("POST", "/api/reports/", None))
            .await
            .unwrap();
        assert!(b > a);
        assert!(c > b);
    }

    #[tokio::test]
    async fn has_pending_tracks_queue() {
        let pool = setup_pool().await;
        assert!(!has_pending(&pool).await.unwrap());
        let id = insert_mutation(&pool, &NewMutation::new("POST", "/api/reports/", None))
            .await
            .unwrap();
        assert!(has_pending(&pool).await.unwrap());
        delete_mutation(&pool, id).await.unwrap();
        assert!(!has_pending(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn flag_roundtrip() {
        let pool = setup_pool().await;
        assert!(!get_flag(&pool, "sync.prompt_suppressed").await.unwrap());
        set_flag(&pool, "sync.prompt_suppressed", true).await.unwrap();
        assert!(get_flag(&pool, "sync.prompt_suppressed").await.unwrap());
        set_flag(&pool, "sync.prompt_suppressed", false).await.unwrap();
        assert!(!get_flag(&pool, "sync.prompt_suppressed").await.unwrap());
    }

    #[test]
    fn prepare_url_passthrough() {
        assert_eq!(prepare_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            prepare_sqlite_url("postgres://localhost/db"),
            "postgres://localhost/db"
        );
    }

    #[test]
    fn prepare_url_keeps_query() {
        let url = prepare_sqlite_url("sqlite:///tmp/logbook/queue.db?mode=rwc");
        assert_eq!(url, "sqlite:///tmp/logbook/queue.db?mode=rwc");
    }
}
