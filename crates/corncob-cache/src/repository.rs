//! SQLite implementation of `ChainRepository`.
//!
//! Grounded on `lnxdrive-cache/src/repository.rs`'s shape: one struct
//! wrapping a `SqlitePool`, row-mapping helper functions, domain types
//! round-tripped through their own `Display`/`FromStr` impls rather than a
//! bespoke wire format.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use corncob_core::domain::ids::RemoteNickname;
use corncob_core::domain::remote::{RemoteRecord, RemoteUrl};
use corncob_core::ports::chain_repository::ChainRepository;

/// SQLite-based implementation of the chain repository port.
pub struct SqliteChainRepository {
    pool: SqlitePool,
}

impl SqliteChainRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn remote_from_row(row: &SqliteRow) -> anyhow::Result<RemoteRecord> {
    let nickname_str: String = row.get("nickname");
    let url_str: String = row.get("url");
    let adapter_state: Option<String> = row.get("adapter_state");
    let last_observed_etag: Option<String> = row.get("last_observed_etag");

    let nickname = RemoteNickname::new(nickname_str)?;
    let url: RemoteUrl = url_str.parse()?;

    Ok(RemoteRecord {
        nickname,
        url,
        adapter_state,
        last_observed_etag,
    })
}

#[async_trait::async_trait]
impl ChainRepository for SqliteChainRepository {
    async fn save_remote(&self, remote: &RemoteRecord) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO remotes (nickname, url, adapter_state, last_observed_etag, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(nickname) DO UPDATE SET
                 url = excluded.url,
                 adapter_state = excluded.adapter_state,
                 last_observed_etag = excluded.last_observed_etag,
                 updated_at = excluded.updated_at",
        )
        .bind(remote.nickname.as_str())
        .bind(remote.url.to_string())
        .bind(&remote.adapter_state)
        .bind(&remote.last_observed_etag)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_remote(&self, nickname: &RemoteNickname) -> anyhow::Result<Option<RemoteRecord>> {
        let row = sqlx::query("SELECT nickname, url, adapter_state, last_observed_etag FROM remotes WHERE nickname = ?1")
            .bind(nickname.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(remote_from_row).transpose()
    }

    async fn list_remotes(&self) -> anyhow::Result<Vec<RemoteRecord>> {
        let rows = sqlx::query("SELECT nickname, url, adapter_state, last_observed_etag FROM remotes ORDER BY nickname")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(remote_from_row).collect()
    }

    async fn remove_remote(&self, nickname: &RemoteNickname) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM remotes WHERE nickname = ?1")
            .bind(nickname.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_observed_etag(&self, nickname: &RemoteNickname, etag: Option<&str>) -> anyhow::Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE remotes SET last_observed_etag = ?1, updated_at = ?2 WHERE nickname = ?3")
            .bind(etag)
            .bind(now)
            .bind(nickname.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DatabasePool;
    use std::path::PathBuf;

    async fn repo() -> (DatabasePool, SqliteChainRepository) {
        let pool = DatabasePool::in_memory().await.unwrap();
        let repo = SqliteChainRepository::new(pool.pool().clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn save_and_get_round_trips_a_remote_record() {
        let (_pool, repo) = repo().await;
        let nickname = RemoteNickname::new("alice-drive").unwrap();
        let mut record = RemoteRecord::new(
            nickname.clone(),
            RemoteUrl::GDrive {
                account_ref: "alice@example.com".to_string(),
            },
        );
        record.adapter_state = Some("{\"path_ids\":{}}".to_string());
        repo.save_remote(&record).await.unwrap();

        let fetched = repo.get_remote(&nickname).await.unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[tokio::test]
    async fn save_remote_upserts_by_nickname() {
        let (_pool, repo) = repo().await;
        let nickname = RemoteNickname::new("bob-s3").unwrap();
        let first = RemoteRecord::new(
            nickname.clone(),
            RemoteUrl::S3 {
                bucket: "team-bucket".to_string(),
            },
        );
        repo.save_remote(&first).await.unwrap();

        let second = RemoteRecord::new(
            nickname.clone(),
            RemoteUrl::File {
                path: PathBuf::from("/tmp/rebased-remote"),
            },
        );
        repo.save_remote(&second).await.unwrap();

        let fetched = repo.get_remote(&nickname).await.unwrap().unwrap();
        assert_eq!(fetched.url, second.url);
        assert_eq!(repo.list_remotes().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_remote_returns_none_for_unknown_nickname() {
        let (_pool, repo) = repo().await;
        let nickname = RemoteNickname::new("nobody").unwrap();
        assert!(repo.get_remote(&nickname).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_remotes_returns_all_configured_remotes_sorted() {
        let (_pool, repo) = repo().await;
        for name in ["zeta", "alpha", "mu"] {
            let nickname = RemoteNickname::new(name).unwrap();
            repo.save_remote(&RemoteRecord::new(
                nickname,
                RemoteUrl::File {
                    path: PathBuf::from(format!("/tmp/{name}")),
                },
            ))
            .await
            .unwrap();
        }
        let names: Vec<_> = repo
            .list_remotes()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.nickname.as_str().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mu", "zeta"]);
    }

    #[tokio::test]
    async fn remove_remote_deletes_the_record() {
        let (_pool, repo) = repo().await;
        let nickname = RemoteNickname::new("transient").unwrap();
        repo.save_remote(&RemoteRecord::new(
            nickname.clone(),
            RemoteUrl::SmallSea {
                session_token: "sess-1".to_string(),
            },
        ))
        .await
        .unwrap();
        repo.remove_remote(&nickname).await.unwrap();
        assert!(repo.get_remote(&nickname).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_observed_etag_leaves_url_and_adapter_state_untouched() {
        let (_pool, repo) = repo().await;
        let nickname = RemoteNickname::new("alice-drive").unwrap();
        let mut record = RemoteRecord::new(
            nickname.clone(),
            RemoteUrl::Dropbox {
                account_ref: "alice".to_string(),
            },
        );
        record.adapter_state = Some("side-state".to_string());
        repo.save_remote(&record).await.unwrap();

        repo.update_observed_etag(&nickname, Some("etag-v2")).await.unwrap();

        let fetched = repo.get_remote(&nickname).await.unwrap().unwrap();
        assert_eq!(fetched.last_observed_etag.as_deref(), Some("etag-v2"));
        assert_eq!(fetched.adapter_state.as_deref(), Some("side-state"));
        assert_eq!(fetched.url, record.url);
    }
}
