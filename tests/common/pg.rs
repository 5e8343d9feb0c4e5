//! Postgres harness: one container shared by the whole test binary, with a
//! freshly migrated database per test.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use ortho_server::models::User;
use ortho_server::store::PgStore;

struct SharedPostgres {
    base_url: String,
    // Keeps the container alive for the whole run.
    _container: ContainerAsync<Postgres>,
}

static SHARED_POSTGRES: OnceCell<Option<SharedPostgres>> = OnceCell::const_new();

impl SharedPostgres {
    async fn start() -> Result<Self, String> {
        let container = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .map_err(|e| e.to_string())?;
        let host = container.get_host().await.map_err(|e| e.to_string())?;
        let port = container
            .get_host_port_ipv4(5432)
            .await
            .map_err(|e| e.to_string())?;

        Ok(Self {
            base_url: format!("postgresql://postgres:postgres@{}:{}", host, port),
            _container: container,
        })
    }

    /// `None` when no container runtime is reachable.
    async fn get() -> Option<&'static Self> {
        SHARED_POSTGRES
            .get_or_init(|| async {
                match Self::start().await {
                    Ok(shared) => Some(shared),
                    Err(e) => {
                        eprintln!("Postgres container unavailable, skipping database tests: {}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

pub struct PgHarness {
    pub pool: PgPool,
    pub store: PgStore,
}

impl PgHarness {
    /// Creates and migrates a private database. Returns `None` (and the
    /// caller skips) when Docker is not available.
    pub async fn new() -> Option<Self> {
        let shared = SharedPostgres::get().await?;

        let admin = PgPool::connect(&format!("{}/postgres", shared.base_url))
            .await
            .expect("Failed to connect to Postgres");
        let database = format!("ortho_{}", Uuid::new_v4().simple());
        sqlx::query(&format!("CREATE DATABASE {}", database))
            .execute(&admin)
            .await
            .expect("Failed to create test database");
        admin.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(&format!("{}/{}", shared.base_url, database))
            .await
            .expect("Failed to connect to test database");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Some(Self {
            store: PgStore::new(pool.clone()),
            pool,
        })
    }

    pub async fn add_user(&self, username: &str, is_staff: bool) -> User {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, full_name, email, is_staff, created_at, updated_at)
            VALUES ($1, $2, $2, $3, $4, $5, $5)
            RETURNING id, username, full_name, email, is_staff, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(format!("{}@example.com", username))
        .bind(is_staff)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert user")
    }
}
