#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Used when no DATABASE_URL is configured: nothing listens on port 1, so
/// the server starts and reports 503 from /health
const UNREACHABLE_DATABASE: &str = "postgres://postgres@127.0.0.1:1/venue_admin_unreachable";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let storage = std::env::temp_dir().join(format!("venue-admin-test-{}", port));

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_venue-admin-api"));
        cmd.env("VENUE_API_PORT", port.to_string())
            .env("HOST", "127.0.0.1")
            .env("JWT_SECRET", TEST_SECRET)
            .env("STORAGE_MEDIA_ROOT", storage.join("media"))
            .env("STORAGE_REPORT_DIR", storage.join("reports"))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if database_url().is_none() {
            cmd.env("DATABASE_URL", UNREACHABLE_DATABASE)
                .env("DATABASE_AUTO_MIGRATE", "false")
                .env("DATABASE_CONNECTION_TIMEOUT", "1");
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;
        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(20)).await?;
    Ok(server)
}

pub fn database_url() -> Option<String> {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
}

/// Connected and migrated pool, or `None` when database scenarios should be skipped
pub async fn database() -> Option<PgPool> {
    let url = match database_url() {
        Some(url) => url,
        None => {
            eprintln!("DATABASE_URL not set; skipping database scenario");
            return None;
        }
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("DATABASE_URL set but database unreachable");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Some(pool)
}

/// Token signed with the server's test secret
pub fn token_for(admin: Uuid) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({ "sub": admin, "email": "test@example.com", "iat": now, "exp": now + 3600 });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes())).expect("sign token")
}

/// One city with a venue and a ground, plus one admin of each tier.
/// Names carry a random suffix so runs never collide.
pub struct Fixture {
    pub tag: String,
    pub city: Uuid,
    pub other_city: Uuid,
    pub sport: Uuid,
    pub venue: Uuid,
    pub other_venue: Uuid,
    pub ground: Uuid,
    pub super_admin: Uuid,
    pub city_admin: Uuid,
    pub sub_admin: Uuid,
}

impl Fixture {
    pub async fn seed(pool: &PgPool) -> Fixture {
        let tag = Uuid::new_v4().simple().to_string()[..8].to_string();

        let city = insert_id(pool, "INSERT INTO cities (name) VALUES ($1) RETURNING id", &format!("City {}", tag)).await;
        let other_city = insert_id(pool, "INSERT INTO cities (name) VALUES ($1) RETURNING id", &format!("Elsewhere {}", tag)).await;
        let sport = insert_id(pool, "INSERT INTO sports (name) VALUES ($1) RETURNING id", &format!("Football {}", tag)).await;

        let venue = Self::venue(pool, &format!("Stadium {}", tag), city).await;
        let other_venue = Self::venue(pool, &format!("Arena {}", tag), other_city).await;

        let ground: (Uuid,) = sqlx::query_as("INSERT INTO grounds (name, venue_id, city_id) VALUES ($1, $2, $3) RETURNING id")
            .bind(format!("Pitch {}", tag))
            .bind(venue)
            .bind(city)
            .fetch_one(pool)
            .await
            .expect("insert ground");

        let super_admin = Self::admin(pool, &tag, "sa", true, false, false, None, &[]).await;
        let city_admin = Self::admin(pool, &tag, "ad", false, true, false, Some(city), &[]).await;
        let sub_admin = Self::admin(pool, &tag, "sub", false, false, true, Some(city), &[venue]).await;

        Fixture { tag, city, other_city, sport, venue, other_venue, ground: ground.0, super_admin, city_admin, sub_admin }
    }

    /// City admin of `self.city` whose role grants only `permissions`
    pub async fn city_admin_with(&self, pool: &PgPool, permissions: serde_json::Value) -> Uuid {
        let role: (Uuid,) = sqlx::query_as("INSERT INTO roles (name, city_id, permissions, added_by) VALUES ($1, $2, $3, 'SA') RETURNING id")
            .bind(format!("Limited {} {}", Uuid::new_v4().simple(), self.tag))
            .bind(self.city)
            .bind(permissions)
            .fetch_one(pool)
            .await
            .expect("insert limited role");
        let admin: (Uuid,) = sqlx::query_as(
            "INSERT INTO admin_users (name, email, role_id, is_admin, city_id) VALUES ('limited admin', $1, $2, true, $3) RETURNING id",
        )
        .bind(format!("limited-{}-{}@example.com", Uuid::new_v4().simple(), self.tag))
        .bind(role.0)
        .bind(self.city)
        .fetch_one(pool)
        .await
        .expect("insert limited admin");
        admin.0
    }

    /// A second ground, on `venue`, with one slot time; returns (ground, slot)
    pub async fn ground_with_slot(&self, pool: &PgPool, venue: Uuid, city: Uuid) -> (Uuid, Uuid) {
        let ground: (Uuid,) = sqlx::query_as("INSERT INTO grounds (name, venue_id, city_id) VALUES ($1, $2, $3) RETURNING id")
            .bind(format!("Court {}", self.tag))
            .bind(venue)
            .bind(city)
            .fetch_one(pool)
            .await
            .expect("insert ground");
        let slot: (Uuid,) = sqlx::query_as(
            "INSERT INTO slot_times (ground_id, venue_id, city_id, slot, price) VALUES ($1, $2, $3, '10:00-11:00', $4) RETURNING id",
        )
        .bind(ground.0)
        .bind(venue)
        .bind(city)
        .bind(prices(100))
        .fetch_one(pool)
        .await
        .expect("insert slot time");
        (ground.0, slot.0)
    }

    pub async fn venue(pool: &PgPool, name: &str, city: Uuid) -> Uuid {
        let row: (Uuid,) = sqlx::query_as("INSERT INTO venues (name, address, city_id) VALUES ($1, 'Main road 1', $2) RETURNING id")
            .bind(name)
            .bind(city)
            .fetch_one(pool)
            .await
            .expect("insert venue");
        row.0
    }

    #[allow(clippy::too_many_arguments)]
    async fn admin(
        pool: &PgPool,
        tag: &str,
        kind: &str,
        is_super_admin: bool,
        is_admin: bool,
        is_subadmin: bool,
        city: Option<Uuid>,
        venues: &[Uuid],
    ) -> Uuid {
        // Non-super admins get a role granting every menu
        let role = if is_super_admin {
            None
        } else {
            let permissions = json!([
                { "menu": "Roles", "add": true, "view": true, "update": true, "delete": true },
                { "menu": "Venues", "add": true, "view": true, "update": true, "delete": true },
                { "menu": "Slot_Times", "add": true, "view": true, "update": true, "delete": true },
                { "menu": "Expenses", "add": true, "view": true, "update": true, "delete": true }
            ]);
            let row: (Uuid,) = sqlx::query_as("INSERT INTO roles (name, city_id, permissions, added_by) VALUES ($1, $2, $3, 'SA') RETURNING id")
                .bind(format!("Full access {} {}", kind, tag))
                .bind(city)
                .bind(permissions)
                .fetch_one(pool)
                .await
                .expect("insert role");
            Some(row.0)
        };

        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO admin_users (name, email, role_id, is_super_admin, is_admin, is_subadmin, city_id, venue_ids) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(format!("{} admin", kind))
        .bind(format!("{}-{}@example.com", kind, tag))
        .bind(role)
        .bind(is_super_admin)
        .bind(is_admin)
        .bind(is_subadmin)
        .bind(city)
        .bind(venues)
        .fetch_one(pool)
        .await
        .expect("insert admin");
        row.0
    }
}

async fn insert_id(pool: &PgPool, sql: &str, name: &str) -> Uuid {
    let row: (Uuid,) = sqlx::query_as(sql).bind(name).fetch_one(pool).await.expect("insert reference row");
    row.0
}

pub fn prices(amount: u32) -> serde_json::Value {
    json!({
        "monday": amount, "tuesday": amount, "wednesday": amount, "thursday": amount,
        "friday": amount, "saturday": amount, "sunday": amount
    })
}
