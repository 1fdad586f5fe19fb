use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    models::{NewCustomer, NewCustomerNote, NewUser},
    seed::{self, SeedData, SeedReport, SeedStore},
    startup::Database,
};

pub static MIGRATOR: Migrator = sqlx::migrate!("../db/migrations");

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let pool = PgPool::connect(db_url).await?;
        Ok(Self { pool })
    }

    pub fn connect_lazy(db_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect_lazy(db_url)
            .context("parse database url")?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn can_connect(&self) -> Result<bool> {
        let one: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("database connectivity probe")?;
        Ok(one == 1)
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("run database migrations")
    }
}

#[async_trait]
impl SeedStore for Store {
    async fn find_user_id(&self, username: &str, email: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM public.users WHERE username = $1 OR email = $2 LIMIT 1")
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn insert_user(&self, user: &NewUser) -> Result<i64> {
        sqlx::query_scalar(
            r#"
INSERT INTO public.users (username, email, password_hash, role)
VALUES ($1, $2, $3, $4)
RETURNING id
"#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_customer_id_by_email(&self, email: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM public.customers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn insert_customer(&self, customer: &NewCustomer) -> Result<i64> {
        sqlx::query_scalar(
            r#"
INSERT INTO public.customers
(first_name, last_name, email, phone, company, notes, is_active, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
RETURNING id
"#,
        )
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(&customer.email)
        .bind(customer.phone.as_deref())
        .bind(customer.company.as_deref())
        .bind(customer.notes.as_deref())
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn note_exists(&self, customer_id: i64, content: &str) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM public.customer_notes WHERE customer_id = $1 AND content = $2)",
        )
        .bind(customer_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn insert_note(&self, note: &NewCustomerNote) -> Result<i64> {
        sqlx::query_scalar(
            r#"
INSERT INTO public.customer_notes (customer_id, content, created_by)
VALUES ($1, $2, $3)
RETURNING id
"#,
        )
        .bind(note.customer_id)
        .bind(&note.content)
        .bind(note.created_by.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }
}

#[async_trait]
impl Database for Store {
    async fn can_connect(&self) -> Result<bool> {
        Store::can_connect(self).await
    }

    async fn migrate(&self) -> Result<()> {
        Store::migrate(self).await
    }

    async fn seed(&self) -> Result<SeedReport> {
        seed::run(self, &SeedData::default()).await
    }
}
