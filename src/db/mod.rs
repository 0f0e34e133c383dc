//! Postgres-backed implementations of the storage traits.

use crate::config::DatabaseConfig;
use crate::models::{GradableActivity, Registration, ResourceLink, Submission, Tenant, User};
use crate::services::stores::{Directory, Gradebook, RegistrationStore};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegistrationStore for Database {
    async fn find_active(
        &self,
        issuer: &str,
        client_id: &str,
    ) -> Result<Option<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(
            "SELECT * FROM lti_registrations
             WHERE issuer = $1 AND client_id = $2 AND status_code = 'active'",
        )
        .bind(issuer)
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_id(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(
            "SELECT * FROM lti_registrations WHERE registration_id = $1",
        )
        .bind(registration_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_resource_link(
        &self,
        registration_id: Uuid,
        external_id: &str,
    ) -> Result<Option<ResourceLink>, sqlx::Error> {
        sqlx::query_as::<_, ResourceLink>(
            "SELECT * FROM lti_resource_links
             WHERE registration_id = $1 AND custom_params->>'resource_link_id' = $2",
        )
        .bind(registration_id)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for Database {
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
        sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE tenant_id = $1 AND LOWER(email) = LOWER($2)",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl Gradebook for Database {
    async fn list_activities(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<GradableActivity>, sqlx::Error> {
        sqlx::query_as::<_, GradableActivity>(
            "SELECT * FROM gradable_activities WHERE tenant_id = $1 ORDER BY created_utc",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<GradableActivity>, sqlx::Error> {
        sqlx::query_as::<_, GradableActivity>(
            "SELECT * FROM gradable_activities WHERE tenant_id = $1 AND activity_id = $2",
        )
        .bind(tenant_id)
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn insert_activity(&self, activity: &GradableActivity) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO gradable_activities
             (activity_id, tenant_id, course_id, label, score_maximum, created_utc)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(activity.activity_id)
        .bind(activity.tenant_id)
        .bind(activity.course_id)
        .bind(&activity.label)
        .bind(activity.score_maximum)
        .bind(activity.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_submissions(&self, activity_id: Uuid) -> Result<Vec<Submission>, sqlx::Error> {
        sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE activity_id = $1 ORDER BY updated_utc",
        )
        .bind(activity_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn upsert_result(
        &self,
        activity: &GradableActivity,
        user_id: Uuid,
        score: f64,
        comment: Option<String>,
    ) -> Result<Submission, sqlx::Error> {
        sqlx::query_as::<_, Submission>(
            "INSERT INTO submissions
             (submission_id, tenant_id, activity_id, user_id, score, score_maximum, comment, updated_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             ON CONFLICT (activity_id, user_id)
             DO UPDATE SET score = $5, score_maximum = $6, comment = $7, updated_utc = NOW()
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(activity.tenant_id)
        .bind(activity.activity_id)
        .bind(user_id)
        .bind(score)
        .bind(activity.score_maximum)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
    }
}
