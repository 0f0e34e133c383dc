//! Storage traits for registrations, the tenant directory and the
//! gradebook, plus in-memory mocks for tests. Postgres implementations live
//! in `crate::db`.

use crate::models::{GradableActivity, Registration, ResourceLink, Submission, Tenant, User};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Looks up an active registration by its (issuer, client_id) pair.
    async fn find_active(
        &self,
        issuer: &str,
        client_id: &str,
    ) -> Result<Option<Registration>, sqlx::Error>;

    async fn find_by_id(&self, registration_id: Uuid)
        -> Result<Option<Registration>, sqlx::Error>;

    /// Finds a resource link under a registration by the counterparty's
    /// external resource link id.
    async fn find_resource_link(
        &self,
        registration_id: Uuid,
        external_id: &str,
    ) -> Result<Option<ResourceLink>, sqlx::Error>;

    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error>;

    /// Case-insensitive email lookup, scoped to one tenant.
    async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error>;
}

#[async_trait]
pub trait Gradebook: Send + Sync {
    async fn list_activities(&self, tenant_id: Uuid)
        -> Result<Vec<GradableActivity>, sqlx::Error>;

    async fn find_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<GradableActivity>, sqlx::Error>;

    async fn insert_activity(&self, activity: &GradableActivity) -> Result<(), sqlx::Error>;

    async fn list_submissions(&self, activity_id: Uuid) -> Result<Vec<Submission>, sqlx::Error>;

    /// Records a score for (activity, user), overwriting any earlier result.
    async fn upsert_result(
        &self,
        activity: &GradableActivity,
        user_id: Uuid,
        score: f64,
        comment: Option<String>,
    ) -> Result<Submission, sqlx::Error>;
}

#[derive(Default)]
pub struct MockRegistry {
    registrations: Mutex<Vec<Registration>>,
    resource_links: Mutex<Vec<ResourceLink>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_registration(&self, registration: Registration) {
        self.registrations.lock().unwrap().push(registration);
    }

    pub fn add_resource_link(&self, link: ResourceLink) {
        self.resource_links.lock().unwrap().push(link);
    }
}

#[async_trait]
impl RegistrationStore for MockRegistry {
    async fn find_active(
        &self,
        issuer: &str,
        client_id: &str,
    ) -> Result<Option<Registration>, sqlx::Error> {
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.issuer == issuer && r.client_id == client_id && r.is_active())
            .cloned())
    }

    async fn find_by_id(
        &self,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, sqlx::Error> {
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.registration_id == registration_id)
            .cloned())
    }

    async fn find_resource_link(
        &self,
        registration_id: Uuid,
        external_id: &str,
    ) -> Result<Option<ResourceLink>, sqlx::Error> {
        Ok(self
            .resource_links
            .lock()
            .unwrap()
            .iter()
            .find(|l| {
                l.registration_id == registration_id && l.external_id() == Some(external_id)
            })
            .cloned())
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockDirectory {
    tenants: Mutex<Vec<Tenant>>,
    users: Mutex<Vec<User>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.tenants.lock().unwrap().push(tenant);
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn find_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, sqlx::Error> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_user_by_email(
        &self,
        tenant_id: Uuid,
        email: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.tenant_id == tenant_id && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[derive(Default)]
pub struct MockGradebook {
    activities: Mutex<Vec<GradableActivity>>,
    submissions: Mutex<Vec<Submission>>,
}

impl MockGradebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_activity(&self, activity: GradableActivity) {
        self.activities.lock().unwrap().push(activity);
    }

    pub fn add_submission(&self, submission: Submission) {
        self.submissions.lock().unwrap().push(submission);
    }
}

#[async_trait]
impl Gradebook for MockGradebook {
    async fn list_activities(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<GradableActivity>, sqlx::Error> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_activity(
        &self,
        tenant_id: Uuid,
        activity_id: Uuid,
    ) -> Result<Option<GradableActivity>, sqlx::Error> {
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.tenant_id == tenant_id && a.activity_id == activity_id)
            .cloned())
    }

    async fn insert_activity(&self, activity: &GradableActivity) -> Result<(), sqlx::Error> {
        self.activities.lock().unwrap().push(activity.clone());
        Ok(())
    }

    async fn list_submissions(&self, activity_id: Uuid) -> Result<Vec<Submission>, sqlx::Error> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.activity_id == activity_id)
            .cloned()
            .collect())
    }

    async fn upsert_result(
        &self,
        activity: &GradableActivity,
        user_id: Uuid,
        score: f64,
        comment: Option<String>,
    ) -> Result<Submission, sqlx::Error> {
        let mut submissions = self.submissions.lock().unwrap();
        if let Some(existing) = submissions
            .iter_mut()
            .find(|s| s.activity_id == activity.activity_id && s.user_id == user_id)
        {
            existing.score = Some(score);
            existing.score_maximum = activity.score_maximum;
            existing.comment = comment;
            existing.updated_utc = Utc::now();
            return Ok(existing.clone());
        }

        let mut submission = Submission::new(activity, user_id, score);
        submission.comment = comment;
        submissions.push(submission.clone());
        Ok(submission)
    }
}
