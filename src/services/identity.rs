//! Maps a validated launch onto an existing tenant and user account.
//!
//! The tenant comes from the registration alone; nothing in the token can
//! steer a launch into another tenant. Users are matched by email within
//! that tenant and are never provisioned here.

use crate::error::AppError;
use crate::models::{Registration, Tenant, User};
use crate::services::launch::LaunchClaims;
use crate::services::stores::Directory;

pub async fn resolve_launch_user(
    directory: &dyn Directory,
    registration: &Registration,
    claims: &LaunchClaims,
) -> Result<(Tenant, User), AppError> {
    let tenant = directory
        .find_tenant(registration.tenant_id)
        .await?
        .ok_or(AppError::UserNotResolved)?;

    let email = claims.best_email().ok_or_else(|| {
        tracing::warn!(
            registration_id = %registration.registration_id,
            "launch carried no email claim"
        );
        AppError::UserNotResolved
    })?;

    let user = directory
        .find_user_by_email(tenant.tenant_id, email)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                registration_id = %registration.registration_id,
                tenant_id = %tenant.tenant_id,
                "no account matched the launch email"
            );
            AppError::UserNotResolved
        })?;

    Ok((tenant, user))
}
