//! Contact to user resolution
//!
//! Assignments and schedules belong to contacts; entries belong to user
//! accounts. Reports about a person start from the contact.

use tp_core::error::TpError;
use tp_core::result::TpResult;
use tp_core::traits::Id;
use tp_db::IdentityProvider;

/// The user account of `contact_id`, if it has one
pub async fn user_for_contact<P>(provider: &P, contact_id: Id) -> TpResult<Option<Id>>
where
    P: IdentityProvider + ?Sized,
{
    Ok(provider.user_for_contact(contact_id).await?)
}

/// Like [`user_for_contact`] but a contact without an account is an error
pub async fn require_user<P>(provider: &P, contact_id: Id) -> TpResult<Id>
where
    P: IdentityProvider + ?Sized,
{
    user_for_contact(provider, contact_id)
        .await?
        .ok_or_else(|| TpError::NotFound {
            entity: "User",
            field: "contact_id",
            value: contact_id.to_string(),
        })
}
