//! # services
//!
//! Use-cases of the advert board. Each service receives its collaborators
//! through [`Ports`] and never reaches for global state.

pub mod adverts;
pub mod applications;
pub mod mailer;
pub mod seeding;

use std::sync::Arc;

use domains::{
    AccessControl, AdvertRepository, AppError, ApplicationRepository, Capability,
    CategoryRepository, Clock, Identity, SubmissionLog, UnitOfWork,
};

pub use adverts::{AdvertDetails, AdvertForm, AdvertService};
pub use applications::ApplicationService;
pub use mailer::{ApplicationMailer, MailSettings};
pub use seeding::{CategorySeeder, CATEGORY_NAMES};

/// The adapters a service talks to.
#[derive(Clone)]
pub struct Ports {
    pub adverts: Arc<dyn AdvertRepository>,
    pub applications: Arc<dyn ApplicationRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub submissions: Arc<dyn SubmissionLog>,
    pub access: Arc<dyn AccessControl>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// Anonymous callers are unauthorized; known callers without the
    /// capability are forbidden.
    pub(crate) fn authorize<'a>(
        &self,
        identity: Option<&'a Identity>,
        capability: Capability,
    ) -> Result<&'a Identity, AppError> {
        let identity =
            identity.ok_or_else(|| AppError::Unauthorized("authentication required".into()))?;
        if self.access.is_granted(identity, capability) {
            Ok(identity)
        } else {
            tracing::warn!(user = identity.name(), ?capability, "access denied");
            Err(AppError::Forbidden(format!(
                "{} may not perform this action",
                identity.name()
            )))
        }
    }
}
