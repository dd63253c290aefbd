//! # Application use-cases
//!
//! Visitors apply to an advert from its page; authors may withdraw an
//! application. Both keep the advert's application counter in step.

use domains::form::ApplicationSubmission;
use domains::validation::{self, Antiflood, ValidationContext};
use domains::{
    AdvertId, AppError, Application, ApplicationId, Capability, ChangeSet, Identity, Result,
};
use tracing::{debug, info};

use crate::mailer::ApplicationMailer;
use crate::Ports;

#[derive(Clone)]
pub struct ApplicationService {
    ports: Ports,
    mailer: ApplicationMailer,
    antiflood: Antiflood,
}

impl ApplicationService {
    pub fn new(ports: Ports, mailer: ApplicationMailer, antiflood: Antiflood) -> Self {
        Self {
            ports,
            mailer,
            antiflood,
        }
    }

    /// Records an application against `advert_id` and notifies the board.
    ///
    /// A signed-in caller applies under their own name; anonymous visitors
    /// supply one in the form.
    pub async fn submit(
        &self,
        advert_id: AdvertId,
        identity: Option<&Identity>,
        submission: &ApplicationSubmission,
    ) -> Result<ApplicationId> {
        let mut advert = self
            .ports
            .adverts
            .find(advert_id)
            .await?
            .ok_or_else(|| AppError::not_found("Advert", advert_id))?;

        let author = identity
            .map(|who| who.name().to_string())
            .unwrap_or_else(|| submission.author.trim().to_string());
        let mut application = Application::new(author, submission.content.trim());

        let ctx = ValidationContext {
            last_submission: self
                .ports
                .submissions
                .last_submission_at(application.author())
                .await,
            antiflood: self.antiflood,
            ..ValidationContext::new(self.ports.clock.now())
        };
        let errors = validation::validate_application(&application, &ctx);
        if !errors.is_empty() {
            debug!(advert_id = %advert_id, failures = errors.len(), "application rejected");
            return Err(AppError::Validation(errors));
        }

        advert.add_application(&mut application);
        advert.increase_application_count();

        let mut changes = ChangeSet::new();
        changes
            .save_application(application.clone())
            .save_advert(advert);
        self.ports.unit_of_work.commit(changes).await?;

        self.ports
            .submissions
            .record(application.author(), ctx.now)
            .await;
        info!(
            advert_id = %advert_id,
            application_id = %application.id(),
            "application recorded"
        );
        self.mailer.notify_new_application(&application).await;
        Ok(application.id())
    }

    /// Removes an application and decrements its advert's counter.
    /// Returns the advert the application belonged to.
    pub async fn withdraw(
        &self,
        identity: Option<&Identity>,
        id: ApplicationId,
    ) -> Result<AdvertId> {
        let identity = self
            .ports
            .authorize(identity, Capability::ManageApplications)?;
        let application = self
            .ports
            .applications
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Application", id))?;
        let advert_id = application.advert().ok_or_else(|| {
            AppError::Internal(format!("application {id} is not attached to an advert"))
        })?;
        let mut advert = self
            .ports
            .adverts
            .find(advert_id)
            .await?
            .ok_or_else(|| AppError::not_found("Advert", advert_id))?;

        advert.remove_application(&application);
        advert.decrease_application_count();

        let mut changes = ChangeSet::new();
        changes.remove_application(id).save_advert(advert);
        self.ports.unit_of_work.commit(changes).await?;

        info!(
            advert_id = %advert_id,
            application_id = %id,
            user = identity.name(),
            "application withdrawn"
        );
        Ok(advert_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mailer::MailSettings;
    use crate::test_support::{now, Mocks};
    use chrono::Duration;
    use domains::{
        Advert, Change, CommitReceipt, Field, MockMailTransport, MockSubmissionLog, Role,
    };
    use mockall::predicate::eq;

    fn advert(id: i64, count: u32) -> Advert {
        let mut advert = Advert::new();
        advert.assign_id(AdvertId(id));
        advert.set_title("Recherche développeur Rust");
        advert.set_author("Alexandre");
        advert.set_content("Poste à Lyon.");
        advert.set_application_count(count);
        advert
    }

    fn mailer(expected_sends: usize) -> ApplicationMailer {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .times(expected_sends)
            .returning(|_| Ok(()));
        ApplicationMailer::new(Arc::new(transport), MailSettings::default())
    }

    fn service(mocks: Mocks, expected_sends: usize) -> ApplicationService {
        ApplicationService::new(
            mocks.into_ports(),
            mailer(expected_sends),
            Antiflood::default(),
        )
    }

    fn form(author: &str, content: &str) -> ApplicationSubmission {
        ApplicationSubmission {
            author: author.into(),
            content: content.into(),
        }
    }

    #[tokio::test]
    async fn submit_links_counts_and_notifies() {
        let mut mocks = Mocks::new();
        mocks
            .adverts
            .expect_find()
            .with(eq(AdvertId(3)))
            .returning(|id| Ok(Some(advert(id.get(), 1))));
        mocks
            .unit_of_work
            .expect_commit()
            .withf(|changes| match changes.changes() {
                [Change::SaveApplication(app), Change::SaveAdvert(advert)] => {
                    app.advert() == Some(AdvertId(3))
                        && app.author() == "Marine"
                        && advert.application_count() == 2
                        && advert.has_application(app)
                }
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(CommitReceipt::default()));

        let id = service(mocks, 1)
            .submit(AdvertId(3), None, &form(" Marine ", "Je suis motivée"))
            .await
            .unwrap();
        assert_eq!(id.0.get_version_num(), 7);
    }

    #[tokio::test]
    async fn signed_in_caller_applies_under_their_name() {
        let mut mocks = Mocks::new();
        mocks
            .adverts
            .expect_find()
            .returning(|id| Ok(Some(advert(id.get(), 0))));
        mocks
            .unit_of_work
            .expect_commit()
            .withf(|changes| {
                matches!(changes.changes(), [Change::SaveApplication(app), _] if app.author() == "Jean")
            })
            .returning(|_| Ok(CommitReceipt::default()));
        let who = Identity::new("Jean", [Role::Author]);

        service(mocks, 1)
            .submit(AdvertId(1), Some(&who), &form("ignored", "Disponible de suite"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blank_application_is_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .adverts
            .expect_find()
            .returning(|id| Ok(Some(advert(id.get(), 0))));
        mocks.unit_of_work.expect_commit().never();

        let err = service(mocks, 0)
            .submit(AdvertId(1), None, &form("", "   "))
            .await
            .unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::Author, Field::Content]);
    }

    #[tokio::test]
    async fn repeated_application_within_cooldown_is_rejected() {
        let mut mocks = Mocks::new();
        mocks
            .adverts
            .expect_find()
            .returning(|id| Ok(Some(advert(id.get(), 0))));
        mocks.unit_of_work.expect_commit().never();
        let mut submissions = MockSubmissionLog::new();
        submissions
            .expect_last_submission_at()
            .with(eq("Marine"))
            .returning(|_| Some(now() - Duration::seconds(14)));
        mocks.submissions = submissions;

        let err = service(mocks, 0)
            .submit(AdvertId(1), None, &form("Marine", "Encore moi"))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors()[0].field, Field::Content);
    }

    #[tokio::test]
    async fn applying_to_unknown_advert_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.adverts.expect_find().returning(|_| Ok(None));

        let err = service(mocks, 0)
            .submit(AdvertId(9), None, &form("Marine", "Bonjour"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn withdraw_removes_and_decrements() {
        let mut stored = Application::new("Marine", "Je suis motivée");
        let mut owner = advert(4, 1);
        owner.add_application(&mut stored);
        let application_id = stored.id();

        let mut mocks = Mocks::new();
        mocks
            .applications
            .expect_find()
            .with(eq(application_id))
            .returning(move |_| Ok(Some(stored.clone())));
        mocks
            .adverts
            .expect_find()
            .with(eq(AdvertId(4)))
            .returning(move |_| Ok(Some(owner.clone())));
        mocks
            .unit_of_work
            .expect_commit()
            .withf(move |changes| match changes.changes() {
                [Change::RemoveApplication(id), Change::SaveAdvert(advert)] => {
                    *id == application_id
                        && advert.application_count() == 0
                        && advert.applications().is_empty()
                }
                _ => false,
            })
            .times(1)
            .returning(|_| Ok(CommitReceipt::default()));
        let who = Identity::new("Alexandre", [Role::Author]);

        let advert_id = service(mocks, 0)
            .withdraw(Some(&who), application_id)
            .await
            .unwrap();
        assert_eq!(advert_id, AdvertId(4));
    }

    #[tokio::test]
    async fn withdraw_requires_authentication() {
        let mocks = Mocks::new();
        assert!(matches!(
            service(mocks, 0)
                .withdraw(None, ApplicationId::generate())
                .await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
