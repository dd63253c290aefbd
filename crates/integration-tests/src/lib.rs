//! Shared harness for the end-to-end scenarios in `tests/`: the real
//! services over the in-memory store, with a clock the test controls.

use std::sync::{Arc, Mutex};

use auth_adapters::RoleAccessControl;
use chrono::{DateTime, Duration, TimeZone, Utc};
use domains::form::AdvertSubmission;
use domains::validation::Antiflood;
use domains::{Clock, Identity, MailTransport, Role};
use services::{AdvertService, ApplicationMailer, ApplicationService, MailSettings, Ports};
use storage_adapters::{DashMapSubmissionLog, InMemoryStore, TracingMailTransport};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.0.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

pub struct Board {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub adverts: AdvertService,
    pub applications: ApplicationService,
}

impl Board {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(TracingMailTransport))
    }

    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::starting_at(
            Utc.with_ymd_and_hms(2019, 7, 16, 10, 32, 6)
                .single()
                .unwrap_or_default(),
        ));
        let antiflood = Antiflood::default();
        let ports = Ports {
            adverts: store.clone(),
            applications: store.clone(),
            categories: store.clone(),
            unit_of_work: store.clone(),
            submissions: Arc::new(DashMapSubmissionLog::with_retention(antiflood.cooldown())),
            access: Arc::new(RoleAccessControl),
            clock: clock.clone(),
        };
        let mailer = ApplicationMailer::new(transport, MailSettings::default());
        Self {
            store,
            clock,
            adverts: AdvertService::new(ports.clone(), antiflood),
            applications: ApplicationService::new(ports, mailer, antiflood),
        }
    }

    /// Moves past the antiflood cooldown.
    pub fn wait_cooldown(&self) {
        self.clock
            .advance(Duration::seconds(Antiflood::DEFAULT_COOLDOWN_SECS as i64));
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

pub fn author() -> Identity {
    Identity::new("alexandre", vec![Role::Author])
}

pub fn admin() -> Identity {
    Identity::new("winzou", vec![Role::Admin])
}

/// A submission that passes every rule.
pub fn submission(title: &str, author: &str) -> AdvertSubmission {
    AdvertSubmission {
        title: title.into(),
        author: author.into(),
        content: "Nous recherchons un développeur Rust débutant sur Lyon.".into(),
        published: true,
        ..AdvertSubmission::default()
    }
}
