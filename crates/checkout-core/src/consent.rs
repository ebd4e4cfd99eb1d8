//! Cookie Consent Flag

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::KeyValueStore;

pub const CONSENT_KEY: &str = "cookie-consent";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consent {
    Accepted,
    Declined,
}

impl Consent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Consent::Accepted => "accepted",
            Consent::Declined => "declined",
        }
    }
}

/// A visitor's cookie choice
pub struct ConsentRecord<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> ConsentRecord<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub fn status(&self) -> Result<Option<Consent>> {
        Ok(match self.store.get(CONSENT_KEY)?.as_deref() {
            Some("accepted") => Some(Consent::Accepted),
            Some("declined") => Some(Consent::Declined),
            _ => None,
        })
    }

    /// The banner is shown until the visitor picks either option
    pub fn needs_prompt(&self) -> Result<bool> {
        Ok(self.status()?.is_none())
    }

    pub fn record(&self, consent: Consent) -> Result<()> {
        self.store.set(CONSENT_KEY, consent.as_str())
    }

    pub fn accept(&self) -> Result<()> {
        self.record(Consent::Accepted)
    }

    pub fn decline(&self) -> Result<()> {
        self.record(Consent::Declined)
    }
}
