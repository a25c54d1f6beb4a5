//! Process-wide settings registry.
//!
//! A lazily initialized, read-only bundle of `{URL, credential-set}` per
//! carrier, built once from the environment. Credentials are [`Secret`]
//! wrappers; missing required variables are collected across every carrier
//! before `from_env` returns, so a misconfigured deployment sees every gap
//! at once instead of failing one variable at a time.

use std::collections::HashMap;
use std::sync::OnceLock;

use freight_core::config::Secret;
use freight_core::{FreightError, Result};

/// `{URL, token}` pair shared by carriers that authenticate with a single
/// bearer/API-key credential (CMA group, HMM, Maersk family, and the
/// generic token-or-OAuth carriers).
#[derive(Debug, Clone)]
pub struct CarrierTokenSettings {
    pub url: String,
    pub token: Secret,
}

/// ZIM's OAuth2 client-credentials triplet plus the Azure APIM subscription
/// key that rides along on every call.
#[derive(Debug, Clone)]
pub struct ZimSettings {
    pub url: String,
    pub token_url: String,
    pub subscription_key: Secret,
    pub client_id: Secret,
    pub client_secret: Secret,
}

/// The full settings registry. Populated once via [`Settings::from_env`]
/// and held behind a `OnceLock`: settings load once at start and are
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cma: CarrierTokenSettings,
    pub zim: ZimSettings,
    pub hmm: CarrierTokenSettings,
    pub maersk: CarrierTokenSettings,
    /// Remaining carriers sharing the generic "token or OAuth / JSON"
    /// protocol family, keyed by SCAC.
    pub generic: HashMap<String, CarrierTokenSettings>,
}

/// SCACs routed to the generic "Others | Token or OAuth | JSON" adapter.
pub const GENERIC_CARRIER_SCACS: &[&str] = &["MSCU", "SUDU", "ANRM", "OOLU", "COSU", "HLCU", "ONEY"];

/// SCACs routed to the CMA-group adapter and its paging sub-protocol.
pub const CMA_GROUP_SCACS: &[&str] = &["CMDU", "ANNU", "APLU", "CHNL", "CSFU"];

/// SCACs routed to the Maersk streaming (NDJSON) adapter.
pub const MAERSK_GROUP_SCACS: &[&str] = &["MAEU", "SEAU", "SEJJ", "MCPU", "MAEI"];

fn require_env(errors: &mut Vec<String>, name: &str) -> String {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value,
        _ => {
            errors.push(name.to_string());
            String::new()
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let mut errors = Vec::new();

        let cma = CarrierTokenSettings {
            url: require_env(&mut errors, "CMA_URL"),
            token: Secret::new(require_env(&mut errors, "CMA_TOKEN")),
        };

        let zim = ZimSettings {
            url: require_env(&mut errors, "ZIM_URL"),
            token_url: require_env(&mut errors, "ZIM_TURL"),
            subscription_key: Secret::new(require_env(&mut errors, "ZIM_TOKEN")),
            client_id: Secret::new(require_env(&mut errors, "ZIM_CLIENT")),
            client_secret: Secret::new(require_env(&mut errors, "ZIM_SECRET")),
        };

        let hmm = CarrierTokenSettings {
            url: require_env(&mut errors, "HMM_URL"),
            token: Secret::new(require_env(&mut errors, "HMM_TOKEN")),
        };

        let maersk = CarrierTokenSettings {
            url: require_env(&mut errors, "MAEU_P2P"),
            token: Secret::new(require_env(&mut errors, "MAEU_TOKEN")),
        };

        let mut generic = HashMap::new();
        for scac in GENERIC_CARRIER_SCACS {
            let url = require_env(&mut errors, &format!("{scac}_URL"));
            let token = Secret::new(require_env(&mut errors, &format!("{scac}_TOKEN")));
            generic.insert(scac.to_string(), CarrierTokenSettings { url, token });
        }

        if !errors.is_empty() {
            return Err(FreightError::Config(format!(
                "missing required settings: {}",
                errors.join(", ")
            )));
        }

        Ok(Self {
            cma,
            zim,
            hmm,
            maersk,
            generic,
        })
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Access the process-wide settings, initializing them from the
/// environment on first use. Panics if required variables are missing —
/// matching the spec's "fail loudly at startup" requirement, since this is
/// only ever called once during service bootstrap.
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(|| Settings::from_env().expect("settings registry failed to initialize"))
}
