use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use spdlog::{info, warn};

use crate::context::{AppContext, Notifier};
use crate::error::{Error, Result};
use crate::store::{Document, DocumentStore, SetOptions};

pub const SETTINGS_COLLECTION: &str = "settings";
pub const SETTINGS_DOCUMENT: &str = "general";

/// Sites that can be put in maintenance.
pub const MAINTENANCE_COUNTRIES: [&str; 2] = ["argentina", "mexico"];
pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "Estamos mejorando la experiencia. Volvemos pronto.";

/// Per country kill switch of the public site, kept in `settings/general`.
pub struct MaintenanceSettings {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn Notifier>,
    modes: BTreeMap<String, bool>,
    message: String,
}

fn default_document() -> Document {
    let mode: serde_json::Map<String, Value> = MAINTENANCE_COUNTRIES.iter()
        .map(|c| (c.to_string(), Value::Bool(false)))
        .collect();

    let mut doc = Document::new();
    doc.insert("maintenance_mode".to_string(), Value::Object(mode));
    doc.insert("maintenance_message".to_string(), Value::String(DEFAULT_MAINTENANCE_MESSAGE.to_string()));
    doc
}

impl MaintenanceSettings {
    /// Reads the settings, creating the default document the first time.
    pub async fn load(ctx: &AppContext) -> Result<MaintenanceSettings> {
        match Self::read(ctx.store.as_ref()).await {
            Ok((modes, message)) => Ok(MaintenanceSettings {
                store: ctx.store.clone(),
                notifier: ctx.notifier.clone(),
                modes,
                message,
            }),
            Err(e) => {
                warn!("Error loading the maintenance state: {}", e);
                ctx.notifier.error("Error loading the maintenance state");
                Err(e)
            }
        }
    }

    async fn read(store: &dyn DocumentStore) -> Result<(BTreeMap<String, bool>, String)> {
        let doc = match store.get_document(SETTINGS_COLLECTION, SETTINGS_DOCUMENT).await? {
            Some(doc) => doc,
            None => {
                info!("{}/{} not found, creating it", SETTINGS_COLLECTION, SETTINGS_DOCUMENT);
                let doc = default_document();
                store.set_document(SETTINGS_COLLECTION, SETTINGS_DOCUMENT, doc.clone(), SetOptions::merge()).await?;
                doc
            }
        };

        let mut modes: BTreeMap<String, bool> = MAINTENANCE_COUNTRIES.iter()
            .map(|c| (c.to_string(), false))
            .collect();
        if let Some(Value::Object(stored)) = doc.get("maintenance_mode") {
            for (country, on) in stored.iter() {
                modes.insert(country.clone(), on.as_bool().unwrap_or(false));
            }
        }

        let message = doc.get("maintenance_message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MAINTENANCE_MESSAGE)
            .to_string();
        Ok((modes, message))
    }

    pub fn is_in_maintenance(&self, country: &str) -> bool {
        self.modes.get(country).copied().unwrap_or(false)
    }

    pub fn modes(&self) -> &BTreeMap<String, bool> {
        &self.modes
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Turns maintenance on or off for one site, the other sites keep their state.
    pub async fn set_maintenance(&mut self, country: &str, on: bool) -> Result<()> {
        if !MAINTENANCE_COUNTRIES.contains(&country) {
            return Err(Error::invalid_input(format!("Unknown site {}", country)));
        }

        let mut mode = serde_json::Map::new();
        mode.insert(country.to_string(), Value::Bool(on));
        let mut update = Document::new();
        update.insert("maintenance_mode".to_string(), Value::Object(mode));
        if let Err(e) = self.store.set_document(SETTINGS_COLLECTION, SETTINGS_DOCUMENT, update, SetOptions::merge()).await {
            warn!("Error setting maintenance mode of {}: {}", country, e);
            self.notifier.error("Error saving the maintenance state");
            return Err(e);
        }

        self.modes.insert(country.to_string(), on);
        if on {
            self.notifier.info(&format!("Site {} in maintenance", country));
        } else {
            self.notifier.success(&format!("Site {} active", country));
        }
        Ok(())
    }
}
