//! Get-or-create lookup of label ids by name.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::mailbox::{LabelVisibility, Mailbox};

pub struct LabelResolver {
    mailbox: Arc<dyn Mailbox>,
    resolved: Mutex<HashMap<String, String>>,
}

impl LabelResolver {
    pub fn new(mailbox: Arc<dyn Mailbox>) -> Self {
        Self {
            mailbox,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Return the id of the label called `name`, creating it when the
    /// mailbox doesn't have one yet. Ids are remembered so a label is
    /// created at most once per process.
    pub async fn resolve(&self, name: &str) -> Result<String> {
        if let Some(id) = self.cached(name) {
            return Ok(id);
        }

        let labels = self.mailbox.list_labels().await?;
        let id = match labels.into_iter().find(|l| l.name == name) {
            Some(label) => label.id,
            None => {
                let label = self
                    .mailbox
                    .create_label(name, &LabelVisibility::default())
                    .await?;
                tracing::info!("Created label {} ({})", name, label.id);
                label.id
            }
        };

        self.resolved
            .lock()
            .unwrap()
            .insert(name.to_string(), id.clone());
        Ok(id)
    }

    /// Drop the remembered id for `name` so the next resolve looks it
    /// up again.
    pub fn forget(&self, name: &str) {
        self.resolved.lock().unwrap().remove(name);
    }

    fn cached(&self, name: &str) -> Option<String> {
        self.resolved.lock().unwrap().get(name).cloned()
    }
}
