//! User-input forms.
//!
//! A [`SettingsPage`] is what the hub renders when the driver answers a setup
//! message with "user input required".  Pages are pure output: a step handler
//! builds one, the driver sends it, and nothing keeps a reference to it
//! afterwards.
//!
//! # Serde representation
//!
//! ```json
//! {"title":"Configure entities","settings":[
//!   {"id":"action","label":"Action","field":{"dropdown":{"value":"configure","items":[
//!     {"id":"add","label":"Add a new device"}]}}}]}
//! ```

use serde::{Deserialize, Serialize};

/// A descriptive form: a title and an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPage {
    pub title: String,
    pub settings: Vec<Setting>,
}

/// One input field on a [`SettingsPage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Key under which the hub returns the user's value in `input_values`.
    pub id: String,
    pub label: String,
    pub field: SettingField,
}

/// Field kinds.  Serialized externally tagged, e.g. `{"text":{"value":""}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingField {
    Dropdown {
        /// Id of the preselected item.
        value: String,
        items: Vec<DropdownItem>,
    },
    Text {
        value: String,
    },
    Checkbox {
        value: bool,
    },
    /// Read-only text shown to the user.
    Label {
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownItem {
    pub id: String,
    pub label: String,
}

impl DropdownItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

impl SettingsPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            settings: Vec::new(),
        }
    }

    /// Appends a field and returns the page (builder style).
    pub fn with(mut self, id: impl Into<String>, label: impl Into<String>, field: SettingField) -> Self {
        self.settings.push(Setting {
            id: id.into(),
            label: label.into(),
            field,
        });
        self
    }

    /// Looks up a field by id.
    pub fn setting(&self, id: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.id == id)
    }
}
