//! The research instruction sent once per batch

use serde_json::Value;
use trialscout_error::{Error, ErrorKind, Result};

/// One field the agent must fill in, with an example/guidance value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub example: String,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, example: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            example: example.into(),
        }
    }
}

/// Request template: an instruction plus the strict output shape.
///
/// The first field identifies the system and doubles as the coverage key.
#[derive(Debug, Clone)]
pub struct ResearchPrompt {
    fields: Vec<SchemaField>,
}

impl Default for ResearchPrompt {
    fn default() -> Self {
        Self {
            fields: vec![
                SchemaField::new("target_system", "eg. Avalara"),
                SchemaField::new("Domain", "eg. give url to official api documentation"),
                SchemaField::new(
                    "Free_trial",
                    "eg. free trial refers to a access to a software including user management API's, \
                     get api credentials from it without Booking a call or quoting a price or contact to sales. \
                     Trial should be like fill a form and you will get it.",
                ),
                SchemaField::new(
                    "Aggregate_accounts",
                    "eg. endpoints to fetch all Identities so identity access managment can be performed \
                     for eg. Some systems have Identity as /users, /members, contacts,etc we should be able \
                     to fetch organization level identities or users, It might not possible to directly fetch \
                     all users but if users can be fetched through organization, Account, Workspace, Team \
                     eg /organization/org_id/users or any similar endpoints",
                ),
                SchemaField::new(
                    "Aggregate_entitlements",
                    "eg. entitlements can be groups, roles, permissions, etc. which enable users some kind \
                     of access in this software",
                ),
            ],
        }
    }
}

impl ResearchPrompt {
    pub fn with_fields(fields: Vec<SchemaField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::invalid_argument("output schema needs at least one field")
                .with_operation("prompt::with_fields"));
        }
        Ok(Self { fields })
    }

    /// Load fields from a JSON object of `field -> example`, keeping key order
    pub fn from_schema_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            Error::new(ErrorKind::ConfigInvalid, format!("schema is not valid JSON: {}", e))
                .with_operation("prompt::from_schema_json")
                .set_source(e)
        })?;

        let Value::Object(map) = value else {
            return Err(Error::new(ErrorKind::ConfigInvalid, "schema must be a JSON object")
                .with_operation("prompt::from_schema_json"));
        };

        let fields = map
            .into_iter()
            .map(|(name, example)| {
                let example = match example {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                SchemaField::new(name, example)
            })
            .collect();
        Self::with_fields(fields)
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Key that names the system in each returned record
    pub fn name_key(&self) -> &str {
        &self.fields[0].name
    }

    /// Render the request for a batch of system names
    pub fn render(&self, names: &[String]) -> String {
        let example: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), Value::String(f.example.clone())))
            .collect();
        let example = serde_json::to_string_pretty(&Value::Object(example))
            .unwrap_or_default();

        format!(
            "Give {names} user management API endpoints for eg. /users for Aggregate_accounts, \
             /groups - Aggregate_entitlements, etc. and is the free trial available?\n\
             Answer for every system listed: {count} system(s), one entry each.\n\
             Output should be strictly a JSON array with one object per system, \
             each object in exactly this format -\n\
             [\n{example}\n]\n\
             Return only the JSON array, with no commentary.",
            names = names.join(", "),
            count = names.len(),
            example = indent(&example, "  "),
        )
    }
}

fn indent(text: &str, pad: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}
