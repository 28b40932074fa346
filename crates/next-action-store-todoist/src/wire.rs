//! JSON shapes exchanged with the Todoist sync endpoint.

use next_action_core::{LabelId, Priority, ProjectId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource types requested on every sync.
pub const RESOURCE_TYPES: &str = r#"["projects","items","labels"]"#;

/// Token requesting a full sync.
pub const FULL_SYNC_TOKEN: &str = "*";

/// Body of a sync response. Absent resource arrays decode as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncResponse {
    /// Token to send with the next incremental sync.
    pub sync_token: Option<String>,
    /// Whether the arrays replace all known state.
    pub full_sync: bool,
    /// Changed (or all) projects.
    pub projects: Vec<WireProject>,
    /// Changed (or all) items.
    pub items: Vec<WireItem>,
    /// Changed (or all) labels.
    pub labels: Vec<WireLabel>,
    /// Per-command results keyed by command uuid.
    pub sync_status: BTreeMap<String, serde_json::Value>,
}

/// A project record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireProject {
    /// Project id.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Set on the user's inbox.
    pub inbox_project: bool,
    /// Deleted.
    pub is_deleted: bool,
    /// Archived.
    pub is_archived: bool,
}

/// An item (task) record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireItem {
    /// Item id.
    pub id: TaskId,
    /// Item text.
    pub content: String,
    /// Owning project.
    pub project_id: ProjectId,
    /// Parent item, for subtasks.
    pub parent_id: Option<TaskId>,
    /// Position among siblings.
    pub child_order: i64,
    /// Due information, when dated.
    pub due: Option<WireDue>,
    /// Completed.
    pub checked: bool,
    /// Deleted.
    pub is_deleted: bool,
    /// Archived (older API revisions only).
    pub is_archived: bool,
    /// Label names.
    pub labels: Vec<String>,
    /// Priority, 1 to 4.
    pub priority: Option<Priority>,
}

/// Due information of an item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireDue {
    /// `YYYY-MM-DD`, floating `YYYY-MM-DDTHH:MM:SS`, or UTC with a `Z` suffix.
    pub date: String,
}

/// A personal label record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireLabel {
    /// Label id.
    pub id: LabelId,
    /// Label name; items reference labels by this name.
    pub name: String,
    /// Deleted.
    pub is_deleted: bool,
}

/// A write command.
#[derive(Debug, Clone, Serialize)]
pub struct WireCommand {
    /// Command type.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Idempotency key; also keys the command's entry in `sync_status`.
    pub uuid: String,
    /// Command arguments.
    pub args: ItemUpdateArgs,
}

/// Arguments of an `item_update` command.
#[derive(Debug, Clone, Serialize)]
pub struct ItemUpdateArgs {
    /// Item id.
    pub id: TaskId,
    /// Complete list of label names.
    pub labels: Vec<String>,
    /// New priority, when it changes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Command results other than `"ok"`, as `(uuid, detail)` pairs.
#[must_use]
pub fn rejected_commands(status: &BTreeMap<String, serde_json::Value>) -> Vec<(String, String)> {
    status
        .iter()
        .filter(|(_, value)| value.as_str() != Some("ok"))
        .map(|(uuid, value)| (uuid.clone(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_minimal_response_with_defaults() {
        let response: SyncResponse = serde_json::from_value(json!({
            "sync_token": "abc",
            "full_sync": true,
            "items": [{ "id": "1", "content": "Buy milk", "project_id": "9" }]
        }))
        .unwrap_or_else(|err| panic!("response must decode: {err}"));

        assert_eq!(response.sync_token.as_deref(), Some("abc"));
        assert!(response.projects.is_empty());
        let item = &response.items[0];
        assert_eq!(item.id.as_str(), "1");
        assert!(item.parent_id.is_none());
        assert!(item.labels.is_empty());
        assert!(!item.checked);
    }

    #[test]
    fn command_serializes_like_the_sync_api_expects() {
        let command = WireCommand {
            kind: "item_update",
            uuid: "u-1".into(),
            args: ItemUpdateArgs {
                id: TaskId::new("42"),
                labels: vec!["next_action".into()],
                priority: None,
            },
        };
        let value = serde_json::to_value(&command).unwrap_or_else(|err| panic!("serialize: {err}"));
        assert_eq!(
            value,
            json!({
                "type": "item_update",
                "uuid": "u-1",
                "args": { "id": "42", "labels": ["next_action"] }
            })
        );
    }

    #[test]
    fn rejected_commands_ignores_ok_entries() {
        let status: BTreeMap<String, serde_json::Value> = serde_json::from_value(json!({
            "a": "ok",
            "b": { "error_code": 22, "error": "Item not found" }
        }))
        .unwrap_or_else(|err| panic!("status must decode: {err}"));

        let rejected = rejected_commands(&status);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, "b");
        assert!(rejected[0].1.contains("Item not found"));
    }
}
