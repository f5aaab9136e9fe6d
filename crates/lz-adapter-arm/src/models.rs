//! ARM request and response bodies. Only the fields the adapter reads or
//! writes are modelled.

use lz_core::naming;
use lz_runtime::{PolicyAssignmentRequest, RemoteAssignment, RemoteGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<String>,
    pub message: Option<String>,
}

// ===== Management groups =====

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupBody<'a> {
    pub properties: CreateGroupProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupProperties<'a> {
    pub display_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<CreateGroupDetails>,
}

#[derive(Debug, Serialize)]
pub struct CreateGroupDetails {
    pub parent: ResourceRef,
}

impl<'a> CreateGroupBody<'a> {
    pub fn new(display_name: &'a str, parent: Option<&str>) -> Self {
        Self {
            properties: CreateGroupProperties {
                display_name,
                details: parent.map(|p| CreateGroupDetails {
                    parent: ResourceRef {
                        id: naming::management_group_scope(p),
                    },
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementGroup {
    pub name: String,
    #[serde(default)]
    pub properties: Option<ManagementGroupProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementGroupProperties {
    pub display_name: Option<String>,
    pub details: Option<ManagementGroupDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ManagementGroupDetails {
    pub parent: Option<ResourceRef>,
}

impl From<ManagementGroup> for RemoteGroup {
    fn from(group: ManagementGroup) -> Self {
        let properties = group.properties;
        let display_name = properties
            .as_ref()
            .and_then(|p| p.display_name.clone())
            .unwrap_or_else(|| group.name.clone());
        let parent_id = properties
            .and_then(|p| p.details)
            .and_then(|d| d.parent)
            .map(|parent| naming::resource_name(&parent.id).to_string());
        Self {
            id: group.name,
            display_name,
            parent_id,
        }
    }
}

// ===== Entities (subscription placement lookup) =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPage {
    #[serde(default)]
    pub value: Vec<Entity>,
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    pub properties: Option<EntityProperties>,
}

#[derive(Debug, Deserialize)]
pub struct EntityProperties {
    pub parent: Option<ResourceRef>,
}

impl Entity {
    pub fn is_subscription(&self) -> bool {
        self.entity_type.to_ascii_lowercase().ends_with("/subscriptions")
    }

    pub fn parent_group(&self) -> Option<String> {
        self.properties
            .as_ref()
            .and_then(|p| p.parent.as_ref())
            .map(|parent| naming::resource_name(&parent.id).to_string())
    }
}

// ===== Policy assignments =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentBody<'a> {
    pub properties: CreateAssignmentProperties<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<IdentityBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentProperties<'a> {
    pub display_name: &'a str,
    pub policy_definition_id: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<&'a str, ParameterValue<'a>>>,
}

#[derive(Debug, Serialize)]
pub struct ParameterValue<'a> {
    pub value: &'a serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct IdentityBody {
    #[serde(rename = "type")]
    pub identity_type: &'static str,
}

impl<'a> From<&'a PolicyAssignmentRequest> for CreateAssignmentBody<'a> {
    fn from(request: &'a PolicyAssignmentRequest) -> Self {
        Self {
            properties: CreateAssignmentProperties {
                display_name: &request.display_name,
                policy_definition_id: &request.policy_definition_id,
                description: &request.description,
                parameters: request.parameters.as_ref().map(|params| {
                    params
                        .iter()
                        .map(|(name, value)| (name.as_str(), ParameterValue { value }))
                        .collect()
                }),
            },
            identity: request.identity.then_some(IdentityBody {
                identity_type: "SystemAssigned",
            }),
            location: request.location.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssignment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Option<PolicyAssignmentProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyAssignmentProperties {
    pub scope: Option<String>,
    pub policy_definition_id: Option<String>,
}

impl PolicyAssignment {
    pub fn into_remote(self, fallback_scope: &str) -> RemoteAssignment {
        let properties = self.properties;
        RemoteAssignment {
            id: self.id,
            name: self.name,
            scope: properties
                .as_ref()
                .and_then(|p| p.scope.clone())
                .unwrap_or_else(|| fallback_scope.to_string()),
            policy_definition_id: properties
                .and_then(|p| p.policy_definition_id)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_group_body_parent_is_scope_path() {
        let body = serde_json::to_value(CreateGroupBody::new("Platform", Some("Target-ALZ"))).unwrap();
        assert_eq!(
            body,
            json!({
                "properties": {
                    "displayName": "Platform",
                    "details": {
                        "parent": { "id": "/providers/Microsoft.Management/managementGroups/Target-ALZ" }
                    }
                }
            })
        );

        let root = serde_json::to_value(CreateGroupBody::new("ALZ", None)).unwrap();
        assert!(root["properties"].get("details").is_none());
    }

    #[test]
    fn test_group_response_parent_is_bare_id() {
        let group: ManagementGroup = serde_json::from_value(json!({
            "id": "/providers/Microsoft.Management/managementGroups/Target-Platform",
            "name": "Target-Platform",
            "properties": {
                "displayName": "Platform",
                "details": {
                    "parent": { "id": "/providers/Microsoft.Management/managementGroups/Target-ALZ" }
                }
            }
        }))
        .unwrap();
        let remote = RemoteGroup::from(group);
        assert_eq!(remote.parent_id.as_deref(), Some("Target-ALZ"));
        assert_eq!(remote.display_name, "Platform");
    }

    #[test]
    fn test_assignment_body_with_identity() {
        let mut parameters = BTreeMap::new();
        parameters.insert("tagName".to_string(), json!("CostCenter"));
        let request = PolicyAssignmentRequest {
            name: "Inherit-Tag-CostCenter".to_string(),
            display_name: "Inherit tag".to_string(),
            policy_definition_id: "/providers/Microsoft.Authorization/policyDefinitions/x"
                .to_string(),
            scope: "/providers/Microsoft.Management/managementGroups/Target-ALZ".to_string(),
            parameters: Some(parameters),
            description: String::new(),
            identity: true,
            location: Some("westeurope".to_string()),
        };
        let body = serde_json::to_value(CreateAssignmentBody::from(&request)).unwrap();

        assert_eq!(body["identity"]["type"], "SystemAssigned");
        assert_eq!(body["location"], "westeurope");
        assert_eq!(body["properties"]["parameters"]["tagName"]["value"], "CostCenter");
        assert!(body["properties"].get("description").is_none());
    }

    #[test]
    fn test_assignment_body_without_parameters() {
        let request = PolicyAssignmentRequest {
            name: "Allowed-Locations".to_string(),
            display_name: "Allowed locations".to_string(),
            policy_definition_id: "def".to_string(),
            scope: "/providers/Microsoft.Management/managementGroups/Target-ALZ".to_string(),
            parameters: None,
            description: "Restricts locations.".to_string(),
            identity: false,
            location: None,
        };
        let body = serde_json::to_value(CreateAssignmentBody::from(&request)).unwrap();

        assert!(body.get("identity").is_none());
        assert!(body.get("location").is_none());
        assert!(body["properties"].get("parameters").is_none());
        assert_eq!(body["properties"]["description"], "Restricts locations.");
    }
}
