use crate::error::SourceError;
use crate::github::client::{next_cursor, GraphQlClient};
use crate::github::queries::{PROJECT_ITEMS_PAGE_SIZE, PROJECT_ITEMS_QUERY};
use crate::github::{IssuePage, IssueSource};
use serde_json::{json, Value};

/// Items of one organization project board, a page per request.
pub struct ProjectIssueSource {
    client: GraphQlClient,
    organization: String,
    project_number: u64,
}

// Create
impl ProjectIssueSource {
    pub fn new(client: GraphQlClient, organization: impl ToString, project_number: u64) -> Self {
        Self {
            client,
            organization: organization.to_string(),
            project_number,
        }
    }

    /// Looks the board up by its exact title.
    pub fn find(
        client: GraphQlClient,
        organization: &str,
        project_name: &str,
    ) -> Result<Self, SourceError> {
        let number = client.project_number(organization, project_name)?;
        Ok(Self::new(client, organization, number))
    }
}

impl IssueSource for ProjectIssueSource {
    fn fetch_page(&mut self, cursor: Option<&str>) -> Result<IssuePage, SourceError> {
        let variables = json!({
            "owner": self.organization,
            "projectNumber": self.project_number,
            "pageSize": PROJECT_ITEMS_PAGE_SIZE,
            "nextPage": cursor,
        });
        let mut data = self.client.run(PROJECT_ITEMS_QUERY, variables)?;
        items_page(&mut data)
    }
}

fn items_page(data: &mut Value) -> Result<IssuePage, SourceError> {
    let Some(items) = data.pointer_mut("/organization/projectV2/items") else {
        return Err(SourceError::Shape("project board has no items".to_string()));
    };
    let next_cursor = next_cursor(items)?;
    let Value::Array(nodes) = items["nodes"].take() else {
        return Err(SourceError::Shape("projectV2.items.nodes is not a list".to_string()));
    };
    Ok(IssuePage {
        items: nodes,
        next_cursor,
    })
}
