use crate::error::SourceError;
use crate::github::queries::{PROJECTS_QUERY, TEAM_MEMBERS_QUERY};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Minimal GitHub GraphQL client authenticated with a bearer token.
pub struct GraphQlClient {
    agent: ureq::Agent,
    url: String,
    token: String,
}

// Create
impl GraphQlClient {
    pub fn new(token: impl ToString) -> Self {
        Self::with_url(GITHUB_GRAPHQL_URL, token)
    }

    pub fn with_url(url: impl ToString, token: impl ToString) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .new_agent();
        Self {
            agent,
            url: url.to_string(),
            token: token.to_string(),
        }
    }
}

impl GraphQlClient {
    /// Runs `query` and returns its `data` object.
    pub fn run(&self, query: &str, variables: Value) -> Result<Value, SourceError> {
        let response = self
            .agent
            .post(&self.url)
            .header("Authorization", &format!("bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send_json(json!({ "query": query, "variables": variables }))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.into_body().read_to_string().unwrap_or_default();
            return Err(SourceError::Status { status, body });
        }
        let mut body: Value = response.into_body().read_json()?;
        data_of(&mut body)
    }

    /// Number of the organization's project board titled exactly `name`.
    pub fn project_number(&self, organization: &str, name: &str) -> Result<u64, SourceError> {
        let mut variables = json!({ "owner": organization, "projectName": name });
        loop {
            let data = self.run(PROJECTS_QUERY, variables.clone())?;
            let projects = &data["organization"]["projectsV2"];
            let Some(nodes) = projects["nodes"].as_array() else {
                return Err(SourceError::Shape("projectsV2.nodes is not a list".to_string()));
            };
            let found = nodes
                .iter()
                .find(|project| project["title"].as_str() == Some(name))
                .and_then(|project| project["number"].as_u64());
            if let Some(number) = found {
                debug!(organization, project = name, number, "project board found");
                return Ok(number);
            }
            match next_cursor(projects)? {
                Some(cursor) => variables["nextPage"] = Value::String(cursor),
                None => break,
            }
        }
        Err(SourceError::ProjectNotFound {
            organization: organization.to_string(),
            name: name.to_string(),
        })
    }

    /// Logins of the first team matching `team`, empty when there is none.
    pub fn team_members(&self, organization: &str, team: &str) -> Result<Vec<String>, SourceError> {
        let data = self.run(TEAM_MEMBERS_QUERY, json!({ "owner": organization, "team": team }))?;
        let Some(teams) = data["organization"]["teams"]["nodes"].as_array() else {
            return Err(SourceError::Shape("teams.nodes is not a list".to_string()));
        };
        let Some(team) = teams.first() else {
            return Ok(vec![]);
        };
        let Some(members) = team["members"]["nodes"].as_array() else {
            return Err(SourceError::Shape("members.nodes is not a list".to_string()));
        };
        Ok(members
            .iter()
            .filter_map(|member| member["login"].as_str().map(String::from))
            .collect())
    }
}

fn data_of(body: &mut Value) -> Result<Value, SourceError> {
    if let Some(errors) = body.get("errors") {
        return Err(SourceError::GraphQl(errors.to_string()));
    }
    match body.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => Err(SourceError::Shape("response has no data".to_string())),
        Some(data) => Ok(data),
    }
}

/// `pageInfo.endCursor` when `pageInfo.hasNextPage`.
pub(crate) fn next_cursor(connection: &Value) -> Result<Option<String>, SourceError> {
    let page_info = &connection["pageInfo"];
    let Some(has_next_page) = page_info["hasNextPage"].as_bool() else {
        return Err(SourceError::Shape("pageInfo.hasNextPage is missing".to_string()));
    };
    if !has_next_page {
        return Ok(None);
    }
    match page_info["endCursor"].as_str() {
        Some(cursor) => Ok(Some(cursor.to_string())),
        None => Err(SourceError::Shape("pageInfo.endCursor is missing".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_errors_win_over_data() {
        let mut body = json!({"data": {"x": 1}, "errors": [{"message": "bad"}]});
        assert!(matches!(data_of(&mut body), Err(SourceError::GraphQl(msg)) if msg.contains("bad")));
        let mut body = json!({"data": null});
        assert!(matches!(data_of(&mut body), Err(SourceError::Shape(_))));
        let mut body = json!({"data": {"x": 1}});
        assert_eq!(data_of(&mut body).unwrap(), json!({"x": 1}));
    }

    #[test]
    fn cursor_follows_page_info() {
        let more = json!({"pageInfo": {"hasNextPage": true, "endCursor": "abc"}});
        assert_eq!(next_cursor(&more).unwrap().as_deref(), Some("abc"));
        let last = json!({"pageInfo": {"hasNextPage": false, "endCursor": null}});
        assert_eq!(next_cursor(&last).unwrap(), None);
        assert!(next_cursor(&json!({})).is_err());
    }
}
