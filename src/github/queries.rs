// https://docs.github.com/en/graphql/guides/introduction-to-graphql#schema

pub const PROJECTS_QUERY: &str = r#"
query QueryProjects($owner: String!, $projectName: String!, $nextPage: String) {
  organization(login: $owner) {
    projectsV2(query: $projectName, first: 100, after: $nextPage) {
      nodes {
        title
        number
      }
      pageInfo {
        endCursor
        hasNextPage
      }
    }
  }
}
"#;

pub const TEAM_MEMBERS_QUERY: &str = r#"
query GetTeamMembers($owner: String!, $team: String!) {
  organization(login: $owner) {
    teams(query: $team, first: 1) {
      nodes {
        members {
          nodes {
            login
          }
        }
      }
    }
  }
}
"#;

pub const PROJECT_ITEMS_PAGE_SIZE: u32 = 100;

pub const PROJECT_ITEMS_QUERY: &str = r#"
query QueryProjectItemsForTeam($owner: String!, $projectNumber: Int!, $pageSize: Int!, $nextPage: String) {
  organization(login: $owner) {
    projectV2(number: $projectNumber) {
      title
      items(first: $pageSize, after: $nextPage) {
        pageInfo {
          endCursor
          hasNextPage
        }
        nodes {
          content {
            ... on Issue {
              url
              number
              title
              author { login }
              createdAt
              closedAt
              closed
              milestone { title }
              assignees(first: 20) {
                nodes { login }
              }
              labels(first: 20) {
                nodes { name }
              }
              reactions(first: 10, content: HOORAY) {
                nodes {
                  content
                  user { login }
                }
              }
              comments(first: 30) {
                nodes {
                  author { login }
                  reactions(first: 10, content: HOORAY) {
                    nodes {
                      content
                      user { login }
                    }
                  }
                }
              }
              timelineItems(last: 1, itemTypes: [CLOSED_EVENT]) {
                nodes {
                  ... on ClosedEvent {
                    actor { login }
                  }
                }
              }
            }
          }
          Urgency: fieldValueByName(name: "Urgency") {
            ... on ProjectV2ItemFieldNumberValue { number }
          }
          Difficulty: fieldValueByName(name: "Difficulty") {
            ... on ProjectV2ItemFieldNumberValue { number }
          }
          Modifier: fieldValueByName(name: "Modifier") {
            ... on ProjectV2ItemFieldNumberValue { number }
          }
        }
      }
    }
  }
}
"#;
