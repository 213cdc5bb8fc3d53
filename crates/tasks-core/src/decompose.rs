//! Keyword-driven breakdown of a requirement into sequential task records.

use serde::Serialize;

use crate::status::Status;
use crate::wbs::Wbs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtask {
    pub name: String,
    pub description: String,
}

struct Pattern {
    keyword: &'static str,
    steps: &'static [(&'static str, &'static str)],
}

const PATTERNS: &[Pattern] = &[
    Pattern {
        keyword: "authentication",
        steps: &[
            ("Design authentication architecture", "Design the overall authentication system architecture"),
            ("Implement user model and database", "Create user model with email/password fields"),
            ("Implement authentication service", "Implement login, logout, and session management"),
            ("Add authentication endpoints", "Create API endpoints for authentication"),
            ("Add authentication tests", "Write tests for authentication functionality"),
        ],
    },
    Pattern {
        keyword: "oauth",
        steps: &[
            ("Design OAuth integration architecture", "Design OAuth2 integration with providers"),
            ("Implement OAuth client", "Implement OAuth client for provider integration"),
            ("Add OAuth endpoints", "Create OAuth callback and redirect endpoints"),
            ("Add OAuth tests", "Write tests for OAuth functionality"),
        ],
    },
    Pattern {
        keyword: "api",
        steps: &[
            ("Design API structure", "Design RESTful API endpoints and structure"),
            ("Implement API endpoints", "Implement the core API endpoints"),
            ("Add input validation", "Add request validation and error handling"),
            ("Add API documentation", "Document API endpoints with OpenAPI/Swagger"),
            ("Add API tests", "Write tests for API endpoints"),
        ],
    },
    Pattern {
        keyword: "ui",
        steps: &[
            ("Design UI layout", "Design the overall UI layout and components"),
            ("Implement UI components", "Implement the UI components"),
            ("Add state management", "Add state management for UI components"),
            ("Add UI tests", "Write tests for UI components"),
        ],
    },
    Pattern {
        keyword: "dashboard",
        steps: &[
            ("Design dashboard layout", "Design dashboard layout and navigation"),
            ("Implement dashboard components", "Implement dashboard widgets and components"),
            ("Add data fetching", "Implement data fetching and state management"),
            ("Add dashboard tests", "Write tests for dashboard functionality"),
        ],
    },
    Pattern {
        keyword: "database",
        steps: &[
            ("Design database schema", "Design database schema and relationships"),
            ("Implement migrations", "Create database migration scripts"),
            ("Create repositories", "Implement repository pattern for data access"),
            ("Add data tests", "Write tests for data layer"),
        ],
    },
];

/// Subtasks for `requirement`: the first matching keyword plan, else a
/// generic design / implement / test split.
pub fn plan_subtasks(requirement: &str) -> Vec<Subtask> {
    let lowered = requirement.to_lowercase();
    if let Some(pattern) = PATTERNS
        .iter()
        .find(|pattern| lowered.contains(pattern.keyword))
    {
        return pattern
            .steps
            .iter()
            .map(|(name, description)| Subtask {
                name: name.to_string(),
                description: description.to_string(),
            })
            .collect();
    }

    let requirement = requirement.trim();
    vec![
        Subtask {
            name: "Design and planning".to_string(),
            description: format!(
                "Analyze requirements and create implementation plan for: {requirement}"
            ),
        },
        Subtask {
            name: "Implementation".to_string(),
            description: format!("Implement the core functionality for: {requirement}"),
        },
        Subtask {
            name: "Testing".to_string(),
            description: format!("Add tests and verify correctness for: {requirement}"),
        },
    ]
}

/// Record content for one subtask. Each subtask after the first depends on
/// its predecessor; the first one carries `parent` when given.
pub fn render_subtask(
    subtask: &Subtask,
    wbs: Wbs,
    previous: Option<Wbs>,
    parent: Option<Wbs>,
    requirement: &str,
    timestamp: &str,
) -> String {
    let mut header = vec![
        format!("name: {}", subtask.name),
        format!("description: {}", subtask.description),
        format!("status: {}", Status::Backlog),
        format!("created_at: {timestamp}"),
        format!("updated_at: {timestamp}"),
        format!("wbs: {wbs}"),
    ];
    match (previous, parent) {
        (Some(previous), _) => header.push(format!("dependencies: [{previous}]")),
        (None, Some(parent)) => header.push(format!("parent: {parent}")),
        (None, None) => {}
    }

    format!(
        "---\n{header}\n---\n\n## {wbs}. {name}\n\n### Background\n\n{requirement}\n\n\
### Requirements / Objectives\n\n{description}\n\n### Solutions / Goals\n\n### References\n",
        header = header.join("\n"),
        name = subtask.name,
        requirement = requirement.trim(),
        description = subtask.description,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::parse_header;

    #[test]
    fn keyword_plan_wins() {
        let plan = plan_subtasks("Build Authentication system");
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0].name, "Design authentication architecture");
    }

    #[test]
    fn generic_plan_mentions_requirement() {
        let plan = plan_subtasks("Speed up nightly export");
        assert_eq!(plan.len(), 3);
        assert!(plan[1].description.ends_with("Speed up nightly export"));
    }

    #[test]
    fn rendered_subtask_links_previous() {
        let subtask = Subtask {
            name: "Implement OAuth client".to_string(),
            description: "Client".to_string(),
        };
        let content = render_subtask(
            &subtask,
            Wbs::new(6).expect("wbs"),
            Some(Wbs::new(5).expect("prev")),
            Some(Wbs::new(2).expect("parent")),
            "Add OAuth",
            "2026-01-01 09:00:00",
        );
        let header = parse_header(&content);
        assert_eq!(header.get("status"), Some("Backlog"));
        assert_eq!(header.get("wbs"), Some("0006"));
        assert_eq!(header.get("dependencies"), Some("[0005]"));
        assert_eq!(header.get("parent"), None);
        assert!(content.contains("## 0006. Implement OAuth client\n"));
    }

    #[test]
    fn first_subtask_records_parent() {
        let subtask = Subtask {
            name: "Design OAuth integration architecture".to_string(),
            description: "Design".to_string(),
        };
        let content = render_subtask(
            &subtask,
            Wbs::new(3).expect("wbs"),
            None,
            Some(Wbs::new(1).expect("parent")),
            "Add OAuth",
            "2026-01-01 09:00:00",
        );
        let header = parse_header(&content);
        assert_eq!(header.get("parent"), Some("0001"));
        assert_eq!(header.get("dependencies"), None);
    }
}
