//! Stored project listing

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime};
use dialogue_client::ProjectSummary;

/// Shown instead of an empty list
pub const EMPTY_LISTING: &str = "No projects yet. Analyze some dialogue text to create one.";

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a service timestamp for display, or "unknown"
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.map(str::trim).filter(|t| !t.is_empty()) else {
        return "unknown".to_string();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Local).format(DISPLAY_FORMAT).to_string();
    }

    // The service writes naive local times
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(parsed) => parsed.format(DISPLAY_FORMAT).to_string(),
        Err(_) => "unknown".to_string(),
    }
}

/// Ordered project summaries as returned by the service
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectListing {
    pub projects: Vec<ProjectSummary>,
}

impl ProjectListing {
    pub fn new(projects: Vec<ProjectSummary>) -> Self {
        Self { projects }
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn get(&self, index: usize) -> Option<&ProjectSummary> {
        self.projects.get(index)
    }
}

impl fmt::Display for ProjectListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.projects.is_empty() {
            return write!(f, "{}", EMPTY_LISTING);
        }

        writeln!(f, "Projects:")?;
        writeln!(f, "{:-<60}", "")?;
        for (i, project) in self.projects.iter().enumerate() {
            writeln!(f, "  {}. {} [{}]", i + 1, project.title, project.id)?;
            writeln!(
                f,
                "     created: {}  updated: {}",
                format_timestamp(project.created_at.as_deref()),
                format_timestamp(project.updated_at.as_deref())
            )?;
        }
        write!(f, "{:-<60}", "")
    }
}
