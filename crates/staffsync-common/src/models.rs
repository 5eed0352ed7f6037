//! Payload types for the HR collections served by the backend.
//!
//! Every list envelope defaults to an empty collection, so the gateway's
//! fallback payload (`{ "employees": [] }` and friends) decodes into it.
//! Fields the backend adds later are kept in `extra` rather than dropped.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier that the backend may send as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Numeric primary key.
    Number(u64),
    /// String primary key (UUIDs, slugs).
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for EntityId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An employee record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Primary key.
    pub id: EntityId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Work email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub img: Option<String>,
    /// Career level shown in the user menu.
    #[serde(default)]
    pub level: Option<u32>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A training course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Primary key.
    pub id: EntityId,
    /// Course title.
    #[serde(default)]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Minimal project reference used by project pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Project identifier.
    pub project_id: String,
    /// Human-readable project name.
    pub project_name: String,
    /// Technologies used by the project.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tech_stack: Vec<String>,
}

/// Enrollment of an employee in a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCourse {
    /// Enrolled employee.
    pub employee_id: String,
    /// Course the employee is enrolled in.
    pub course_id: String,
    /// `true` once the course is completed.
    pub status: bool,
    /// When the enrollment was created.
    pub created_at: DateTime<Utc>,
    /// When the enrollment last changed.
    pub updated_at: DateTime<Utc>,
}

/// `{ "employees": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeeList {
    /// The employees in the response.
    #[serde(default)]
    pub employees: Vec<Employee>,
}

/// `{ "courses": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseList {
    /// The courses in the response.
    #[serde(default)]
    pub courses: Vec<Course>,
}

/// `{ "projects": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    /// The projects in the response.
    #[serde(default)]
    pub projects: Vec<ProjectInfo>,
}

/// `{ "employeeCourses": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCourseList {
    /// Enrollments in the response.
    #[serde(default)]
    pub employee_courses: Vec<EmployeeCourse>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_employee_list_accepts_numeric_and_string_ids() {
        let list: EmployeeList = serde_json::from_value(json!({
            "employees": [
                {"id": 1, "name": "Ana", "level": 3},
                {"id": "b7c1", "email": "luis@example.com", "department": "R&D"}
            ]
        }))
        .unwrap();

        assert_eq!(list.employees.len(), 2);
        assert_eq!(list.employees[0].id, EntityId::Number(1));
        assert_eq!(list.employees[0].level, Some(3));
        assert_eq!(list.employees[1].id, EntityId::Text("b7c1".to_string()));
        assert_eq!(list.employees[1].extra["department"], json!("R&D"));
    }

    #[test]
    fn test_fallback_shapes_decode_to_empty_lists() {
        let employees: EmployeeList = serde_json::from_value(json!({"employees": []})).unwrap();
        assert!(employees.employees.is_empty());

        let courses: CourseList = serde_json::from_value(json!({"courses": []})).unwrap();
        assert!(courses.courses.is_empty());

        let projects: ProjectList = serde_json::from_value(json!({"projects": []})).unwrap();
        assert!(projects.projects.is_empty());

        let enrollments: EmployeeCourseList =
            serde_json::from_value(json!({"employeeCourses": []})).unwrap();
        assert!(enrollments.employee_courses.is_empty());
    }

    #[test]
    fn test_project_info_camel_case() {
        let project = ProjectInfo {
            project_id: "p-1".to_string(),
            project_name: "Portal".to_string(),
            tech_stack: vec!["React".to_string()],
        };
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(
            value,
            json!({"projectId": "p-1", "projectName": "Portal", "techStack": ["React"]})
        );
    }

    #[test]
    fn test_employee_course_dates() {
        let link: EmployeeCourse = serde_json::from_value(json!({
            "employeeId": "e1",
            "courseId": "c1",
            "status": true,
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-02T10:00:00Z"
        }))
        .unwrap();

        assert!(link.status);
        assert!(link.updated_at > link.created_at);
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::from(42).to_string(), "42");
        assert_eq!(EntityId::from("abc").to_string(), "abc");
    }
}
