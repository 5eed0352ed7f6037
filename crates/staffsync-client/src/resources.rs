//! Typed calls for the HR collections.
//!
//! Each method is a single [`AuthGateway::send`] with the fallback collection
//! set to match the endpoint, so an empty response decodes into an empty list.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde_json::Value;

use staffsync_common::{CourseList, EmployeeCourseList, EmployeeList, EntityId, ProjectList};

use crate::error::ClientError;
use crate::gateway::{AuthGateway, GatewayOutcome};
use crate::request::RequestDescriptor;

const EMPLOYEES: &str = "employees";
const COURSES: &str = "courses";
const PROJECTS: &str = "projects";
const EMPLOYEE_COURSES: &str = "employeeCourses";

/// HR resource calls over an [`AuthGateway`].
#[derive(Debug, Clone)]
pub struct HrApi {
    gateway: AuthGateway,
}

impl HrApi {
    /// Wraps a gateway.
    #[must_use]
    pub const fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    /// The underlying gateway.
    #[must_use]
    pub const fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    /// `GET /employees`
    pub async fn employees(&self) -> GatewayOutcome<EmployeeList> {
        self.list(EMPLOYEES, EMPLOYEES).await
    }

    /// `GET /courses`
    pub async fn courses(&self) -> GatewayOutcome<CourseList> {
        self.list(COURSES, COURSES).await
    }

    /// `GET /projects`
    pub async fn projects(&self) -> GatewayOutcome<ProjectList> {
        self.list(PROJECTS, PROJECTS).await
    }

    /// `GET /employees/{id}/courses`
    pub async fn employee_courses(
        &self,
        employee_id: &EntityId,
    ) -> GatewayOutcome<EmployeeCourseList> {
        self.list(&format!("{EMPLOYEES}/{employee_id}/{COURSES}"), EMPLOYEE_COURSES)
            .await
    }

    /// `GET path`, decoded as untyped JSON.
    ///
    /// `collection` overrides the configured fallback collection.
    pub async fn get_json(&self, path: &str, collection: Option<&str>) -> GatewayOutcome<Value> {
        let mut request = RequestDescriptor::get(self.gateway.endpoint(path));
        if let Some(collection) = collection {
            request = request.with_collection(collection);
        }
        self.gateway.send(request).await
    }

    /// `POST path` with a multipart form.
    pub async fn upload(&self, path: &str, form: Form) -> GatewayOutcome<Value> {
        let request = RequestDescriptor::post(self.gateway.endpoint(path)).with_form(form);
        self.gateway.send(request).await
    }

    /// Reads `file` from disk and uploads it as `field`, alongside text fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the local file cannot be read. Once the request
    /// is sent, every result is reported through the outcome.
    pub async fn upload_file(
        &self,
        path: &str,
        field: &str,
        file: &Path,
        text_fields: &[(String, String)],
    ) -> Result<GatewayOutcome<Value>, ClientError> {
        let bytes = tokio::fs::read(file).await?;
        let mut part = Part::bytes(bytes);
        if let Some(name) = file.file_name().and_then(|n| n.to_str()) {
            part = part.file_name(name.to_string());
        }

        let mut form = Form::new();
        for (name, value) in text_fields {
            form = form.text(name.clone(), value.clone());
        }
        form = form.part(field.to_string(), part);

        Ok(self.upload(path, form).await)
    }

    async fn list<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        collection: &str,
    ) -> GatewayOutcome<T> {
        let request = RequestDescriptor::get(self.gateway.endpoint(path)).with_collection(collection);
        self.gateway.send(request).await
    }
}
