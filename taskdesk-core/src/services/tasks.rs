//! Task API facade
//!
//! Thin typed wrappers over the task and user endpoints. Reads used to fill
//! a screen (`list_tasks`, `list_users`) fail open: the error is logged and
//! an empty collection returned. Everything else hands the error back.

use tracing::{debug, warn};

use crate::adapters::http::HttpClient;
use crate::domain::result::Result;
use crate::domain::{NewTask, Task, TaskChanges, TaskList, TaskQuery, TaskStatus, User};

pub struct TaskApi {
    http: HttpClient,
}

impl TaskApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Tasks visible to the current user, or nothing if the request fails
    pub async fn list_tasks(&self) -> Vec<Task> {
        match self.query_tasks(&TaskQuery::default()).await {
            Ok(list) => list.tasks,
            Err(e) => {
                warn!(error = %e, "failed to fetch tasks");
                Vec::new()
            }
        }
    }

    /// Filtered, paged task listing
    pub async fn query_tasks(&self, query: &TaskQuery) -> Result<TaskList> {
        self.http.get_json_with_query("/tasks", query).await
    }

    pub async fn get_task(&self, id: i64) -> Result<Task> {
        self.http.get_json(&task_path(id)).await
    }

    /// Create a task; the assignee is normalized to a numeric id or null
    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        let created: Task = self.http.post_json("/tasks", &task.payload()).await?;
        debug!(task_id = created.id, "task created");
        Ok(created)
    }

    /// Send only the fields present in `changes`
    pub async fn update_task(&self, id: i64, changes: &TaskChanges) -> Result<Task> {
        let updated: Task = self.http.put_json(&task_path(id), &changes.payload()).await?;
        debug!(task_id = id, "task updated");
        Ok(updated)
    }

    /// Status transition: an update carrying nothing but the status
    pub async fn set_status(&self, id: i64, status: TaskStatus) -> Result<Task> {
        self.update_task(id, &TaskChanges::status(status)).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<()> {
        self.http.delete(&task_path(id)).await?;
        debug!(task_id = id, "task deleted");
        Ok(())
    }

    /// All users (admins only), or nothing if the request fails
    pub async fn list_users(&self) -> Vec<User> {
        match self.http.get_json("/users").await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "failed to fetch users");
                Vec::new()
            }
        }
    }
}

fn task_path(id: i64) -> String {
    format!("/tasks/{}", id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::mock_backend::{
        MockBackend, MockConfig, ADMIN_EMAIL, MANAGER_EMAIL, MEMBER_EMAIL, MEMBER_ID,
    };
    use crate::domain::result::Error;
    use crate::domain::TaskPriority;

    fn api_as(server: &MockBackend, email: &str) -> TaskApi {
        let token = server.token_for(email);
        let http = HttpClient::new(&server.base_url(), Arc::new(move || token.clone())).unwrap();
        TaskApi::new(http)
    }

    #[tokio::test]
    async fn test_create_normalizes_assignee() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        let api = api_as(&server, MANAGER_EMAIL);

        let created = api
            .create_task(
                &NewTask::new("Write report")
                    .with_priority(TaskPriority::High)
                    .assigned_to("3"),
            )
            .await
            .unwrap();

        assert_eq!(created.assigned_to, Some(MEMBER_ID));
        let body = server.requests().last().unwrap().json_body().unwrap();
        assert_eq!(body["assigned_to"], serde_json::json!(3));
        assert_eq!(body["priority"], "high");
    }

    #[tokio::test]
    async fn test_set_status_sends_only_status() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        server.seed_task(5, "Fix bug", Some(MEMBER_ID), 1);
        let api = api_as(&server, MEMBER_EMAIL);

        let updated = api.set_status(5, TaskStatus::Completed).await.unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        let request = server.requests().pop().unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/api/v1/tasks/5");
        assert_eq!(request.body, r#"{"status":"completed"}"#);
    }

    #[tokio::test]
    async fn test_member_cannot_edit_title() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        server.seed_task(5, "Fix bug", Some(MEMBER_ID), 1);
        let api = api_as(&server, MEMBER_EMAIL);

        let result = api
            .update_task(5, &TaskChanges::new().with_title("Renamed"))
            .await;

        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_query_tasks_sends_filters() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        server.seed_task(1, "One", Some(MEMBER_ID), 1);
        server.seed_task(2, "Two", None, 1);
        let api = api_as(&server, ADMIN_EMAIL);

        let query = TaskQuery {
            assigned_to: Some(MEMBER_ID),
            limit: Some(5),
            ..Default::default()
        };
        let list = api.query_tasks(&query).await.unwrap();

        assert_eq!(list.total, 1);
        assert_eq!(list.size, 5);
        let request = server.requests().pop().unwrap();
        assert_eq!(request.query.as_deref(), Some("assigned_to=3&limit=5"));
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let server = MockBackend::start(MockConfig::default()).unwrap();
        server.seed_task(7, "Cleanup", None, 1);
        let api = api_as(&server, ADMIN_EMAIL);

        assert_eq!(api.get_task(7).await.unwrap().title, "Cleanup");
        api.delete_task(7).await.unwrap();
        assert!(matches!(api.get_task(7).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_users_fails_open_for_non_admin() {
        let server = MockBackend::start(MockConfig::default()).unwrap();

        assert!(api_as(&server, MEMBER_EMAIL).list_users().await.is_empty());
        assert_eq!(api_as(&server, ADMIN_EMAIL).list_users().await.len(), 3);
    }
}
