//! In-memory mirrors of the server collections, the session-side
//! counterpart of the task and project screens. A store fetches its
//! collection once when the session becomes available, and every mutation
//! goes to the gateway first: only a successful call mutates the mirror
//! (append, replace-by-id, filter-out-by-id). A failed call is logged and
//! leaves the mirror exactly as it was; there is no retry and no
//! background reconciliation, only the explicit `refresh`.

use log::error;
use thiserror::Error;

use crate::models::project::{ProjectRead, ProjectWrite};
use crate::models::task::{TaskRead, TaskWriteRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("server rejected the call: {status} {message}")]
    Rejected { status: u16, message: String },
}

/// The task REST surface as the store consumes it.
pub trait TaskGateway {
    async fn tasks_for_user(&self, user_id: i64) -> Result<Vec<TaskRead>, GatewayError>;
    async fn create_task(&self, payload: &TaskWriteRequest) -> Result<TaskRead, GatewayError>;
    async fn update_task(
        &self,
        task_id: i64,
        payload: &TaskWriteRequest,
    ) -> Result<TaskRead, GatewayError>;
    async fn delete_task(&self, task_id: i64) -> Result<(), GatewayError>;
}

pub trait ProjectGateway {
    async fn projects_for_company(&self, company_id: i64)
        -> Result<Vec<ProjectRead>, GatewayError>;
    async fn create_project(&self, payload: &ProjectWrite) -> Result<ProjectRead, GatewayError>;
    async fn update_project(
        &self,
        project_id: i64,
        payload: &ProjectWrite,
    ) -> Result<ProjectRead, GatewayError>;
    async fn delete_project(&self, project_id: i64) -> Result<(), GatewayError>;
}

pub struct TaskStore<G> {
    gateway: G,
    tasks: Vec<TaskRead>,
    loaded: bool,
}

impl<G: TaskGateway> TaskStore<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway, tasks: Vec::new(), loaded: false }
    }

    pub fn tasks(&self) -> &[TaskRead] {
        &self.tasks
    }

    /// Fetches the mirror on first call; a no-op afterwards.
    pub async fn ensure_loaded(&mut self, user_id: i64) -> Result<(), GatewayError> {
        if self.loaded {
            return Ok(());
        }
        self.refresh(user_id).await
    }

    /// Explicit refetch, the only point at which the mirror re-syncs with
    /// the server.
    pub async fn refresh(&mut self, user_id: i64) -> Result<(), GatewayError> {
        let tasks = self.gateway.tasks_for_user(user_id).await.map_err(log_failure)?;
        self.tasks = tasks;
        self.loaded = true;
        Ok(())
    }

    pub async fn create(&mut self, payload: &TaskWriteRequest) -> Result<i64, GatewayError> {
        let created = self.gateway.create_task(payload).await.map_err(log_failure)?;
        let task_id = created.task_id;
        self.tasks.push(created);
        Ok(task_id)
    }

    pub async fn update(
        &mut self,
        task_id: i64,
        payload: &TaskWriteRequest,
    ) -> Result<(), GatewayError> {
        let updated = self.gateway.update_task(task_id, payload).await.map_err(log_failure)?;
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.task_id == task_id) {
            *slot = updated;
        }
        Ok(())
    }

    pub async fn delete(&mut self, task_id: i64) -> Result<(), GatewayError> {
        self.gateway.delete_task(task_id).await.map_err(log_failure)?;
        self.tasks.retain(|t| t.task_id != task_id);
        Ok(())
    }
}

pub struct ProjectStore<G> {
    gateway: G,
    projects: Vec<ProjectRead>,
    loaded: bool,
}

impl<G: ProjectGateway> ProjectStore<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway, projects: Vec::new(), loaded: false }
    }

    pub fn projects(&self) -> &[ProjectRead] {
        &self.projects
    }

    pub async fn ensure_loaded(&mut self, company_id: i64) -> Result<(), GatewayError> {
        if self.loaded {
            return Ok(());
        }
        self.refresh(company_id).await
    }

    pub async fn refresh(&mut self, company_id: i64) -> Result<(), GatewayError> {
        let projects =
            self.gateway.projects_for_company(company_id).await.map_err(log_failure)?;
        self.projects = projects;
        self.loaded = true;
        Ok(())
    }

    pub async fn create(&mut self, payload: &ProjectWrite) -> Result<i64, GatewayError> {
        let created = self.gateway.create_project(payload).await.map_err(log_failure)?;
        let project_id = created.project_id;
        self.projects.push(created);
        Ok(project_id)
    }

    pub async fn update(
        &mut self,
        project_id: i64,
        payload: &ProjectWrite,
    ) -> Result<(), GatewayError> {
        let updated =
            self.gateway.update_project(project_id, payload).await.map_err(log_failure)?;
        if let Some(slot) = self.projects.iter_mut().find(|p| p.project_id == project_id) {
            *slot = updated;
        }
        Ok(())
    }

    pub async fn delete(&mut self, project_id: i64) -> Result<(), GatewayError> {
        self.gateway.delete_project(project_id).await.map_err(log_failure)?;
        self.projects.retain(|p| p.project_id != project_id);
        Ok(())
    }
}

fn log_failure(err: GatewayError) -> GatewayError {
    error!("gateway call failed, mirror left untouched: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use chrono::Utc;

    use super::*;
    use crate::models::project::ProjectStatus;
    use crate::models::task::{TaskPriority, TaskStatus};

    fn task_read(task_id: i64, title: &str) -> TaskRead {
        TaskRead {
            task_id,
            title: title.to_string(),
            description: None,
            due_date: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            project_id: 1,
            company_id: 1,
            created_by_id: 1,
            created_at: Utc::now(),
            subtask_count: 0,
            assignee_count: 0,
            project_name: Some("Website Redesign".to_string()),
            subtasks: vec![],
            assignees: vec![],
        }
    }

    fn write_request(title: &str) -> TaskWriteRequest {
        TaskWriteRequest {
            title: title.to_string(),
            description: None,
            due_date: None,
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            project_id: 1,
            company_id: 1,
            created_by_id: 1,
            subtasks: vec![],
            assignees: vec![],
        }
    }

    /// Serves canned reads and echoes writes back as read shapes; `fail`
    /// makes every call error without touching the canned data.
    struct MockGateway {
        canned: RefCell<Vec<TaskRead>>,
        next_id: Cell<i64>,
        fetches: Cell<usize>,
        fail: Cell<bool>,
    }

    impl MockGateway {
        fn new(canned: Vec<TaskRead>) -> Self {
            Self {
                canned: RefCell::new(canned),
                next_id: Cell::new(100),
                fetches: Cell::new(0),
                fail: Cell::new(false),
            }
        }

        fn check(&self) -> Result<(), GatewayError> {
            if self.fail.get() {
                Err(GatewayError::Transport("connection reset".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl TaskGateway for MockGateway {
        async fn tasks_for_user(&self, _user_id: i64) -> Result<Vec<TaskRead>, GatewayError> {
            self.check()?;
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.canned.borrow().clone())
        }

        async fn create_task(
            &self,
            payload: &TaskWriteRequest,
        ) -> Result<TaskRead, GatewayError> {
            self.check()?;
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Ok(task_read(id, &payload.title))
        }

        async fn update_task(
            &self,
            task_id: i64,
            payload: &TaskWriteRequest,
        ) -> Result<TaskRead, GatewayError> {
            self.check()?;
            Ok(task_read(task_id, &payload.title))
        }

        async fn delete_task(&self, _task_id: i64) -> Result<(), GatewayError> {
            self.check()
        }
    }

    #[tokio::test]
    async fn ensure_loaded_fetches_only_once() {
        let gateway = MockGateway::new(vec![task_read(1, "Design Homepage")]);
        let mut store = TaskStore::new(gateway);

        store.ensure_loaded(1).await.unwrap();
        store.ensure_loaded(1).await.unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.gateway.fetches.get(), 1);
    }

    #[tokio::test]
    async fn refresh_refetches_from_server() {
        let gateway = MockGateway::new(vec![task_read(1, "Design Homepage")]);
        let mut store = TaskStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        store.gateway.canned.borrow_mut().push(task_read(2, "Setup Environment"));
        store.refresh(1).await.unwrap();

        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.gateway.fetches.get(), 2);
    }

    #[tokio::test]
    async fn create_appends_to_mirror() {
        let gateway = MockGateway::new(vec![]);
        let mut store = TaskStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        let id = store.create(&write_request("Design Homepage")).await.unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].task_id, id);
        assert_eq!(store.tasks()[0].title, "Design Homepage");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_mirror_untouched() {
        let gateway = MockGateway::new(vec![task_read(1, "Design Homepage")]);
        let mut store = TaskStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        store.gateway.fail.set(true);
        assert!(store.create(&write_request("Doomed")).await.is_err());
        assert!(store.delete(1).await.is_err());
        assert!(store.update(1, &write_request("Doomed")).await.is_err());

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].title, "Design Homepage");
    }

    #[tokio::test]
    async fn update_replaces_entry_by_id() {
        let gateway =
            MockGateway::new(vec![task_read(1, "Design Homepage"), task_read(2, "Setup")]);
        let mut store = TaskStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        store.update(1, &write_request("Design Homepage v2")).await.unwrap();

        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.tasks()[0].title, "Design Homepage v2");
        assert_eq!(store.tasks()[1].title, "Setup");
    }

    #[tokio::test]
    async fn delete_filters_entry_out() {
        let gateway =
            MockGateway::new(vec![task_read(1, "Design Homepage"), task_read(2, "Setup")]);
        let mut store = TaskStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        store.delete(1).await.unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].task_id, 2);
    }

    fn project_read(project_id: i64, name: &str) -> ProjectRead {
        ProjectRead {
            project_id,
            company_id: 1,
            name: name.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            status: ProjectStatus::Planned,
            technologies: None,
            document_file_name: None,
            created_at: Utc::now(),
            team_member_count: 0,
            team_members: vec![],
        }
    }

    struct MockProjectGateway {
        canned: RefCell<Vec<ProjectRead>>,
        fail: Cell<bool>,
    }

    impl ProjectGateway for MockProjectGateway {
        async fn projects_for_company(
            &self,
            _company_id: i64,
        ) -> Result<Vec<ProjectRead>, GatewayError> {
            if self.fail.get() {
                return Err(GatewayError::Rejected {
                    status: 500,
                    message: "persistence_failure".to_string(),
                });
            }
            Ok(self.canned.borrow().clone())
        }

        async fn create_project(
            &self,
            payload: &ProjectWrite,
        ) -> Result<ProjectRead, GatewayError> {
            if self.fail.get() {
                return Err(GatewayError::Transport("connection reset".to_string()));
            }
            Ok(project_read(77, &payload.name))
        }

        async fn update_project(
            &self,
            project_id: i64,
            payload: &ProjectWrite,
        ) -> Result<ProjectRead, GatewayError> {
            Ok(project_read(project_id, &payload.name))
        }

        async fn delete_project(&self, _project_id: i64) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn project_store_mirrors_create_update_delete() {
        let gateway = MockProjectGateway {
            canned: RefCell::new(vec![project_read(1, "Website Redesign")]),
            fail: Cell::new(false),
        };
        let mut store = ProjectStore::new(gateway);
        store.ensure_loaded(1).await.unwrap();

        let payload = ProjectWrite { name: "Mobile App".to_string(), ..Default::default() };
        let id = store.create(&payload).await.unwrap();
        assert_eq!(store.projects().len(), 2);

        let renamed = ProjectWrite { name: "Mobile App v2".to_string(), ..Default::default() };
        store.update(id, &renamed).await.unwrap();
        assert_eq!(store.projects()[1].name, "Mobile App v2");

        store.delete(1).await.unwrap();
        assert_eq!(store.projects().len(), 1);
        assert_eq!(store.projects()[0].project_id, id);
    }

    #[tokio::test]
    async fn failed_load_keeps_store_unloaded() {
        let gateway = MockProjectGateway {
            canned: RefCell::new(vec![project_read(1, "Website Redesign")]),
            fail: Cell::new(true),
        };
        let mut store = ProjectStore::new(gateway);

        assert!(store.ensure_loaded(1).await.is_err());
        assert!(store.projects().is_empty());

        // First successful call still counts as the initial load.
        store.gateway.fail.set(false);
        store.ensure_loaded(1).await.unwrap();
        assert_eq!(store.projects().len(), 1);
    }
}
