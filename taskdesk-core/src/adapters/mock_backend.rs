//! Mock task backend for testing
//!
//! An in-process HTTP server that implements the part of the task backend
//! API this client consumes, so the session and task services can be
//! exercised end to end without a real server:
//! - POST /api/v1/auth/login (form body) returns { access_token, token_type }
//! - GET /api/v1/users/me and GET /api/v1/users
//! - GET/POST /api/v1/tasks and GET/PUT/DELETE /api/v1/tasks/{id}
//!
//! Role rules follow the real backend: admins see everything, managers see
//! the tasks they created, members see the tasks assigned to them and may
//! only change status. Every request is recorded for later assertions.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

/// Path prefix of every API route
pub const API_PREFIX: &str = "/api/v1";

pub const ADMIN_ID: i64 = 1;
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub const MANAGER_ID: i64 = 2;
pub const MANAGER_EMAIL: &str = "manager@example.com";
pub const MANAGER_PASSWORD: &str = "manager-password";

pub const MEMBER_ID: i64 = 3;
pub const MEMBER_EMAIL: &str = "member@example.com";
pub const MEMBER_PASSWORD: &str = "member-password";

/// Failure injection for the mock server
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Answer every `/tasks` request with this status
    pub fail_tasks: Option<u16>,
    /// Answer every `GET /users` request with this status
    pub fail_users: Option<u16>,
    /// Reject every bearer token with 401
    pub reject_tokens: bool,
}

/// A request as received by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Header names are lowercased
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn authorization(&self) -> Option<&str> {
        self.header("authorization")
    }

    pub fn json_body(&self) -> Option<JsonValue> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug, Clone)]
struct MockUser {
    id: i64,
    email: &'static str,
    full_name: &'static str,
    role: &'static str,
    password: &'static str,
}

impl MockUser {
    fn token(&self) -> String {
        format!("mock-token-{}", self.id)
    }

    fn to_json(&self) -> JsonValue {
        json!({
            "id": self.id,
            "email": self.email,
            "full_name": self.full_name,
            "role": self.role,
            "created_at": "2024-01-01T09:00:00",
            "updated_at": "2024-01-01T09:00:00",
        })
    }

    fn can_manage(&self) -> bool {
        self.role == "admin" || self.role == "manager"
    }
}

#[derive(Debug, Clone)]
struct MockTask {
    id: i64,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    assigned_to: Option<i64>,
    created_by: Option<i64>,
}

type Reply = (u16, Option<JsonValue>);

struct BackendState {
    config: MockConfig,
    users: Vec<MockUser>,
    tasks: Vec<MockTask>,
    next_task_id: i64,
    requests: Vec<RecordedRequest>,
}

impl BackendState {
    fn new(config: MockConfig) -> Self {
        Self {
            config,
            users: vec![
                MockUser {
                    id: ADMIN_ID,
                    email: ADMIN_EMAIL,
                    full_name: "Ada Admin",
                    role: "admin",
                    password: ADMIN_PASSWORD,
                },
                MockUser {
                    id: MANAGER_ID,
                    email: MANAGER_EMAIL,
                    full_name: "Max Manager",
                    role: "manager",
                    password: MANAGER_PASSWORD,
                },
                MockUser {
                    id: MEMBER_ID,
                    email: MEMBER_EMAIL,
                    full_name: "Mia Member",
                    role: "user",
                    password: MEMBER_PASSWORD,
                },
            ],
            tasks: Vec::new(),
            next_task_id: 1,
            requests: Vec::new(),
        }
    }

    fn user(&self, id: i64) -> Option<&MockUser> {
        self.users.iter().find(|u| u.id == id)
    }

    fn task_json(&self, task: &MockTask) -> JsonValue {
        json!({
            "id": task.id,
            "title": task.title,
            "description": task.description,
            "status": task.status,
            "priority": task.priority,
            "assigned_to": task.assigned_to,
            "created_by": task.created_by,
            "due_date": null,
            "created_at": "2024-01-02T10:00:00+00:00",
            "updated_at": "2024-01-02T10:00:00+00:00",
            "assignee": task.assigned_to.and_then(|id| self.user(id)).map(MockUser::to_json),
            "creator": task.created_by.and_then(|id| self.user(id)).map(MockUser::to_json),
        })
    }

    fn authenticate(&self, request: &RecordedRequest) -> Result<MockUser, Reply> {
        let unauthorized = || (401, detail("Could not validate credentials"));

        if self.config.reject_tokens {
            return Err(unauthorized());
        }

        let token = request
            .authorization()
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(unauthorized)?;

        self.users
            .iter()
            .find(|u| u.token() == token)
            .cloned()
            .ok_or_else(unauthorized)
    }
}

/// Mock task backend server
pub struct MockBackend {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<BackendState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockBackend {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(BackendState::new(config)));

        // Non-blocking so the accept loop notices shutdown
        listener.set_nonblocking(true)?;

        let running_clone = Arc::clone(&running);
        let state_clone = Arc::clone(&state);
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = Arc::clone(&state_clone);
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// API root, e.g. `http://127.0.0.1:41234/api/v1`
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, API_PREFIX)
    }

    /// Bearer token the server issues for a seeded account
    pub fn token_for(&self, email: &str) -> Option<String> {
        self.lock()
            .users
            .iter()
            .find(|u| u.email == email)
            .map(MockUser::token)
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    /// Replace the failure injection settings
    pub fn set_config(&self, config: MockConfig) {
        self.lock().config = config;
    }

    /// Insert a task directly, bypassing role checks
    pub fn seed_task(&self, id: i64, title: &str, assigned_to: Option<i64>, created_by: i64) {
        let mut state = self.lock();
        state.tasks.push(MockTask {
            id,
            title: title.to_string(),
            description: Some(format!("{} description", title)),
            status: "pending".to_string(),
            priority: "medium".to_string(),
            assigned_to,
            created_by: Some(created_by),
        });
        state.next_task_id = state.next_task_id.max(id + 1);
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, state: &Arc<Mutex<BackendState>>) {
    // Accepted sockets inherit non-blocking mode on some platforms
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, detail("Invalid request"));
        return;
    };

    let (status, body) = {
        let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.requests.push(request.clone());
        route(&mut state, &request)
    };

    send_response(&mut stream, status, body);
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target, None),
    };

    Some(RecordedRequest {
        method,
        path,
        query,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn route(state: &mut BackendState, request: &RecordedRequest) -> Reply {
    let Some(route) = request.path.strip_prefix(API_PREFIX) else {
        return (404, detail("Not Found"));
    };
    let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["auth", "login"]) => login(state, request),
        ("GET", ["users", "me"]) => match state.authenticate(request) {
            Ok(user) => (200, Some(user.to_json())),
            Err(reply) => reply,
        },
        ("GET", ["users"]) => list_users(state, request),
        ("GET", ["tasks"]) => list_tasks(state, request),
        ("POST", ["tasks"]) => create_task(state, request),
        (method, ["tasks", id]) => {
            let Ok(id) = id.parse::<i64>() else {
                return validation_error("path", "task_id", "value is not a valid integer");
            };
            match method {
                "GET" => get_task(state, request, id),
                "PUT" => update_task(state, request, id),
                "DELETE" => delete_task(state, request, id),
                _ => (405, detail("Method Not Allowed")),
            }
        }
        _ => (404, detail("Not Found")),
    }
}

fn login(state: &BackendState, request: &RecordedRequest) -> Reply {
    let mut username = None;
    let mut password = None;
    for (key, value) in url::form_urlencoded::parse(request.body.as_bytes()) {
        match key.as_ref() {
            "username" => username = Some(value.into_owned()),
            "password" => password = Some(value.into_owned()),
            _ => {}
        }
    }

    let (Some(username), Some(password)) = (username, password) else {
        return validation_error("body", "username", "field required");
    };

    match state
        .users
        .iter()
        .find(|u| u.email == username && u.password == password)
    {
        Some(user) => (
            200,
            Some(json!({"access_token": user.token(), "token_type": "bearer"})),
        ),
        None => (401, detail("Incorrect credentials")),
    }
}

fn list_users(state: &BackendState, request: &RecordedRequest) -> Reply {
    if let Some(status) = state.config.fail_users {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    if user.role != "admin" {
        return (403, detail("Not enough permissions"));
    }
    let users: Vec<JsonValue> = state.users.iter().map(MockUser::to_json).collect();
    (200, Some(JsonValue::Array(users)))
}

fn list_tasks(state: &BackendState, request: &RecordedRequest) -> Reply {
    if let Some(status) = state.config.fail_tasks {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };

    let mut status_filter = None;
    let mut assigned_filter = None;
    let mut skip = 0usize;
    let mut limit = 10usize;
    if let Some(query) = &request.query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "status" => status_filter = Some(value.into_owned()),
                "assigned_to" => assigned_filter = value.parse::<i64>().ok(),
                "skip" => skip = value.parse().unwrap_or(0),
                "limit" => limit = value.parse().unwrap_or(10).clamp(1, 100),
                _ => {}
            }
        }
    }

    let visible: Vec<&MockTask> = state
        .tasks
        .iter()
        .filter(|t| match user.role {
            "admin" => true,
            "manager" => t.created_by == Some(user.id),
            _ => t.assigned_to == Some(user.id),
        })
        .filter(|t| status_filter.as_deref().map_or(true, |s| t.status == s))
        .filter(|t| assigned_filter.map_or(true, |a| t.assigned_to == Some(a)))
        .collect();

    let tasks: Vec<JsonValue> = visible
        .iter()
        .skip(skip)
        .take(limit)
        .map(|t| state.task_json(t))
        .collect();

    (
        200,
        Some(json!({
            "tasks": tasks,
            "total": visible.len(),
            "page": skip / limit + 1,
            "size": limit,
        })),
    )
}

fn get_task(state: &BackendState, request: &RecordedRequest, id: i64) -> Reply {
    if let Some(status) = state.config.fail_tasks {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    let Some(task) = state.tasks.iter().find(|t| t.id == id) else {
        return (404, detail("Task not found"));
    };
    if !can_see(&user, task) {
        return (403, detail("Not enough permissions"));
    }
    (200, Some(state.task_json(task)))
}

fn create_task(state: &mut BackendState, request: &RecordedRequest) -> Reply {
    if let Some(status) = state.config.fail_tasks {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    if !user.can_manage() {
        return (403, detail("Not enough permissions"));
    }

    let Some(body) = request.json_body().filter(JsonValue::is_object) else {
        return validation_error("body", "body", "value is not a valid dict");
    };

    let Some(title) = body.get("title").and_then(JsonValue::as_str) else {
        return validation_error("body", "title", "field required");
    };

    let priority = match body.get("priority") {
        None | Some(JsonValue::Null) => "medium".to_string(),
        Some(value) => match value.as_str().filter(|p| is_priority(p)) {
            Some(p) => p.to_string(),
            None => return validation_error("body", "priority", "invalid priority"),
        },
    };

    let assigned_to = match parse_assignee(state, body.get("assigned_to")) {
        Ok(assigned_to) => assigned_to,
        Err(reply) => return reply,
    };

    let task = MockTask {
        id: state.next_task_id,
        title: title.to_string(),
        description: body
            .get("description")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        status: "pending".to_string(),
        priority,
        assigned_to,
        created_by: Some(user.id),
    };
    state.next_task_id += 1;

    let reply = state.task_json(&task);
    state.tasks.push(task);
    (200, Some(reply))
}

fn update_task(state: &mut BackendState, request: &RecordedRequest, id: i64) -> Reply {
    if let Some(status) = state.config.fail_tasks {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    let Some(body) = request.json_body().filter(JsonValue::is_object) else {
        return validation_error("body", "body", "value is not a valid dict");
    };
    let Some(index) = state.tasks.iter().position(|t| t.id == id) else {
        return (404, detail("Task not found"));
    };

    let task = &state.tasks[index];
    match user.role {
        "admin" => {}
        "manager" => {
            if task.created_by != Some(user.id) && task.assigned_to != Some(user.id) {
                return (403, detail("Not enough permissions"));
            }
        }
        _ => {
            if task.assigned_to != Some(user.id) {
                return (403, detail("Not enough permissions"));
            }
            let touches_other_fields = ["title", "description", "priority", "assigned_to"]
                .iter()
                .any(|field| is_truthy(body.get(*field)));
            if touches_other_fields {
                return (403, detail("Users can only update task status"));
            }
        }
    }

    let mut updated = task.clone();

    if let Some(value) = body.get("title") {
        match value.as_str() {
            Some(title) => updated.title = title.to_string(),
            None => return validation_error("body", "title", "str type expected"),
        }
    }
    if let Some(value) = body.get("description") {
        updated.description = value.as_str().map(str::to_string);
    }
    if let Some(value) = body.get("status") {
        match value.as_str().filter(|s| is_status(s)) {
            Some(status) => updated.status = status.to_string(),
            None => return validation_error("body", "status", "invalid status"),
        }
    }
    if let Some(value) = body.get("priority") {
        match value.as_str().filter(|p| is_priority(p)) {
            Some(priority) => updated.priority = priority.to_string(),
            None => return validation_error("body", "priority", "invalid priority"),
        }
    }
    if body.get("assigned_to").is_some() {
        match parse_assignee(state, body.get("assigned_to")) {
            Ok(assigned_to) => updated.assigned_to = assigned_to,
            Err(reply) => return reply,
        }
    }

    let reply = state.task_json(&updated);
    state.tasks[index] = updated;
    (200, Some(reply))
}

fn delete_task(state: &mut BackendState, request: &RecordedRequest, id: i64) -> Reply {
    if let Some(status) = state.config.fail_tasks {
        return (status, detail("Internal Server Error"));
    }
    let user = match state.authenticate(request) {
        Ok(user) => user,
        Err(reply) => return reply,
    };
    if !user.can_manage() {
        return (403, detail("Not enough permissions"));
    }
    let Some(index) = state.tasks.iter().position(|t| t.id == id) else {
        return (404, detail("Task not found"));
    };
    if user.role == "manager" && state.tasks[index].created_by != Some(user.id) {
        return (403, detail("Not enough permissions"));
    }
    state.tasks.remove(index);
    (204, None)
}

fn can_see(user: &MockUser, task: &MockTask) -> bool {
    match user.role {
        "admin" => true,
        "manager" => task.created_by == Some(user.id) || task.assigned_to == Some(user.id),
        _ => task.assigned_to == Some(user.id),
    }
}

fn parse_assignee(state: &BackendState, value: Option<&JsonValue>) -> Result<Option<i64>, Reply> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => {
            let Some(id) = value.as_i64() else {
                return Err(validation_error("body", "assigned_to", "value is not a valid integer"));
            };
            if state.user(id).is_none() {
                return Err((404, detail("Assigned user not found")));
            }
            Ok(Some(id))
        }
    }
}

fn is_truthy(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::String(s)) => !s.is_empty(),
        Some(JsonValue::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
        Some(JsonValue::Bool(b)) => *b,
        Some(_) => true,
    }
}

fn is_status(value: &str) -> bool {
    matches!(value, "pending" | "in_progress" | "completed")
}

fn is_priority(value: &str) -> bool {
    matches!(value, "low" | "medium" | "high")
}

fn detail(message: &str) -> Option<JsonValue> {
    Some(json!({ "detail": message }))
}

fn validation_error(location: &str, field: &str, message: &str) -> Reply {
    (
        422,
        Some(json!({
            "detail": [{"loc": [location, field], "msg": message, "type": "value_error"}]
        })),
    )
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: Option<JsonValue>) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        reason_phrase(status),
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
