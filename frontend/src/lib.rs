use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use todo_shared::{board::normalize_input, AuthStatus, Task, TaskBoard};
use uuid::Uuid;
use web_sys::{console, window};

mod api;

use api::FetchError;

const TOGGLE_FAILED: &str = "Could not save the change";

#[derive(Debug, Clone)]
pub enum Msg {
    StatusLoaded(AuthStatus),
    LoadTasks,
    TasksLoaded(Vec<Task>),
    SetNewTaskText(String),
    AddTask,
    TaskAdded(Task),
    ToggleTask(Uuid),
    TaskUpdated(Task),
    /// The server refused the toggle; carries the value it tried to set.
    RevertToggle(Uuid, bool),
    DeleteTask(Uuid),
    TaskDeleted(Uuid),
    ClearCompleted,
    CompletedCleared(Vec<Uuid>),
    ClearAll,
    AllCleared,
    ClearAllFailed(String),
    /// Local state may have drifted from the server; reload it.
    Resync(String),
    Unauthorized,
    Error(String),
}

impl From<FetchError> for Msg {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Unauthorized => Msg::Unauthorized,
            other => Msg::Error(other.describe()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    board: TaskBoard,
    new_task_text: String,
    user: Option<String>,
    loading: bool,
    error: Option<String>,
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        Cmd::batch(vec![
            Cmd::new(async {
                match api::fetch_status().await {
                    Ok(status) => Msg::StatusLoaded(status),
                    Err(e) => e.into(),
                }
            }),
            Cmd::new(async { Msg::LoadTasks }),
        ])
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::StatusLoaded(status) => {
                self.user = status.display_name().map(str::to_string);
                Cmd::none()
            }
            Msg::LoadTasks => {
                self.loading = true;
                Cmd::new(async {
                    match api::fetch_tasks().await {
                        Ok(tasks) => Msg::TasksLoaded(tasks),
                        Err(e) => e.into(),
                    }
                })
            }
            Msg::TasksLoaded(tasks) => {
                console::log_1(&format!("[todo] {} tasks loaded", tasks.len()).into());
                self.board.replace(tasks);
                self.loading = false;
                self.error = None;
                Cmd::none()
            }
            Msg::SetNewTaskText(text) => {
                self.new_task_text = text;
                Cmd::none()
            }
            Msg::AddTask => {
                let Some(text) = normalize_input(&self.new_task_text) else {
                    return Cmd::none();
                };
                Cmd::new(async move {
                    match api::create_task(text).await {
                        Ok(task) => Msg::TaskAdded(task),
                        Err(e) => e.into(),
                    }
                })
            }
            Msg::TaskAdded(task) => {
                self.board.push(task);
                self.new_task_text.clear();
                self.error = None;
                Cmd::none()
            }
            Msg::ToggleTask(id) => {
                let Some(completed) = self.board.toggle(id) else {
                    return Cmd::none();
                };
                Cmd::new(async move {
                    match api::set_completed(id, completed).await {
                        Ok(task) => Msg::TaskUpdated(task),
                        Err(FetchError::Unauthorized) => Msg::Unauthorized,
                        Err(e) => {
                            console::log_1(&format!("[todo] toggle failed: {}", e.describe()).into());
                            Msg::RevertToggle(id, completed)
                        }
                    }
                })
            }
            Msg::TaskUpdated(task) => {
                self.board.apply(task);
                self.error = None;
                Cmd::none()
            }
            Msg::RevertToggle(id, attempted) => {
                if self.board.revert_toggle(id, attempted) {
                    self.error = Some(TOGGLE_FAILED.to_string());
                }
                Cmd::none()
            }
            Msg::DeleteTask(id) => Cmd::new(async move {
                match api::delete_task(id).await {
                    Ok(()) => Msg::TaskDeleted(id),
                    Err(e) => e.into(),
                }
            }),
            Msg::TaskDeleted(id) => {
                self.board.remove(id);
                self.error = None;
                Cmd::none()
            }
            Msg::ClearCompleted => {
                let ids = self.board.completed_ids();
                if ids.is_empty() {
                    return Cmd::none();
                }
                Cmd::new(async move {
                    for id in &ids {
                        match api::delete_task(*id).await {
                            Ok(()) => {}
                            Err(FetchError::Unauthorized) => return Msg::Unauthorized,
                            Err(e) => return Msg::Resync(e.describe()),
                        }
                    }
                    Msg::CompletedCleared(ids)
                })
            }
            Msg::CompletedCleared(ids) => {
                for id in ids {
                    self.board.remove(id);
                }
                self.error = None;
                Cmd::none()
            }
            Msg::ClearAll => {
                let confirmed = window()
                    .and_then(|w| {
                        w.confirm_with_message("Are you sure you want to delete ALL tasks?")
                            .ok()
                    })
                    .unwrap_or(false);
                if !confirmed {
                    return Cmd::none();
                }
                Cmd::new(async {
                    match api::delete_all().await {
                        Ok(()) => Msg::AllCleared,
                        Err(FetchError::Unauthorized) => Msg::Unauthorized,
                        Err(e) => Msg::ClearAllFailed(e.describe()),
                    }
                })
            }
            Msg::AllCleared => {
                self.board.clear();
                self.error = None;
                Cmd::none()
            }
            Msg::ClearAllFailed(reason) => {
                console::log_1(&format!("[todo] clear all failed: {}", reason).into());
                if let Some(w) = window() {
                    let _ = w.alert_with_message("Failed to clear all tasks.");
                }
                Cmd::none()
            }
            Msg::Resync(reason) => {
                self.error = Some(reason);
                Cmd::new(async { Msg::LoadTasks })
            }
            Msg::Unauthorized => {
                api::redirect_to_login();
                Cmd::none()
            }
            Msg::Error(error) => {
                console::log_1(&format!("Error: {}", error).into());
                self.loading = false;
                self.error = Some(error);
                Cmd::none()
            }
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [
                self.view_header(),
                div(
                    [class("max-w-2xl mx-auto px-6 py-8 space-y-6")],
                    [
                        self.view_create_form(),
                        self.view_error(),
                        if self.loading {
                            div([class("text-center py-10 text-ctp-subtext0 italic")], [text("Loading...")])
                        } else {
                            self.view_task_list()
                        },
                        self.view_footer(),
                    ],
                ),
            ],
        )
    }
}

impl Model {
    fn view_header(&self) -> Node<Msg> {
        header([class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")], [
            div([class("max-w-2xl mx-auto px-6 py-4 flex items-center justify-between")], [
                h1([class("text-2xl font-bold text-ctp-text")], [text("To-Do List")]),
                match &self.user {
                    Some(name) => div([class("flex items-center space-x-4 text-sm")], [
                        span([class("text-ctp-subtext1")], [text(name)]),
                        a([href("/auth/logout"), class("text-ctp-blue hover:text-ctp-sapphire")], [text("Log out")]),
                    ]),
                    None => span([], []),
                },
            ]),
        ])
    }

    fn view_create_form(&self) -> Node<Msg> {
        div([id("task-form"), class("flex gap-2")], [
            input([
                id("task-input"),
                r#type("text"),
                placeholder("What needs doing?"),
                value(&self.new_task_text),
                on_input(|event| Msg::SetNewTaskText(event.value())),
                class("flex-1 px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md text-ctp-text placeholder-ctp-subtext0 focus:outline-none focus:ring-2 focus:ring-ctp-blue"),
            ], []),
            button([
                on_click(|_| Msg::AddTask),
                class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md transition-colors duration-200"),
            ], [text("Add")]),
        ])
    }

    fn view_error(&self) -> Node<Msg> {
        match &self.error {
            Some(error) => p([class("text-sm text-ctp-red")], [text(error)]),
            None => span([], []),
        }
    }

    fn view_task_list(&self) -> Node<Msg> {
        ul(
            [id("task-list"), class("space-y-2")],
            self.board.tasks().iter().map(|task| self.view_task(task)).collect::<Vec<_>>(),
        )
    }

    fn view_task(&self, task: &Task) -> Node<Msg> {
        let task_id = task.id;
        li(
            [
                key(task.id.to_string()),
                class(&format!(
                    "flex items-center gap-3 rounded-lg border p-3 {}",
                    if task.completed {
                        "completed border-ctp-green bg-ctp-green/10"
                    } else {
                        "border-ctp-surface1 bg-ctp-surface0"
                    }
                )),
            ],
            [
                input([
                    r#type("checkbox"),
                    checked(task.completed),
                    on_click(move |_| Msg::ToggleTask(task_id)),
                ], []),
                span([class(&format!(
                    "task-text flex-1 {}",
                    if task.completed { "line-through text-ctp-overlay1" } else { "text-ctp-text" }
                ))], [text(&task.text)]),
                button([
                    class("delete-btn text-ctp-red hover:text-ctp-maroon"),
                    r#type("button"),
                    on_click(move |_| Msg::DeleteTask(task_id)),
                ], [text("❌")]),
            ],
        )
    }

    fn view_footer(&self) -> Node<Msg> {
        div([class("flex items-center justify-between text-sm")], [
            p([id("task-count"), class("text-ctp-subtext0")], [text(&self.board.summary())]),
            div([class("flex gap-2")], [
                button([
                    id("clear-completed"),
                    on_click(|_| Msg::ClearCompleted),
                    disabled(self.board.counts().completed == 0),
                    class("bg-ctp-surface1 hover:bg-ctp-surface2 px-3 py-1 rounded-full"),
                ], [text("Clear completed")]),
                button([
                    id("clear-all"),
                    on_click(|_| Msg::ClearAll),
                    disabled(self.board.is_empty()),
                    class("bg-ctp-red/20 text-ctp-red hover:bg-ctp-red/30 px-3 py-1 rounded-full"),
                ], [text("Clear all")]),
            ]),
        ])
    }
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}
