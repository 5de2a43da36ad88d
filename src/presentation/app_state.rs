// Application state for HTTP handlers
use crate::application::scheduler::UpdateScheduler;
use tokio::sync::Mutex;

pub struct AppState {
    pub scheduler: Mutex<UpdateScheduler>,
}
