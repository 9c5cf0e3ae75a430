use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use famquest_core::goals::{GoalService, GoalServiceTrait};
use famquest_core::notifications::{NotificationDispatcherTrait, NotificationRepositoryTrait};
use famquest_core::profiles::ChildProfileRepositoryTrait;
use famquest_core::progress::{ProgressService, ProgressServiceTrait};
use famquest_core::resets::ResetService;
use famquest_core::timers::TaskTimerService;
use famquest_storage_sqlite::goals::GoalRepository;
use famquest_storage_sqlite::notifications::NotificationRepository;
use famquest_storage_sqlite::profiles::ChildProfileRepository;
use famquest_storage_sqlite::progress::ProgressRepository;
use famquest_storage_sqlite::{db, spawn_writer};

use crate::config::Config;
use crate::notifications::PushDispatcher;

pub struct AppState {
    pub goal_service: Arc<dyn GoalServiceTrait + Send + Sync>,
    pub progress_service: Arc<dyn ProgressServiceTrait + Send + Sync>,
    pub reset_service: Arc<ResetService>,
    pub timers: Arc<TaskTimerService>,
    pub profile_repository: Arc<dyn ChildProfileRepositoryTrait + Send + Sync>,
    pub notification_repository: Arc<dyn NotificationRepositoryTrait + Send + Sync>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("FQ_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.data_dir)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let profile_repository = Arc::new(ChildProfileRepository::new(pool.clone(), writer.clone()));
    let goal_repository = Arc::new(GoalRepository::new(pool.clone(), writer.clone()));
    let progress_repository = Arc::new(ProgressRepository::new(pool.clone(), writer.clone()));
    let notification_repository =
        Arc::new(NotificationRepository::new(pool.clone(), writer.clone()));

    let dispatcher: Arc<dyn NotificationDispatcherTrait> = Arc::new(PushDispatcher::new(
        notification_repository.clone(),
        config.push_endpoint.clone(),
    ));
    if config.push_endpoint.is_some() {
        tracing::info!("Push delivery enabled");
    } else {
        tracing::info!("No push endpoint configured, notifications are stored only");
    }

    let timers = TaskTimerService::new();

    let goal_service = Arc::new(GoalService::new(
        goal_repository.clone(),
        profile_repository.clone(),
        dispatcher.clone(),
    ));
    let progress_service = Arc::new(ProgressService::new(
        progress_repository,
        dispatcher.clone(),
        timers.clone(),
    ));
    let reset_service = Arc::new(ResetService::new(goal_repository, dispatcher));

    Ok(Arc::new(AppState {
        goal_service,
        progress_service,
        reset_service,
        timers,
        profile_repository,
        notification_repository,
        db_path,
    }))
}
