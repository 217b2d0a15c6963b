//! Common test utilities for integration tests.
//!
//! Provides in-memory implementations of every collaborator the scheduler
//! drives, so runs and HTTP handlers can be exercised without a database.

// Helpers are shared across test binaries; not every binary uses every one.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use domain::models::{
    AverageBasketRow, DatabaseSettings, ExecutionLogEntry, ExportFormat, LegacyRecurrence,
    NewExecutionLogEntry, NewSchedule, RenderedReport, ReportFilter, ReportOutput, ReportTotals,
    Schedule, ScheduleChanges, Tenant,
};
use domain::services::{
    report_file_name, NotifyError, RenderError, ReportEmail, ReportEngine, ReportError,
    ReportNotifier, ReportRenderer, ScheduleStore, SettingsStore, StoreError, TenantCatalog,
    TenantStores,
};
use report_scheduler_api::app::{create_app, AppState};
use report_scheduler_api::config::Config;
use report_scheduler_api::services::ScheduleExecutionService;

pub const ADMIN_API_KEY: &str = "test-admin-key";
pub const AVERAGE_BASKET: &str = "AverageBasket";

/// A fixed reference instant: Monday 2024-06-03 09:00.
pub fn reference_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

pub fn tenant(code: &str, display_name: &str) -> Tenant {
    Tenant {
        code: code.to_string(),
        display_name: display_name.to_string(),
        db_name: format!("{}_db", code.to_lowercase()),
        server_host: "localhost".to_string(),
        server_port: 5432,
        db_user: "reporting".to_string(),
        db_password_encrypted: String::new(),
        company_code: "ACME".to_string(),
    }
}

// ============================================================================
// Schedule store
// ============================================================================

#[derive(Default)]
struct ScheduleState {
    schedules: Vec<Schedule>,
    logs: Vec<ExecutionLogEntry>,
    next_id: i64,
    next_log_id: i64,
}

/// In-memory schedule store; `unavailable` makes every call fail like a missing table.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    state: Mutex<ScheduleState>,
    unavailable: bool,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable(
                "relation \"report_schedules\" does not exist".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    pub fn logs(&self) -> Vec<ExecutionLogEntry> {
        self.state.lock().unwrap().logs.clone()
    }

    pub fn logs_for(&self, schedule_id: i64) -> Vec<ExecutionLogEntry> {
        self.logs()
            .into_iter()
            .filter(|l| l.schedule_id == schedule_id)
            .collect()
    }

    pub fn schedule(&self, id: i64) -> Option<Schedule> {
        self.state
            .lock()
            .unwrap()
            .schedules
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Inserts a schedule directly, bypassing authoring rules.
    pub fn insert(&self, new: NewSchedule) -> Schedule {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let schedule = Schedule {
            id: state.next_id,
            report_type: new.report_type,
            schedule_name: new.schedule_name,
            created_by: new.created_by,
            created_at: new.created_at,
            is_active: true,
            legacy: new.legacy,
            recurrence_json: new.recurrence_json,
            parameters_json: new.parameters_json,
            export_format: new.export_format,
            recipients: new.recipients,
            email_subject: new.email_subject,
            next_run_at: new.next_run_at,
            last_run_at: None,
            run_count: 0,
        };
        state.schedules.push(schedule.clone());
        schedule
    }

    pub fn set_run_count(&self, id: i64, run_count: i32) {
        let mut state = self.state.lock().unwrap();
        if let Some(s) = state.schedules.iter_mut().find(|s| s.id == id) {
            s.run_count = run_count;
        }
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn create(&self, schedule: &NewSchedule) -> Result<Schedule, StoreError> {
        self.check()?;
        Ok(self.insert(schedule.clone()))
    }

    async fn get(&self, id: i64) -> Result<Option<Schedule>, StoreError> {
        self.check()?;
        Ok(self.schedule(id))
    }

    async fn list_active(&self, report_type: Option<&str>) -> Result<Vec<Schedule>, StoreError> {
        self.check()?;
        let mut active: Vec<Schedule> = self
            .state
            .lock()
            .unwrap()
            .schedules
            .iter()
            .filter(|s| s.is_active)
            .filter(|s| report_type.map_or(true, |t| s.report_type.eq_ignore_ascii_case(t)))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(active)
    }

    async fn update(&self, id: i64, changes: &ScheduleChanges) -> Result<Schedule, StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Schedule {}", id)))?;
        schedule.schedule_name = changes.schedule_name.clone();
        schedule.is_active = changes.is_active;
        schedule.legacy = changes.legacy.clone();
        schedule.recurrence_json = changes.recurrence_json.clone();
        schedule.parameters_json = changes.parameters_json.clone();
        schedule.export_format = changes.export_format;
        schedule.recipients = changes.recipients.clone();
        schedule.email_subject = changes.email_subject.clone();
        schedule.next_run_at = changes.next_run_at;
        if changes.restart_occurrences {
            schedule.run_count = 0;
        }
        Ok(schedule.clone())
    }

    async fn deactivate(&self, id: i64) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Schedule {}", id)))?;
        schedule.is_active = false;
        Ok(())
    }

    async fn count_active_for_report(&self, report_type: &str) -> Result<i64, StoreError> {
        Ok(self.list_active(Some(report_type)).await?.len() as i64)
    }

    async fn list_due(&self, as_of: NaiveDateTime) -> Result<Vec<Schedule>, StoreError> {
        self.check()?;
        let mut due: Vec<Schedule> = self
            .state
            .lock()
            .unwrap()
            .schedules
            .iter()
            .filter(|s| s.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.next_run_at, s.id));
        Ok(due)
    }

    async fn record_execution(
        &self,
        id: i64,
        ran_at: NaiveDateTime,
        next_run_at: Option<NaiveDateTime>,
        deactivate: bool,
    ) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("Schedule {}", id)))?;
        schedule.last_run_at = Some(ran_at);
        schedule.next_run_at = next_run_at;
        schedule.run_count += 1;
        if deactivate {
            schedule.is_active = false;
        }
        Ok(())
    }

    async fn append_log(&self, entry: &NewExecutionLogEntry) -> Result<i64, StoreError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.next_log_id += 1;
        let id = state.next_log_id;
        state.logs.push(ExecutionLogEntry {
            id,
            schedule_id: entry.schedule_id,
            run_at: entry.run_at,
            status: entry.status,
            rows_produced: entry.rows_produced,
            output_bytes: entry.output_bytes,
            error_message: entry.error_message.clone(),
            duration_ms: entry.duration_ms,
        });
        Ok(id)
    }

    async fn list_logs(&self, schedule_id: i64, limit: i64) -> Result<Vec<ExecutionLogEntry>, StoreError> {
        self.check()?;
        let mut logs = self.logs_for(schedule_id);
        logs.sort_by(|a, b| b.run_at.cmp(&a.run_at).then(b.id.cmp(&a.id)));
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }
}

// ============================================================================
// Settings store
// ============================================================================

pub struct InMemorySettingsStore {
    settings: Mutex<DatabaseSettings>,
    failing: bool,
}

impl InMemorySettingsStore {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            settings: Mutex::new(DatabaseSettings::default()),
            failing: true,
        }
    }

    pub fn current(&self) -> DatabaseSettings {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<DatabaseSettings, StoreError> {
        if self.failing {
            return Err(StoreError::Backend("ini_settings read failed".to_string()));
        }
        Ok(self.current())
    }

    async fn save(&self, settings: &DatabaseSettings) -> Result<(), StoreError> {
        if self.failing {
            return Err(StoreError::Backend("ini_settings write failed".to_string()));
        }
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}

// ============================================================================
// Report engine, renderer and notifier
// ============================================================================

/// Returns `rows` identical rows; optionally sleeps first to keep a run busy.
pub struct FakeReportEngine {
    rows: usize,
    delay: Option<Duration>,
    filters: Mutex<Vec<ReportFilter>>,
}

impl FakeReportEngine {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            delay: None,
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn slow(rows: usize, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(rows)
        }
    }

    pub fn filters(&self) -> Vec<ReportFilter> {
        self.filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportEngine for FakeReportEngine {
    async fn generate(&self, report_type: &str, filter: &ReportFilter) -> Result<ReportOutput, ReportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if report_type != AVERAGE_BASKET {
            return Err(ReportError::UnsupportedReportType(report_type.to_string()));
        }
        self.filters.lock().unwrap().push(filter.clone());

        let rows: Vec<AverageBasketRow> = (0..self.rows)
            .map(|i| AverageBasketRow {
                period: format!("2024-05-{:02}", i + 1),
                cy_invoice_count: 10,
                cy_net_sales: 1_000.0,
                ..Default::default()
            })
            .collect();
        let totals = ReportTotals::from_rows(&rows);
        Ok(ReportOutput { rows, totals })
    }
}

/// Renders a placeholder payload; PDF rendering fails when `fail_pdf` is set
/// and panics when `panic_pdf` is set.
#[derive(Default)]
pub struct FakeRenderer {
    pub fail_pdf: bool,
    pub panic_pdf: bool,
}

impl ReportRenderer for FakeRenderer {
    fn render(
        &self,
        format: ExportFormat,
        report_type: &str,
        output: &ReportOutput,
        filter: &ReportFilter,
        _generated_at: NaiveDateTime,
    ) -> Result<RenderedReport, RenderError> {
        if self.panic_pdf && format == ExportFormat::Pdf {
            panic!("renderer bug");
        }
        if self.fail_pdf && format == ExportFormat::Pdf {
            return Err(RenderError::Pdf("font table corrupt".to_string()));
        }
        Ok(RenderedReport {
            bytes: format!("{} rows", output.rows.len()).into_bytes(),
            file_name: report_file_name(report_type, filter, format),
            content_type: format.content_type().to_string(),
        })
    }
}

/// Records every delivered email; addresses in `failing` are rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<ReportEmail>>,
    attempts: Mutex<Vec<String>>,
    failing: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<ReportEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportNotifier for RecordingNotifier {
    async fn send(&self, email: &ReportEmail) -> Result<(), NotifyError> {
        self.attempts.lock().unwrap().push(email.to.clone());
        if self.failing.contains(&email.to) {
            return Err(NotifyError::Failed("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ============================================================================
// Tenant catalog and per-tenant binding
// ============================================================================

#[derive(Default)]
pub struct InMemoryCatalog {
    tenants: Vec<Tenant>,
    unreachable: bool,
}

impl InMemoryCatalog {
    pub fn new(tenants: Vec<Tenant>) -> Self {
        Self {
            tenants,
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            tenants: Vec::new(),
            unreachable: true,
        }
    }
}

#[async_trait]
impl TenantCatalog for InMemoryCatalog {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, StoreError> {
        if self.unreachable {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self.tenants.clone())
    }

    async fn find_tenant(&self, code: &str) -> Result<Option<Tenant>, StoreError> {
        Ok(self
            .list_active_tenants()
            .await?
            .into_iter()
            .find(|t| t.code == code))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.list_active_tenants().await.map(|_| ())
    }
}

/// Collaborators bound to one tenant.
pub struct TenantFixture {
    pub schedules: Arc<InMemoryScheduleStore>,
    pub settings: Arc<InMemorySettingsStore>,
}

impl TenantFixture {
    pub fn new() -> Self {
        Self {
            schedules: Arc::new(InMemoryScheduleStore::new()),
            settings: Arc::new(InMemorySettingsStore::new(DatabaseSettings::default())),
        }
    }

    pub fn with_schedules(mut self, schedules: InMemoryScheduleStore) -> Self {
        self.schedules = Arc::new(schedules);
        self
    }

    pub fn with_settings(mut self, settings: InMemorySettingsStore) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}

impl Default for TenantFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryTenantStores {
    tenants: HashMap<String, TenantFixture>,
    engine: Arc<FakeReportEngine>,
}

impl InMemoryTenantStores {
    pub fn new(engine: Arc<FakeReportEngine>) -> Self {
        Self {
            tenants: HashMap::new(),
            engine,
        }
    }

    pub fn with_tenant(mut self, code: &str, fixture: TenantFixture) -> Self {
        self.tenants.insert(code.to_string(), fixture);
        self
    }

    fn fixture(&self, tenant: &Tenant) -> Result<&TenantFixture, StoreError> {
        self.tenants.get(&tenant.code).ok_or_else(|| {
            StoreError::Unavailable(format!("no database provisioned for {}", tenant.code))
        })
    }
}

impl TenantStores for InMemoryTenantStores {
    fn schedule_store(&self, tenant: &Tenant) -> Result<Arc<dyn ScheduleStore>, StoreError> {
        Ok(self.fixture(tenant)?.schedules.clone())
    }

    fn settings_store(&self, tenant: &Tenant) -> Result<Arc<dyn SettingsStore>, StoreError> {
        Ok(self.fixture(tenant)?.settings.clone())
    }

    fn report_engine(&self, tenant: &Tenant) -> Result<Arc<dyn ReportEngine>, StoreError> {
        self.fixture(tenant)?;
        Ok(self.engine.clone())
    }
}

// ============================================================================
// Schedule fixtures
// ============================================================================

/// A daily 08:00 schedule that became due one hour before `now`.
pub fn due_schedule(name: &str, format: ExportFormat, recipients: &str, now: NaiveDateTime) -> NewSchedule {
    NewSchedule {
        report_type: AVERAGE_BASKET.to_string(),
        schedule_name: name.to_string(),
        created_by: "tests".to_string(),
        created_at: now - ChronoDuration::days(7),
        legacy: LegacyRecurrence {
            recurrence_type: "Daily".to_string(),
            recurrence_day: None,
            schedule_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        },
        recurrence_json: None,
        parameters_json: Some(r#"{"breakdown":"Daily","reportDateRange":{"type":"LastMonth"}}"#.to_string()),
        export_format: format,
        recipients: recipients.to_string(),
        email_subject: None,
        next_run_at: Some(now - ChronoDuration::hours(1)),
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

/// Test configuration whose admin key hash matches [`ADMIN_API_KEY`].
pub fn test_config() -> Config {
    let hash = shared::crypto::sha256_hex(ADMIN_API_KEY);
    Config::load_for_test(&[("security.admin_api_key_hash", hash.as_str())])
        .expect("Failed to load test config")
}

pub fn create_test_app(
    catalog: Arc<InMemoryCatalog>,
    stores: Arc<InMemoryTenantStores>,
    notifier: Arc<RecordingNotifier>,
) -> Router {
    let config = test_config();
    let executor = Arc::new(ScheduleExecutionService::new(
        catalog.clone(),
        stores.clone(),
        Arc::new(FakeRenderer::default()),
        notifier,
        config.scheduler.tenant_concurrency,
    ));
    create_app(AppState {
        config: Arc::new(config),
        catalog,
        stores,
        executor,
        shutdown: CancellationToken::new(),
    })
}

/// Build a JSON request with API key authentication.
pub fn json_request_with_api_key(
    method: axum::http::Method,
    uri: &str,
    body: serde_json::Value,
    api_key: &str,
) -> axum::http::Request<axum::body::Body> {
    use axum::{body::Body, http::{header, Request}};

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", api_key)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a bodiless request with API key authentication.
pub fn request_with_api_key(
    method: axum::http::Method,
    uri: &str,
    api_key: &str,
) -> axum::http::Request<axum::body::Body> {
    use axum::{body::Body, http::Request};

    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-API-Key", api_key)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}
