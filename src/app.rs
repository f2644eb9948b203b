use crate::filter::{
    ActiveFilterSet, FilterCategory, FilterDefinition, FilterValue, apply_filters, build_filters,
};
use crate::input::Action;
use crate::model::{ConfigDump, ConfigTab, FetchKey, PodEntry, ZtunnelService, ZtunnelWorkload};
use crate::session::{SessionStore, TAB_KEY};
use chrono::{DateTime, Local};
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    PodPicker,
    FilterPicker,
}

/// Where the coordinator stands relative to the backend. A failed fetch
/// returns to `Idle` with an alert recorded, so any later selection change
/// can retry.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FetchPhase {
    Idle,
    FetchPending,
    Fetching,
    NoPods,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    RefreshPods,
    FetchConfig { key: FetchKey },
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub message: String,
    pub detail: String,
    pub raised_at: DateTime<Local>,
}

/// One row of the filter picker: a value within its category, with its
/// current selection state.
#[derive(Debug, Clone)]
pub struct FilterEntry {
    pub category: FilterCategory,
    pub value: FilterValue,
    pub selected: bool,
}

const MAX_ALERTS: usize = 20;

pub struct App {
    running: bool,
    mode: InputMode,
    tabs: Vec<ConfigTab>,
    active_tab_index: usize,
    pods: Vec<PodEntry>,
    selected_pod: Option<String>,
    phase: FetchPhase,
    last_fetched: Option<FetchKey>,
    dump: Option<ConfigDump>,
    fetched_at: Option<DateTime<Local>>,
    filters: Vec<FilterDefinition>,
    active_filters: ActiveFilterSet,
    session: SessionStore,
    alerts: Vec<Alert>,
    status: String,
    show_help: bool,
    picker_index: usize,
    filter_cursor: usize,
    cluster: String,
    context: String,
    user: String,
    namespace: String,
    workload: String,
}

impl App {
    pub fn new(
        cluster: String,
        context: String,
        namespace: String,
        workload: String,
        session: SessionStore,
    ) -> Self {
        let tabs = ConfigTab::ALL.to_vec();
        let restored_tab = session
            .get(TAB_KEY)
            .and_then(ConfigTab::from_token)
            .unwrap_or(ConfigTab::Services);
        let active_tab_index = tabs
            .iter()
            .position(|tab| *tab == restored_tab)
            .unwrap_or(0);

        Self {
            running: true,
            mode: InputMode::Normal,
            tabs,
            active_tab_index,
            pods: Vec::new(),
            selected_pod: None,
            phase: FetchPhase::NoPods,
            last_fetched: None,
            dump: None,
            fetched_at: None,
            filters: Vec::new(),
            active_filters: ActiveFilterSet::default(),
            session,
            alerts: Vec::new(),
            status: "Discovering ztunnel pods…".to_string(),
            show_help: false,
            picker_index: 0,
            filter_cursor: 0,
            cluster,
            context,
            user: "-".to_string(),
            namespace,
            workload,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn tabs(&self) -> &[ConfigTab] {
        &self.tabs
    }

    pub fn active_tab(&self) -> ConfigTab {
        self.tabs[self.active_tab_index]
    }

    pub fn active_tab_index(&self) -> usize {
        self.active_tab_index
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn pods(&self) -> &[PodEntry] {
        &self.pods
    }

    pub fn selected_pod(&self) -> Option<&str> {
        self.selected_pod.as_deref()
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn set_user(&mut self, user: String) {
        self.user = user;
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn picker_index(&self) -> usize {
        self.picker_index
    }

    pub fn filter_cursor(&self) -> usize {
        self.filter_cursor
    }

    pub fn fetched_at(&self) -> Option<DateTime<Local>> {
        self.fetched_at
    }

    pub fn has_config(&self) -> bool {
        self.dump.is_some()
    }

    pub fn active_filters(&self) -> &ActiveFilterSet {
        &self.active_filters
    }

    pub fn last_alert(&self) -> Option<&Alert> {
        self.alerts.last()
    }

    /// Services of the displayed dump after the active filters, original
    /// order preserved.
    pub fn visible_services(&self) -> Vec<ZtunnelService> {
        let Some(dump) = &self.dump else {
            return Vec::new();
        };
        apply_filters(&dump.services, &self.filters, &self.active_filters)
    }

    /// Workloads of the displayed dump after the active filters.
    pub fn visible_workloads(&self) -> Vec<ZtunnelWorkload> {
        let Some(dump) = &self.dump else {
            return Vec::new();
        };
        apply_filters(&dump.workloads, &self.filters, &self.active_filters)
    }

    pub fn filter_entries(&self) -> Vec<FilterEntry> {
        let mut entries = Vec::new();
        for definition in &self.filters {
            for value in &definition.filter_values {
                entries.push(FilterEntry {
                    category: definition.category,
                    value: value.clone(),
                    selected: self
                        .active_filters
                        .is_selected(definition.category, &value.id),
                });
            }
        }
        entries
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
        }

        match action {
            Action::Quit => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            Action::NextTab => self.switch_tab_by_offset(1),
            Action::PrevTab => self.switch_tab_by_offset(-1),
            Action::Down => {
                self.move_cursor(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_cursor(-1);
                AppCommand::None
            }
            Action::Refresh => {
                self.status = format!(
                    "Refreshing {} pods in namespace '{}'",
                    self.workload, self.namespace
                );
                AppCommand::RefreshPods
            }
            Action::OpenPodPicker => {
                if self.pods.is_empty() {
                    self.status = format!("No {} pods to select", self.workload);
                    return AppCommand::None;
                }
                self.picker_index = self
                    .selected_pod
                    .as_deref()
                    .and_then(|selected| self.pods.iter().position(|pod| pod.name == selected))
                    .unwrap_or(0);
                self.mode = InputMode::PodPicker;
                self.status = "Select a pod (enter to apply, esc to cancel)".to_string();
                AppCommand::None
            }
            Action::OpenFilterPicker => {
                if self.filter_entries().is_empty() {
                    self.status = "No filter values available yet".to_string();
                    return AppCommand::None;
                }
                self.filter_cursor = 0;
                self.mode = InputMode::FilterPicker;
                self.status =
                    "Toggle filters with space, C clears, esc closes".to_string();
                AppCommand::None
            }
            Action::ToggleSelected => {
                if self.mode == InputMode::FilterPicker {
                    self.toggle_filter_at_cursor();
                }
                AppCommand::None
            }
            Action::ClearFilters => {
                self.active_filters.clear();
                self.status = "Filters cleared".to_string();
                AppCommand::None
            }
            Action::Submit => match self.mode {
                InputMode::PodPicker => {
                    let Some(entry) = self.pods.get(self.picker_index) else {
                        self.mode = InputMode::Normal;
                        return AppCommand::None;
                    };
                    let name = entry.name.clone();
                    self.mode = InputMode::Normal;
                    self.select_pod(&name)
                }
                InputMode::FilterPicker => {
                    self.mode = InputMode::Normal;
                    self.status = filter_summary(&self.active_filters);
                    AppCommand::None
                }
                InputMode::Normal => AppCommand::None,
            },
            Action::CancelOverlay => {
                self.mode = InputMode::Normal;
                AppCommand::None
            }
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
        }
    }

    /// Replaces the known pod list. Keeps the current selection when it is
    /// still present, otherwise falls back to the lexicographically first
    /// pod. An empty list disables fetching entirely.
    pub fn set_pods(&mut self, mut pods: Vec<PodEntry>) -> AppCommand {
        pods.sort_by(|left, right| left.name.cmp(&right.name));
        self.pods = pods;

        if self.pods.is_empty() {
            self.phase = FetchPhase::NoPods;
            self.selected_pod = None;
            self.dump = None;
            self.filters.clear();
            self.status = format!(
                "No {} pods found in namespace '{}'",
                self.workload, self.namespace
            );
            return AppCommand::None;
        }

        let retained = self
            .selected_pod
            .as_deref()
            .is_some_and(|selected| self.pods.iter().any(|pod| pod.name == selected));
        if !retained {
            let first = self.pods[0].name.clone();
            self.status = format!("Selected pod {first}");
            self.selected_pod = Some(first);
            self.dump = None;
            self.filters.clear();
            self.phase = FetchPhase::FetchPending;
        } else if self.phase == FetchPhase::NoPods {
            self.phase = FetchPhase::FetchPending;
        }

        self.maybe_begin_fetch()
    }

    pub fn select_tab(&mut self, tab: ConfigTab) -> AppCommand {
        if tab == self.active_tab() {
            return AppCommand::None;
        }

        if let Some(index) = self.tabs.iter().position(|candidate| *candidate == tab) {
            self.active_tab_index = index;
        }
        self.dump = None;
        self.fetched_at = None;
        self.filters.clear();
        self.session.set(TAB_KEY, tab.token());
        if self.phase != FetchPhase::NoPods {
            self.phase = FetchPhase::FetchPending;
        }
        self.status = format!("Switched to {}", tab.title());
        self.maybe_begin_fetch()
    }

    pub fn select_pod(&mut self, name: &str) -> AppCommand {
        if self.selected_pod.as_deref() == Some(name) {
            return AppCommand::None;
        }

        self.selected_pod = Some(name.to_string());
        self.dump = None;
        self.fetched_at = None;
        self.filters.clear();
        if self.phase != FetchPhase::NoPods {
            self.phase = FetchPhase::FetchPending;
        }
        self.status = format!("Selected pod {name}");
        self.maybe_begin_fetch()
    }

    /// Applies a fetched dump if the selection it was requested for is
    /// still current; late responses for a superseded selection are
    /// discarded.
    pub fn commit_config(&mut self, key: &FetchKey, dump: ConfigDump) {
        if !self.key_matches_selection(key) {
            debug!("discarding stale config dump for pod {}", key.pod);
            return;
        }

        self.filters = match key.tab {
            ConfigTab::Services => build_filters(&dump.services),
            ConfigTab::Workloads => build_filters(&dump.workloads),
        };
        let services = dump.services.len();
        let workloads = dump.workloads.len();
        self.dump = Some(dump);
        self.fetched_at = Some(Local::now());
        self.last_fetched = Some(key.clone());
        self.phase = FetchPhase::Idle;
        self.status = format!(
            "Loaded {services} services / {workloads} workloads from {}",
            key.pod
        );
    }

    pub fn fetch_failed(&mut self, key: &FetchKey, detail: String) {
        self.report_error(
            format!("Could not fetch ztunnel config for {}.", key.pod),
            detail,
        );
        if self.key_matches_selection(key) && self.phase == FetchPhase::Fetching {
            self.phase = FetchPhase::Idle;
        }
    }

    pub fn report_error(&mut self, message: String, detail: String) {
        self.status = message.clone();
        self.alerts.push(Alert {
            message,
            detail,
            raised_at: Local::now(),
        });
        if self.alerts.len() > MAX_ALERTS {
            self.alerts.remove(0);
        }
    }

    fn switch_tab_by_offset(&mut self, offset: isize) -> AppCommand {
        let count = self.tabs.len() as isize;
        let next = (self.active_tab_index as isize + offset).rem_euclid(count) as usize;
        self.select_tab(self.tabs[next])
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.mode {
            InputMode::PodPicker => {
                self.picker_index = step_index(self.picker_index, delta, self.pods.len());
            }
            InputMode::FilterPicker => {
                self.filter_cursor =
                    step_index(self.filter_cursor, delta, self.filter_entries().len());
            }
            InputMode::Normal => {}
        }
    }

    fn toggle_filter_at_cursor(&mut self) {
        let entries = self.filter_entries();
        if let Some(entry) = entries.get(self.filter_cursor) {
            self.active_filters.toggle(entry.category, &entry.value.id);
        }
    }

    /// Decides whether a pending fetch may fire. After the first load a
    /// refetch is admitted only when both the pod and the tab differ from
    /// the last fetched combination; otherwise the coordinator stays
    /// parked in `FetchPending` with the display cleared.
    fn maybe_begin_fetch(&mut self) -> AppCommand {
        if self.phase != FetchPhase::FetchPending {
            return AppCommand::None;
        }
        let Some(pod) = self.selected_pod.clone() else {
            self.phase = FetchPhase::NoPods;
            return AppCommand::None;
        };

        let tab = self.active_tab();
        let admitted = match &self.last_fetched {
            None => true,
            Some(previous) => previous.pod != pod && previous.tab != tab,
        };
        if !admitted {
            debug!(
                "fetch suppressed for {pod}/{}: selection overlaps last fetched combination",
                tab.title()
            );
            return AppCommand::None;
        }

        self.phase = FetchPhase::Fetching;
        self.status = format!("Fetching ztunnel config from {pod}…");
        AppCommand::FetchConfig {
            key: FetchKey {
                pod,
                tab,
                cluster: self.cluster.clone(),
            },
        }
    }

    fn key_matches_selection(&self, key: &FetchKey) -> bool {
        self.selected_pod.as_deref() == Some(key.pod.as_str())
            && key.tab == self.active_tab()
            && key.cluster == self.cluster
    }
}

fn step_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    if delta >= 0 {
        (current + delta as usize).min(len - 1)
    } else {
        current.saturating_sub(delta.unsigned_abs())
    }
}

fn filter_summary(active: &ActiveFilterSet) -> String {
    if active.is_empty() {
        "No filters active".to_string()
    } else {
        format!("{} filter values active", active.active_count())
    }
}
