use crate::config::RuntimeConfig;
use crate::decor::{DecorContext, Decoration, DecoratorSet};
use crate::input::Action;
use crate::model::{NamespaceScope, ResourceKind};
use crate::table::{ChangeSet, Fields, TableData};
use crate::view::{FilterSpec, SelectionTracker, SortSpec, view_order};
use crate::watch::{ResourceSource, TableModel};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Command,
    Filter,
}

/// Work the event loop performs on behalf of the app state; the state itself
/// never touches the network or the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    RefreshActive,
    RefreshAll,
    ShowManifest {
        kind: ResourceKind,
        path: String,
    },
    DeleteResource {
        kind: ResourceKind,
        path: String,
    },
    OpenShell {
        path: String,
    },
    StartPortForward {
        path: String,
        local_port: u16,
        remote_port: u16,
    },
    SwitchNamespace(NamespaceScope),
    SetLabelSelector(Option<String>),
    SetRefreshInterval(Duration),
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    command: AppCommand,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PortForwardSession {
    pub path: String,
    pub local_port: u16,
    pub remote_port: u16,
    pub pid: u32,
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub title: String,
    pub content: String,
    pub scroll: u16,
}

/// One row as it goes to the widget layer: canonical fields plus the
/// advisory change mask and the decoration for this draw.
pub struct RenderRow {
    pub id: String,
    pub fields: Fields,
    pub decoration: Decoration,
    pub changed: Option<Vec<bool>>,
}

pub struct RenderTable {
    pub kind: ResourceKind,
    pub columns: Vec<String>,
    pub rows: Vec<RenderRow>,
    pub selected: Option<usize>,
    pub total_rows: usize,
    pub sort: SortSpec,
}

pub struct App<S: ResourceSource> {
    running: bool,
    mode: InputMode,
    kinds: Vec<ResourceKind>,
    active_kind_index: usize,
    models: HashMap<ResourceKind, Arc<TableModel<S>>>,
    filters: HashMap<ResourceKind, String>,
    sorts: HashMap<ResourceKind, SortSpec>,
    selections: HashMap<ResourceKind, SelectionTracker>,
    recent_changes: HashMap<ResourceKind, ChangeSet>,
    last_refreshed: Option<DateTime<Local>>,
    decorators: DecoratorSet,
    port_forwards: Vec<PortForwardSession>,
    input: String,
    status: String,
    show_help: bool,
    overlay: Option<Overlay>,
    pending_confirmation: Option<PendingConfirmation>,
    table_page_size: usize,
    aliases: HashMap<String, String>,
    cluster: String,
    context: String,
}

impl<S: ResourceSource> App<S> {
    pub fn new(
        cluster: String,
        context: String,
        models: HashMap<ResourceKind, Arc<TableModel<S>>>,
        config: &RuntimeConfig,
    ) -> Self {
        let kinds = ResourceKind::ALL
            .iter()
            .copied()
            .filter(|kind| models.contains_key(kind))
            .collect::<Vec<_>>();
        let selections = kinds
            .iter()
            .copied()
            .map(|kind| (kind, SelectionTracker::default()))
            .collect::<HashMap<_, _>>();

        Self {
            running: true,
            mode: InputMode::Normal,
            kinds,
            active_kind_index: 0,
            models,
            filters: HashMap::new(),
            sorts: HashMap::new(),
            selections,
            recent_changes: HashMap::new(),
            last_refreshed: None,
            decorators: DecoratorSet::standard(),
            port_forwards: Vec::new(),
            input: String::new(),
            status: "Ready".to_string(),
            show_help: false,
            overlay: None,
            pending_confirmation: None,
            table_page_size: 10,
            aliases: config.aliases.clone(),
            cluster,
            context,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn kinds(&self) -> &[ResourceKind] {
        &self.kinds
    }

    pub fn active_kind(&self) -> ResourceKind {
        self.kinds[self.active_kind_index]
    }

    pub fn active_model(&self) -> &Arc<TableModel<S>> {
        &self.models[&self.active_kind()]
    }

    pub fn model(&self, kind: ResourceKind) -> Option<&Arc<TableModel<S>>> {
        self.models.get(&kind)
    }

    pub fn models(&self) -> impl Iterator<Item = (&ResourceKind, &Arc<TableModel<S>>)> {
        self.models.iter()
    }

    pub fn namespace_scope(&self) -> NamespaceScope {
        self.active_model().namespace()
    }

    pub fn filter(&self) -> &str {
        self.filters
            .get(&self.active_kind())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn input(&self) -> &str {
        &self.input
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

    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    pub fn set_overlay(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.overlay = Some(Overlay {
            title: title.into(),
            content: content.into(),
            scroll: 0,
        });
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    pub fn set_table_page_size(&mut self, size: usize) {
        self.table_page_size = size.max(1);
    }

    pub fn port_forwards(&self) -> &[PortForwardSession] {
        &self.port_forwards
    }

    pub fn register_port_forward(&mut self, session: PortForwardSession) {
        self.port_forwards.push(session);
    }

    pub fn remove_port_forward_by_pid(&mut self, pid: u32) -> Option<PortForwardSession> {
        let index = self
            .port_forwards
            .iter()
            .position(|session| session.pid == pid)?;
        Some(self.port_forwards.remove(index))
    }

    /// Record a background reconciliation's outcome. The change set feeds the
    /// next draw's cell highlighting and is discarded there.
    pub fn note_table_changed(&mut self, kind: ResourceKind, changes: ChangeSet) {
        self.last_refreshed = Some(Local::now());
        if !changes.is_quiet() {
            self.recent_changes.insert(kind, changes);
        }
    }

    fn sort_spec(&self, kind: ResourceKind) -> SortSpec {
        self.sorts.get(&kind).copied().unwrap_or_default()
    }

    fn filter_spec(&self, kind: ResourceKind) -> FilterSpec {
        FilterSpec::parse(self.filters.get(&kind).map(String::as_str).unwrap_or(""))
    }

    fn active_view(&self) -> (Arc<TableData>, Vec<String>) {
        let kind = self.active_kind();
        let data = self.models[&kind].peek();
        let order = view_order(&data, &self.filter_spec(kind), &self.sort_spec(kind));
        (data, order)
    }

    /// Select a row by its identity in the active table. Unknown identities
    /// leave the selection untouched.
    pub fn select_row_by_path(&mut self, path: &str) {
        let (_, order) = self.active_view();
        let kind = self.active_kind();
        if let Some(selection) = self.selections.get_mut(&kind) {
            selection.select_by_path(path, &order);
        }
    }

    /// The identity of the highlighted row, or empty when nothing was ever
    /// selected in this table.
    pub fn selected_path(&self) -> Option<String> {
        self.selections
            .get(&self.active_kind())
            .and_then(|selection| selection.current())
            .map(str::to_string)
    }

    /// Everything the widget layer needs for one draw of the active table.
    /// Consumes the pending change masks: highlighting lives for exactly one
    /// render pass.
    pub fn render_table(&mut self) -> RenderTable {
        let kind = self.active_kind();
        let (data, order) = self.active_view();
        let changes = self.recent_changes.remove(&kind);
        let forwarded = self
            .port_forwards
            .iter()
            .map(|session| session.path.clone())
            .collect::<Vec<_>>();
        let ctx = DecorContext::new(&forwarded);

        let rows = order
            .iter()
            .filter_map(|id| data.get(id))
            .map(|row| RenderRow {
                id: row.id.clone(),
                fields: row.fields.clone(),
                decoration: self.decorators.apply(row, data.header(), Some(&ctx)),
                changed: changes
                    .as_ref()
                    .and_then(|changes| changes.changed_cells_for(&row.id))
                    .map(|mask| mask.to_vec()),
            })
            .collect::<Vec<_>>();

        let selected = self
            .selections
            .get(&kind)
            .and_then(|selection| selection.display_position(&order));

        RenderTable {
            kind,
            columns: data
                .header()
                .columns()
                .iter()
                .map(|column| column.name.clone())
                .collect(),
            rows,
            selected,
            total_rows: data.row_count(),
            sort: self.sort_spec(kind),
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if self.pending_confirmation.is_some() {
            return self.apply_confirmation_action(action);
        }
        if self.overlay.is_some() {
            self.apply_overlay_action(action);
            return AppCommand::None;
        }

        match self.mode {
            InputMode::Normal => self.apply_normal_action(action),
            InputMode::Command | InputMode::Filter => self.apply_input_action(action),
        }
    }

    fn apply_confirmation_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::ConfirmYes => {
                let pending = self.pending_confirmation.take();
                pending
                    .map(|pending| pending.command)
                    .unwrap_or(AppCommand::None)
            }
            Action::ConfirmNo | Action::CancelInput => {
                self.pending_confirmation = None;
                self.status = "Cancelled".to_string();
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn apply_overlay_action(&mut self, action: Action) {
        let Some(overlay) = self.overlay.as_mut() else {
            return;
        };
        match action {
            Action::Down => overlay.scroll = overlay.scroll.saturating_add(1),
            Action::Up => overlay.scroll = overlay.scroll.saturating_sub(1),
            Action::PageDown => overlay.scroll = overlay.scroll.saturating_add(10),
            Action::PageUp => overlay.scroll = overlay.scroll.saturating_sub(10),
            Action::Top => overlay.scroll = 0,
            Action::CancelInput | Action::CloseOverlay | Action::Quit => {
                self.overlay = None;
            }
            _ => {}
        }
    }

    fn apply_normal_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::Quit => {
                self.running = false;
                AppCommand::None
            }
            Action::Down => self.move_selection(1),
            Action::Up => self.move_selection(-1),
            Action::PageDown => self.move_selection(self.table_page_size as isize),
            Action::PageUp => self.move_selection(-(self.table_page_size as isize)),
            Action::Top => self.select_edge(true),
            Action::Bottom => self.select_edge(false),
            Action::NextTab => self.switch_kind_by_offset(1),
            Action::PrevTab => self.switch_kind_by_offset(-1),
            Action::SortNext => self.cycle_sort(1),
            Action::SortPrev => self.cycle_sort(-1),
            Action::SortInvert => self.invert_sort(),
            Action::StartFilter => {
                self.mode = InputMode::Filter;
                self.input = self.filter().to_string();
                AppCommand::None
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.clear();
                AppCommand::None
            }
            Action::Refresh => AppCommand::RefreshActive,
            Action::RefreshAll => AppCommand::RefreshAll,
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::ShowManifest => match self.selected_path() {
                Some(path) => AppCommand::ShowManifest {
                    kind: self.active_kind(),
                    path,
                },
                None => {
                    self.status = "No resource selected".to_string();
                    AppCommand::None
                }
            },
            Action::OpenShell => match (self.active_kind(), self.selected_path()) {
                (ResourceKind::Pods, Some(path)) => AppCommand::OpenShell { path },
                (ResourceKind::Pods, None) => {
                    self.status = "No pod selected".to_string();
                    AppCommand::None
                }
                (kind, _) => {
                    self.status = format!("Shell is only available for Pods, not {}", kind.title());
                    AppCommand::None
                }
            },
            Action::DeleteSelected => match self.selected_path() {
                Some(path) => {
                    let kind = self.active_kind();
                    self.pending_confirmation = Some(PendingConfirmation {
                        prompt: format!("Delete {} {path}? (y/n)", kind.title()),
                        command: AppCommand::DeleteResource { kind, path },
                    });
                    AppCommand::None
                }
                None => {
                    self.status = "No resource selected".to_string();
                    AppCommand::None
                }
            },
            Action::CancelInput | Action::CloseOverlay => {
                if self.show_help {
                    self.show_help = false;
                } else if !self.filter().is_empty() {
                    self.set_filter(String::new());
                    self.status = "Filter cleared".to_string();
                }
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn apply_input_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.input.push(c);
                if self.mode == InputMode::Filter {
                    let raw = self.input.clone();
                    self.set_filter(raw);
                }
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                if self.mode == InputMode::Filter {
                    let raw = self.input.clone();
                    self.set_filter(raw);
                }
                AppCommand::None
            }
            Action::SubmitInput => {
                let raw = std::mem::take(&mut self.input);
                let mode = self.mode;
                self.mode = InputMode::Normal;
                match mode {
                    InputMode::Filter => {
                        self.set_filter(raw);
                        AppCommand::None
                    }
                    InputMode::Command => self.submit_command(&raw),
                    InputMode::Normal => AppCommand::None,
                }
            }
            Action::CancelInput => {
                if self.mode == InputMode::Filter {
                    self.set_filter(String::new());
                }
                self.input.clear();
                self.mode = InputMode::Normal;
                AppCommand::None
            }
            _ => AppCommand::None,
        }
    }

    fn set_filter(&mut self, raw: String) {
        let kind = self.active_kind();
        if raw.is_empty() {
            self.filters.remove(&kind);
        } else {
            self.filters.insert(kind, raw);
        }
    }

    fn move_selection(&mut self, delta: isize) -> AppCommand {
        let (_, order) = self.active_view();
        let kind = self.active_kind();
        if let Some(selection) = self.selections.get_mut(&kind) {
            selection.move_by(delta, &order);
        }
        AppCommand::None
    }

    fn select_edge(&mut self, top: bool) -> AppCommand {
        let (_, order) = self.active_view();
        let kind = self.active_kind();
        if let Some(selection) = self.selections.get_mut(&kind) {
            let index = if top { 0 } else { order.len().saturating_sub(1) };
            selection.select_index(index, &order);
        }
        AppCommand::None
    }

    fn switch_kind_by_offset(&mut self, delta: isize) -> AppCommand {
        if self.kinds.is_empty() {
            return AppCommand::None;
        }
        let len = self.kinds.len() as isize;
        let next = (self.active_kind_index as isize + delta).rem_euclid(len) as usize;
        self.activate_kind_index(next)
    }

    fn activate_kind_index(&mut self, index: usize) -> AppCommand {
        self.active_kind_index = index;
        let kind = self.active_kind();
        // Landing on a kind is a fresh table from the view's perspective.
        if let Some(selection) = self.selections.get_mut(&kind) {
            selection.reset();
        }
        self.status = format!("Viewing {}", kind.title());
        AppCommand::RefreshActive
    }

    fn cycle_sort(&mut self, delta: isize) -> AppCommand {
        let kind = self.active_kind();
        let columns = self.models[&kind].header().len();
        let spec = self.sort_spec(kind).cycled(columns, delta);
        self.sorts.insert(kind, spec);
        AppCommand::None
    }

    fn invert_sort(&mut self) -> AppCommand {
        let kind = self.active_kind();
        let spec = self.sort_spec(kind).inverted();
        self.sorts.insert(kind, spec);
        AppCommand::None
    }

    fn submit_command(&mut self, raw: &str) -> AppCommand {
        let raw = raw.trim();
        if raw.is_empty() {
            return AppCommand::None;
        }

        let resolved = self
            .aliases
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string());
        let mut parts = resolved.split_whitespace();
        let head = parts.next().unwrap_or("");
        let rest = parts.collect::<Vec<_>>();

        match head {
            "q" | "quit" => {
                self.running = false;
                AppCommand::None
            }
            "ns" | "namespace" if !rest.is_empty() => match rest.as_slice() {
                ["all"] | ["-A"] => AppCommand::SwitchNamespace(NamespaceScope::All),
                [namespace] => {
                    AppCommand::SwitchNamespace(NamespaceScope::Named(namespace.to_string()))
                }
                _ => {
                    self.status = "Usage: ns <name> | ns all".to_string();
                    AppCommand::None
                }
            },
            "sel" | "selector" => match rest.as_slice() {
                [] => AppCommand::SetLabelSelector(None),
                parts => AppCommand::SetLabelSelector(Some(parts.join(","))),
            },
            "rate" => match rest.first().and_then(|value| value.parse::<u64>().ok()) {
                Some(ms) if ms >= 250 => {
                    AppCommand::SetRefreshInterval(Duration::from_millis(ms))
                }
                _ => {
                    self.status = "Usage: rate <milliseconds, min 250>".to_string();
                    AppCommand::None
                }
            },
            "pf" => self.parse_port_forward(&rest),
            _ => self.switch_kind_command(head, &rest, &resolved),
        }
    }

    fn switch_kind_command(&mut self, head: &str, rest: &[&str], resolved: &str) -> AppCommand {
        let Some(kind) = ResourceKind::from_token(head) else {
            self.status = format!("Unknown command '{resolved}'");
            return AppCommand::None;
        };
        let Some(index) = self.kinds.iter().position(|candidate| *candidate == kind) else {
            self.status = format!("{} is not an available view", kind.title());
            return AppCommand::None;
        };

        let command = self.activate_kind_index(index);
        // `:po kube-system/dns` jumps straight to that row when it is
        // already visible; a miss leaves the selection alone.
        if let Some(path) = rest.first() {
            self.select_row_by_path(path);
        }
        command
    }

    fn parse_port_forward(&mut self, rest: &[&str]) -> AppCommand {
        if self.active_kind() != ResourceKind::Pods {
            self.status = "Port-forward is only available for Pods".to_string();
            return AppCommand::None;
        }
        let Some(path) = self.selected_path() else {
            self.status = "No pod selected".to_string();
            return AppCommand::None;
        };
        let parsed = rest.first().and_then(|spec| {
            let (local, remote) = spec.split_once(':')?;
            Some((local.parse::<u16>().ok()?, remote.parse::<u16>().ok()?))
        });
        match parsed {
            Some((local_port, remote_port)) => AppCommand::StartPortForward {
                path,
                local_port,
                remote_port,
            },
            None => {
                self.status = "Usage: pf <local>:<remote>".to_string();
                AppCommand::None
            }
        }
    }

    /// Reset selections after a namespace scope change: the underlying
    /// tables were structurally replaced.
    pub fn on_scope_changed(&mut self) {
        for selection in self.selections.values_mut() {
            selection.reset();
        }
        self.recent_changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand};
    use crate::config::RuntimeConfig;
    use crate::input::Action;
    use crate::model::{NamespaceScope, ResourceKind};
    use crate::table::{Header, Row, Snapshot, TableData};
    use crate::watch::{ResourceSource, TableModel};
    use anyhow::Result;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct FixedSource {
        rows: Mutex<Vec<Row>>,
    }

    impl ResourceSource for Arc<FixedSource> {
        async fn snapshot(
            &self,
            _scope: &NamespaceScope,
            _selector: Option<&str>,
        ) -> Result<Snapshot> {
            Ok(Snapshot::new(self.rows.lock().unwrap().clone()))
        }

        async fn get(&self, path: &str) -> Result<String> {
            Ok(format!("name: {path}\n"))
        }

        async fn delete(&self, _path: &str) -> Result<()> {
            Ok(())
        }
    }

    fn pod_rows(names: &[&str]) -> Vec<Row> {
        names
            .iter()
            .map(|name| {
                Row::new(
                    format!("default/{name}"),
                    vec!["default".to_string(), name.to_string()],
                )
            })
            .collect()
    }

    fn app_with_pods(names: &[&str]) -> App<Arc<FixedSource>> {
        let source = Arc::new(FixedSource {
            rows: Mutex::new(pod_rows(names)),
        });
        let initial = TableData::new(
            ResourceKind::Pods,
            NamespaceScope::All,
            Header::from_names(&["NAMESPACE", "NAME"]),
        );
        let model = Arc::new(TableModel::new(source, initial, Duration::from_secs(1)));
        let mut models = HashMap::new();
        models.insert(ResourceKind::Pods, model);
        App::new(
            "test-cluster".to_string(),
            "test-context".to_string(),
            models,
            &RuntimeConfig::default(),
        )
    }

    #[tokio::test]
    async fn selection_sticks_to_identity_across_misses() {
        let mut app = app_with_pods(&["pod1", "pod2", "pod3"]);
        app.active_model().refresh(false).await.unwrap();

        app.select_row_by_path("default/pod2");
        assert_eq!(app.selected_path().as_deref(), Some("default/pod2"));

        app.select_row_by_path("default/nonexistent");
        assert_eq!(app.selected_path().as_deref(), Some("default/pod2"));
    }

    #[tokio::test]
    async fn empty_tables_report_no_selection() {
        let mut app = app_with_pods(&[]);
        app.active_model().refresh(false).await.unwrap();

        app.select_row_by_path("default/pod1");
        app.select_row_by_path("default/pod1");
        assert_eq!(app.selected_path(), None);
    }

    #[tokio::test]
    async fn navigation_selects_by_visible_position() {
        let mut app = app_with_pods(&["pod1", "pod2", "pod3"]);
        app.active_model().refresh(false).await.unwrap();

        app.apply_action(Action::Down);
        assert_eq!(app.selected_path().as_deref(), Some("default/pod1"));
        app.apply_action(Action::Down);
        assert_eq!(app.selected_path().as_deref(), Some("default/pod2"));
        app.apply_action(Action::Bottom);
        assert_eq!(app.selected_path().as_deref(), Some("default/pod3"));
    }

    #[tokio::test]
    async fn render_masks_are_consumed_by_one_draw() {
        let mut app = app_with_pods(&["pod1"]);
        app.active_model().refresh(false).await.unwrap();
        let changes = app.active_model().refresh(false).await.unwrap();
        app.note_table_changed(ResourceKind::Pods, changes);

        // Quiet pass: nothing stashed, nothing highlighted.
        let table = app.render_table();
        assert!(table.rows.iter().all(|row| row.changed.is_none()));

        let mut changed = crate::table::ChangeSet::default();
        changed.events.push(crate::table::RowEvent {
            kind: crate::table::RowEventKind::Updated,
            row: pod_rows(&["pod1"]).remove(0),
            changed_cells: Some(vec![false, true]),
        });
        app.note_table_changed(ResourceKind::Pods, changed);

        let table = app.render_table();
        assert_eq!(
            table.rows[0].changed.as_deref(),
            Some(&[false, true][..])
        );
        let table = app.render_table();
        assert!(table.rows[0].changed.is_none());
    }

    #[tokio::test]
    async fn delete_requires_confirmation() {
        let mut app = app_with_pods(&["pod1"]);
        app.active_model().refresh(false).await.unwrap();
        app.select_row_by_path("default/pod1");

        assert_eq!(app.apply_action(Action::DeleteSelected), AppCommand::None);
        assert!(app.pending_confirmation_prompt().is_some());

        let command = app.apply_action(Action::ConfirmYes);
        assert_eq!(
            command,
            AppCommand::DeleteResource {
                kind: ResourceKind::Pods,
                path: "default/pod1".to_string(),
            }
        );
        assert!(app.pending_confirmation_prompt().is_none());
    }

    #[tokio::test]
    async fn commands_parse_namespace_and_rate() {
        let mut app = app_with_pods(&["pod1"]);

        app.apply_action(Action::StartCommand);
        for c in "ns kube-system".chars() {
            app.apply_action(Action::InputChar(c));
        }
        assert_eq!(
            app.apply_action(Action::SubmitInput),
            AppCommand::SwitchNamespace(NamespaceScope::Named("kube-system".to_string()))
        );

        app.apply_action(Action::StartCommand);
        for c in "rate 2000".chars() {
            app.apply_action(Action::InputChar(c));
        }
        assert_eq!(
            app.apply_action(Action::SubmitInput),
            AppCommand::SetRefreshInterval(Duration::from_millis(2000))
        );
    }

    #[tokio::test]
    async fn kind_command_with_path_jumps_to_the_row() {
        let mut app = app_with_pods(&["pod1", "pod2"]);
        app.active_model().refresh(false).await.unwrap();

        app.apply_action(Action::StartCommand);
        for c in "po default/pod2".chars() {
            app.apply_action(Action::InputChar(c));
        }
        let command = app.apply_action(Action::SubmitInput);

        assert_eq!(command, AppCommand::RefreshActive);
        assert_eq!(app.selected_path().as_deref(), Some("default/pod2"));
    }

    #[tokio::test]
    async fn filter_narrows_render_without_touching_the_store() {
        let mut app = app_with_pods(&["pod1", "pod2"]);
        app.active_model().refresh(false).await.unwrap();

        app.apply_action(Action::StartFilter);
        for c in "pod2".chars() {
            app.apply_action(Action::InputChar(c));
        }
        app.apply_action(Action::SubmitInput);

        let table = app.render_table();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].id, "default/pod2");
        assert_eq!(table.total_rows, 2);
    }
}
