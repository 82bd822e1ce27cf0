mod app;
mod cli;
mod config;
mod decor;
mod exec;
mod input;
mod k8s;
mod model;
mod table;
mod ui;
mod view;
mod watch;

use anyhow::{Context, Result};
use app::{App, AppCommand, PortForwardSession};
use clap::Parser;
use cli::CliArgs;
use config::{ClientFlags, load_runtime_config};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::{StreamExt, TryStreamExt};
use k8s::{KindSource, KubeGateway, header_for};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Event as KubeEvent, Namespace, Node, Pod, Secret, Service};
use kube::runtime::watcher::{Config as WatchConfig, watcher};
use kube::{Api, Client};
use model::{NamespaceScope, ResourceKind, split_path};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use table::{ChangeSet, TableData};
use tokio::process::Command as TokioCommand;
use tokio::sync::{mpsc, watch as tokio_watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use watch::{TableListener, TableModel, start_watch};

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;
type MantaApp = App<KindSource>;

const TABLE_REFRESH_TIMEOUT: Duration = Duration::from_secs(4);
const MANIFEST_TIMEOUT: Duration = Duration::from_secs(4);
const PING_MIN_INTERVAL: Duration = Duration::from_millis(350);

enum ModelEvent {
    Changed {
        kind: ResourceKind,
        changes: ChangeSet,
    },
    Failed {
        kind: ResourceKind,
        error: String,
    },
}

/// Bridges a table model's listener callbacks onto the event loop's channel.
struct ForwardingListener {
    kind: ResourceKind,
    tx: mpsc::UnboundedSender<ModelEvent>,
}

impl TableListener for ForwardingListener {
    fn table_changed(&self, changes: &ChangeSet) {
        let _ = self.tx.send(ModelEvent::Changed {
            kind: self.kind,
            changes: changes.clone(),
        });
    }

    fn table_load_failed(&self, error: &anyhow::Error) {
        let _ = self.tx.send(ModelEvent::Failed {
            kind: self.kind,
            error: compact_error(error),
        });
    }
}

#[derive(Debug, Clone)]
struct PortForwardExitEvent {
    pid: u32,
    path: String,
    local_port: u16,
    remote_port: u16,
    result: std::result::Result<std::process::ExitStatus, String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter)?;

    let flags = args.client_flags();
    let runtime_config = load_runtime_config().unwrap_or_else(|error| {
        warn!("runtime config ignored: {error:#}");
        config::RuntimeConfig::default()
    });
    if let Some(source) = &runtime_config.source {
        debug!("runtime config loaded from {source}");
    }

    let gateway = KubeGateway::connect(&flags).await?;
    let scope = resolve_namespace_scope(&args, &gateway);
    let refresh_interval = Duration::from_millis(args.refresh_ms.max(500));

    let (model_tx, model_rx) = mpsc::unbounded_channel::<ModelEvent>();
    let (stop_tx, stop_rx) = tokio_watch::channel(false);

    let mut models = HashMap::new();
    let mut sync_tasks = Vec::new();
    for kind in ResourceKind::ALL {
        let wide = runtime_config.view.wide_for(kind.short_token());
        let table_scope = if kind.cluster_scoped() {
            NamespaceScope::All
        } else {
            scope.clone()
        };
        let initial = TableData::new(kind, table_scope, header_for(kind, wide));
        let model = Arc::new(TableModel::new(
            gateway.source(kind, wide),
            initial,
            refresh_interval,
        ));
        model.add_listener(Arc::new(ForwardingListener {
            kind,
            tx: model_tx.clone(),
        }));
        sync_tasks.push(start_watch(Arc::clone(&model), stop_rx.clone()));
        models.insert(kind, model);
    }

    let mut app = App::new(
        gateway.cluster().to_string(),
        gateway.context().to_string(),
        models,
        &runtime_config,
    );

    let run_result = run(&mut app, &gateway, &flags, model_rx).await;

    let _ = stop_tx.send(true);
    for task in sync_tasks {
        task.abort();
    }

    run_result
}

fn init_tracing(level_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::sink)
        .try_init();

    Ok(())
}

fn resolve_namespace_scope(args: &CliArgs, gateway: &KubeGateway) -> NamespaceScope {
    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }
    if args.all_namespaces {
        NamespaceScope::All
    } else if let Some(namespace) = &args.namespace {
        NamespaceScope::Named(namespace.clone())
    } else {
        NamespaceScope::Named(gateway.default_namespace().to_string())
    }
}

async fn run(
    app: &mut MantaApp,
    gateway: &KubeGateway,
    flags: &ClientFlags,
    model_rx: mpsc::UnboundedReceiver<ModelEvent>,
) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway, flags, model_rx).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut MantaApp,
    gateway: &KubeGateway,
    flags: &ClientFlags,
    mut model_rx: mpsc::UnboundedReceiver<ModelEvent>,
) -> Result<()> {
    let mut reader = EventStream::new();
    let (ping_tx, mut ping_rx) = mpsc::unbounded_channel::<ResourceKind>();
    let mut ping_tasks = start_change_pings(gateway.client(), ping_tx);
    let mut ping_throttle = HashMap::<ResourceKind, Instant>::new();
    let (pf_tx, mut pf_rx) = mpsc::unbounded_channel::<PortForwardExitEvent>();

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        if let Some(action) = input::map_key(app.mode(), key) {
                            debug!("action={action:?}");
                            let command = app.apply_action(action);
                            execute_app_command(terminal, app, flags, command, &pf_tx).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            maybe_model = model_rx.recv() => {
                match maybe_model {
                    Some(ModelEvent::Changed { kind, changes }) => {
                        app.note_table_changed(kind, changes);
                    }
                    Some(ModelEvent::Failed { kind, error }) => {
                        app.set_status(format!(
                            "{} refresh failed (showing cached): {error}",
                            kind.title()
                        ));
                    }
                    None => break,
                }
            }
            maybe_kind = ping_rx.recv() => {
                if let Some(kind) = maybe_kind
                    && should_process_ping(kind, &mut ping_throttle)
                    && kind == app.active_kind()
                {
                    refresh_kind(app, kind).await;
                }
            }
            maybe_pf = pf_rx.recv() => {
                if let Some(event) = maybe_pf {
                    let removed = app.remove_port_forward_by_pid(event.pid);
                    let target = format!(
                        "{} {}:{}",
                        event.path, event.local_port, event.remote_port
                    );
                    match event.result {
                        Ok(status) if status.success() => {
                            if removed.is_some() {
                                app.set_status(format!("Port-forward closed: {target}"));
                            }
                        }
                        Ok(status) => {
                            app.set_status(format!("Port-forward exited ({status}) for {target}"));
                        }
                        Err(error) => {
                            app.set_status(format!("Port-forward failed for {target}: {error}"));
                        }
                    }
                }
            }
        }
    }

    for task in ping_tasks.drain(..) {
        task.abort();
    }

    Ok(())
}

async fn execute_app_command(
    terminal: &mut TuiTerminal,
    app: &mut MantaApp,
    flags: &ClientFlags,
    command: AppCommand,
    pf_tx: &mpsc::UnboundedSender<PortForwardExitEvent>,
) {
    match command {
        AppCommand::None => {}
        AppCommand::RefreshActive => {
            let kind = app.active_kind();
            refresh_kind(app, kind).await;
        }
        AppCommand::RefreshAll => {
            for kind in app.kinds().to_vec() {
                refresh_kind(app, kind).await;
            }
        }
        AppCommand::ShowManifest { kind, path } => {
            let Some(model) = app.model(kind).cloned() else {
                return;
            };
            match timeout(MANIFEST_TIMEOUT, model.get(&path)).await {
                Ok(Ok(manifest)) => {
                    app.set_overlay(format!("{} {path}", kind.title()), manifest);
                }
                Ok(Err(error)) => {
                    app.set_status(format!("Failed loading manifest for {path}: {error:#}"));
                }
                Err(_) => {
                    app.set_status(format!("Manifest request timed out for {path}"));
                }
            }
        }
        AppCommand::DeleteResource { kind, path } => {
            let Some(model) = app.model(kind).cloned() else {
                return;
            };
            match model.delete(&path).await {
                Ok(()) => {
                    app.set_status(format!("Deleted {} {path}", kind.title()));
                    refresh_kind(app, kind).await;
                }
                Err(error) => {
                    app.set_status(format!("Delete failed for {path}: {error:#}"));
                }
            }
        }
        AppCommand::OpenShell { path } => {
            let args = exec::shell_args(&path, "", flags, std::env::consts::OS);
            match run_kubectl_shell(terminal, &args).await {
                Ok(()) => {
                    app.set_status(format!("Shell session closed for {path}"));
                    refresh_kind(app, ResourceKind::Pods).await;
                }
                Err(error) => {
                    app.set_status(format!("Shell failed for {path}: {error:#}"));
                }
            }
        }
        AppCommand::StartPortForward {
            path,
            local_port,
            remote_port,
        } => match run_kubectl_port_forward(&path, local_port, remote_port).await {
            Ok((pid, mut child)) => {
                app.register_port_forward(PortForwardSession {
                    path: path.clone(),
                    local_port,
                    remote_port,
                    pid,
                });
                app.set_status(format!(
                    "Port-forward started {path} {local_port}:{remote_port} pid={pid}"
                ));

                let tx = pf_tx.clone();
                tokio::spawn(async move {
                    let result = child
                        .wait()
                        .await
                        .map_err(|error| format!("wait failed: {error}"));
                    let _ = tx.send(PortForwardExitEvent {
                        pid,
                        path,
                        local_port,
                        remote_port,
                        result,
                    });
                });
            }
            Err(error) => {
                app.set_status(format!("Port-forward failed for {path}: {error:#}"));
            }
        },
        AppCommand::SwitchNamespace(scope) => {
            for (kind, model) in app.models() {
                if !kind.cluster_scoped() {
                    model.set_namespace(scope.clone());
                }
            }
            app.on_scope_changed();
            app.set_status(format!("Namespace scope set to {scope}"));
            for kind in app.kinds().to_vec() {
                refresh_kind(app, kind).await;
            }
        }
        AppCommand::SetLabelSelector(selector) => {
            for (_, model) in app.models() {
                model.set_label_selector(selector.clone());
            }
            match &selector {
                Some(selector) => app.set_status(format!("Label selector: {selector}")),
                None => app.set_status("Label selector cleared"),
            }
            for kind in app.kinds().to_vec() {
                refresh_kind(app, kind).await;
            }
        }
        AppCommand::SetRefreshInterval(interval) => {
            for (_, model) in app.models() {
                model.set_refresh_interval(interval);
            }
            app.set_status(format!("Refresh interval set to {}ms", interval.as_millis()));
        }
    }
}

async fn refresh_kind(app: &mut MantaApp, kind: ResourceKind) {
    let Some(model) = app.model(kind).cloned() else {
        return;
    };
    match timeout(TABLE_REFRESH_TIMEOUT, model.refresh(false)).await {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => {
            // Failure details already reached the status line via the
            // model's listener.
        }
        Err(_) => {
            app.set_status(format!(
                "Refresh timed out for {} (showing cached data)",
                kind.title()
            ));
        }
    }
}

async fn run_kubectl_shell(terminal: &mut TuiTerminal, args: &[String]) -> Result<()> {
    suspend_terminal_for_subprocess(terminal)?;

    let run_result = TokioCommand::new("kubectl")
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .context("failed to run kubectl shell");
    let restore_result = resume_terminal_after_subprocess(terminal);

    let status = match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => {
            return Err(anyhow::anyhow!(
                "{run_error:#}\nterminal resume error: {restore_error:#}"
            ));
        }
        (Err(error), _) => return Err(error),
        (_, Err(error)) => return Err(error),
        (Ok(status), Ok(())) => status,
    };

    if status.success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("kubectl shell exited with {status}"))
    }
}

fn suspend_terminal_for_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode for subprocess")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen for subprocess")?;
    terminal
        .show_cursor()
        .context("failed to show cursor for subprocess")?;
    Ok(())
}

fn resume_terminal_after_subprocess(terminal: &mut TuiTerminal) -> Result<()> {
    enable_raw_mode().context("failed to re-enable raw mode after subprocess")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("failed to re-enter alternate screen after subprocess")?;
    terminal
        .clear()
        .context("failed to clear terminal after subprocess")?;
    Ok(())
}

async fn run_kubectl_port_forward(
    path: &str,
    local_port: u16,
    remote_port: u16,
) -> Result<(u32, tokio::process::Child)> {
    let (namespace, name) = split_path(path);
    let namespace = namespace.context("port-forward requires a namespaced pod")?;

    let child = TokioCommand::new("kubectl")
        .arg("port-forward")
        .arg("-n")
        .arg(namespace)
        .arg(format!("pod/{name}"))
        .arg(format!("{local_port}:{remote_port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn port-forward for {path}"))?;

    let pid = child
        .id()
        .context("failed to determine process id for kubectl port-forward")?;

    Ok((pid, child))
}

fn should_process_ping(kind: ResourceKind, throttle: &mut HashMap<ResourceKind, Instant>) -> bool {
    let now = Instant::now();
    let Some(last) = throttle.get(&kind) else {
        throttle.insert(kind, now);
        return true;
    };

    if now.duration_since(*last) >= PING_MIN_INTERVAL {
        throttle.insert(kind, now);
        true
    } else {
        false
    }
}

fn start_change_pings(
    client: Client,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_change_ping::<Pod>(client.clone(), ResourceKind::Pods, tx.clone()),
        spawn_change_ping::<Deployment>(client.clone(), ResourceKind::Deployments, tx.clone()),
        spawn_change_ping::<Service>(client.clone(), ResourceKind::Services, tx.clone()),
        spawn_change_ping::<ConfigMap>(client.clone(), ResourceKind::ConfigMaps, tx.clone()),
        spawn_change_ping::<Secret>(client.clone(), ResourceKind::Secrets, tx.clone()),
        spawn_change_ping::<Node>(client.clone(), ResourceKind::Nodes, tx.clone()),
        spawn_change_ping::<KubeEvent>(client.clone(), ResourceKind::Events, tx.clone()),
        spawn_change_ping::<Namespace>(client, ResourceKind::Namespaces, tx),
    ]
}

fn spawn_change_ping<K>(
    client: Client,
    kind: ResourceKind,
    tx: mpsc::UnboundedSender<ResourceKind>,
) -> JoinHandle<()>
where
    K: Clone + std::fmt::Debug + serde::de::DeserializeOwned + kube::Resource + Send + 'static,
    <K as kube::Resource>::DynamicType: Default + Eq + std::hash::Hash + Clone + Send,
{
    tokio::spawn(async move {
        loop {
            let api: Api<K> = Api::all(client.clone());
            let mut events = watcher(api, WatchConfig::default()).boxed();
            loop {
                match events.try_next().await {
                    Ok(Some(_)) => {
                        let _ = tx.send(kind);
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!("watch stream error for {}: {error}", kind.title());
                        break;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(900)).await;
        }
    })
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join(" ")
}
