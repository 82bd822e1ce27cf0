use crate::model::NamespaceScope;
use crate::table::{ChangeSet, Header, Snapshot, TableData};
use anyhow::Result;
use arc_swap::ArcSwap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Capability a resource kind implements to feed a table: produce a full
/// snapshot for a scope and optional label selector, fetch one identity,
/// delete one identity. The table model is generic over this — any
/// implementation can drive a Row Store.
pub trait ResourceSource: Send + Sync + 'static {
    fn snapshot(
        &self,
        scope: &NamespaceScope,
        selector: Option<&str>,
    ) -> impl Future<Output = Result<Snapshot>> + Send;

    fn get(&self, path: &str) -> impl Future<Output = Result<String>> + Send;

    fn delete(&self, path: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Observer notified after every reconciliation pass of one table model.
pub trait TableListener: Send + Sync {
    fn table_changed(&self, changes: &ChangeSet);

    fn table_load_failed(&self, _error: &anyhow::Error) {}
}

/// Owns the canonical `TableData` for one resource kind/scope and drives it
/// from a `ResourceSource`.
///
/// Writer discipline: `refresh` is the sole mutator; the canonical state
/// lives behind a mutex so reconciliations serialize, and every pass
/// publishes an immutable snapshot through an `ArcSwap` so readers never
/// observe a half-merged table.
pub struct TableModel<S> {
    source: S,
    canonical: Mutex<TableData>,
    published: ArcSwap<TableData>,
    selector: Mutex<Option<String>>,
    listeners: Mutex<Vec<Arc<dyn TableListener>>>,
    interval_tx: watch::Sender<Duration>,
    interval_rx: watch::Receiver<Duration>,
}

impl<S: ResourceSource> TableModel<S> {
    pub fn new(source: S, initial: TableData, refresh_interval: Duration) -> Self {
        let (interval_tx, interval_rx) = watch::channel(refresh_interval);
        Self {
            source,
            published: ArcSwap::from_pointee(initial.clone()),
            canonical: Mutex::new(initial),
            selector: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
            interval_tx,
            interval_rx,
        }
    }

    /// The last published complete snapshot. Cheap, lock-free, and safe to
    /// hold across an entire render pass.
    pub fn peek(&self) -> Arc<TableData> {
        self.published.load_full()
    }

    pub fn is_empty(&self) -> bool {
        self.peek().is_empty()
    }

    pub fn namespace(&self) -> NamespaceScope {
        self.peek().scope().clone()
    }

    /// Switch the namespace scope. This is a structural replacement: the
    /// table restarts empty and repopulates on the next refresh.
    pub fn set_namespace(&self, scope: NamespaceScope) {
        let mut canonical = self.canonical.lock().expect("table state poisoned");
        if *canonical.scope() == scope {
            return;
        }
        let header = canonical.header().clone();
        *canonical = TableData::new(canonical.kind(), scope, header);
        self.published.store(Arc::new(canonical.clone()));
    }

    pub fn label_selector(&self) -> Option<String> {
        self.selector.lock().expect("selector poisoned").clone()
    }

    pub fn set_label_selector(&self, selector: Option<String>) {
        *self.selector.lock().expect("selector poisoned") =
            selector.filter(|selector| !selector.is_empty());
    }

    pub fn header(&self) -> Header {
        self.peek().header().clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn TableListener>) {
        self.listeners
            .lock()
            .expect("listeners poisoned")
            .push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn TableListener>) {
        self.listeners
            .lock()
            .expect("listeners poisoned")
            .retain(|candidate| !Arc::ptr_eq(candidate, listener));
    }

    pub fn refresh_interval(&self) -> Duration {
        *self.interval_rx.borrow()
    }

    /// Change the polling cadence. Takes effect on the next scheduling cycle
    /// of an already-running watch task; no restart needed.
    pub fn set_refresh_interval(&self, interval: Duration) {
        let _ = self.interval_tx.send(interval);
    }

    /// One on-demand synchronization pass: fetch a snapshot from the source,
    /// reconcile it into the canonical table, publish the result, and notify
    /// listeners. On source failure the last published snapshot stays in
    /// place and listeners hear about the error instead.
    pub async fn refresh(&self, full_resync: bool) -> Result<ChangeSet> {
        let scope = self.namespace();
        let selector = self.label_selector();

        let snapshot = match self.source.snapshot(&scope, selector.as_deref()).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                for listener in self.listeners_snapshot() {
                    listener.table_load_failed(&error);
                }
                return Err(error);
            }
        };

        let changes = {
            let mut canonical = self.canonical.lock().expect("table state poisoned");
            if *canonical.scope() != scope {
                // Scope flipped while the fetch was in flight; this snapshot
                // belongs to the old table.
                return Ok(ChangeSet::default());
            }
            let changes = canonical.reconcile(snapshot, full_resync);
            self.published.store(Arc::new(canonical.clone()));
            changes
        };

        for listener in self.listeners_snapshot() {
            listener.table_changed(&changes);
        }
        Ok(changes)
    }

    pub async fn get(&self, path: &str) -> Result<String> {
        self.source.get(path).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.source.delete(path).await
    }

    fn listeners_snapshot(&self) -> Vec<Arc<dyn TableListener>> {
        self.listeners.lock().expect("listeners poisoned").clone()
    }
}

/// Spawn the background synchronization task for one table model. The task
/// performs an immediate pass, then repolls at the model's current refresh
/// interval, re-reading the cadence each cycle. Flipping `stop` to true (or
/// dropping its sender) ends the task promptly; no reconciliation callbacks
/// happen afterward.
pub fn start_watch<S: ResourceSource>(
    model: Arc<TableModel<S>>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if *stop.borrow() {
            return;
        }
        if let Err(error) = model.refresh(true).await {
            warn!("initial table sync failed: {error:#}");
        }

        loop {
            let interval = model.refresh_interval();
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!("watch task stopping");
                        break;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(error) = model.refresh(false).await {
                        warn!("periodic table sync failed: {error:#}");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{ResourceSource, TableListener, TableModel, start_watch};
    use crate::model::{NamespaceScope, ResourceKind};
    use crate::table::{ChangeSet, Header, Row, RowEventKind, Snapshot, TableData};
    use anyhow::{Result, bail};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::watch;

    struct ScriptedSource {
        rows: Mutex<Vec<Row>>,
        fail: AtomicBool,
        fetches: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(rows: Vec<Row>) -> Self {
            Self {
                rows: Mutex::new(rows),
                fail: AtomicBool::new(false),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl ResourceSource for Arc<ScriptedSource> {
        async fn snapshot(
            &self,
            _scope: &NamespaceScope,
            _selector: Option<&str>,
        ) -> Result<Snapshot> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                bail!("connection refused");
            }
            Ok(Snapshot::new(self.rows.lock().unwrap().clone()))
        }

        async fn get(&self, path: &str) -> Result<String> {
            Ok(format!("kind: Pod\nname: {path}\n"))
        }

        async fn delete(&self, _path: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingListener {
        changed: AtomicUsize,
        failed: AtomicUsize,
    }

    impl TableListener for CountingListener {
        fn table_changed(&self, _changes: &ChangeSet) {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }

        fn table_load_failed(&self, _error: &anyhow::Error) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn pod_row(name: &str) -> Row {
        Row::new(
            format!("default/{name}"),
            vec!["default".to_string(), name.to_string()],
        )
    }

    fn model_with(rows: Vec<Row>) -> (Arc<ScriptedSource>, TableModel<Arc<ScriptedSource>>) {
        let source = Arc::new(ScriptedSource::new(rows));
        let initial = TableData::new(
            ResourceKind::Pods,
            NamespaceScope::All,
            Header::from_names(&["NAMESPACE", "NAME"]),
        );
        let model = TableModel::new(
            Arc::clone(&source),
            initial,
            Duration::from_millis(10),
        );
        (source, model)
    }

    #[tokio::test]
    async fn refresh_populates_the_store_and_notifies_listeners() {
        let (_source, model) = model_with(vec![pod_row("pod1"), pod_row("pod2")]);
        let listener = Arc::new(CountingListener::default());
        model.add_listener(listener.clone());

        let changes = model.refresh(false).await.unwrap();

        assert_eq!(changes.count(RowEventKind::Added), 2);
        assert_eq!(model.peek().row_count(), 2);
        assert_eq!(listener.changed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_failure_keeps_the_last_good_snapshot() {
        let (source, model) = model_with(vec![pod_row("pod1")]);
        model.refresh(false).await.unwrap();
        assert_eq!(model.peek().row_count(), 1);

        let listener = Arc::new(CountingListener::default());
        model.add_listener(listener.clone());
        source.fail.store(true, Ordering::SeqCst);

        assert!(model.refresh(false).await.is_err());
        assert_eq!(model.peek().row_count(), 1);
        assert_eq!(listener.failed.load(Ordering::SeqCst), 1);
        assert_eq!(listener.changed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn removed_listeners_stop_hearing_about_changes() {
        let (_source, model) = model_with(vec![pod_row("pod1")]);
        let listener = Arc::new(CountingListener::default());
        let registered: Arc<dyn TableListener> = listener.clone();
        model.add_listener(registered.clone());
        model.remove_listener(&registered);

        model.refresh(false).await.unwrap();
        assert_eq!(listener.changed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn namespace_switch_replaces_the_table_structurally() {
        let (_source, model) = model_with(vec![pod_row("pod1")]);
        model.refresh(false).await.unwrap();
        assert!(!model.is_empty());

        model.set_namespace(NamespaceScope::Named("kube-system".to_string()));
        assert!(model.is_empty());
        assert_eq!(model.namespace(), NamespaceScope::Named("kube-system".to_string()));
    }

    #[tokio::test]
    async fn watch_task_stops_promptly_on_cancellation() {
        let (source, model) = model_with(vec![pod_row("pod1")]);
        let model = Arc::new(model);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = start_watch(Arc::clone(&model), stop_rx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watch task did not stop")
            .unwrap();

        let fetches = source.fetches.load(Ordering::SeqCst);
        assert!(fetches >= 1);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), fetches);
    }

    #[tokio::test]
    async fn refresh_interval_changes_apply_without_restart() {
        let (_source, model) = model_with(Vec::new());
        assert_eq!(model.refresh_interval(), Duration::from_millis(10));
        model.set_refresh_interval(Duration::from_secs(5));
        assert_eq!(model.refresh_interval(), Duration::from_secs(5));
    }
}
