//! Regenerate the grammar whenever Openplanet metadata changes
//!
//! Runs never overlap: a change seen while a run is in flight is coalesced
//! into a single follow-up run.

use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc as tokio_mpsc;
use tracing::{debug, info, warn};

use crate::config::GeneratorOptions;
use crate::discovery::SourceResolver;
use crate::generator::{RegenerationReport, regenerate_now};
use crate::{OpgenError, Result};

/// Extensions of files that can change the generated output
pub const METADATA_EXTENSIONS: [&str; 2] = ["json", "h"];

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// A file system change under a watch root
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

/// Watches install directories without descending into them
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: tokio_mpsc::UnboundedReceiver<FileChangeEvent>,
    debounce_duration: Duration,
}

impl FileWatcher {
    pub fn new(roots: &[PathBuf]) -> Result<Self> {
        let (tx, rx) = tokio_mpsc::unbounded_channel();

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let kind = match event.kind {
                        EventKind::Create(_) => FileChangeKind::Created,
                        EventKind::Remove(_) => FileChangeKind::Deleted,
                        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
                            FileChangeKind::Modified
                        }
                        EventKind::Access(_) => return,
                        _ => FileChangeKind::Modified,
                    };
                    for path in event.paths {
                        let change = FileChangeEvent {
                            path,
                            kind,
                            timestamp: Instant::now(),
                        };
                        if let Err(e) = tx.send(change) {
                            warn!("Failed to forward file change event: {}", e);
                        }
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            })
            .map_err(|e| OpgenError::watch(format!("Failed to create file watcher: {e}")))?;

        for root in roots {
            watcher
                .watch(root, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    OpgenError::watch(format!("Failed to watch '{}': {e}", root.display()))
                })?;
            debug!("Watching {}", root.display());
        }

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            debounce_duration: DEFAULT_DEBOUNCE,
        })
    }

    /// Next change; cancel safe, no event is lost when the future is dropped
    pub async fn next_event(&mut self) -> Option<FileChangeEvent> {
        self.receiver.recv().await
    }

    /// Quiet period after the last change before a run starts
    pub fn set_debounce_duration(&mut self, duration: Duration) {
        self.debounce_duration = duration;
    }

    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }
}

/// Whether a change to `path` can affect the generated grammar
pub fn is_metadata_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| METADATA_EXTENSIONS.contains(&ext.as_str()))
}

/// Serializes regeneration requests
///
/// At most one run is in flight; any number of requests made meanwhile
/// collapse into one pending follow-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegenerationQueue {
    in_flight: bool,
    pending: bool,
}

impl RegenerationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request; true when the caller should start a run now
    pub fn request(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Record the end of a run; true when a follow-up run should start now
    pub fn complete(&mut self) -> bool {
        if self.pending {
            self.pending = false;
            true
        } else {
            self.in_flight = false;
            false
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Run one regeneration off the async runtime, reporting through `done`
fn spawn_run(options: &GeneratorOptions, done: &tokio_mpsc::UnboundedSender<RegenerationReport>) {
    let options = options.clone();
    let done = done.clone();
    tokio::spawn(async move {
        let report = tokio::task::spawn_blocking(move || regenerate_now(&options))
            .await
            .unwrap_or_else(|e| RegenerationReport {
                success: false,
                diagnostics: vec![format!("Regeneration task failed: {e}")],
                summary: None,
            });
        let _ = done.send(report);
    });
}

/// Directories to watch for the given options
pub fn watch_roots(options: &GeneratorOptions) -> Result<Vec<PathBuf>> {
    let sources = SourceResolver::new(options).resolve()?;
    Ok(sources.watch_roots())
}

/// Regenerate once, then again on every relevant change until Ctrl-C
///
/// `on_report` sees the outcome of every run. Failed runs do not stop
/// the loop.
pub async fn watch<F>(options: GeneratorOptions, on_report: F) -> Result<()>
where
    F: FnMut(&RegenerationReport),
{
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    watch_until(options, on_report, ctrl_c).await
}

/// Like [`watch`], stopping when `shutdown` completes
///
/// Changes start a run once no further change arrives for the watcher's
/// debounce period. The run still in flight at shutdown is reported.
pub async fn watch_until<F, S>(
    options: GeneratorOptions,
    mut on_report: F,
    shutdown: S,
) -> Result<()>
where
    F: FnMut(&RegenerationReport),
    S: Future<Output = ()>,
{
    let roots = watch_roots(&options)?;
    let mut watcher = FileWatcher::new(&roots)?;
    let debounce = watcher.debounce_duration();
    let grammar_path = options.grammar_path();
    info!(
        "Watching {} director{} for metadata changes",
        roots.len(),
        if roots.len() == 1 { "y" } else { "ies" }
    );

    let (done_tx, mut done_rx) = tokio_mpsc::unbounded_channel();
    let mut queue = RegenerationQueue::new();
    queue.request();
    spawn_run(&options, &done_tx);

    let mut quiet_deadline: Option<tokio::time::Instant> = None;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = watcher.next_event() => {
                let Some(event) = event else {
                    warn!("File watcher stopped");
                    break;
                };
                if !is_metadata_path(&event.path) || event.path.ends_with(&grammar_path) {
                    continue;
                }
                debug!("{:?}: {}", event.kind, event.path.display());
                quiet_deadline = Some(tokio::time::Instant::now() + debounce);
            }
            _ = tokio::time::sleep_until(quiet_deadline.unwrap_or_else(tokio::time::Instant::now)),
                if quiet_deadline.is_some() =>
            {
                quiet_deadline = None;
                if queue.request() {
                    spawn_run(&options, &done_tx);
                }
            }
            Some(report) = done_rx.recv() => {
                on_report(&report);
                if queue.complete() {
                    spawn_run(&options, &done_tx);
                }
            }
            _ = &mut shutdown => {
                info!("Stopping watch");
                break;
            }
        }
    }

    if queue.is_in_flight()
        && let Some(report) = done_rx.recv().await
    {
        on_report(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    const GRAMMAR: &str = include_str!("../tests/fixtures/angelscript.tmLanguage.json");

    /// Install directory holding a core file, with the grammar beside it
    fn watched_install() -> (TempDir, GeneratorOptions) {
        let temp_dir = TempDir::new().unwrap();
        let install = temp_dir.path().join("OpenplanetNext");
        fs::create_dir_all(&install).unwrap();
        fs::write(
            install.join("OpenplanetCore.json"),
            r#"{"functions": [{"name": "GetApp"}]}"#,
        )
        .unwrap();
        let grammar = temp_dir.path().join("angelscript.tmLanguage.json");
        fs::write(&grammar, GRAMMAR).unwrap();

        let options = GeneratorOptions {
            openplanet_dirs: vec![install],
            grammar: Some(grammar),
            ..Default::default()
        };
        (temp_dir, options)
    }

    async fn next_report(
        reports: &mut tokio_mpsc::UnboundedReceiver<RegenerationReport>,
    ) -> RegenerationReport {
        tokio::time::timeout(Duration::from_secs(10), reports.recv())
            .await
            .expect("timed out waiting for a run")
            .expect("watch loop ended")
    }

    #[test]
    fn test_queue_starts_when_idle() {
        let mut queue = RegenerationQueue::new();
        assert!(queue.request());
        assert!(queue.is_in_flight());
        assert!(!queue.complete());
        assert!(!queue.is_in_flight());
    }

    #[test]
    fn test_queue_coalesces_requests_in_flight() {
        let mut queue = RegenerationQueue::new();
        assert!(queue.request());
        assert!(!queue.request());
        assert!(!queue.request());
        assert!(!queue.request());
        assert!(queue.is_pending());

        // exactly one follow-up
        assert!(queue.complete());
        assert!(queue.is_in_flight());
        assert!(!queue.is_pending());
        assert!(!queue.complete());
        assert!(!queue.is_in_flight());
    }

    #[test]
    fn test_request_during_follow_up_queues_again() {
        let mut queue = RegenerationQueue::new();
        queue.request();
        queue.request();
        assert!(queue.complete());
        assert!(!queue.request());
        assert!(queue.complete());
        assert!(!queue.complete());
    }

    #[test]
    fn test_metadata_paths() {
        assert!(is_metadata_path(Path::new("/op/OpenplanetNext.json")));
        assert!(is_metadata_path(Path::new("/op/Openplanet.h")));
        assert!(is_metadata_path(Path::new("/op/OPENPLANETCORE.JSON")));
        assert!(!is_metadata_path(Path::new("/op/Openplanet.log")));
        assert!(!is_metadata_path(Path::new("/op/Plugins")));
    }

    #[tokio::test]
    async fn test_file_watcher_creation() {
        let temp_dir = TempDir::new().unwrap();
        let mut watcher = FileWatcher::new(&[temp_dir.path().to_path_buf()]).unwrap();
        assert_eq!(watcher.debounce_duration(), DEFAULT_DEBOUNCE);
        watcher.set_debounce_duration(Duration::from_millis(50));
        assert_eq!(watcher.debounce_duration(), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_watching_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileWatcher::new(&[temp_dir.path().join("absent")]);
        assert!(matches!(result, Err(OpgenError::Watch { .. })));
    }

    #[test]
    fn test_watch_roots_of_explicit_files() {
        let temp_dir = TempDir::new().unwrap();
        let core = temp_dir.path().join("OpenplanetCore.json");
        std::fs::write(&core, "{}").unwrap();
        let options = GeneratorOptions {
            core: Some(core),
            ..Default::default()
        };
        let roots = watch_roots(&options).unwrap();
        assert_eq!(roots, vec![temp_dir.path().to_path_buf()]);
    }

    #[tokio::test]
    async fn test_truncate_then_write_regenerates_with_written_content() {
        let (_temp_dir, options) = watched_install();
        let core = options.openplanet_dirs[0].join("OpenplanetCore.json");
        let grammar = options.grammar_path();
        let (report_tx, mut reports) = tokio_mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let scenario = async {
            assert!(next_report(&mut reports).await.success);

            fs::write(&core, "").unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
            fs::write(
                &core,
                r#"{"functions": [{"name": "GetApp"}, {"name": "NewFunction"}]}"#,
            )
            .unwrap();

            let mut regenerated = false;
            for _ in 0..3 {
                let report = next_report(&mut reports).await;
                if report.success && fs::read_to_string(&grammar).unwrap().contains("NewFunction") {
                    regenerated = true;
                    break;
                }
            }
            let _ = stop_tx.send(());
            regenerated
        };
        let on_report = move |report: &RegenerationReport| {
            let _ = report_tx.send(report.clone());
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let (result, regenerated) = tokio::join!(watch_until(options, on_report, shutdown), scenario);
        result.unwrap();
        assert!(regenerated, "grammar never picked up the written metadata");
    }

    #[tokio::test]
    async fn test_burst_of_writes_runs_once() {
        let (_temp_dir, options) = watched_install();
        let core = options.openplanet_dirs[0].join("OpenplanetCore.json");
        let (report_tx, mut reports) = tokio_mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let scenario = async {
            assert!(next_report(&mut reports).await.success);

            for i in 0..5 {
                fs::write(&core, format!(r#"{{"functions": [{{"name": "Fn{i}"}}]}}"#)).unwrap();
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            let follow_up = next_report(&mut reports).await;
            let extra = tokio::time::timeout(Duration::from_millis(500), reports.recv()).await;
            let _ = stop_tx.send(());
            (follow_up, extra.is_err())
        };
        let on_report = move |report: &RegenerationReport| {
            let _ = report_tx.send(report.clone());
        };
        let shutdown = async {
            let _ = stop_rx.await;
        };

        let (result, (follow_up, quiet)) =
            tokio::join!(watch_until(options, on_report, shutdown), scenario);
        result.unwrap();
        assert!(follow_up.success, "{}", follow_up.message());
        assert!(quiet, "burst of writes started more than one run");
    }

    #[tokio::test]
    async fn test_watch_until_reports_initial_run_and_stops() {
        let (_temp_dir, options) = watched_install();
        let grammar = options.grammar_path();
        let mut reports = Vec::new();

        watch_until(options, |report| reports.push(report.clone()), async {})
            .await
            .unwrap();

        assert_eq!(reports.len(), 1);
        assert!(reports[0].success, "{}", reports[0].message());
        assert!(fs::read_to_string(grammar).unwrap().contains("GetApp"));
    }
}
