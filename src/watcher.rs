use crate::cache::SharedCache;
use crate::ignore_rules::IgnoreRules;
use crate::tokenizer::TokenCounter;
use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

// ---------------------------------------------------------------------------
// Change watcher — keeps the token cost cache consistent with the tree.
//
// Raw notify events are translated into typed ChangeEvents and sent over a
// channel; a single consumer task applies them to the shared cache serially.
// One writer means updates to the same key can never interleave, without
// per-key locking. Event delivery gaps are non-fatal: a stale entry is
// corrected the next time a reader revalidates against the on-disk stat
// (an accepted eventual-consistency window).
//
// State machine per path: Unknown → Known on the first successful refresh;
// Known → Known on modify (refresh); Known → Unknown on delete (invalidate).
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

fn translate(event: notify::Event) -> Vec<ChangeEvent> {
    use notify::EventKind;
    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(ChangeEvent::Created).collect(),
        EventKind::Modify(_) => event.paths.into_iter().map(ChangeEvent::Modified).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(ChangeEvent::Deleted).collect(),
        _ => Vec::new(),
    }
}

/// Apply one event to the cache. Created/Modified only touch paths that are
/// cache members (inside the root, not ignored, non-empty extension); Deleted
/// always drops the entry.
pub fn apply_change(
    root: &Path,
    rules: &IgnoreRules,
    cache: &SharedCache,
    counter: &dyn TokenCounter,
    event: ChangeEvent,
) {
    match event {
        ChangeEvent::Deleted(path) => {
            let Ok(mut guard) = cache.write() else { return };
            guard.invalidate(&path);
        }
        ChangeEvent::Created(path) | ChangeEvent::Modified(path) => {
            let Ok(rel) = path.strip_prefix(root) else { return };
            let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if extension.is_empty() {
                return;
            }
            if rules.is_ignored(rel, false) {
                return;
            }
            if !path.is_file() {
                return; // directory events and already-gone paths
            }
            let Ok(mut guard) = cache.write() else { return };
            if let Err(err) = guard.refresh(&path, counter) {
                crate::warn_log!("refresh failed for {}: {err:#}", path.display());
            }
        }
    }
}

async fn consume(
    mut rx: UnboundedReceiver<ChangeEvent>,
    root: PathBuf,
    rules: Arc<IgnoreRules>,
    cache: SharedCache,
    counter: Arc<dyn TokenCounter>,
) {
    while let Some(event) = rx.recv().await {
        apply_change(&root, &rules, &cache, counter.as_ref(), event);
    }
}

pub struct WatchHandle {
    // Dropping the watcher stops event delivery, so it rides along.
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl WatchHandle {
    /// Runs until the event channel closes (i.e. the watcher is dropped or
    /// the surrounding runtime shuts down).
    pub async fn run_to_completion(self) {
        let _ = self.task.await;
    }
}

/// Start watching `root` recursively and folding change events into `cache`.
/// Must be called from within a tokio runtime.
pub fn watch(
    root: &Path,
    rules: Arc<IgnoreRules>,
    cache: SharedCache,
    counter: Arc<dyn TokenCounter>,
) -> Result<WatchHandle> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for change in translate(event) {
                    let _ = tx.send(change);
                }
            }
            Err(err) => crate::warn_log!("watch error: {err}"),
        },
        notify::Config::default(),
    )?;
    watcher.watch(root, RecursiveMode::Recursive)?;

    let task = tokio::spawn(consume(rx, root.to_path_buf(), rules, cache, counter));

    Ok(WatchHandle {
        _watcher: watcher,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TokenCostCache;
    use crate::tokenizer::HeuristicCounter;
    use tempfile::TempDir;

    fn shared_cache(root: &Path) -> SharedCache {
        TokenCostCache::build(root, &IgnoreRules::empty(), &HeuristicCounter::default()).into_shared()
    }

    #[test]
    fn create_then_modify_then_delete_walks_the_state_machine() {
        let tmp = TempDir::new().unwrap();
        let rules = IgnoreRules::empty();
        let cache = shared_cache(tmp.path());
        let counter = HeuristicCounter::default();
        let file = tmp.path().join("a.js");

        // Unknown → Known
        std::fs::write(&file, "let x = 1;\n").unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Created(file.clone()));
        let after_create = cache.read().unwrap().get(&file).map(|e| e.tokens);
        assert!(after_create.is_some());

        // Known → Known (updated)
        std::fs::write(&file, "let x = 1;\nlet y = 2;\nlet z = 3;\n").unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Modified(file.clone()));
        let after_modify = cache.read().unwrap().get(&file).map(|e| e.tokens);
        assert!(after_modify > after_create, "bigger content must cost more");

        // Known → Unknown
        std::fs::remove_file(&file).unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Deleted(file.clone()));
        assert!(cache.read().unwrap().get(&file).is_none());
    }

    #[test]
    fn ignored_and_extension_less_paths_never_enter_the_cache() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".gitignore"), "*.log\n").unwrap();
        let rules = IgnoreRules::load(tmp.path());
        let cache = shared_cache(tmp.path());
        let counter = HeuristicCounter::default();

        let log = tmp.path().join("trace.log");
        std::fs::write(&log, "noise").unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Created(log.clone()));
        assert!(cache.read().unwrap().get(&log).is_none());

        let noext = tmp.path().join("Makefile");
        std::fs::write(&noext, "all:").unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Created(noext.clone()));
        assert!(cache.read().unwrap().get(&noext).is_none());
    }

    #[test]
    fn events_outside_the_root_are_no_ops() {
        let tmp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let rules = IgnoreRules::empty();
        let cache = shared_cache(tmp.path());
        let counter = HeuristicCounter::default();

        let foreign = elsewhere.path().join("b.js");
        std::fs::write(&foreign, "x").unwrap();
        apply_change(tmp.path(), &rules, &cache, &counter, ChangeEvent::Created(foreign.clone()));
        assert!(cache.read().unwrap().get(&foreign).is_none());
    }

    #[tokio::test]
    async fn consumer_applies_queued_events_in_order() {
        let tmp = TempDir::new().unwrap();
        let rules = Arc::new(IgnoreRules::empty());
        let cache = shared_cache(tmp.path());
        let counter: Arc<dyn TokenCounter> = Arc::new(HeuristicCounter::default());

        let file = tmp.path().join("a.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(consume(
            rx,
            tmp.path().to_path_buf(),
            rules,
            cache.clone(),
            counter,
        ));

        tx.send(ChangeEvent::Created(file.clone())).unwrap();
        tx.send(ChangeEvent::Deleted(file.clone())).unwrap();
        drop(tx);
        task.await.unwrap();

        // Created then Deleted, applied serially: the final state is absent.
        assert!(cache.read().unwrap().get(&file).is_none());
    }
}
