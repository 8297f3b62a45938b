//! Concurrent directory walker.
//!
//! A fixed pool of worker threads drains one job queue. Jobs are either
//! "list this directory" or "process this file". Listing a directory pushes
//! one job per entry and bumps that directory's pending counter once per job,
//! plus one for the listing itself.
//!
//! When a job finishes it decrements its parent's counter. The job that takes
//! a counter to zero completes the directory: it prunes the now-empty
//! directories under it, bottom-up, then decrements the grandparent. A
//! directory is therefore never pruned before every file and subdirectory
//! beneath it has been handled, and no thread ever blocks waiting on a
//! subtree.
//!
//! Paths the run itself created (moved files, extraction directories) are
//! skipped when they show up in a listing.

use crate::file_category::Category;
use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult};
use crate::ledger::RunState;
use crossbeam_channel::{Receiver, Sender};
use indicatif::ProgressBar;
use serde::Serialize;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// A directory whose subtree is still being processed.
#[derive(Debug)]
struct DirNode {
    path: PathBuf,
    parent: Option<Arc<DirNode>>,
    /// Outstanding child jobs, plus one while the directory is being listed.
    pending: AtomicUsize,
}

impl DirNode {
    fn root(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            parent: None,
            pending: AtomicUsize::new(1),
        })
    }

    fn child(path: PathBuf, parent: &Arc<DirNode>) -> Arc<Self> {
        Arc::new(Self {
            path,
            parent: Some(Arc::clone(parent)),
            pending: AtomicUsize::new(1),
        })
    }
}

enum Job {
    Dir(Arc<DirNode>),
    File { path: PathBuf, parent: Arc<DirNode> },
    Shutdown,
}

/// Counters collected over one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Files handed to the organizer, including ones that failed.
    pub files: usize,
    /// Directories listed, the walk root included.
    pub directories: usize,
    /// Empty directories removed.
    pub pruned: usize,
}

#[derive(Debug, Default)]
struct WalkCounters {
    files: AtomicUsize,
    directories: AtomicUsize,
    pruned: AtomicUsize,
}

impl WalkCounters {
    fn snapshot(&self) -> WalkStats {
        WalkStats {
            files: self.files.load(Ordering::Relaxed),
            directories: self.directories.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every worker of one walk.
struct WalkContext {
    organizer: FileOrganizer,
    state: Arc<RunState>,
    destination_root: PathBuf,
    prune: bool,
    jobs: Sender<Job>,
    done: Sender<()>,
    progress: Option<ProgressBar>,
    counters: Arc<WalkCounters>,
}

impl WalkContext {
    fn run_worker(&self, jobs: &Receiver<Job>) {
        for job in jobs.iter() {
            match job {
                Job::Shutdown => break,
                Job::Dir(node) => self.list_dir(node),
                Job::File { path, parent } => {
                    self.process_file(&path);
                    self.finish_child(parent);
                }
            }
        }
    }

    fn list_dir(&self, node: Arc<DirNode>) {
        self.counters.directories.fetch_add(1, Ordering::Relaxed);

        // The listing is read in full before any child is dispatched, so
        // directories created by those children never show up in it.
        match fs::read_dir(&node.path).and_then(|rd| rd.collect::<io::Result<Vec<_>>>()) {
            Ok(entries) => {
                for entry in entries {
                    let path = entry.path();
                    if self.state.is_placed(&path) {
                        debug!("skipping {} placed by this run", path.display());
                        continue;
                    }

                    // Symlinks are moved like files, never followed.
                    let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
                    let job = if is_dir {
                        Job::Dir(DirNode::child(path, &node))
                    } else {
                        Job::File {
                            path,
                            parent: Arc::clone(&node),
                        }
                    };

                    node.pending.fetch_add(1, Ordering::AcqRel);
                    if self.jobs.send(job).is_err() {
                        error!("job queue closed while listing {}", node.path.display());
                        node.pending.fetch_sub(1, Ordering::AcqRel);
                    }
                }
            }
            Err(e) => {
                let err = OrganizeError::ReadDirFailed {
                    path: node.path.clone(),
                    source: e,
                };
                warn!("{}", err);
                self.state.record_failure(&node.path, err.to_string());
            }
        }

        // Release the listing's own slot.
        self.finish_child(node);
    }

    fn process_file(&self, path: &Path) {
        self.counters.files.fetch_add(1, Ordering::Relaxed);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.organizer
                .process(path, &self.destination_root, &self.state)
        }));
        match outcome {
            Ok(Ok(category)) => debug!("{} -> {}", path.display(), category),
            Ok(Err(e)) => {
                warn!("{}", e);
                self.state.record_failure(path, e.to_string());
            }
            Err(_) => {
                error!("processing {} panicked", path.display());
                self.state.record_failure(path, "processing panicked");
            }
        }

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }

    /// Decrements `node`'s counter and completes every ancestor whose counter
    /// reaches zero as a result.
    fn finish_child(&self, node: Arc<DirNode>) {
        let mut current = node;
        loop {
            if current.pending.fetch_sub(1, Ordering::AcqRel) != 1 {
                return;
            }

            self.complete_dir(&current);

            match &current.parent {
                Some(parent) => current = Arc::clone(parent),
                None => {
                    let _ = self.done.send(());
                    return;
                }
            }
        }
    }

    fn complete_dir(&self, node: &DirNode) {
        debug!("finished {}", node.path.display());
        if !self.prune {
            return;
        }

        let is_root = node.parent.is_none();
        let removed = prune_empty_dirs(&node.path, is_root, |dir| {
            if is_root {
                return Some(fs::remove_dir(dir));
            }
            // Until the whole walk is done other workers may still be
            // writing into these. The placed check and the removal happen
            // under one lock, so an extraction directory marked concurrently
            // is either skipped here or recreated after this removal.
            if self.is_category_dir(dir) {
                return None;
            }
            self.state.unless_placed(dir, || fs::remove_dir(dir))
        });
        self.counters.pruned.fetch_add(removed, Ordering::Relaxed);
    }

    fn is_category_dir(&self, dir: &Path) -> bool {
        if dir.parent() != Some(self.destination_root.as_path()) {
            return false;
        }
        dir.file_name()
            .is_some_and(|name| Category::ALL.iter().any(|c| name == c.dir_name()))
    }
}

/// Removes empty directories under `path`, deepest first.
///
/// `path` itself is removed too when it ends up empty, unless `keep_top` is
/// set. Each candidate is handed to `remove`, which either removes it
/// (usually with `fs::remove_dir`) or returns `None` to leave it alone.
/// Returns the number of directories removed.
pub fn prune_empty_dirs<F>(path: &Path, keep_top: bool, remove: F) -> usize
where
    F: Fn(&Path) -> Option<io::Result<()>>,
{
    let min_depth = usize::from(keep_top);
    let mut removed = 0;

    for entry in WalkDir::new(path)
        .min_depth(min_depth)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
    {
        let dir = entry.path();
        let Some(result) = remove(dir) else {
            continue;
        };
        match result {
            Ok(()) => {
                debug!("removed empty directory {}", dir.display());
                removed += 1;
            }
            // Not empty, or already gone.
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound
                ) => {}
            Err(e) => warn!("could not remove {}: {}", dir.display(), e),
        }
    }

    removed
}

/// Walks a directory tree on a bounded worker pool, handing every file to a
/// [`FileOrganizer`].
pub struct TreeWalker {
    organizer: FileOrganizer,
    workers: usize,
    progress: Option<ProgressBar>,
}

impl TreeWalker {
    /// Creates a walker with one worker per CPU.
    pub fn new(organizer: FileOrganizer) -> Self {
        Self {
            organizer,
            workers: num_cpus::get(),
            progress: None,
        }
    }

    /// Sets the worker pool size. Zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Ticks `pb` once per processed file.
    pub fn progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    /// Sorts everything under `folder` into category folders of
    /// `destination_root`, then prunes empty directories under `folder`.
    ///
    /// `folder` itself is never removed. In dry-run mode nothing is moved or
    /// pruned. Per-file failures are recorded in `state`; only a missing
    /// `folder` or a failure to start the workers is returned as an error.
    pub fn walk(
        &self,
        folder: &Path,
        destination_root: &Path,
        state: &Arc<RunState>,
    ) -> OrganizeResult<WalkStats> {
        if !folder.is_dir() {
            return Err(OrganizeError::InvalidBasePath {
                path: folder.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded::<Job>();
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        let counters = Arc::new(WalkCounters::default());
        let ctx = Arc::new(WalkContext {
            organizer: self.organizer.clone(),
            state: Arc::clone(state),
            destination_root: destination_root.to_path_buf(),
            prune: !self.organizer.is_dry_run(),
            jobs: jobs_tx.clone(),
            done: done_tx,
            progress: self.progress.clone(),
            counters: Arc::clone(&counters),
        });

        info!(
            "walking {} with {} workers",
            folder.display(),
            self.workers
        );

        let mut handles = Vec::with_capacity(self.workers);
        for i in 0..self.workers {
            let ctx = Arc::clone(&ctx);
            let jobs_rx = jobs_rx.clone();
            let spawned = thread::Builder::new()
                .name(format!("file-sorter-worker-{i}"))
                .spawn(move || ctx.run_worker(&jobs_rx));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    for _ in &handles {
                        let _ = jobs_tx.send(Job::Shutdown);
                    }
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(OrganizeError::WorkerSpawnFailed { source });
                }
            }
        }

        // Only the workers hold the done sender from here on, so `recv`
        // fails instead of hanging if they all exit early.
        drop(ctx);
        let _ = jobs_tx.send(Job::Dir(DirNode::root(folder.to_path_buf())));

        // Every job has finished once the root completes.
        if done_rx.recv().is_err() {
            error!("all workers exited before the walk finished");
        }
        let stats = counters.snapshot();

        for _ in &handles {
            let _ = jobs_tx.send(Job::Shutdown);
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("a worker thread panicked");
            }
        }

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }

        info!(
            "walk done: {} files, {} directories, {} pruned",
            stats.files, stats.directories, stats.pruned
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    fn walker(workers: usize) -> TreeWalker {
        TreeWalker::new(FileOrganizer::new().print_warnings(false)).workers(workers)
    }

    #[test]
    fn test_prune_removes_nested_empty_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::create_dir_all(dir.path().join("d")).unwrap();
        touch(&dir.path().join("d/keep.txt"));

        let removed = prune_empty_dirs(dir.path(), true, |d| Some(fs::remove_dir(d)));

        assert_eq!(removed, 3);
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("d/keep.txt").exists());
        assert!(dir.path().exists());
    }

    #[test]
    fn test_prune_removes_top_unless_kept() {
        let dir = TempDir::new().unwrap();
        let top = dir.path().join("top");
        fs::create_dir_all(top.join("inner")).unwrap();

        assert_eq!(prune_empty_dirs(&top, false, |d| Some(fs::remove_dir(d))), 2);
        assert!(!top.exists());
    }

    #[test]
    fn test_prune_respects_protection() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("keep/inner")).unwrap();
        let keep = dir.path().join("keep");

        prune_empty_dirs(dir.path(), true, |p| {
            if p == keep {
                None
            } else {
                Some(fs::remove_dir(p))
            }
        });

        assert!(keep.exists());
        assert!(!keep.join("inner").exists());
    }

    #[test]
    fn test_walk_flattens_nested_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("top.txt"));
        touch(&root.join("one/pic.png"));
        touch(&root.join("one/two/clip.mp4"));
        touch(&root.join("one/two/three/tune.ogg"));
        fs::create_dir_all(root.join("empty/deeper")).unwrap();
        let state = Arc::new(RunState::new());

        let stats = walker(4).walk(root, root, &state).expect("walk");

        assert_eq!(stats.files, 4);
        assert_eq!(stats.directories, 6);
        assert!(root.join("documents/top.txt").is_file());
        assert!(root.join("images/pic.png").is_file());
        assert!(root.join("video/clip.mp4").is_file());
        assert!(root.join("music/tune.ogg").is_file());
        assert!(!root.join("one").exists());
        assert!(!root.join("empty").exists());
        assert_eq!(state.ledger.total(), 4);
    }

    #[test]
    fn test_walk_with_single_worker() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for i in 0..20 {
            touch(&root.join(format!("d{}/f{i}.txt", i % 3)));
        }
        let state = Arc::new(RunState::new());

        walker(1).walk(root, root, &state).expect("walk");

        assert_eq!(state.ledger.files_in(Category::Documents).len(), 20);
        assert!(!root.join("d0").exists());
    }

    #[test]
    fn test_walk_many_files_many_workers() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for i in 0..200 {
            touch(&root.join(format!("a{}/b{}/file_{i}.jpg", i % 5, i % 7)));
        }
        let state = Arc::new(RunState::new());

        let stats = walker(8).walk(root, root, &state).expect("walk");

        assert_eq!(stats.files, 200);
        assert_eq!(state.ledger.files_in(Category::Images).len(), 200);
        assert_eq!(fs::read_dir(root.join("images")).unwrap().count(), 200);
        let leftovers: Vec<_> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec!["images"]);
    }

    #[test]
    fn test_walk_keeps_empty_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("inbox");
        fs::create_dir(&root).unwrap();

        let stats = walker(2)
            .walk(&root, &root, &Arc::new(RunState::new()))
            .expect("walk");

        assert_eq!(stats.files, 0);
        assert!(root.is_dir());
    }

    #[test]
    fn test_walk_rejects_missing_folder() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let result = walker(2).walk(&missing, &missing, &Arc::new(RunState::new()));

        assert!(matches!(result, Err(OrganizeError::InvalidBasePath { .. })));
    }

    #[test]
    fn test_dry_run_walk_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("sub/a.txt"));
        fs::create_dir(root.join("empty")).unwrap();
        let state = Arc::new(RunState::new());

        TreeWalker::new(FileOrganizer::new().dry_run(true))
            .workers(2)
            .walk(root, root, &state)
            .expect("walk");

        assert!(root.join("sub/a.txt").is_file());
        assert!(root.join("empty").is_dir());
        assert!(!root.join("documents").exists());
        assert_eq!(state.ledger.files_in(Category::Documents), vec!["a.txt"]);
    }

    #[test]
    fn test_walk_into_separate_destination() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in");
        let dest = dir.path().join("out");
        touch(&source.join("x/song.wav"));
        fs::create_dir(&dest).unwrap();

        walker(3)
            .walk(&source, &dest, &Arc::new(RunState::new()))
            .expect("walk");

        assert!(dest.join("music/song.wav").is_file());
        assert!(source.is_dir());
        assert!(!source.join("x").exists());
    }
}
