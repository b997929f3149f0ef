//! Source/target caching
//!
//! A task declaring `source` and `target` globs is skipped when its targets
//! exist and its sources are unchanged since the last successful run. Each
//! configuration file gets its own cache directory, keyed by the hash of its
//! absolute path; inside, one marker file per task holds the hex fingerprint
//! of the sources it last ran against.

use crate::config::Task;
use crate::error::{RunError, RunResult};
use crate::runner::Context;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-configuration fingerprint store
#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
}

impl Cache {
    /// Cache for a config file, under `$WHISK_CACHE_HOME` or the user cache
    /// directory.
    pub fn new(cfg_path: &Path) -> RunResult<Cache> {
        let base = match env::var_os("WHISK_CACHE_HOME") {
            Some(home) => PathBuf::from(home),
            None => dirs::cache_dir()
                .ok_or_else(|| RunError::Cache("cannot determine a cache directory".into()))?
                .join("whisk"),
        };
        Ok(Cache::with_base(base, cfg_path))
    }

    /// Cache rooted at an explicit base directory.
    pub fn with_base(base: PathBuf, cfg_path: &Path) -> Cache {
        let absolute = cfg_path
            .canonicalize()
            .unwrap_or_else(|_| cfg_path.to_path_buf());
        let key = blake3::hash(absolute.to_string_lossy().as_bytes());
        Cache {
            root: base.join(key.to_hex().to_string()),
        }
    }

    fn marker_path(&self, task_name: &str) -> PathBuf {
        self.root.join(task_name)
    }

    /// Whether the task's targets exist and its sources are unchanged.
    ///
    /// Read problems are logged at debug level and mean "not up to date".
    pub fn is_up_to_date(&self, task: &Task, ctx: &Context) -> bool {
        if task.source.is_empty() || task.target.is_empty() {
            return false;
        }

        match self.check_fingerprint(task, ctx) {
            Ok(fresh) => fresh,
            Err(err) => {
                ctx.logger
                    .debug(&format!("cache check for {:?}: {err}", task.name));
                false
            }
        }
    }

    fn check_fingerprint(&self, task: &Task, ctx: &Context) -> RunResult<bool> {
        let dir = ctx.dir();

        let targets = expand_globs(&dir, &task.target)?;
        if targets.is_empty() {
            return Ok(false);
        }

        let current = fingerprint(&dir, &task.source)?;
        let stored = fs::read_to_string(self.marker_path(&task.name))
            .map_err(|e| RunError::Cache(e.to_string()))?;

        Ok(stored.trim_end() == current)
    }

    /// Record the current source fingerprint after a successful run.
    pub fn write(&self, task: &Task, ctx: &Context) -> RunResult<()> {
        if task.source.is_empty() || task.target.is_empty() {
            return Ok(());
        }

        let current = fingerprint(&ctx.dir(), &task.source)?;
        fs::create_dir_all(&self.root)
            .map_err(|e| RunError::Cache(format!("creating {}: {e}", self.root.display())))?;

        let marker = self.marker_path(&task.name);
        fs::write(&marker, format!("{current}\n"))
            .map_err(|e| RunError::Cache(format!("writing {}: {e}", marker.display())))
    }

    /// Drop the marker for one task, or the whole per-config cache.
    pub fn clean(&self, task_name: Option<&str>) -> RunResult<()> {
        let result = match task_name {
            Some(name) => fs::remove_file(self.marker_path(name)),
            None => fs::remove_dir_all(&self.root),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunError::Cache(e.to_string())),
        }
    }
}

/// Expand glob patterns relative to `base` into a sorted, deduplicated list
/// of files. A leading `!` excludes matching relative paths.
pub fn expand_globs(base: &Path, patterns: &[String]) -> RunResult<Vec<PathBuf>> {
    let mut includes = Vec::new();
    let mut excludes = Vec::new();
    for pattern in patterns {
        match pattern.strip_prefix('!') {
            Some(negated) => excludes.push(
                glob::Pattern::new(negated)
                    .map_err(|e| RunError::Cache(format!("pattern {negated:?}: {e}")))?,
            ),
            None => includes.push(pattern),
        }
    }

    let mut files = BTreeSet::new();
    for pattern in includes {
        let full = base.join(pattern);
        let entries = glob::glob(&full.to_string_lossy())
            .map_err(|e| RunError::Cache(format!("pattern {pattern:?}: {e}")))?;
        for entry in entries {
            let path = entry.map_err(|e| RunError::Cache(e.to_string()))?;
            if path.is_file() {
                files.insert(path);
            }
        }
    }

    let matches_exclude = |path: &Path| {
        let relative = path.strip_prefix(base).unwrap_or(path);
        excludes.iter().any(|pattern| pattern.matches_path(relative))
    };

    Ok(files.into_iter().filter(|p| !matches_exclude(p)).collect())
}

/// Digest over the sorted relative paths and content digests of every file
/// matched by the patterns.
pub fn fingerprint(base: &Path, patterns: &[String]) -> RunResult<String> {
    let files = expand_globs(base, patterns)?;

    let mut hasher = blake3::Hasher::new();
    for file in files {
        let relative = file.strip_prefix(base).unwrap_or(&file);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(&[0]);

        let contents = fs::read(&file)
            .map_err(|e| RunError::Cache(format!("reading {}: {e}", file.display())))?;
        hasher.update(blake3::hash(&contents).as_bytes());
    }

    Ok(hasher.finalize().to_hex().to_string())
}
