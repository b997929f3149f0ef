//! Common test utilities

// Not every test file uses every helper.
#![allow(dead_code)]

use indexmap::IndexMap;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use whisk::config::{parse_config, Config};
use whisk::runner::{Cache, Context, TaskRunner};
use whisk::ui::{Logger, Verbosity};

/// A temporary directory holding a whisk.yml and anything tasks create
pub struct TestProject {
    pub dir: TempDir,
    pub config: Config,
}

impl TestProject {
    pub fn new(yaml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("whisk.yml");
        fs::write(&config_path, yaml).unwrap();
        let config = parse_config(yaml, Some(&config_path)).unwrap();
        TestProject { dir, config }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("whisk.yml")
    }

    pub fn context(&self) -> Context {
        Context::new(self.config_path(), Logger::new(Verbosity::Silent))
    }

    pub fn run(&self, task: &str) -> whisk::Result<()> {
        self.run_with(task, &[], &IndexMap::new())
    }

    pub fn run_with(
        &self,
        task: &str,
        args: &[String],
        opts: &IndexMap<String, String>,
    ) -> whisk::Result<()> {
        let cache = Cache::with_base(self.dir.path().join(".cache"), &self.config_path());
        TaskRunner::new(&self.config, cache).run(task, args, opts, &self.context())
    }

    pub fn read(&self, file: &str) -> String {
        fs::read_to_string(self.dir.path().join(file)).unwrap()
    }

    pub fn exists(&self, file: &str) -> bool {
        self.dir.path().join(file).exists()
    }

    pub fn write(&self, file: &str, contents: &str) {
        fs::write(self.dir.path().join(file), contents).unwrap()
    }

    pub fn mkdir(&self, dir: &str) {
        fs::create_dir_all(self.dir.path().join(dir)).unwrap()
    }
}
