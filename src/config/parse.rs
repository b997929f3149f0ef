//! Configuration file parsing and discovery

use crate::config::types::{Config, Task};
use crate::config::validate::validate_config;
use crate::error::{ConfigError, ConfigResult, Result};
use indexmap::IndexMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["whisk.yml", "whisk.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(
        env::current_dir()
            .map_err(|e| ConfigError::Invalid(format!("getting current directory: {e}")))?,
    )
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                return Err(ConfigError::NotFound(searched_paths.join(", ")));
            }
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("reading {}: {e}", path.display())))?;

    parse_config(&contents, Some(path))
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str, config_path: Option<&Path>) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(yaml)?;

    if let Some(base_path) = config_path {
        process_includes(&mut config, base_path)?;
    }

    assign_names(&mut config);
    merge_global_options(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf)> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

/// Replace tasks using `include` with the referenced definitions.
fn process_includes(config: &mut Config, config_path: &Path) -> ConfigResult<()> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let task_names: Vec<String> = config.tasks.keys().cloned().collect();

    for task_name in task_names {
        let Some(task) = config.tasks.get(&task_name) else {
            continue;
        };
        let Some(include_path) = task.include.clone() else {
            continue;
        };

        if task.has_fields_besides_include() {
            return Err(ConfigError::Invalid(format!(
                "task {task_name:?}: tasks using include may not specify other fields"
            )));
        }

        let full_include_path = base_dir.join(&include_path);
        let included = load_included_task(&full_include_path)?;
        config.tasks.insert(task_name, included);
    }

    Ok(())
}

/// Load a full task definition from an included file.
fn load_included_task(path: &Path) -> ConfigResult<Task> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Include {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    // Unknown keys fail here: Task derives deny_unknown_fields.
    let task: Task = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Include {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if task.include.is_some() {
        return Err(ConfigError::Include {
            path: path.to_path_buf(),
            detail: "included files may not themselves use include".into(),
        });
    }

    Ok(task)
}

/// Inject mapping keys as names on tasks, options, and args.
fn assign_names(config: &mut Config) {
    for (name, opt) in config.options.iter_mut() {
        opt.name = name.clone();
    }
    for (name, task) in config.tasks.iter_mut() {
        task.name = name.clone();
        task.assign_member_names();
    }
}

/// Prepend the global options to every task's option list.
///
/// Globals resolve before task options and a task may not redefine one. The
/// top-level list is drained afterwards so a serialized catalogue parses to
/// the same tasks.
fn merge_global_options(config: &mut Config) -> ConfigResult<()> {
    if config.options.is_empty() {
        return Ok(());
    }

    for (task_name, task) in config.tasks.iter_mut() {
        for name in config.options.keys() {
            if task.options.contains_key(name) || task.args.contains_key(name) {
                return Err(ConfigError::GlobalOptionCollision {
                    task: task_name.clone(),
                    name: name.clone(),
                });
            }
        }

        let mut merged = config.options.clone();
        merged.extend(std::mem::take(&mut task.options));
        task.options = merged;
    }

    config.options.clear();
    Ok(())
}

/// Re-inject names into a task copy after an interpolation round trip.
pub(crate) fn restore_task_names(task: &mut Task, name: &str, vars: IndexMap<String, String>) {
    task.name = name.to_string();
    task.vars = vars;
    task.assign_member_names();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
tasks:
  hello:
    usage: Say hello
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(config.tasks.len(), 1);
        assert_eq!(config.tasks.get("hello").unwrap().name, "hello");
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");

        fs::write(
            &config_path,
            r#"
tasks:
  test:
    run: echo "test"
"#,
        )
        .unwrap();

        let found = find_config_file_from(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        let sub_dir = temp_dir.path().join("subdir");

        fs::create_dir(&sub_dir).unwrap();
        fs::write(
            &config_path,
            r#"
tasks:
  test:
    run: echo "test"
"#,
        )
        .unwrap();

        let found = find_config_file_from(sub_dir).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = find_config_file_from(temp_dir.path().to_path_buf());
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_parse_config_with_name_and_usage() {
        let yaml = r#"
name: my-app
usage: My application
tasks:
  hello:
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(config.name, Some("my-app".to_string()));
        assert_eq!(config.usage, Some("My application".to_string()));
    }

    #[test]
    fn test_parse_config_with_interpreter() {
        let yaml = r#"
interpreter:
  - bash
  - -c
tasks:
  hello:
    run: echo "hello"
"#;
        let config = parse_config(yaml, None).unwrap();
        assert_eq!(
            config.interpreter,
            Some(vec!["bash".to_string(), "-c".to_string()])
        );
    }

    #[test]
    fn test_include_substitutes_task() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("build.yml"),
            r#"
usage: Build everything
run: echo building
"#,
        )
        .unwrap();

        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            &config_path,
            r#"
tasks:
  build:
    include: build.yml
"#,
        )
        .unwrap();

        let config = parse_config_file(&config_path).unwrap();
        let task = config.tasks.get("build").unwrap();
        assert_eq!(task.usage, Some("Build everything".to_string()));
        assert_eq!(task.name, "build");
        assert_eq!(task.run.len(), 1);
    }

    #[test]
    fn test_include_rejects_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            &config_path,
            r#"
tasks:
  build:
    include: build.yml
    usage: not allowed
"#,
        )
        .unwrap();

        let err = parse_config_file(&config_path).unwrap_err().to_string();
        assert!(err.contains("may not specify other fields"), "got: {err}");
    }

    #[test]
    fn test_include_strict_parsing() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("build.yml"),
            r#"
run: echo building
unexpected: key
"#,
        )
        .unwrap();

        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            &config_path,
            r#"
tasks:
  build:
    include: build.yml
"#,
        )
        .unwrap();

        assert!(parse_config_file(&config_path).is_err());
    }

    #[test]
    fn test_include_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("whisk.yml");
        fs::write(
            &config_path,
            r#"
tasks:
  build:
    include: nope.yml
"#,
        )
        .unwrap();

        let result = parse_config_file(&config_path);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(ConfigError::Include { .. }))
        ));
    }

    #[test]
    fn test_global_options_merged_into_tasks() {
        let yaml = r#"
options:
  env:
    default: dev
tasks:
  deploy:
    options:
      region:
        default: local
    run: echo ${env} ${region}
"#;
        let config = parse_config(yaml, None).unwrap();
        let task = config.tasks.get("deploy").unwrap();
        let names: Vec<&String> = task.options.keys().collect();
        assert_eq!(names, ["env", "region"]);
        assert_eq!(task.options.get("env").unwrap().name, "env");
    }

    #[test]
    fn test_global_option_collision() {
        let yaml = r#"
options:
  env:
    default: dev
tasks:
  deploy:
    options:
      env:
        default: prod
    run: echo ${env}
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(
                ConfigError::GlobalOptionCollision { .. }
            ))
        ));
    }
}
