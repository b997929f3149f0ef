//! Structural validation of a parsed configuration

use crate::config::types::{Config, Task, TaskOption};
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    for (name, task) in &config.tasks {
        validate_task(name, task)?;
        validate_subtask_refs(config, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &Task) -> ConfigResult<()> {
    if !task.source.is_empty() && task.target.is_empty() {
        return Err(ConfigError::SourceWithoutTarget {
            task: name.to_string(),
        });
    }
    if !task.target.is_empty() && task.source.is_empty() {
        return Err(ConfigError::TargetWithoutSource {
            task: name.to_string(),
        });
    }

    for arg_name in task.args.keys() {
        if task.options.contains_key(arg_name) {
            return Err(ConfigError::DuplicateName {
                task: name.to_string(),
                name: arg_name.clone(),
            });
        }
    }

    for option in task.options.values() {
        validate_option(option)?;
    }

    for item in task.all_run_items() {
        item.check_actions().map_err(|detail| {
            ConfigError::Invalid(format!("task {name:?}: {detail}"))
        })?;
    }

    Ok(())
}

fn validate_option(option: &TaskOption) -> ConfigResult<()> {
    if option.required && !option.default.is_empty() {
        return Err(ConfigError::RequiredWithDefault {
            option: option.name.clone(),
        });
    }

    if option.is_bool() && !option.values.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "option {:?}: a bool option cannot specify values",
            option.name
        )));
    }

    if let Some(short) = &option.short {
        if short.chars().count() != 1 {
            return Err(ConfigError::Invalid(format!(
                "option {:?}: short flag {short:?} must be a single character",
                option.name
            )));
        }
    }

    Ok(())
}

/// Check that sub-task references point at defined tasks with matching
/// arg counts and known option names.
fn validate_subtask_refs(config: &Config, task: &Task) -> ConfigResult<()> {
    for item in task.all_run_items() {
        for sub in &item.task {
            let Some(target) = config.tasks.get(&sub.name) else {
                return Err(ConfigError::TaskNotFound(sub.name.clone()));
            };

            if sub.args.len() != target.args.len() {
                return Err(ConfigError::WrongArgCount {
                    task: sub.name.clone(),
                    expected: target.args.len(),
                    actual: sub.args.len(),
                });
            }

            for opt_name in sub.options.keys() {
                if !target.options.contains_key(opt_name) {
                    return Err(ConfigError::UnknownOption {
                        task: sub.name.clone(),
                        name: opt_name.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse::parse_config;

    #[test]
    fn test_validate_source_without_target() {
        let yaml = r#"
tasks:
  bad:
    source: "file.txt"
    run: echo bad
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(
                ConfigError::SourceWithoutTarget { .. }
            ))
        ));
    }

    #[test]
    fn test_validate_target_without_source() {
        let yaml = r#"
tasks:
  bad:
    target: out.txt
    run: echo bad
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(
                ConfigError::TargetWithoutSource { .. }
            ))
        ));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let yaml = r#"
tasks:
  bad:
    args:
      name: {}
    options:
      name:
        default: x
    run: echo bad
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(ConfigError::DuplicateName { .. }))
        ));
    }

    #[test]
    fn test_validate_required_with_default() {
        let yaml = r#"
tasks:
  bad:
    options:
      version:
        required: true
        default: "1.0"
    run: echo ${version}
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(
                ConfigError::RequiredWithDefault { .. }
            ))
        ));
    }

    #[test]
    fn test_validate_bool_with_values() {
        let yaml = r#"
tasks:
  bad:
    options:
      flag:
        type: bool
        values: [a, b]
    run: echo ${flag}
"#;
        assert!(parse_config(yaml, None).is_err());
    }

    #[test]
    fn test_validate_subtask_must_exist() {
        let yaml = r#"
tasks:
  all:
    run:
      - task: nope
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(ConfigError::TaskNotFound(_)))
        ));
    }

    #[test]
    fn test_validate_subtask_arg_count() {
        let yaml = r#"
tasks:
  all:
    run:
      - task:
          name: child
          args: [one, two]
  child:
    args:
      only: {}
    run: echo ${only}
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(ConfigError::WrongArgCount { .. }))
        ));
    }

    #[test]
    fn test_validate_subtask_unknown_option() {
        let yaml = r#"
tasks:
  all:
    run:
      - task:
          name: child
          options:
            nope: x
  child:
    run: echo hi
"#;
        let result = parse_config(yaml, None);
        assert!(matches!(
            result,
            Err(crate::WhiskError::Config(ConfigError::UnknownOption { .. }))
        ));
    }

    #[test]
    fn test_validate_valid_config() {
        let yaml = r#"
tasks:
  all:
    run:
      - task: child
  child:
    quiet: true
    run: echo hi
"#;
        assert!(parse_config(yaml, None).is_ok());
    }
}
