//! Integration tests for task execution

mod common;

use common::TestProject;
use indexmap::IndexMap;
use whisk::error::{ConfigError, RunError};
use whisk::WhiskError;

fn opts(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_option_default_interpolates_into_command() {
    let project = TestProject::new(
        r#"
tasks:
  greet:
    options:
      name:
        default: world
    run: echo hello ${name} > out.txt
"#,
    );

    project.run("greet").unwrap();
    assert_eq!(project.read("out.txt").trim(), "hello world");
}

#[test]
fn test_passed_option_overrides_default() {
    let project = TestProject::new(
        r#"
tasks:
  greet:
    options:
      name:
        default: world
    run: echo hello ${name} > out.txt
"#,
    );

    project
        .run_with("greet", &[], &opts(&[("name", "there")]))
        .unwrap();
    assert_eq!(project.read("out.txt").trim(), "hello there");
}

#[test]
fn test_source_target_cache_skips_until_sources_change() {
    let project = TestProject::new(
        r#"
tasks:
  build:
    source:
      - "src/**"
    target:
      - out/bin
    run:
      - mkdir -p out
      - touch out/bin
      - echo ran >> runs.txt
"#,
    );
    project.mkdir("src");
    project.write("src/lib.rs", "v1");

    project.run("build").unwrap();
    assert_eq!(project.read("runs.txt"), "ran\n");

    // Unchanged sources: skipped.
    project.run("build").unwrap();
    assert_eq!(project.read("runs.txt"), "ran\n");

    // Any changed file under src forces a re-run.
    project.write("src/lib.rs", "v2");
    project.run("build").unwrap();
    assert_eq!(project.read("runs.txt"), "ran\nran\n");
}

#[test]
fn test_bool_rewrite_flag() {
    let yaml = r#"
tasks:
  test:
    options:
      race:
        type: bool
        rewrite: -race
    run: echo go test ${race} ./... > cmd.txt
"#;

    let with_flag = TestProject::new(yaml);
    with_flag
        .run_with("test", &[], &opts(&[("race", "true")]))
        .unwrap();
    assert_eq!(with_flag.read("cmd.txt").trim(), "go test -race ./...");

    let without_flag = TestProject::new(yaml);
    without_flag.run("test").unwrap();
    assert_eq!(without_flag.read("cmd.txt").trim(), "go test ./...");
}

#[test]
fn test_self_referencing_task_fails_with_cycle() {
    let project = TestProject::new(
        r#"
tasks:
  outer:
    run:
      - task: outer
"#,
    );

    let err = project.run("outer").unwrap_err();
    match err {
        WhiskError::Run(RunError::TaskCycle { stack }) => {
            assert!(stack.contains("outer -> outer"), "stack was {stack:?}");
        }
        other => panic!("expected a cycle error, got {other:?}"),
    }
}

#[test]
fn test_finally_runs_on_failure_with_original_status() {
    let project = TestProject::new(
        r#"
tasks:
  flaky:
    run: exit 2
    finally:
      - echo cleanup > cleanup.txt
"#,
    );

    let err = project.run("flaky").unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(project.read("cleanup.txt").trim(), "cleanup");
}

#[test]
fn test_os_guarded_default_candidates() {
    let this_os = std::env::consts::OS;
    let yaml = format!(
        r#"
tasks:
  pick:
    options:
      value:
        default:
          - when:
              os: {this_os}
            value: a
          - value: b
    run: echo ${{value}} > picked.txt
"#
    );

    let project = TestProject::new(&yaml);
    project.run("pick").unwrap();
    assert_eq!(project.read("picked.txt").trim(), "a");

    let yaml = r#"
tasks:
  pick:
    options:
      value:
        default:
          - when:
              os: plan9
            value: a
          - value: b
    run: echo ${value} > picked.txt
"#;

    let project = TestProject::new(yaml);
    project.run("pick").unwrap();
    assert_eq!(project.read("picked.txt").trim(), "b");
}

#[test]
fn test_run_items_execute_in_order() {
    let project = TestProject::new(
        r#"
tasks:
  ordered:
    run:
      - echo one >> order.txt
      - echo two >> order.txt
      - echo three >> order.txt
"#,
    );

    project.run("ordered").unwrap();
    assert_eq!(project.read("order.txt"), "one\ntwo\nthree\n");
}

#[test]
fn test_subtasks_run_depth_first() {
    let project = TestProject::new(
        r#"
tasks:
  all:
    run:
      - echo start >> order.txt
      - task: inner
      - echo end >> order.txt
  inner:
    run: echo inner >> order.txt
"#,
    );

    project.run("all").unwrap();
    assert_eq!(project.read("order.txt"), "start\ninner\nend\n");
}

#[test]
fn test_environment_mutations_visible_to_subtasks() {
    let project = TestProject::new(
        r#"
tasks:
  all:
    run:
      - set-environment:
          WHISK_EXEC_TEST_FLOW: from-parent
      - task: child
  child:
    run: printenv WHISK_EXEC_TEST_FLOW > seen.txt
"#,
    );

    project.run("all").unwrap();
    assert_eq!(project.read("seen.txt").trim(), "from-parent");
    std::env::remove_var("WHISK_EXEC_TEST_FLOW");
}

#[test]
fn test_positional_args_reach_commands() {
    let project = TestProject::new(
        r#"
tasks:
  greet:
    args:
      first: {}
      second: {}
    run: echo ${first} and ${second} > out.txt
"#,
    );

    project
        .run_with(
            "greet",
            &["alpha".to_string(), "beta".to_string()],
            &IndexMap::new(),
        )
        .unwrap();
    assert_eq!(project.read("out.txt").trim(), "alpha and beta");
}

#[test]
fn test_arg_count_mismatch_is_validation_error() {
    let project = TestProject::new(
        r#"
tasks:
  greet:
    args:
      person: {}
    run: echo ${person}
"#,
    );

    let err = project.run("greet").unwrap_err();
    assert!(matches!(
        err,
        WhiskError::Config(ConfigError::WrongArgCount { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_required_option_missing_is_validation_error() {
    let project = TestProject::new(
        r#"
tasks:
  deploy:
    options:
      version:
        required: true
    run: echo ${version}
"#,
    );

    let err = project.run("deploy").unwrap_err();
    assert!(matches!(
        err,
        WhiskError::Config(ConfigError::MissingRequired { .. })
    ));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_required_option_satisfied_by_environment() {
    let project = TestProject::new(
        r#"
tasks:
  deploy:
    options:
      version:
        required: true
        environment: WHISK_EXEC_TEST_VERSION
    run: echo ${version} > version.txt
"#,
    );

    std::env::set_var("WHISK_EXEC_TEST_VERSION", "1.2.3");
    let result = project.run("deploy");
    std::env::remove_var("WHISK_EXEC_TEST_VERSION");

    result.unwrap();
    assert_eq!(project.read("version.txt").trim(), "1.2.3");
}

#[test]
fn test_command_default_feeds_later_commands() {
    let project = TestProject::new(
        r#"
tasks:
  stamp:
    options:
      rev:
        default:
          command: echo deadbeef
    run: echo rev=${rev} > stamp.txt
"#,
    );

    project.run("stamp").unwrap();
    assert_eq!(project.read("stamp.txt").trim(), "rev=deadbeef");
}

#[test]
fn test_when_equal_gates_run_item() {
    let yaml = r#"
tasks:
  deploy:
    options:
      env:
        default: dev
    run:
      - when:
          equal:
            env: production
        command: echo prod >> log.txt
      - echo always >> log.txt
"#;

    let dev = TestProject::new(yaml);
    dev.run("deploy").unwrap();
    assert_eq!(dev.read("log.txt"), "always\n");

    let prod = TestProject::new(yaml);
    prod.run_with("deploy", &[], &opts(&[("env", "production")]))
        .unwrap();
    assert_eq!(prod.read("log.txt"), "prod\nalways\n");
}

#[test]
fn test_private_subtask_runs_via_reference() {
    let project = TestProject::new(
        r#"
tasks:
  public:
    run:
      - task: helper
  helper:
    private: true
    run: echo helped > helped.txt
"#,
    );

    project.run("public").unwrap();
    assert_eq!(project.read("helped.txt").trim(), "helped");
}

#[test]
fn test_subtask_passes_args_and_options() {
    let project = TestProject::new(
        r#"
tasks:
  all:
    run:
      - task:
          name: emit
          args: [positional]
          options:
            flavor: spicy
  emit:
    private: true
    args:
      word: {}
    options:
      flavor:
        default: mild
    run: echo ${word}-${flavor} > emitted.txt
"#,
    );

    project.run("all").unwrap();
    assert_eq!(project.read("emitted.txt").trim(), "positional-spicy");
}

#[test]
fn test_failed_command_propagates_exit_code() {
    let project = TestProject::new(
        r#"
tasks:
  fail:
    run: exit 42
"#,
    );

    let err = project.run("fail").unwrap_err();
    assert_eq!(err.exit_code(), 42);
    match err {
        WhiskError::Run(RunError::CommandFailed { code, .. }) => assert_eq!(code, Some(42)),
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}
