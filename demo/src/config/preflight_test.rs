use super::{FarmConfig, TaskSpec};

fn valid_config() -> FarmConfig {
    FarmConfig {
        processes: 3,
        timeout: 10,
        tasks: vec![TaskSpec {
            command: "/bin/true".into(),
            params: String::new(),
        }],
    }
}

#[test]
pub fn valid_config_passes() {
    assert!(!valid_config().preflight_checks());
}

#[test]
pub fn zero_processes_fail() {
    let mut config = valid_config();
    config.processes = 0;

    assert!(config.preflight_checks());
}

#[test]
pub fn delimiter_in_params_fails() {
    let mut config = valid_config();
    config.tasks[0].params = "a;b".into();

    assert!(config.preflight_checks());
}

#[test]
pub fn reserved_command_fails() {
    let mut config = valid_config();
    config.tasks[0].command = "TERMINATE".into();

    assert!(config.preflight_checks());
}

#[test]
pub fn config_parses_with_defaults() {
    let config: FarmConfig = serde_yaml::from_str(
        "tasks:\n  - command: /bin/echo\n    params: hello\n  - command: /bin/true\n",
    )
    .unwrap();

    assert_eq!(config.processes, 4);
    assert_eq!(config.timeout, 30);
    assert_eq!(config.tasks.len(), 2);
    assert!(!config.preflight_checks());
}
