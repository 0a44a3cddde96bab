use farmhand::worker::executor::execute;
use uuid::Uuid;

#[tokio::test]
async fn test_execute_simple_command() {
    let outcome = execute(Uuid::new_v4(), "echo hello").await;

    assert!(outcome.success);
    assert_eq!(outcome.std_out, "hello\n");
    assert!(outcome.std_err.is_empty());
}

#[tokio::test]
async fn test_execute_silent_command() {
    let outcome = execute(Uuid::new_v4(), "true").await;

    assert!(outcome.success);
    assert!(outcome.std_out.is_empty());
    assert!(outcome.std_err.is_empty());
}

#[tokio::test]
async fn test_execute_nonzero_exit_fails() {
    let outcome = execute(Uuid::new_v4(), "exit 3").await;

    assert!(!outcome.success);
}

#[tokio::test]
async fn test_execute_captures_stderr_on_failure() {
    let outcome = execute(Uuid::new_v4(), "echo 'error message' >&2 && exit 1").await;

    assert!(!outcome.success);
    assert!(outcome.std_err.contains("error message"));
}

#[tokio::test]
async fn test_execute_missing_binary_fails() {
    let outcome = execute(Uuid::new_v4(), "nonexistent_command_12345").await;

    assert!(!outcome.success);
    assert!(!outcome.std_err.is_empty());
}

#[tokio::test]
async fn test_execute_piped_commands() {
    let outcome = execute(Uuid::new_v4(), "echo 'hello world' | wc -w").await;

    assert!(outcome.success);
    assert_eq!(outcome.std_out.trim(), "2");
}

#[tokio::test]
async fn test_execute_preserves_quoting() {
    let outcome = execute(Uuid::new_v4(), "echo 'hello $USER'").await;

    assert!(outcome.success);
    assert_eq!(outcome.std_out, "hello $USER\n");
}
