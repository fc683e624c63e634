#![cfg(unix)]

use std::time::Duration;

use anyhow::Result;
use vggt_probe_video::{CommandSpec, VideoError, run_captured};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

#[test]
fn captures_both_streams_on_success() -> Result<()> {
    let output = run_captured(&sh("echo hello; echo progress >&2"), Some(Duration::from_secs(10)))?;
    assert_eq!(output.stdout.trim(), "hello");
    assert_eq!(output.stderr.trim(), "progress");
    Ok(())
}

#[test]
fn non_zero_exit_keeps_status_and_stderr() {
    let err = run_captured(&sh("echo first >&2; echo last >&2; exit 3"), None)
        .expect_err("exit 3 is a failure");
    match err {
        VideoError::ToolFailed {
            tool,
            status,
            stderr,
        } => {
            assert_eq!(tool, "sh");
            assert_eq!(status, Some(3));
            assert!(stderr.contains("last"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn slow_commands_are_killed_at_the_timeout() {
    let start = std::time::Instant::now();
    let err = run_captured(&sh("sleep 5"), Some(Duration::from_millis(200)))
        .expect_err("sleep outlives the timeout");
    assert!(matches!(err, VideoError::Timeout { .. }), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[test]
fn missing_program_is_reported_as_tool_missing() {
    let spec = CommandSpec::new("vggt-probe-no-such-tool").arg("-version");
    let err = run_captured(&spec, None).expect_err("tool does not exist");
    match err {
        VideoError::ToolMissing { tool } => assert_eq!(tool, "vggt-probe-no-such-tool"),
        other => panic!("unexpected error: {other:?}"),
    }
}
