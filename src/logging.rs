use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};

const DEFAULT_LOG_PATH: &str = "/tmp/askme-debug.log";
const LOG_PATH_ENV: &str = "ASKME_LOG_PATH";

/// Debug diagnostics for the host/editor pair. The editor owns the terminal
/// while it runs, so everything goes to an append-only file when one can be
/// resolved and falls back to stderr otherwise.
pub fn emit_event(component: &str, detail: &str) {
    emit_log_message(&format!("ASKME {component} {detail}\n"));
}

pub fn emit_error(component: &str, detail: &str) {
    emit_log_message(&format!("ASKME ERROR {component} {detail}\n"));
}

fn emit_log_message(message: &str) {
    if let Some(path) = resolve_log_path() {
        if append_log_file(&path, message).is_ok() {
            return;
        }
    }

    eprint!("{message}");
}

fn resolve_log_path() -> Option<String> {
    std::env::var(LOG_PATH_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            if std::io::stderr().is_terminal() {
                Some(DEFAULT_LOG_PATH.to_string())
            } else {
                None
            }
        })
}

fn append_log_file(path: &str, message: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(message.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_log_path_prefers_env_override() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(LOG_PATH_ENV, "/tmp/askme-test.log");
        assert_eq!(resolve_log_path().as_deref(), Some("/tmp/askme-test.log"));
        std::env::remove_var(LOG_PATH_ENV);
    }

    #[test]
    fn test_append_log_file_writes_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.txt");
        let path = path.to_string_lossy().to_string();
        append_log_file(&path, "one\n").expect("append");
        append_log_file(&path, "two\n").expect("append");
        let contents = std::fs::read_to_string(&path).expect("read");
        assert_eq!(contents, "one\ntwo\n");
    }
}
