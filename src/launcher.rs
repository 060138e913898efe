use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::broker::BrokerError;
use crate::logging;
use crate::message::now_millis;

const EDITOR_BIN: &str = "askme-ui";

/// Seam between the broker and the OS. The real implementation opens a
/// terminal application; tests substitute an in-process replier.
pub trait TerminalLaunch {
    fn launch(&self, prompt: &str, socket_path: &Path, terminal_app: &str)
        -> Result<(), BrokerError>;
}

/// Writes a disposable launch script and asks the OS to open it in the
/// configured terminal application.
pub struct SystemLauncher;

impl TerminalLaunch for SystemLauncher {
    fn launch(
        &self,
        prompt: &str,
        socket_path: &Path,
        terminal_app: &str,
    ) -> Result<(), BrokerError> {
        let script_path = write_launch_script(prompt, socket_path).map_err(|err| {
            BrokerError::Launch {
                app: terminal_app.to_string(),
                source: std::io::Error::other(err),
            }
        })?;

        logging::emit_event(
            "launcher",
            &format!("opening {} with {terminal_app}", script_path.display()),
        );
        open::with_detached(&script_path, terminal_app).map_err(|source| {
            // The script never ran, so it will not delete itself.
            let _ = std::fs::remove_file(&script_path);
            BrokerError::Launch {
                app: terminal_app.to_string(),
                source,
            }
        })
    }
}

/// Renders the self-deleting bash script that runs the editor binary with
/// the prompt and socket path, marks it 0755, and returns its path.
fn write_launch_script(prompt: &str, socket_path: &Path) -> Result<PathBuf> {
    let editor = editor_binary_path();
    let content = render_script(
        &editor.to_string_lossy(),
        prompt,
        &socket_path.to_string_lossy(),
    );

    let script_path = std::env::temp_dir().join(format!("askme-script-{}.sh", now_millis()));
    std::fs::write(&script_path, content)
        .with_context(|| format!("Failed to write launch script {}", script_path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to chmod launch script {}", script_path.display()))?;
    }

    Ok(script_path)
}

fn render_script(editor: &str, prompt: &str, socket_path: &str) -> String {
    format!(
        "#!/bin/bash\n\
         '{editor}' '{prompt}' '{socket}'\n\
         /bin/rm \"$0\"\n",
        editor = escape_single_quoted(editor),
        prompt = escape_single_quoted(prompt),
        socket = escape_single_quoted(socket_path),
    )
}

/// Escapes a value for interpolation inside single quotes: each `'` becomes
/// `'\''` (close, literal quote, reopen).
fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// The editor binary ships next to the host binary; fall back to PATH lookup
/// when the current executable cannot be resolved.
fn editor_binary_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(EDITOR_BIN)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(EDITOR_BIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_single_quoted_handles_embedded_quotes() {
        assert_eq!(escape_single_quoted("plain"), "plain");
        assert_eq!(escape_single_quoted("it's"), "it'\\''s");
        assert_eq!(escape_single_quoted("''"), "'\\'''\\''");
    }

    #[test]
    fn test_render_script_is_self_deleting_and_quotes_args() {
        let script = render_script("/opt/askme-ui", "What's next?", "/tmp/a.sock");
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains("'/opt/askme-ui' 'What'\\''s next?' '/tmp/a.sock'"));
        assert!(script.ends_with("/bin/rm \"$0\"\n"));
    }

    #[test]
    fn test_write_launch_script_is_executable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let socket = dir.path().join("s.sock");
        let script = write_launch_script("prompt", &socket).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&script).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        let body = std::fs::read_to_string(&script).expect("read");
        assert!(body.contains("s.sock"));
        std::fs::remove_file(script).expect("cleanup");
    }
}
