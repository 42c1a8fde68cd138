//! External transform processes.

use std::path::Path;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::TransformErrorKind;

/// Pipe `input` through `program args...` and return its stdout.
///
/// The module path is exported as `BALE_MODULE_PATH`. The child is killed if
/// the returned future is dropped, which is how step timeouts and build
/// cancellation stop it.
pub async fn run(
    program: &str,
    args: &[String],
    input: &[u8],
    module_path: &Path,
) -> Result<Vec<u8>, TransformErrorKind> {
    let mut child = Command::new(program)
        .args(args)
        .env("BALE_MODULE_PATH", module_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TransformErrorKind::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    let mut stdin = child.stdin.take().ok_or_else(|| TransformErrorKind::Spawn {
        program: program.to_string(),
        message: "stdin was not captured".to_string(),
    })?;

    let feed = async move {
        // a process that exits without reading stdin is not an error by itself
        let _ = stdin.write_all(input).await;
        drop(stdin);
    };
    let ((), output) = tokio::join!(feed, child.wait_with_output());
    let output = output.map_err(|e| TransformErrorKind::Failed(e.to_string()))?;

    if !output.status.success() {
        return Err(TransformErrorKind::Exit {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}
