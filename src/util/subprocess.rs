use std::io;
use std::io::BufRead;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, LastError};
use crate::util::anyerror::Fault;

/// Runs external programs on behalf of the orchestrators.
///
/// Implemented by [`SystemInvoker`] for real invocations; tests substitute a
/// recorder that captures the argument list and returns canned results.
pub trait Invoke {
    /// Runs `command` from `cwd` and blocks until it exits.
    ///
    /// The child's stdout and stderr are merged into a single stream and
    /// relayed line-by-line to `line_handler` as they arrive, or printed to
    /// stdout when no handler is given. A nonzero exit becomes
    /// [`Error::CommandFailed`].
    fn invoke(
        &self,
        command: &str,
        args: &[String],
        cwd: &Path,
        line_handler: Option<&mut dyn FnMut(&str)>,
    ) -> Result<(), Fault>;

    /// Launches `command` from `cwd` and returns without waiting.
    ///
    /// The child is not tracked or reaped; this is only for interactive tool
    /// launches such as opening a gui.
    fn detach(&self, command: &str, args: &[String], cwd: &Path) -> Result<(), Fault>;
}

/// Renders a command line the way it is echoed before running.
pub fn render(command: &str, args: &[String]) -> String {
    format!(
        "{} {}",
        command,
        args.iter().fold(String::new(), |x, y| x + "\"" + y + "\" ")
    )
}

pub struct SystemInvoker;

impl SystemInvoker {
    pub fn new() -> Self {
        Self
    }
}

impl Invoke for SystemInvoker {
    fn invoke(
        &self,
        command: &str,
        args: &[String],
        cwd: &Path,
        mut line_handler: Option<&mut dyn FnMut(&str)>,
    ) -> Result<(), Fault> {
        println!("info: running: {}", render(command, args));
        println!("info: from directory {:?}", cwd);
        // one pipe carries both streams so lines interleave in arrival order
        let (reader, writer) = io::pipe()?;
        let mut proc = Command::new(command);
        proc.args(args)
            .current_dir(cwd)
            .stdout(Stdio::from(writer.try_clone()?))
            .stderr(Stdio::from(writer));
        let mut child = match proc.spawn() {
            Ok(c) => c,
            Err(e) => {
                return Err(Error::CommandLaunchFailed(
                    command.to_string(),
                    LastError(e.to_string()),
                ))?
            }
        };
        // release the parent's copies of the write end so the reader sees eof
        drop(proc);
        for line in io::BufReader::new(reader).lines() {
            let line = line?;
            match line_handler.as_mut() {
                Some(handler) => handler(&line),
                None => println!("{}", line),
            }
        }
        let status = child.wait()?;
        match status.code() {
            Some(0) => Ok(()),
            Some(num) => Err(Error::CommandFailed(
                command.to_string(),
                cwd.to_path_buf(),
                num,
            ))?,
            None => Err(Error::CommandTerminated(command.to_string()))?,
        }
    }

    fn detach(&self, command: &str, args: &[String], cwd: &Path) -> Result<(), Fault> {
        println!("info: launching: {}", render(command, args));
        match Command::new(command)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => Ok(()),
            Err(e) => Err(Error::CommandLaunchFailed(
                command.to_string(),
                LastError(e.to_string()),
            ))?,
        }
    }
}
