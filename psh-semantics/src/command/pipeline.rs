// This file is part of yash, an extended POSIX shell.
// Copyright (C) 2021 WATANABE Yuki
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Implementation of pipeline semantics.

use super::Command;
use psh_env::io::print_error;
use psh_env::io::Fd;
use psh_env::job::Pid;
use psh_env::semantics::Divert;
use psh_env::semantics::ExitStatus;
use psh_env::semantics::Result;
use psh_env::stack::Frame;
use psh_env::subshell::Subshell;
use psh_env::system::Errno;
use psh_env::Env;
use psh_env::System;
use psh_syntax::ast;
use psh_syntax::source::Location;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Executes the pipeline.
///
/// # Executing commands
///
/// If this pipeline contains one command, it is executed in the current shell
/// execution environment.
///
/// If the pipeline has more than one command, all the commands are executed
/// concurrently. Every command is executed in a new subshell. The standard
/// output of a command is connected to the standard input of the next command
/// via a pipe, except for the standard output of the last command and the
/// standard input of the first command, which are not modified.
///
/// If the pipeline has no command, it is a no-op.
///
/// # Exit status
///
/// The exit status of the pipeline is that of the last command (or zero if no
/// command). If the pipeline starts with an `!`, the exit status is inverted:
/// zero becomes one, and non-zero becomes zero.
///
/// In POSIX, the expected exit status is unclear when an inverted pipeline
/// performs a jump as in `! return 42`. The behavior disagrees among existing
/// shells. This implementation does not invert the exit status when the return
/// value is `Err(Divert::...)`, which is different from yash 2.
///
/// # Stack
///
/// if `self.negated` is true, [`Frame::Condition`] is pushed to the
/// environment's stack while the pipeline is executed.
impl Command for ast::Pipeline {
    async fn execute(&self, env: &mut Env) -> Result {
        if !self.negated {
            return execute_commands_in_pipeline(env, &self.commands).await;
        }

        let mut env = env.push_frame(Frame::Condition);
        execute_commands_in_pipeline(&mut env, &self.commands).await?;
        env.exit_status = if env.exit_status == ExitStatus::SUCCESS {
            ExitStatus::FAILURE
        } else {
            ExitStatus::SUCCESS
        };
        Continue(())
    }
}

async fn execute_commands_in_pipeline(env: &mut Env, commands: &[Rc<ast::Command>]) -> Result {
    match commands.len() {
        0 => {
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        1 => commands[0].execute(env).await,
        _ => execute_multi_command_pipeline(env, commands).await,
    }
}

async fn execute_multi_command_pipeline(env: &mut Env, commands: &[Rc<ast::Command>]) -> Result {
    // Start commands
    let mut commands = commands.iter().cloned().peekable();
    let mut pipes = PipeSet::new();
    let mut pids = Vec::new();
    while let Some(command) = commands.next() {
        let has_next = commands.peek().is_some();
        shift_or_fail(env, &mut pipes, has_next).await?;

        let pipes2 = pipes;
        let subshell = Subshell::new(move |sub_env, _job_control| {
            Box::pin(connect_pipe_and_execute_command(sub_env, pipes2, command))
        });

        match subshell.start(env).await {
            Ok((pid, _job_control)) => pids.push(pid),
            Err(errno) => return subshell_start_failed(env, errno).await,
        }
    }

    shift_or_fail(env, &mut pipes, false).await?;

    // Await the last command
    for pid in pids {
        // TODO Report if the child was signaled and the shell is interactive
        env.exit_status = env
            .wait_for_subshell_to_finish(pid)
            .await
            .expect("cannot receive exit status of child process")
            .1;
    }
    Continue(())
}

async fn shift_or_fail(env: &mut Env, pipes: &mut PipeSet, has_next: bool) -> Result {
    match pipes.shift(env, has_next) {
        Ok(()) => Continue(()),
        Err(errno) => {
            print_error(
                env,
                "cannot connect pipes in the pipeline".into(),
                errno.to_string().into(),
                &Location::dummy(""),
            )
            .await;
            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}

async fn subshell_start_failed(env: &mut Env, errno: Errno) -> Result {
    print_error(
        env,
        "cannot start a subshell in the pipeline".into(),
        errno.to_string().into(),
        &Location::dummy(""),
    )
    .await;
    Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
}

async fn connect_pipe_and_execute_command(env: &mut Env, pipes: PipeSet, command: Rc<ast::Command>) {
    if let Err(errno) = pipes.move_to_stdin_stdout(env) {
        print_error(
            env,
            "cannot connect pipes in the pipeline".into(),
            errno.to_string().into(),
            &Location::dummy(""),
        )
        .await;
        env.exit_status = ExitStatus::NOEXEC;
        return;
    }

    if let Break(divert) = command.execute(env).await {
        if let Some(exit_status) = divert.exit_status() {
            env.exit_status = exit_status;
        }
    }
}

/// Set of pipe file descriptors that connect commands.
#[derive(Clone, Copy, Default)]
struct PipeSet {
    read_previous: Option<Fd>,
    /// Reader and writer to the next command.
    next: Option<(Fd, Fd)>,
}

impl PipeSet {
    fn new() -> Self {
        Self::default()
    }

    /// Updates the pipe set for the next command.
    ///
    /// Closes FDs that are no longer necessary and opens a new pipe if there is
    /// a next command.
    fn shift(&mut self, env: &mut Env, has_next: bool) -> std::result::Result<(), Errno> {
        if let Some(fd) = self.read_previous {
            let _ = env.system.close(fd);
        }

        if let Some((reader, writer)) = self.next {
            let _ = env.system.close(writer);
            self.read_previous = Some(reader);
        } else {
            self.read_previous = None;
        }

        self.next = None;
        if has_next {
            self.next = Some(env.system.pipe()?);
        }

        Ok(())
    }

    /// Moves the pipe FDs to stdin/stdout and closes the FDs that are no longer
    /// necessary.
    fn move_to_stdin_stdout(mut self, env: &mut Env) -> std::result::Result<(), Errno> {
        if let Some((reader, writer)) = self.next {
            assert_ne!(reader, writer);
            assert_ne!(self.read_previous, Some(reader));
            assert_ne!(self.read_previous, Some(writer));

            env.system.close(reader)?;
            if writer != Fd::STDOUT {
                if self.read_previous == Some(Fd::STDOUT) {
                    self.read_previous = Some(env.system.dup(Fd::STDOUT, Fd(0), false)?);
                }
                env.system.dup2(writer, Fd::STDOUT)?;
                env.system.close(writer)?;
            }
        }
        if let Some(reader) = self.read_previous {
            if reader != Fd::STDIN {
                env.system.dup2(reader, Fd::STDIN)?;
                env.system.close(reader)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::in_virtual_system;
    use crate::tests::literal_word;
    use futures_util::FutureExt;

    fn assign(name: &str, value: &str) -> Rc<ast::Command> {
        Rc::new(ast::Command::Simple(ast::SimpleCommand {
            assigns: vec![ast::Assign {
                name: name.to_string(),
                index: None,
                append: false,
                value: ast::AssignValue::Scalar(literal_word(value)),
                location: Location::dummy(""),
            }],
            words: Vec::new(),
            redirects: Vec::new(),
            background: false,
        }))
    }

    fn exit_command(status: &str) -> Rc<ast::Command> {
        Rc::new(ast::Command::Simple(ast::SimpleCommand {
            assigns: Vec::new(),
            words: vec![literal_word("exit"), literal_word(status)],
            redirects: Vec::new(),
            background: false,
        }))
    }

    fn pipeline(commands: Vec<Rc<ast::Command>>, negated: bool) -> ast::Pipeline {
        ast::Pipeline { commands, negated }
    }

    #[test]
    fn empty_pipeline() {
        let mut env = Env::new_virtual();
        let pipeline = pipeline(vec![], false);
        let result = pipeline.execute(&mut env).now_or_never().unwrap();
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus(0));
    }

    #[test]
    fn single_command_pipeline_executes_command_in_current_environment() {
        let mut env = Env::new_virtual();
        let pipeline = pipeline(vec![assign("foo", "bar")], false);
        let result = pipeline.execute(&mut env).now_or_never().unwrap();
        assert_eq!(result, Continue(()));
        assert_eq!(
            env.variables.get("foo").unwrap().value,
            Some(psh_env::variable::Value::Scalar("bar".to_string()))
        );
    }

    #[test]
    fn single_command_pipeline_propagates_divert() {
        let mut env = Env::new_virtual();
        let pipeline = pipeline(vec![exit_command("37")], false);
        let result = pipeline.execute(&mut env).now_or_never().unwrap();
        assert_eq!(result, Break(Divert::Exit(None)));
    }

    #[test]
    fn multi_command_pipeline_returns_last_command_exit_status() {
        in_virtual_system(|mut env, _state| async move {
            let pipeline = pipeline(vec![exit_command("10"), exit_command("20")], false);
            let result = pipeline.execute(&mut env).await;
            assert_eq!(result, Continue(()));
            assert_eq!(env.exit_status, ExitStatus(20));
        });
    }

    #[test]
    fn multi_command_pipeline_waits_for_all_commands() {
        in_virtual_system(|mut env, state| async move {
            let original_pids: std::collections::BTreeSet<_> =
                state.borrow().processes.keys().copied().collect();

            let pipeline = pipeline(
                vec![exit_command("1"), exit_command("2"), exit_command("3")],
                false,
            );
            pipeline.execute(&mut env).await;

            // Every subshell process started for the pipeline should have
            // finished by the time the pipeline returns.
            for (pid, process) in &state.borrow().processes {
                if !original_pids.contains(pid) {
                    assert!(!process.state().is_alive(), "pid {pid:?} still alive");
                }
            }
        });
    }

    #[test]
    fn inverting_exit_status_to_0() {
        let mut env = Env::new_virtual();
        let pipeline = pipeline(vec![assign("foo", "bar")], true);
        let result = pipeline.execute(&mut env).now_or_never().unwrap();
        assert_eq!(result, Continue(()));
        assert_eq!(env.exit_status, ExitStatus::FAILURE);
    }

    #[test]
    fn not_inverting_exit_status_with_divert() {
        let mut env = Env::new_virtual();
        let pipeline = pipeline(vec![exit_command("15")], true);
        let result = pipeline.execute(&mut env).now_or_never().unwrap();
        assert_eq!(result, Break(Divert::Exit(None)));
    }

    #[test]
    fn pipe_set_shift_to_first_command() {
        let mut env = Env::new_virtual();
        let mut pipes = PipeSet::new();

        let result = pipes.shift(&mut env, true);
        assert_eq!(result, Ok(()));
        assert_eq!(pipes.read_previous, None);
        assert_eq!(pipes.next, Some((Fd(3), Fd(4))));
    }

    #[test]
    fn pipe_set_shift_to_middle_command() {
        let mut env = Env::new_virtual();
        let mut pipes = PipeSet::new();

        let _ = pipes.shift(&mut env, true);
        let result = pipes.shift(&mut env, true);
        assert_eq!(result, Ok(()));
        assert_eq!(pipes.read_previous, Some(Fd(3)));
        assert_eq!(pipes.next, Some((Fd(4), Fd(5))));
    }

    #[test]
    fn pipe_set_shift_to_last_command() {
        let mut env = Env::new_virtual();
        let mut pipes = PipeSet::new();

        let _ = pipes.shift(&mut env, true);
        let result = pipes.shift(&mut env, false);
        assert_eq!(result, Ok(()));
        assert_eq!(pipes.read_previous, Some(Fd(3)));
        assert_eq!(pipes.next, None);
    }

    // TODO test PipeSet::move_to_stdin_stdout
}
