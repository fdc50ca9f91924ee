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

//! Implementation for Item.

use super::Command;
use psh_env::io::print_error;
use psh_env::semantics::{Divert, ExitStatus, Result};
use psh_env::subshell::Subshell;
use psh_env::Env;
use psh_syntax::ast;
use psh_syntax::source::Location;
use std::ops::ControlFlow::{Break, Continue};
use std::rc::Rc;

/// Executes the item.
///
/// # Synchronous command
///
/// If the item is not backgrounded, this function executes the and-or list
/// directly.
///
/// # Asynchronous command
///
/// If the item is backgrounded (`&`), the and-or list is executed
/// asynchronously in a subshell, whose process ID is [set to the job
/// set](psh_env::job::JobSet::set_last_async_pid) in the environment.
///
/// Since this function finishes before the asynchronous execution finishes,
/// the exit status does not reflect the results of the and-or list; the exit
/// status is always 0.
impl Command for ast::Item {
    async fn execute(&self, env: &mut Env) -> Result {
        if self.is_background {
            execute_async(env, &self.and_or).await
        } else {
            self.and_or.execute(env).await
        }
    }
}

async fn execute_async(env: &mut Env, and_or: &Rc<ast::AndOrList>) -> Result {
    let and_or_2 = Rc::clone(and_or);
    let subshell = Subshell::new(move |sub_env, _job_control| {
        Box::pin(async move {
            if let Break(divert) = and_or_2.execute(sub_env).await {
                if let Some(exit_status) = divert.exit_status() {
                    sub_env.exit_status = exit_status;
                }
            }
        })
    });
    match subshell.start(env).await {
        Ok((pid, _job_control)) => {
            env.jobs.set_last_async_pid(pid);
            env.exit_status = ExitStatus::SUCCESS;
            Continue(())
        }
        Err(errno) => {
            print_error(
                env,
                "cannot start a subshell to run an asynchronous command".into(),
                errno.to_string().into(),
                &Location::dummy(""),
            )
            .await;

            Break(Divert::Interrupt(Some(ExitStatus::NOEXEC)))
        }
    }
}
