//! Процессы / Processes — fork, exit, wait, kill, getpid.

use core::convert::Infallible;
use core::future::Future;

use mlfq_kernel::syscall::{SYS_GETPID, SYS_KILL, SYS_WAIT};

use crate::{call, check, Error, Pid, Result, Sys};

fn pid(raw: isize) -> Pid {
    Pid(raw as u32)
}

/// Создать ребёнка с телом `entry` / Create a child running `entry`.
pub fn fork<F, Fut>(sys: Sys, entry: F) -> Result<Pid>
where
    F: FnOnce(Sys) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    check(sys.fork(entry), Error::NoResources).map(pid)
}

/// Завершиться / Terminate.
pub async fn exit(sys: Sys) -> Infallible {
    sys.exit().await
}

/// Дождаться зомби-ребёнка / Wait for a ZOMBIE child.
pub async fn wait(sys: Sys) -> Result<Pid> {
    call(sys, SYS_WAIT, 0, 0, Error::NoChildren).await.map(pid)
}

pub async fn kill(sys: Sys, target: Pid) -> Result<()> {
    call(sys, SYS_KILL, target.0 as usize, 0, Error::NotFound)
        .await
        .map(drop)
}

pub async fn getpid(sys: Sys) -> Result<Pid> {
    call(sys, SYS_GETPID, 0, 0, Error::InvalidArg).await.map(pid)
}
