//! Syscall table — целочисленные точки входа планировщика
//!
//! Номера / Numbers:
//!   1  exit()                      — завершиться
//!   2  wait()                      — дождаться зомби-ребёнка
//!   3  kill(pid)                   — пометить убитым
//!   4  getpid()                    — свой pid
//!   5  sleep(n)                    — проспать n тиков
//!   6  uptime()                    — тики с последнего сброса
//!   7  yield()                     — отдать CPU
//!   8  get_level()                 — текущий уровень MLFQ
//!   9  set_priority(pid, prio)     — приоритет нижнего уровня
//!   10 scheduler_lock(password)    — монопольный CPU
//!   11 scheduler_unlock(password)  — снять монополию
//!   12 print_process_info()        — строка своего PCB
//!   13 procdump()                  — дамп всех PCB
//!
//! fork принимает тело ребёнка и вызывается напрямую: [`Sys::fork`].
//! fork takes the child's body and is called directly: [`Sys::fork`].

use log::trace;

use crate::error::{ENOSYS, FAILURE};
use crate::proc::Pid;
use crate::task::Sys;

pub const SYS_EXIT: usize = 1;
pub const SYS_WAIT: usize = 2;
pub const SYS_KILL: usize = 3;
pub const SYS_GETPID: usize = 4;
pub const SYS_SLEEP: usize = 5;
pub const SYS_UPTIME: usize = 6;
pub const SYS_YIELD: usize = 7;
pub const SYS_GET_LEVEL: usize = 8;
pub const SYS_SET_PRIORITY: usize = 9;
pub const SYS_SCHEDULER_LOCK: usize = 10;
pub const SYS_SCHEDULER_UNLOCK: usize = 11;
pub const SYS_PRINT_PROCESS_INFO: usize = 12;
pub const SYS_PROCDUMP: usize = 13;

/// Аргумент-целое из регистра / Integer argument from a register.
fn arg_int(raw: usize) -> Option<i32> {
    i32::try_from(raw as isize).ok()
}

fn arg_pid(raw: usize) -> Option<Pid> {
    u32::try_from(raw).ok().filter(|&p| p != 0).map(Pid)
}

/// Выполнить syscall `number` от имени `sys`.
/// Run syscall `number` on behalf of `sys`.
pub async fn dispatch(sys: Sys, number: usize, arg0: usize, arg1: usize) -> isize {
    trace!(target: "syscall", "pid {}: syscall {} ({:#x}, {:#x})", sys.getpid(), number, arg0, arg1);

    match number {
        SYS_EXIT => match sys.exit().await {},
        SYS_WAIT => sys.wait().await,
        SYS_KILL => match arg_pid(arg0) {
            Some(pid) => sys.kill(pid),
            None => FAILURE,
        },
        SYS_GETPID => sys.getpid().as_isize(),
        SYS_SLEEP => match arg_int(arg0).and_then(|n| u32::try_from(n).ok()) {
            Some(n) => sys.sleep(n).await,
            None => FAILURE,
        },
        SYS_UPTIME => sys.uptime() as isize,
        SYS_YIELD => {
            sys.yield_now().await;
            0
        }
        SYS_GET_LEVEL => sys.get_level(),
        SYS_SET_PRIORITY => match (arg_pid(arg0), arg_int(arg1)) {
            (Some(pid), Some(prio)) => sys.set_priority(pid, prio),
            _ => FAILURE,
        },
        SYS_SCHEDULER_LOCK => match arg_int(arg0) {
            Some(password) => sys.scheduler_lock(password).await,
            None => FAILURE,
        },
        SYS_SCHEDULER_UNLOCK => match arg_int(arg0) {
            Some(password) => sys.scheduler_unlock(password).await,
            None => FAILURE,
        },
        SYS_PRINT_PROCESS_INFO => {
            if sys.kernel().dump_one(sys.getpid()) {
                0
            } else {
                FAILURE
            }
        }
        SYS_PROCDUMP => {
            sys.procdump();
            0
        }
        _ => ENOSYS,
    }
}
