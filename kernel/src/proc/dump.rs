//! Диагностический дамп / Diagnostic dump
//!
//! Только для отладки сбоев. Реестр копируется через `try_lock`, печать
//! идёт уже без блокировки. Если реестр занят, дамп не ждёт (его зовут и
//! из аварийных путей) и печатает то, что видно без блокировок: какой
//! слот исполняет каждый CPU.
//! For fault diagnosis only. The registry is copied via `try_lock` and
//! printed outside the lock. If the registry is busy the dump does not wait,
//! since it is called from fault paths too; it prints what is visible
//! without locks instead: the slot each CPU is running.

use core::fmt::{self, Write};

use heapless::Vec;

use super::{Pcb, Pid, ProcFlags};
use crate::param::NPROC;
use crate::{kprint, Kernel};

/// `fmt::Write` поверх консоли / `fmt::Write` over the console.
struct Console;

impl Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        kprint!("{}", s);
        Ok(())
    }
}

fn write_pcb(out: &mut dyn Write, p: &Pcb) -> fmt::Result {
    writeln!(
        out,
        "{} {} level {} prio {} exec {} arrived {}{}{}",
        p.pid,
        p.state().name(),
        p.level,
        p.priority,
        p.exec_time,
        p.arrived_time,
        if p.flags.contains(ProcFlags::LOCKED) { " locked" } else { "" },
        if p.flags.contains(ProcFlags::KILLED) { " killed" } else { "" },
    )
}

impl Kernel {
    fn snapshot(&self) -> Option<Vec<Pcb, NPROC>> {
        let procs = self.procs.try_lock()?;
        Some(procs.live().map(|(_, p)| *p).collect())
    }

    /// Дамп в произвольный приёмник / Dump into any writer.
    pub fn dump_into(&self, out: &mut dyn Write) -> fmt::Result {
        let Some(live) = self.snapshot() else {
            writeln!(out, "procdump: registry busy, cpu view only")?;
            for c in &self.cpus {
                match c.peek() {
                    Some(slot) => writeln!(out, "cpu{} slot {}", c.id(), slot)?,
                    None => writeln!(out, "cpu{} idle", c.id())?,
                }
            }
            return Ok(());
        };

        writeln!(out, "PID STATE  SCHED")?;
        for p in &live {
            write_pcb(out, p)?;
        }
        Ok(())
    }

    /// Все живые PCB, по строке на процесс / Every live PCB, one line each.
    pub fn procdump(&self) {
        self.dump_into(&mut Console).ok();
    }

    /// Один процесс; `false`, если pid не найден.
    /// One process; `false` if `pid` is not live.
    pub fn dump_one(&self, pid: Pid) -> bool {
        match self.pcb(pid) {
            Some(p) => write_pcb(&mut Console, &p).is_ok(),
            None => false,
        }
    }
}
