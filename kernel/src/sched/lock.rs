//! Lock Slot — эксклюзивная блокировка планировщика
//!
//! Ноль или один процесс. Пока слот занят, планировщик запускает только
//! держателя, минуя очереди. Держатель никогда не стоит в очереди.
//! Zero or one process. While occupied, the scheduler runs only the holder
//! and bypasses the queue table. The holder is never queued.
//!
//! Порядок блокировок / Lock order: `procs` → `queues` → `lock_slot`.

use log::{debug, error, warn};

use super::queue::QueueTable;
use crate::error::LockError;
use crate::param::TOP;
use crate::proc::{ProcFlags, ProcState, ProcTable, Slot};
use crate::Kernel;

/// Причина освобождения / Why the slot is being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Держатель завершается, обратно не допускается.
    /// Holder is exiting and is not re-admitted.
    Exit,
    /// unlock, purge, sleep или boost: свежие поля, голова верхнего уровня.
    /// unlock, purge, sleep or boost: fresh fields, head of the top level.
    Readmit,
}

#[derive(Debug, Default)]
pub struct LockSlot {
    holder: Option<Slot>,
}

impl LockSlot {
    pub const fn new() -> Self {
        Self { holder: None }
    }

    pub fn holder(&self) -> Option<Slot> {
        self.holder
    }

    /// Занять слот: убрать `slot` из очередей и пометить LOCKED.
    /// Take the slot: pull `slot` out of the queues and flag it LOCKED.
    pub fn acquire(
        &mut self,
        procs: &mut ProcTable,
        queues: &mut QueueTable,
        slot: Slot,
    ) -> Result<(), LockError> {
        if self.holder.is_some() {
            return Err(LockError::Busy);
        }
        let pid = procs[slot].pid;
        // Запущенный процесс не в очереди; NotFound здесь норма.
        queues.delete_by_pid(procs, pid).ok();

        procs[slot].flags.insert(ProcFlags::LOCKED);
        self.holder = Some(slot);
        debug!(target: "lock", "pid {} acquired the scheduler lock", pid);
        Ok(())
    }

    /// Освободить слот. Пустой слот — no-op.
    ///
    /// При `Readmit` держатель получает свежие execTime/priority и новую
    /// метку прибытия. RUNNABLE сразу встаёт в голову верхнего уровня,
    /// RUNNING получает FRONT и встанет туда при следующем yield,
    /// SLEEPING будет допущен своим wakeup.
    ///
    /// Release the slot; a no-op when empty. With `Readmit` the holder gets
    /// fresh execTime/priority and a new arrival stamp. A RUNNABLE holder is
    /// front-enqueued at the top level at once, a RUNNING one is flagged
    /// FRONT for its next yield, a SLEEPING one is admitted by its wakeup.
    pub fn release(
        &mut self,
        procs: &mut ProcTable,
        queues: &mut QueueTable,
        how: Release,
    ) -> Option<Slot> {
        let slot = self.holder.take()?;
        procs[slot].flags.remove(ProcFlags::LOCKED);
        debug!(target: "lock", "pid {} released the scheduler lock ({:?})", procs[slot].pid, how);

        if how == Release::Exit {
            return Some(slot);
        }

        let stamp = procs.stamp();
        procs[slot].refresh();
        procs[slot].arrived_time = stamp;
        match procs[slot].state() {
            ProcState::Runnable => {
                if let Err(e) = queues.front_enqueue(procs, slot, TOP) {
                    error!(target: "lock", "pid {}: readmit failed: {}", procs[slot].pid, e);
                }
            }
            ProcState::Running => procs[slot].flags.insert(ProcFlags::FRONT),
            _ => {}
        }
        Some(slot)
    }

    /// Освободить, только если держит `slot` / Release only if `slot` holds it.
    pub fn release_if_held(
        &mut self,
        procs: &mut ProcTable,
        queues: &mut QueueTable,
        slot: Slot,
        how: Release,
    ) -> bool {
        if self.holder != Some(slot) {
            return false;
        }
        self.release(procs, queues, how).is_some()
    }
}

// ── Протокол с паролем / Credential protocol ──────────────────────────────

impl Kernel {
    /// Неверный пароль — враждебный ввод: вызывающий помечается убитым.
    /// A wrong password is hostile input: the caller is marked killed.
    fn check_password(&self, slot: Slot, password: i32, op: &str) -> Result<(), LockError> {
        if password == self.config().lock_password {
            return Ok(());
        }
        let mut procs = self.procs.lock();
        let p = &mut procs[slot];
        warn!(
            target: "lock",
            "{}: wrong password (pid {}, exec_time {}, level {})",
            op, p.pid, p.exec_time, p.level
        );
        p.flags.insert(ProcFlags::KILLED);
        Err(LockError::BadCredential)
    }

    /// Занять слот, сбросить `ticks` и отдать CPU без постановки в очередь.
    /// Take the slot, reset `ticks`, and give up the CPU without queueing.
    pub(crate) fn lock_acquire(&self, slot: Slot, password: i32) -> Result<(), LockError> {
        self.check_password(slot, password, "scheduler_lock")?;

        let mut clock = self.clock.lock();
        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        self.lock_slot
            .lock()
            .acquire(&mut procs, &mut queues, slot)?;
        clock.reset();
        self.yield_locked(&mut procs, &mut queues, slot);
        Ok(())
    }

    /// Освободить слот, кто бы его ни держал. Пустой слот — успех.
    /// Release the slot, whoever holds it. An empty slot is a success.
    pub(crate) fn lock_release(&self, slot: Slot, password: i32) -> Result<(), LockError> {
        self.check_password(slot, password, "scheduler_unlock")?;

        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        self.lock_slot
            .lock()
            .release(&mut procs, &mut queues, Release::Readmit);
        Ok(())
    }
}
