//! Process lifecycle — fork / exit / wait / kill / sleep / wakeup
//!
//! Каждая операция меняет реестр и очереди вместе, под их блокировками.
//! Здесь только синхронная публикация состояния; отдать CPU вызывающий
//! должен сам, через `.await` в [`crate::task`].
//! Every operation mutates the registry and the queue table together under
//! their locks. Only the synchronous state publication lives here; giving
//! up the CPU is the caller's `.await` in [`crate::task`].

use alloc::boxed::Box;
use core::future::Future;

use heapless::Vec;
use log::{debug, error, warn};

use super::image::{Bare, Image};
use super::{Channel, Pid, ProcFlags, ProcState, ProcTable, Slot};
use crate::error::ProcError;
use crate::param::{MAX_PRIORITY, NPROC, TOP};
use crate::sched::lock::Release;
use crate::sched::queue::QueueTable;
use crate::task::Sys;
use crate::Kernel;

/// Итог одного шага `wait` / Outcome of one `wait` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStep {
    /// Зомби-ребёнок освобождён / A ZOMBIE child was reclaimed.
    Reaped(Pid),
    /// Ждать нечего или вызывающий убит / Nothing to wait for, or killed.
    Failed(ProcError),
    /// Вызывающий уснул на `Channel::Wait` / Caller is now asleep.
    Blocked,
}

/// Разбудить всех спящих на `chan`: свежие поля, хвост верхнего уровня.
/// Wake every sleeper on `chan`: fresh fields, tail of the top level.
pub(crate) fn wakeup_locked(procs: &mut ProcTable, queues: &mut QueueTable, chan: Channel) {
    let mut sleepers: Vec<Slot, NPROC> = Vec::new();
    for (slot, p) in procs.live() {
        if p.state() == ProcState::Sleeping && p.chan == Some(chan) {
            // Ёмкость равна NPROC, переполнения нет.
            sleepers.push(slot).ok();
        }
    }
    for slot in sleepers {
        make_runnable(procs, queues, slot);
    }
}

/// SLEEPING → RUNNABLE с допуском в хвост верхнего уровня.
fn make_runnable(procs: &mut ProcTable, queues: &mut QueueTable, slot: Slot) {
    let stamp = procs.stamp();
    let p = &mut procs[slot];
    p.set_state(ProcState::Runnable);
    p.chan = None;
    p.flags.remove(ProcFlags::FRONT);
    p.refresh();
    p.arrived_time = stamp;
    if let Err(e) = queues.enqueue(procs, slot, TOP) {
        error!(target: "proc", "pid {}: admit failed: {}", procs[slot].pid, e);
    }
}

impl Kernel {
    /// Корневой процесс: сирот переподчиняют ему, он не должен выходить.
    /// Root process: orphans are reparented to it and it must never exit.
    pub fn userinit<F, Fut>(&'static self, image: Box<dyn Image>, entry: F) -> Pid
    where
        F: FnOnce(Sys) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.root.is_completed() {
            panic!("userinit: root process already exists");
        }
        let slot = match self.procs.lock().alloc() {
            Ok(slot) => slot,
            Err(e) => panic!("userinit: {}", e),
        };
        self.root.call_once(|| slot);
        let pid = self.spawn(slot, None, image, entry);
        debug!(target: "proc", "userinit: pid {}", pid);
        pid
    }

    /// Дочерний процесс вызывающего `parent`.
    ///
    /// Образ копируется через коллаборатора; если памяти нет, EMBRYO
    /// откатывается в UNUSED и ничего не утекает.
    /// Child of `parent`. The image is duplicated through the collaborator;
    /// when that fails the EMBRYO is rolled back to UNUSED, leaking nothing.
    pub(crate) fn fork<F, Fut>(&'static self, parent: Slot, entry: F) -> Result<Pid, ProcError>
    where
        F: FnOnce(Sys) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let child = self.procs.lock().alloc()?;

        let image = match self.images[parent].lock().as_ref() {
            Some(img) => img.duplicate(),
            None => Some(Box::new(Bare) as Box<dyn Image>),
        };
        let Some(image) = image else {
            self.procs.lock().free(child);
            warn!(target: "proc", "fork: out of memory, slot {} rolled back", child);
            return Err(ProcError::NoMemory);
        };

        let pid = self.spawn(child, Some(parent), image, entry);
        debug!(target: "proc", "fork: slot {} -> pid {}", parent, pid);
        Ok(pid)
    }

    /// EMBRYO → RUNNABLE: контекст и образ на место, допуск на верхний уровень.
    /// EMBRYO → RUNNABLE: install context and image, admit at the top level.
    fn spawn<F, Fut>(
        &'static self,
        slot: Slot,
        parent: Option<Slot>,
        image: Box<dyn Image>,
        entry: F,
    ) -> Pid
    where
        F: FnOnce(Sys) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let pid = self.procs.lock()[slot].pid;
        *self.images[slot].lock() = Some(image);
        // Прежний CPU мог ещё держать контекст этого слота; ждём его.
        *self.contexts[slot].lock() = Some(Box::pin(entry(Sys::new(self, slot, pid))));

        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        let p = &mut procs[slot];
        p.parent = parent;
        p.set_state(ProcState::Runnable);
        if let Err(e) = queues.enqueue(&mut procs, slot, TOP) {
            error!(target: "proc", "pid {}: admit failed: {}", pid, e);
        }
        pid
    }

    /// Путь завершения: RUNNING → ZOMBIE.
    ///
    /// Снимает блокировку (без повторного допуска), закрывает файлы,
    /// будит родителя, отдаёт детей корню.
    /// Exit path: releases the exclusive lock without re-admission, closes
    /// files, wakes the parent and hands the children to the root.
    pub(crate) fn terminate(&self, slot: Slot) {
        if self.root.get() == Some(&slot) {
            panic!("init exiting");
        }

        if let Some(img) = self.images[slot].lock().as_mut() {
            img.close_files();
        }

        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        let pid = procs[slot].pid;

        self.lock_slot
            .lock()
            .release_if_held(&mut procs, &mut queues, slot, Release::Exit);
        queues.delete_by_pid(&procs, pid).ok();

        if let Some(parent) = procs[slot].parent {
            wakeup_locked(&mut procs, &mut queues, Channel::Wait(parent));
        }

        let root = self.root.get().copied();
        let mut orphan_zombie = false;
        for (_, child) in procs.live_mut() {
            if child.parent == Some(slot) {
                child.parent = root;
                orphan_zombie |= child.state() == ProcState::Zombie;
            }
        }
        if let (true, Some(root)) = (orphan_zombie, root) {
            wakeup_locked(&mut procs, &mut queues, Channel::Wait(root));
        }

        let p = &mut procs[slot];
        p.set_state(ProcState::Zombie);
        p.cpu = None;
        p.chan = None;
        p.flags.remove(ProcFlags::FRONT);
        debug!(target: "proc", "pid {} exited", pid);
    }

    /// Один шаг `wait`: освободить зомби-ребёнка или уснуть.
    ///
    /// Проверка и засыпание идут под одной блокировкой реестра, так что
    /// выход ребёнка между ними не теряется.
    /// One `wait` step: reclaim a ZOMBIE child or go to sleep. The check and
    /// the sleep happen under one registry lock, so no exit is missed.
    pub(crate) fn wait_step(&self, parent: Slot) -> WaitStep {
        let mut procs = self.procs.lock();

        let mut have_kids = false;
        let mut zombie = None;
        for (slot, p) in procs.live() {
            if p.parent == Some(parent) {
                have_kids = true;
                if p.state() == ProcState::Zombie {
                    zombie = Some(slot);
                    break;
                }
            }
        }

        if let Some(child) = zombie {
            let pid = procs[child].pid;
            // Память образа освобождается здесь / image memory is freed here.
            self.images[child].lock().take();
            procs.free(child);
            debug!(target: "proc", "pid {} reclaimed by pid {}", pid, procs[parent].pid);
            return WaitStep::Reaped(pid);
        }
        if !have_kids {
            return WaitStep::Failed(ProcError::NoChildren);
        }
        if procs[parent].is_killed() {
            return WaitStep::Failed(ProcError::Killed);
        }

        self.sleep_locked(&mut procs, parent, Channel::Wait(parent));
        WaitStep::Blocked
    }

    /// RUNNING → SLEEPING на `chan`. Держатель блокировки её теряет.
    /// RUNNING → SLEEPING on `chan`. A lock holder loses the lock first.
    pub(crate) fn sleep_locked(&self, procs: &mut ProcTable, slot: Slot, chan: Channel) {
        let mut queues = self.queues.lock();
        let p = &mut procs[slot];
        p.set_state(ProcState::Sleeping);
        p.chan = Some(chan);
        p.cpu = None;
        p.flags.remove(ProcFlags::FRONT);

        self.lock_slot
            .lock()
            .release_if_held(procs, &mut queues, slot, Release::Readmit);
    }

    /// Уснуть, отпустив внешнюю блокировку `external` уже под реестром.
    /// Sleep, dropping `external` only once the registry lock is held.
    pub(crate) fn sleep_on<G>(&self, slot: Slot, chan: Channel, external: G) {
        let mut procs = self.procs.lock();
        drop(external);
        self.sleep_locked(&mut procs, slot, chan);
    }

    pub fn wakeup(&self, chan: Channel) {
        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        wakeup_locked(&mut procs, &mut queues, chan);
    }

    /// RUNNING → RUNNABLE при отдаче CPU.
    ///
    /// Держатель блокировки в очередь не встаёт; FRONT ставит в голову
    /// верхнего уровня; остальные в хвост своего уровня.
    /// RUNNING → RUNNABLE on yield. The lock holder is not queued, a FRONT
    /// process goes to the head of the top level, the rest to the tail of
    /// their own level.
    pub(crate) fn yield_locked(&self, procs: &mut ProcTable, queues: &mut QueueTable, slot: Slot) {
        let p = &mut procs[slot];
        p.set_state(ProcState::Runnable);
        p.cpu = None;

        let res = if p.is_locked() {
            Ok(())
        } else if p.flags.contains(ProcFlags::FRONT) {
            p.flags.remove(ProcFlags::FRONT);
            queues.front_enqueue(procs, slot, TOP)
        } else {
            let level = p.level;
            queues.enqueue(procs, slot, level)
        };
        if let Err(e) = res {
            error!(target: "proc", "pid {}: requeue failed: {}", procs[slot].pid, e);
        }
    }

    pub(crate) fn yield_now(&self, slot: Slot) {
        let mut procs = self.procs.lock();
        let mut queues = self.queues.lock();
        self.yield_locked(&mut procs, &mut queues, slot);
    }

    /// Пометить убитым. Спящий сразу становится RUNNABLE со свежими полями;
    /// работающий умрёт в ближайшей безопасной точке.
    /// Mark `pid` killed. A sleeper becomes RUNNABLE with fresh fields at
    /// once; a running process dies at its next safe checkpoint.
    pub fn kill(&self, pid: Pid) -> Result<(), ProcError> {
        let mut procs = self.procs.lock();
        let slot = procs.find(pid).ok_or(ProcError::NoSuchProcess)?;
        procs[slot].flags.insert(ProcFlags::KILLED);
        if procs[slot].state() == ProcState::Sleeping {
            let mut queues = self.queues.lock();
            make_runnable(&mut procs, &mut queues, slot);
        }
        debug!(target: "proc", "pid {} killed", pid);
        Ok(())
    }

    /// Приоритет в `0..=MAX_PRIORITY` / Priority in `0..=MAX_PRIORITY`.
    pub fn set_priority(&self, pid: Pid, priority: i32) -> Result<(), ProcError> {
        let priority = u8::try_from(priority)
            .ok()
            .filter(|&p| p <= MAX_PRIORITY)
            .ok_or(ProcError::InvalidPriority)?;
        let mut procs = self.procs.lock();
        let slot = procs.find(pid).ok_or(ProcError::NoSuchProcess)?;
        procs[slot].priority = priority;
        Ok(())
    }
}
