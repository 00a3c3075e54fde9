//! Queue Table — уровни MLFQ
//!
//! Фиксированный набор уровней, каждый — ограниченная FIFO слотов.
//! Нижний уровень выбирает по полосам приоритета, затем по arrivedTime.
//! A fixed set of levels, each a bounded FIFO of slots. The lowest level
//! selects by priority band, then by arrival.
//!
//! Все операции принимают реестр по ссылке: вызвать их можно только
//! держа `procs`, в порядке `procs` → `queues`.
//! Every operation borrows the registry, so callers necessarily hold
//! `procs` and acquire in the order `procs` → `queues`.

use heapless::Vec;

use crate::error::QueueError;
use crate::param::{BOTTOM, MAX_PRIORITY, MIN_PRIORITY, NLEVEL, NPROC};
use crate::proc::{Pid, ProcState, ProcTable, Slot};

type Level = Vec<Slot, NPROC>;

/// Позиция записи / Position of a queued entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub level: usize,
    pub index: usize,
}

pub struct QueueTable {
    levels: [Level; NLEVEL],
}

impl QueueTable {
    pub const fn new() -> Self {
        const EMPTY: Level = Vec::new();
        Self {
            levels: [EMPTY; NLEVEL],
        }
    }

    fn admit_check(&self, procs: &ProcTable, slot: Slot, level: usize) -> Result<(), QueueError> {
        if level >= NLEVEL {
            return Err(QueueError::InvalidLevel);
        }
        if self.levels[level].is_full() {
            return Err(QueueError::Full);
        }
        if procs[slot].state() != ProcState::Runnable {
            return Err(QueueError::NotRunnable);
        }
        if let Some(at) = self.locate(slot) {
            panic!(
                "queue: pid {} already queued at level {}",
                procs[slot].pid, at.level
            );
        }
        Ok(())
    }

    /// В хвост уровня / Append at the tail of `level`.
    pub fn enqueue(
        &mut self,
        procs: &mut ProcTable,
        slot: Slot,
        level: usize,
    ) -> Result<(), QueueError> {
        self.admit_check(procs, slot, level)?;
        self.levels[level].push(slot).map_err(|_| QueueError::Full)?;
        procs[slot].level = level;
        Ok(())
    }

    /// В голову уровня, остальные сдвигаются назад.
    /// Insert at the head of `level`, shifting the others back.
    pub fn front_enqueue(
        &mut self,
        procs: &mut ProcTable,
        slot: Slot,
        level: usize,
    ) -> Result<(), QueueError> {
        self.admit_check(procs, slot, level)?;
        self.levels[level]
            .insert(0, slot)
            .map_err(|_| QueueError::Full)?;
        procs[slot].level = level;
        Ok(())
    }

    /// Снять следующую запись уровня.
    ///
    /// Верхние уровни — голова FIFO. Нижний — первая непустая полоса
    /// приоритета сверху вниз, в ней наименьший arrivedTime, затем
    /// наименьший индекс.
    ///
    /// Upper levels pop the FIFO head. The lowest level scans priority bands
    /// from highest to lowest and takes the smallest arrivedTime in the first
    /// non-empty band, lowest index on ties.
    pub fn dequeue(&mut self, procs: &ProcTable, level: usize) -> Result<Slot, QueueError> {
        if level >= NLEVEL {
            return Err(QueueError::InvalidLevel);
        }
        let q = &mut self.levels[level];
        if q.is_empty() {
            return Err(QueueError::Empty);
        }
        let index = if level < BOTTOM {
            0
        } else {
            Self::select_bottom(q, procs)
        };
        Ok(q.remove(index))
    }

    fn select_bottom(q: &Level, procs: &ProcTable) -> usize {
        for band in (MIN_PRIORITY..=MAX_PRIORITY).rev() {
            let pick = q
                .iter()
                .enumerate()
                .filter(|(_, &s)| procs[s].priority == band)
                .min_by_key(|&(i, &s)| (procs[s].arrived_time, i));
            if let Some((i, _)) = pick {
                return i;
            }
        }
        // Приоритет вне полос не бывает, но голова всё равно валидна.
        0
    }

    /// Линейный поиск по всем уровням / Linear scan across all levels.
    pub fn find_by_pid(&self, procs: &ProcTable, pid: Pid) -> Option<Location> {
        self.levels.iter().enumerate().find_map(|(level, q)| {
            q.iter()
                .position(|&s| procs[s].pid == pid)
                .map(|index| Location { level, index })
        })
    }

    /// Удалить запись pid с уплотнением уровня.
    /// Remove `pid`'s entry, compacting its level.
    pub fn delete_by_pid(&mut self, procs: &ProcTable, pid: Pid) -> Result<Slot, QueueError> {
        let at = self
            .find_by_pid(procs, pid)
            .ok_or(QueueError::NotFound)?;
        Ok(self.levels[at.level].remove(at.index))
    }

    /// Где стоит слот / Where `slot` is queued, if anywhere.
    pub fn locate(&self, slot: Slot) -> Option<Location> {
        self.levels.iter().enumerate().find_map(|(level, q)| {
            q.iter()
                .position(|&s| s == slot)
                .map(|index| Location { level, index })
        })
    }

    /// Содержимое уровня в порядке хранения / Level contents in storage order.
    pub fn level(&self, level: usize) -> &[Slot] {
        &self.levels[level]
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|q| q.is_empty())
    }
}

impl Default for QueueTable {
    fn default() -> Self {
        Self::new()
    }
}
