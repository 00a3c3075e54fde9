//! Process Registry — таблица PCB фиксированного размера
//!
//! Реестр — единственный владелец слотов: выделение, освобождение,
//! идентичность и переходы состояний. Ссылки на родителя — индексы слотов,
//! не владеющие.
//! The registry is the sole owner of process slots: allocation, reclamation,
//! identity and state transitions. Parent links are plain slot indices.
//!
//! Состояния / States:
//!
//! ```text
//!   UNUSED ──alloc──► EMBRYO ──admit──► RUNNABLE ◄──dispatch/suspend──► RUNNING
//!      ▲                 │                  ▲                            │  │
//!      │            (rollback)              └──────wake──── SLEEPING ◄───┘  │
//!      └──── reclaim ──── ZOMBIE ◄──────────────── terminate ──────────────┘
//! ```

pub mod dump;
pub mod image;
pub mod lifecycle;

use core::fmt;
use core::ops::{Index, IndexMut};

use bitflags::bitflags;

use crate::error::ProcError;
use crate::param::{MAX_PRIORITY, NPROC, TOP};

/// Индекс слота в реестре / Registry slot index.
pub type Slot = usize;

/// Идентификатор процесса / Process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// Pid свободного слота / Pid of an UNUSED slot.
    pub const NONE: Pid = Pid(0);

    pub const fn as_isize(self) -> isize {
        self.0 as isize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Состояние процесса / Process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

impl ProcState {
    /// Допустимые рёбра автомата / Legal edges of the state machine.
    pub const fn can_become(self, next: ProcState) -> bool {
        use ProcState::*;
        matches!(
            (self, next),
            (Unused, Embryo)
                | (Embryo, Runnable)
                | (Embryo, Unused)
                | (Runnable, Running)
                | (Running, Runnable)
                | (Running, Sleeping)
                | (Running, Zombie)
                | (Sleeping, Runnable)
                | (Zombie, Unused)
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Embryo => "embryo",
            Self::Sleeping => "sleep ",
            Self::Runnable => "runble",
            Self::Running => "run   ",
            Self::Zombie => "zombie",
        }
    }
}

bitflags! {
    /// Флаги PCB / PCB flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProcFlags: u8 {
        /// Получил kill, умрёт в ближайшей безопасной точке.
        /// Killed, terminates at its next safe checkpoint.
        const KILLED = 1 << 0;
        /// Держит эксклюзивную блокировку / Holds the exclusive lock.
        const LOCKED = 1 << 1;
        /// Вернуть в голову верхнего уровня при следующем yield.
        /// Re-admit at the head of the top level on the next yield.
        const FRONT  = 1 << 2;
    }
}

/// Ключ ожидания для sleep/wakeup / Wait key for sleep/wakeup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Тик часов / Clock tick.
    Ticks,
    /// Родитель в `wait`, ключ — его слот / Parent in `wait`, keyed by its slot.
    Wait(Slot),
    /// Произвольный ключ вызывающего / Caller-defined key.
    Key(usize),
}

impl Channel {
    /// Ключ по адресу объекта / Key derived from an object's address.
    pub fn of<T>(obj: &T) -> Self {
        Channel::Key(obj as *const T as usize)
    }
}

/// Process control block.
#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    pub pid: Pid,
    state: ProcState,
    /// Текущий уровень MLFQ / Current MLFQ level.
    pub level: usize,
    pub priority: u8,
    /// Тики на текущем уровне / Ticks consumed at the current level.
    pub exec_time: u32,
    /// Ключ тай-брейка / Tie-break key.
    pub arrived_time: u32,
    pub parent: Option<Slot>,
    pub chan: Option<Channel>,
    pub flags: ProcFlags,
    /// CPU, на котором процесс RUNNING / CPU the process is RUNNING on.
    pub cpu: Option<usize>,
}

impl Pcb {
    const fn unused() -> Self {
        Self {
            pid: Pid::NONE,
            state: ProcState::Unused,
            level: TOP,
            priority: MAX_PRIORITY,
            exec_time: 0,
            arrived_time: 0,
            parent: None,
            chan: None,
            flags: ProcFlags::empty(),
            cpu: None,
        }
    }

    pub fn state(&self) -> ProcState {
        self.state
    }

    /// Переход состояния. Недопустимое ребро — порча ядра, останов.
    /// State transition. An illegal edge means corrupted kernel state: halt.
    pub fn set_state(&mut self, next: ProcState) {
        if !self.state.can_become(next) {
            panic!(
                "pid {}: illegal transition {:?} -> {:?}",
                self.pid, self.state, next
            );
        }
        self.state = next;
    }

    pub fn is_killed(&self) -> bool {
        self.flags.contains(ProcFlags::KILLED)
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(ProcFlags::LOCKED)
    }

    /// Свежие execTime и priority / Freshest execTime and priority.
    pub fn refresh(&mut self) {
        self.exec_time = 0;
        self.priority = MAX_PRIORITY;
    }

    /// Можно диспетчеризовать / Eligible for dispatch.
    pub fn is_dispatchable(&self) -> bool {
        self.state == ProcState::Runnable && !self.is_killed()
    }
}

/// Реестр процессов / Process registry.
pub struct ProcTable {
    procs: [Pcb; NPROC],
    next_pid: u32,
    last_stamp: u32,
}

impl ProcTable {
    pub const fn new() -> Self {
        Self {
            procs: [Pcb::unused(); NPROC],
            next_pid: 1,
            last_stamp: 0,
        }
    }

    /// UNUSED → EMBRYO: новый pid и поля планирования по умолчанию.
    /// UNUSED → EMBRYO with a fresh pid and default scheduling fields.
    pub fn alloc(&mut self) -> Result<Slot, ProcError> {
        let slot = self
            .procs
            .iter()
            .position(|p| p.state == ProcState::Unused)
            .ok_or(ProcError::NoSlot)?;

        let pid = self.next_pid;
        self.next_pid += 1;

        let p = &mut self.procs[slot];
        *p = Pcb::unused();
        p.set_state(ProcState::Embryo);
        p.pid = Pid(pid);
        p.arrived_time = pid;
        Ok(slot)
    }

    /// EMBRYO/ZOMBIE → UNUSED: слот снова свободен.
    /// EMBRYO/ZOMBIE → UNUSED: the slot is free for reuse.
    pub fn free(&mut self, slot: Slot) {
        let p = &mut self.procs[slot];
        p.set_state(ProcState::Unused);
        *p = Pcb::unused();
    }

    /// Метка прибытия для повторного допуска, не меньше следующего pid.
    /// Arrival stamp for re-admission; never below the next pid.
    pub fn stamp(&mut self) -> u32 {
        self.last_stamp = (self.last_stamp + 1).max(self.next_pid);
        self.last_stamp
    }

    /// Слот живого процесса с данным pid / Slot of the live process `pid`.
    pub fn find(&self, pid: Pid) -> Option<Slot> {
        if pid == Pid::NONE {
            return None;
        }
        self.procs
            .iter()
            .position(|p| p.pid == pid && p.state != ProcState::Unused)
    }

    /// Живые PCB / Live (non-UNUSED) PCBs.
    pub fn live(&self) -> impl Iterator<Item = (Slot, &Pcb)> {
        self.procs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state != ProcState::Unused)
    }

    pub fn live_mut(&mut self) -> impl Iterator<Item = (Slot, &mut Pcb)> {
        self.procs
            .iter_mut()
            .enumerate()
            .filter(|(_, p)| p.state != ProcState::Unused)
    }

    pub fn count(&self, state: ProcState) -> usize {
        self.procs.iter().filter(|p| p.state == state).count()
    }
}

impl Default for ProcTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<Slot> for ProcTable {
    type Output = Pcb;

    fn index(&self, slot: Slot) -> &Pcb {
        &self.procs[slot]
    }
}

impl IndexMut<Slot> for ProcTable {
    fn index_mut(&mut self, slot: Slot) -> &mut Pcb {
        &mut self.procs[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_assigns_monotonic_pids_and_defaults() {
        let mut t = ProcTable::new();
        let a = t.alloc().unwrap();
        let b = t.alloc().unwrap();
        assert_ne!(a, b);
        assert_eq!(t[a].pid, Pid(1));
        assert_eq!(t[b].pid, Pid(2));
        assert_eq!(t[b].state(), ProcState::Embryo);
        assert_eq!(t[b].level, TOP);
        assert_eq!(t[b].priority, MAX_PRIORITY);
        assert_eq!(t[b].exec_time, 0);
        assert_eq!(t[b].arrived_time, 2);
    }

    #[test]
    fn freed_slot_is_reused_with_new_pid() {
        let mut t = ProcTable::new();
        let a = t.alloc().unwrap();
        t.free(a);
        assert_eq!(t[a].state(), ProcState::Unused);
        assert_eq!(t.find(Pid(1)), None);

        let b = t.alloc().unwrap();
        assert_eq!(a, b);
        assert_eq!(t[b].pid, Pid(2));
    }

    #[test]
    fn alloc_fails_when_full() {
        let mut t = ProcTable::new();
        for _ in 0..NPROC {
            t.alloc().unwrap();
        }
        assert_eq!(t.alloc(), Err(ProcError::NoSlot));
        assert_eq!(t.count(ProcState::Embryo), NPROC);
    }

    #[test]
    fn new_process_arrives_with_its_pid() {
        let mut t = ProcTable::new();
        let a = t.alloc().unwrap();
        let s = t.stamp();
        let b = t.alloc().unwrap();
        assert_eq!(t[a].arrived_time, 1);
        assert_eq!(t[b].arrived_time, t[b].pid.0);
        assert!(s > t[a].arrived_time);
        assert!(t.stamp() > t[b].arrived_time);
        assert!(t.stamp() > s);
    }

    #[test]
    fn legal_edges_only() {
        use ProcState::*;
        assert!(Running.can_become(Sleeping));
        assert!(Sleeping.can_become(Runnable));
        assert!(!Sleeping.can_become(Running));
        assert!(!Zombie.can_become(Runnable));
        assert!(!Unused.can_become(Runnable));
    }

    #[test]
    #[should_panic(expected = "illegal transition")]
    fn illegal_edge_halts() {
        let mut t = ProcTable::new();
        let a = t.alloc().unwrap();
        t[a].set_state(ProcState::Zombie);
    }
}
