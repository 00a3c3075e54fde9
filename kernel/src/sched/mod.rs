//! Scheduler — MLFQ с эксклюзивной блокировкой
//!
//! Multilevel Feedback Queue с бустом приоритетов.
//! Multilevel Feedback Queue with priority boosting.
//!
//! Очереди / Queues (кванты по умолчанию / default quanta):
//!   0 → 4 тика  — новые и разбуженные   (highest priority)
//!   1 → 6 тиков — исчерпавшие квант на 0
//!   2 → 8 тиков — приоритет, затем FCFS (lowest level)
//!
//! Пробуждение ВСЕГДА идёт на уровень 0.
//! Wake-up ALWAYS goes to level 0.
//!
//! Каждые `boost_interval` тиков всё поднимается на уровень 0.
//! Пока занят слот блокировки, исполняется только его держатель.
//! Every `boost_interval` ticks everything is raised to level 0.
//! While the lock slot is occupied, only its holder runs.

pub mod clock;
pub mod cpu;
pub mod lock;
pub mod queue;
pub mod scheduler;

pub use scheduler::Dispatch;
