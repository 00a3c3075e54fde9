//! Параметры ядра / Kernel parameters
//!
//! Фиксированные ёмкости компилируются в ядро: гарантии планировщика
//! (ограниченная стоимость сканирования, никаких аллокаций) зависят от них.
//! Fixed capacities are compiled in: the scheduler's guarantees
//! (bounded scan cost, no allocation in the hot path) depend on them.

/// Максимум процессов / Maximum number of processes (registry slots).
pub const NPROC: usize = 64;

/// Максимум CPU / Maximum number of CPUs.
pub const NCPU: usize = 8;

/// Число уровней MLFQ / Number of MLFQ levels.
pub const NLEVEL: usize = 3;

/// Верхний уровень (наивысший приоритет) / Top level (most favored).
pub const TOP: usize = 0;

/// Нижний уровень — приоритет + время прибытия / Lowest level, priority + arrival ordered.
pub const BOTTOM: usize = NLEVEL - 1;

/// Приоритеты 0..=MAX_PRIORITY, больше — лучше.
/// Priorities 0..=MAX_PRIORITY, higher is more favored.
pub const MAX_PRIORITY: u8 = 3;

/// Минимальный приоритет / Floor for bottom-level demotion.
pub const MIN_PRIORITY: u8 = 0;

/// Кванты по уровням в тиках / Time quantum per level, in ticks.
pub const QUANTUM: [u32; NLEVEL] = [4, 6, 8];

/// Период priority boosting в тиках / Priority boosting period, in ticks.
pub const BOOST_INTERVAL: u32 = 100;

/// Пароль эксклюзивной блокировки по умолчанию.
/// Default exclusive scheduling lock credential.
pub const LOCK_PASSWORD: i32 = 2019_0309;
