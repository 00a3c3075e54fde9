//! Runtime configuration of a kernel instance.
//!
//! Ёмкости фиксированы в [`crate::param`], здесь только политика.
//! Capacities live in [`crate::param`]; this is policy only.

use log::LevelFilter;

use crate::param::{BOOST_INTERVAL, LOCK_PASSWORD, NLEVEL, QUANTUM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Credential checked by `scheduler_lock` / `scheduler_unlock`.
    pub lock_password: i32,
    /// Ticks between two priority boosts.
    pub boost_interval: u32,
    /// Time quantum per level.
    pub quantum: [u32; NLEVEL],
    /// Level handed to `klog::init` at boot.
    pub log_level: LevelFilter,
}

impl KernelConfig {
    pub const fn new() -> Self {
        Self {
            lock_password: LOCK_PASSWORD,
            boost_interval: BOOST_INTERVAL,
            quantum: QUANTUM,
            log_level: LevelFilter::Info,
        }
    }

    pub const fn with_lock_password(mut self, password: i32) -> Self {
        self.lock_password = password;
        self
    }

    pub const fn with_boost_interval(mut self, ticks: u32) -> Self {
        self.boost_interval = ticks;
        self
    }

    pub const fn with_quantum(mut self, quantum: [u32; NLEVEL]) -> Self {
        self.quantum = quantum;
        self
    }

    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Квант уровня / Quantum of `level`.
    pub const fn quantum(&self, level: usize) -> u32 {
        self.quantum[level]
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}
