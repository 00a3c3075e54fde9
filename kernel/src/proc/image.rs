//! Image — внешние ресурсы процесса (память, файлы)
//!
//! Планировщик не управляет адресными пространствами и файлами; он лишь
//! зовёт коллабораторов в нужные моменты жизненного цикла.
//! The scheduler does not manage address spaces or files; it only calls the
//! collaborator at the right lifecycle points:
//!
//!   fork    → `duplicate`   (None = нет памяти / out of memory)
//!   exit    → `close_files`
//!   wait    → drop          (освобождение памяти / memory is freed)

use alloc::boxed::Box;

pub trait Image: Send {
    /// Копия для ребёнка / Copy for a forked child.
    fn duplicate(&self) -> Option<Box<dyn Image>>;

    /// Закрыть файлы при exit / Close open files on exit.
    fn close_files(&mut self) {}
}

/// Процесс без ресурсов / A process with no resources.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bare;

impl Image for Bare {
    fn duplicate(&self) -> Option<Box<dyn Image>> {
        Some(Box::new(Bare))
    }
}
