#[cfg(target_os = "windows")]
pub mod windows;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::trace;

#[cfg(target_os = "windows")]
pub fn get_drive_letter(path: &Path) -> Option<OsString> {
    windows::get_drive_letter(path)
}

#[cfg(not(target_os = "windows"))]
pub fn get_drive_letter(_path: &Path) -> Option<OsString> {
    None
}

/// Opaque OS window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub usize);

/// A point-in-time read of one top-level window. Stale as soon as it is taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub handle: WindowHandle,
    pub title: String,
    pub pid: u32,
}

impl fmt::Display for WindowSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WindowSnapshot(hwnd={:#x}, title=\"{}\", pid={})",
            self.handle.0, self.title, self.pid
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub cwd: Option<PathBuf>,
}

/// The process vanished between being observed and being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessGone(pub u32);

impl fmt::Display for ProcessGone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no such process: {}", self.0)
    }
}

impl std::error::Error for ProcessGone {}

pub trait WindowObserver: Send + Sync {
    /// Every top-level window currently owned by `pid`. Re-enumerated per call.
    fn windows_of(&self, pid: u32) -> Box<dyn Iterator<Item = WindowSnapshot> + '_>;

    /// Ask the window to close. Returns false if the request was not delivered.
    fn close_window(&self, window: &WindowSnapshot) -> bool;
}

pub trait ProcessObserver: Send + Sync {
    /// Scan the process table once and return the first match.
    fn process_of(&self, predicate: &dyn Fn(&ProcessInfo) -> bool) -> Option<ProcessInfo>;

    fn children_of(&self, pid: u32) -> Vec<ProcessInfo>;

    fn is_running(&self, pid: u32) -> bool;

    fn terminate(&self, pid: u32) -> Result<(), ProcessGone>;

    fn lower_priority(&self, pid: u32) -> Result<(), ProcessGone>;
}

/// Everything the session controller observes or pokes on the host.
pub trait Host: WindowObserver + ProcessObserver {}

impl<T: WindowObserver + ProcessObserver> Host for T {}

/// The real host: processes through `sysinfo`, windows through Win32.
pub struct SystemHost {
    system: Mutex<System>,
}

impl SystemHost {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn refreshed(&self, processes: ProcessesToUpdate<'_>) -> MutexGuard<'_, System> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes_specifics(
            processes,
            true,
            ProcessRefreshKind::nothing().with_cwd(UpdateKind::OnlyIfNotSet),
        );
        system
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

fn process_info(pid: Pid, process: &sysinfo::Process) -> ProcessInfo {
    ProcessInfo {
        pid: pid.as_u32(),
        parent_pid: process.parent().map(|p| p.as_u32()),
        name: process.name().to_string_lossy().into_owned(),
        cwd: process.cwd().map(Path::to_path_buf),
    }
}

impl ProcessObserver for SystemHost {
    fn process_of(&self, predicate: &dyn Fn(&ProcessInfo) -> bool) -> Option<ProcessInfo> {
        let system = self.refreshed(ProcessesToUpdate::All);
        system
            .processes()
            .iter()
            .map(|(pid, process)| process_info(*pid, process))
            .find(|info| predicate(info))
    }

    fn children_of(&self, pid: u32) -> Vec<ProcessInfo> {
        let parent = Pid::from_u32(pid);
        let system = self.refreshed(ProcessesToUpdate::All);
        system
            .processes()
            .iter()
            .filter(|(_, process)| process.parent() == Some(parent))
            .map(|(pid, process)| process_info(*pid, process))
            .collect()
    }

    fn is_running(&self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        let system = self.refreshed(ProcessesToUpdate::Some(&[pid]));
        system.process(pid).is_some()
    }

    fn terminate(&self, pid: u32) -> Result<(), ProcessGone> {
        let target = Pid::from_u32(pid);
        let system = self.refreshed(ProcessesToUpdate::Some(&[target]));
        let process = system.process(target).ok_or(ProcessGone(pid))?;
        if !process.kill() {
            trace!("kill signal for {} was not delivered", pid);
        }
        Ok(())
    }

    #[cfg(target_os = "windows")]
    fn lower_priority(&self, pid: u32) -> Result<(), ProcessGone> {
        if windows::set_below_normal_priority(pid) || self.is_running(pid) {
            Ok(())
        } else {
            Err(ProcessGone(pid))
        }
    }

    #[cfg(not(target_os = "windows"))]
    fn lower_priority(&self, pid: u32) -> Result<(), ProcessGone> {
        if self.is_running(pid) {
            Ok(())
        } else {
            Err(ProcessGone(pid))
        }
    }
}

impl WindowObserver for SystemHost {
    #[cfg(target_os = "windows")]
    fn windows_of(&self, pid: u32) -> Box<dyn Iterator<Item = WindowSnapshot> + '_> {
        Box::new(windows::windows_of(pid))
    }

    #[cfg(not(target_os = "windows"))]
    fn windows_of(&self, _pid: u32) -> Box<dyn Iterator<Item = WindowSnapshot> + '_> {
        Box::new(std::iter::empty())
    }

    #[cfg(target_os = "windows")]
    fn close_window(&self, window: &WindowSnapshot) -> bool {
        windows::close_window(window.handle)
    }

    #[cfg(not(target_os = "windows"))]
    fn close_window(&self, _window: &WindowSnapshot) -> bool {
        false
    }
}
