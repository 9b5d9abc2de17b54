extern crate winapi;

use std::ffi::OsString;
use std::path::{Component, Path};

use winapi::shared::minwindef::{BOOL, DWORD, FALSE, LPARAM, TRUE};
use winapi::shared::windef::HWND;
use winapi::um::handleapi::CloseHandle;
use winapi::um::processthreadsapi::{OpenProcess, SetPriorityClass};
use winapi::um::winbase::BELOW_NORMAL_PRIORITY_CLASS;
use winapi::um::winnt::PROCESS_SET_INFORMATION;
use winapi::um::winuser::{
    EnumWindows, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId, PostMessageW,
    WM_CLOSE,
};

use super::{WindowHandle, WindowSnapshot};

pub fn get_drive_letter(path: &Path) -> Option<OsString> {
    for component in path.components() {
        if let Component::Prefix(prefix_comp) = component {
            match prefix_comp.kind() {
                std::path::Prefix::Disk(letter) | std::path::Prefix::VerbatimDisk(letter) => {
                    let drive_letter = format!("{}:", letter as char);
                    return Some(OsString::from(drive_letter));
                }
                _ => (),
            }
        }
    }
    None
}

unsafe extern "system" fn collect_window(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let handles = &mut *(lparam as *mut Vec<usize>);
    handles.push(hwnd as usize);
    TRUE
}

/// Handles of all top-level windows on the desktop.
pub fn top_level_windows() -> Vec<WindowHandle> {
    let mut handles: Vec<usize> = Vec::new();
    unsafe {
        EnumWindows(
            Some(collect_window),
            &mut handles as *mut Vec<usize> as LPARAM,
        );
    }
    handles.into_iter().map(WindowHandle).collect()
}

pub fn window_pid(handle: WindowHandle) -> u32 {
    let mut pid: DWORD = 0;
    unsafe {
        GetWindowThreadProcessId(handle.0 as HWND, &mut pid);
    }
    pid
}

pub fn window_title(handle: WindowHandle) -> String {
    unsafe {
        let hwnd = handle.0 as HWND;
        // For the null character.
        let max_count = GetWindowTextLengthW(hwnd) + 1;
        let mut buf: Vec<u16> = vec![0; max_count as usize];
        let copied = GetWindowTextW(hwnd, buf.as_mut_ptr(), max_count);
        String::from_utf16_lossy(&buf[..copied.max(0) as usize])
    }
}

/// Lazily snapshot the windows owned by `pid`; titles are read on demand.
pub fn windows_of(pid: u32) -> impl Iterator<Item = WindowSnapshot> {
    top_level_windows()
        .into_iter()
        .filter(move |handle| window_pid(*handle) == pid)
        .map(move |handle| WindowSnapshot {
            handle,
            title: window_title(handle),
            pid,
        })
}

pub fn close_window(handle: WindowHandle) -> bool {
    unsafe { PostMessageW(handle.0 as HWND, WM_CLOSE, 0, 0) != 0 }
}

pub fn set_below_normal_priority(pid: u32) -> bool {
    unsafe {
        let handle = OpenProcess(PROCESS_SET_INFORMATION, FALSE, pid);
        if handle.is_null() {
            return false;
        }
        let ok = SetPriorityClass(handle, BELOW_NORMAL_PRIORITY_CLASS) != 0;
        CloseHandle(handle);
        ok
    }
}
