#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tf2idle_core::account::CommandLine;
use tf2idle_core::installation::REQUIRED_GCFS;
use tf2idle_core::platform::{
    ProcessGone, ProcessInfo, ProcessObserver, WindowHandle, WindowObserver, WindowSnapshot,
};
use tf2idle_core::sandbox::{ExecutionContext, SandboxOptions};
use tf2idle_core::steam::SessionTimings;
use tf2idle_core::Error;

pub type StartHook = Box<dyn FnMut(&mut FakeWorld, &str, &CommandLine) + Send>;

/// A scripted host shared by the fake observer and the fake sandbox.
///
/// Window titles per pid are played back frame by frame, one frame per
/// `windows_of` call; the last frame repeats.
#[derive(Default)]
pub struct FakeWorld {
    pub processes: Vec<ProcessInfo>,
    pub window_script: HashMap<u32, Vec<Vec<String>>>,
    pub window_calls: HashMap<u32, usize>,
    /// pid -> number of `windows_of` calls after which the process exits.
    pub exits: HashMap<u32, usize>,
    /// Spawned when the keyed pid exits.
    pub successors: HashMap<u32, (ProcessInfo, Vec<Vec<String>>)>,
    pub terminated: Vec<u32>,
    pub closed_windows: Vec<String>,
    /// (context, redacted command, wait)
    pub commands: Vec<(String, String, bool)>,
    pub created: Vec<(String, SandboxOptions)>,
    pub destroyed: Vec<String>,
    pub terminated_contexts: Vec<String>,
    pub fail_create: HashSet<String>,
    pub fail_destroy: HashSet<String>,
    pub on_start: Option<StartHook>,
    next_pid: u32,
}

impl FakeWorld {
    pub fn spawn(
        &mut self,
        name: &str,
        parent: Option<u32>,
        cwd: Option<&Path>,
        frames: &[&[&str]],
    ) -> u32 {
        self.next_pid = self.next_pid.max(100) + 1;
        let pid = self.next_pid;
        self.add_process(
            ProcessInfo {
                pid,
                parent_pid: parent,
                name: name.to_string(),
                cwd: cwd.map(Path::to_path_buf),
            },
            to_frames(frames),
        );
        pid
    }

    pub fn add_process(&mut self, process: ProcessInfo, frames: Vec<Vec<String>>) {
        self.window_script.insert(process.pid, frames);
        self.processes.push(process);
    }

    pub fn kill(&mut self, pid: u32) {
        self.processes.retain(|p| p.pid != pid);
        if let Some((successor, frames)) = self.successors.remove(&pid) {
            self.add_process(successor, frames);
        }
    }

    pub fn is_alive(&self, pid: u32) -> bool {
        self.processes.iter().any(|p| p.pid == pid)
    }
}

pub fn to_frames(frames: &[&[&str]]) -> Vec<Vec<String>> {
    frames
        .iter()
        .map(|frame| frame.iter().map(|t| t.to_string()).collect())
        .collect()
}

#[derive(Clone, Default)]
pub struct FakeHost {
    world: Arc<Mutex<FakeWorld>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> MutexGuard<'_, FakeWorld> {
        self.world.lock().unwrap()
    }

    pub fn sandbox(&self) -> FakeSandbox {
        FakeSandbox {
            world: Arc::clone(&self.world),
        }
    }

    pub fn on_start(&self, hook: impl FnMut(&mut FakeWorld, &str, &CommandLine) + Send + 'static) {
        self.world().on_start = Some(Box::new(hook));
    }
}

impl WindowObserver for FakeHost {
    fn windows_of(&self, pid: u32) -> Box<dyn Iterator<Item = WindowSnapshot> + '_> {
        let mut world = self.world();
        if !world.is_alive(pid) {
            return Box::new(std::iter::empty());
        }

        let calls = {
            let counter = world.window_calls.entry(pid).or_insert(0);
            *counter += 1;
            *counter
        };
        let frame = world
            .window_script
            .get(&pid)
            .and_then(|frames| frames.get(calls - 1).or_else(|| frames.last()))
            .cloned()
            .unwrap_or_default();

        if world.exits.get(&pid).map_or(false, |after| calls >= *after) {
            world.kill(pid);
        }

        let snapshots: Vec<WindowSnapshot> = frame
            .into_iter()
            .enumerate()
            .map(|(i, title)| WindowSnapshot {
                handle: WindowHandle(pid as usize * 1000 + i),
                title,
                pid,
            })
            .collect();
        Box::new(snapshots.into_iter())
    }

    fn close_window(&self, window: &WindowSnapshot) -> bool {
        self.world().closed_windows.push(window.title.clone());
        true
    }
}

impl ProcessObserver for FakeHost {
    fn process_of(&self, predicate: &dyn Fn(&ProcessInfo) -> bool) -> Option<ProcessInfo> {
        let processes = self.world().processes.clone();
        processes.into_iter().find(|p| predicate(p))
    }

    fn children_of(&self, pid: u32) -> Vec<ProcessInfo> {
        self.world()
            .processes
            .iter()
            .filter(|p| p.parent_pid == Some(pid))
            .cloned()
            .collect()
    }

    fn is_running(&self, pid: u32) -> bool {
        self.world().is_alive(pid)
    }

    fn terminate(&self, pid: u32) -> Result<(), ProcessGone> {
        let mut world = self.world();
        if !world.is_alive(pid) {
            return Err(ProcessGone(pid));
        }
        world.terminated.push(pid);
        world.kill(pid);
        Ok(())
    }

    fn lower_priority(&self, pid: u32) -> Result<(), ProcessGone> {
        if self.is_running(pid) {
            Ok(())
        } else {
            Err(ProcessGone(pid))
        }
    }
}

/// Records every call; runs the world's start hook for `start_in_context`.
pub struct FakeSandbox {
    world: Arc<Mutex<FakeWorld>>,
}

impl ExecutionContext for FakeSandbox {
    fn create_context(&self, name: &str, options: &SandboxOptions) -> Result<(), Error> {
        let mut world = self.world.lock().unwrap();
        if world.fail_create.contains(name) {
            return Err(Error::Sandbox {
                context: name.to_string(),
                message: "create failed".to_string(),
            });
        }
        world.created.push((name.to_string(), options.clone()));
        Ok(())
    }

    fn start_in_context(&self, name: &str, command: &CommandLine, wait: bool) -> Result<(), Error> {
        let mut world = self.world.lock().unwrap();
        world
            .commands
            .push((name.to_string(), command.to_string(), wait));
        if let Some(mut hook) = world.on_start.take() {
            hook(&mut world, name, command);
            world.on_start = Some(hook);
        }
        Ok(())
    }

    fn terminate_processes(&self, name: &str) -> Result<(), Error> {
        self.world
            .lock()
            .unwrap()
            .terminated_contexts
            .push(name.to_string());
        Ok(())
    }

    fn destroy_context(&self, name: &str) -> Result<(), Error> {
        let mut world = self.world.lock().unwrap();
        if world.fail_destroy.contains(name) {
            return Err(Error::Sandbox {
                context: name.to_string(),
                message: "destroy failed".to_string(),
            });
        }
        world.destroyed.push(name.to_string());
        Ok(())
    }
}

pub fn fast_timings() -> SessionTimings {
    SessionTimings {
        launcher_start: Duration::from_millis(200),
        restart_after_update: Duration::from_millis(200),
        shutdown: Duration::from_millis(50),
        login_poll: Duration::from_millis(5),
        launch_poll: Duration::from_millis(5),
        console_poll: Duration::from_millis(5),
        login_timeout: None,
        steam_guard_extension: None,
    }
}

/// A base Steam tree with everything a TF2 installation needs.
///
/// Layout:
///   root/
///     steam.exe, Steam.dll, readme.txt
///     bin/launcher.dll
///     steamapps/<every required gcf>, steamapps/notes.txt
pub fn create_steam_tree(root: &Path) -> PathBuf {
    fs::create_dir_all(root.join("bin")).unwrap();
    fs::create_dir_all(root.join("steamapps")).unwrap();
    fs::write(root.join("steam.exe"), "exe").unwrap();
    fs::write(root.join("Steam.dll"), "dll").unwrap();
    fs::write(root.join("readme.txt"), "not linked").unwrap();
    fs::write(root.join("bin").join("launcher.dll"), "bin dll").unwrap();
    for gcf in REQUIRED_GCFS {
        fs::write(root.join("steamapps").join(gcf), gcf).unwrap();
    }
    fs::write(root.join("steamapps").join("notes.txt"), "not linked").unwrap();
    root.to_path_buf()
}
