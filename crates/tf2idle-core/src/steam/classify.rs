use crate::platform::WindowSnapshot;

/// All three must be open at once for a login to count as done.
pub const READY_TITLES: [&str; 3] = ["Steam", "Friends", "Servers"];
pub const LOGIN_ERROR_TITLES: [&str; 2] = ["Steam - Error", "Steam - Warning"];
pub const SUSPENDED_TITLE: &str = "Steam - Contact us";
pub const STEAM_GUARD_TITLE: &str = "Steam Guard - Computer Authorization Required";
pub const STEAM_UPDATING_PREFIX: &str = "Steam - Updating";

pub const UNKNOWN_VIDEO_CARD_TITLE: &str = "Unknown Video Card";
pub const LAUNCH_ERROR_TITLES: [&str; 3] =
    ["Steam - Error", "Steam - Warning", "Ready - Team Fortress 2"];
pub const PREPARING_TITLE: &str = "Team Fortress 2 - Steam";
pub const UPDATING_TF2_TITLE: &str = "Updating Team Fortress 2";

pub const FATAL_ERROR_TITLES: [&str; 3] =
    ["Error!", "ERROR", "Microsoft Visual C++ Runtime Library"];

/// The windows of one process at one instant.
#[derive(Debug, Clone, Default)]
pub struct WindowSet {
    windows: Vec<WindowSnapshot>,
}

impl WindowSet {
    pub fn new(windows: impl IntoIterator<Item = WindowSnapshot>) -> Self {
        Self {
            windows: windows.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn find(&self, title: &str) -> Option<&WindowSnapshot> {
        self.windows.iter().find(|w| w.title == title)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.find(title).is_some()
    }

    pub fn find_any(&self, titles: &[&str]) -> Option<&WindowSnapshot> {
        titles.iter().find_map(|title| self.find(title))
    }

    pub fn any_starts_with(&self, prefix: &str) -> bool {
        self.windows.iter().any(|w| w.title.starts_with(prefix))
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.windows.iter().map(|w| w.title.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Suspended,
    Failed,
    Ready,
    Updating,
    GuardRequired,
    NoWindows,
    Pending,
}

/// Classify the Steam client's windows during login. Terminal verdicts take
/// precedence over progress states; suspension beats a plain error.
pub fn classify_login(windows: &WindowSet) -> LoginState {
    if windows.contains(SUSPENDED_TITLE) {
        LoginState::Suspended
    } else if windows.find_any(&LOGIN_ERROR_TITLES).is_some() {
        LoginState::Failed
    } else if READY_TITLES.iter().all(|title| windows.contains(title)) {
        LoginState::Ready
    } else if windows.any_starts_with(STEAM_UPDATING_PREFIX) {
        LoginState::Updating
    } else if windows.contains(STEAM_GUARD_TITLE) {
        LoginState::GuardRequired
    } else if windows.is_empty() {
        LoginState::NoWindows
    } else {
        LoginState::Pending
    }
}

/// Progress markers seen on one poll. Both can be up at once, whatever
/// `classify_login` decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginFlags {
    pub updating: bool,
    pub guard_required: bool,
}

pub fn login_flags(windows: &WindowSet) -> LoginFlags {
    LoginFlags {
        updating: windows.any_starts_with(STEAM_UPDATING_PREFIX),
        guard_required: windows.contains(STEAM_GUARD_TITLE),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchState<'a> {
    UnknownVideoCard(&'a WindowSnapshot),
    Failed(&'a WindowSnapshot),
    Preparing,
    Updating,
    Pending,
}

/// Classify the Steam client's windows while TF2 is being started.
pub fn classify_launch(windows: &WindowSet) -> LaunchState<'_> {
    if let Some(window) = windows.find(UNKNOWN_VIDEO_CARD_TITLE) {
        LaunchState::UnknownVideoCard(window)
    } else if let Some(window) = windows.find_any(&LAUNCH_ERROR_TITLES) {
        LaunchState::Failed(window)
    } else if windows.contains(UPDATING_TF2_TITLE) {
        LaunchState::Updating
    } else if windows.contains(PREPARING_TITLE) {
        LaunchState::Preparing
    } else {
        LaunchState::Pending
    }
}

pub fn has_fatal_error(windows: &WindowSet) -> bool {
    windows.find_any(&FATAL_ERROR_TITLES).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::WindowHandle;

    fn set(titles: &[&str]) -> WindowSet {
        WindowSet::new(titles.iter().enumerate().map(|(i, t)| WindowSnapshot {
            handle: WindowHandle(i + 1),
            title: t.to_string(),
            pid: 7,
        }))
    }

    #[test]
    fn test_ready_needs_all_three() {
        assert_eq!(classify_login(&set(&["Steam", "Friends", "Servers"])), LoginState::Ready);
        assert_eq!(classify_login(&set(&["Steam", "Friends"])), LoginState::Pending);
    }

    #[test]
    fn test_errors_beat_ready() {
        assert_eq!(
            classify_login(&set(&["Steam", "Friends", "Servers", "Steam - Warning"])),
            LoginState::Failed
        );
        assert_eq!(
            classify_login(&set(&["Steam - Error", "Steam - Contact us"])),
            LoginState::Suspended
        );
    }

    #[test]
    fn test_progress_states() {
        assert_eq!(classify_login(&set(&["Steam - Updating (42%)"])), LoginState::Updating);
        assert_eq!(classify_login(&set(&[STEAM_GUARD_TITLE])), LoginState::GuardRequired);
        assert_eq!(classify_login(&set(&[])), LoginState::NoWindows);
    }

    #[test]
    fn test_flags_are_independent_of_verdict() {
        let windows = set(&["Steam - Updating", STEAM_GUARD_TITLE]);
        assert_eq!(classify_login(&windows), LoginState::Updating);
        assert_eq!(
            login_flags(&windows),
            LoginFlags {
                updating: true,
                guard_required: true
            }
        );
        assert_eq!(login_flags(&set(&["Steam"])), LoginFlags::default());
    }

    #[test]
    fn test_launch_classification() {
        let windows = set(&["Steam", "Unknown Video Card"]);
        assert!(matches!(
            classify_launch(&windows),
            LaunchState::UnknownVideoCard(w) if w.handle == WindowHandle(2)
        ));

        let windows = set(&["Ready - Team Fortress 2"]);
        assert!(matches!(classify_launch(&windows), LaunchState::Failed(_)));

        assert_eq!(classify_launch(&set(&[PREPARING_TITLE])), LaunchState::Preparing);
        assert_eq!(classify_launch(&set(&["Steam"])), LaunchState::Pending);
    }

    #[test]
    fn test_fatal_error_titles() {
        assert!(has_fatal_error(&set(&[
            "Team Fortress 2",
            "Microsoft Visual C++ Runtime Library"
        ])));
        assert!(!has_fatal_error(&set(&["Team Fortress 2"])));
    }
}
