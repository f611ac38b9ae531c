//! src/model/navigation.rs
//! ============================================================================
//! # `NavigationState`: directory history as a stack of absolute paths
//!
//! The bottom element is always `/` and the stack is never empty; the top is
//! the current directory. Paths are not validated here. A malformed path
//! simply fails when the lister tries to open it.

use smallvec::{SmallVec, smallvec};
use std::path::{Path, PathBuf};

/// Most sessions stay within a few levels of the home directory.
type PathStack = SmallVec<[PathBuf; 8]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    stack: PathStack,
}

impl NavigationState {
    /// `["/", home]`, or just `["/"]` when home is the root itself.
    #[must_use]
    pub fn new(home: &Path) -> Self {
        let mut state = Self {
            stack: smallvec![PathBuf::from("/")],
        };
        state.descend_path(home);
        state
    }

    #[must_use]
    pub fn current(&self) -> &Path {
        self.stack.last().map_or_else(|| Path::new("/"), PathBuf::as_path)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_at_root(&self) -> bool {
        self.stack.len() == 1
    }

    /// Bottom-to-top view of the history.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.stack.iter().map(PathBuf::as_path)
    }

    /// Pushes `current/name` and returns it.
    pub fn descend(&mut self, name: &str) -> &Path {
        let current = self.current().to_string_lossy();
        let next = if current.ends_with('/') {
            format!("{current}{name}")
        } else {
            format!("{current}/{name}")
        };

        self.stack.push(PathBuf::from(next));
        self.current()
    }

    /// Pushes an absolute path as-is unless it is already current.
    pub fn descend_path(&mut self, path: &Path) -> &Path {
        if path != self.current() {
            self.stack.push(path.to_path_buf());
        }
        self.current()
    }

    /// Pops one level; stays on `/` at depth 1.
    pub fn ascend(&mut self) -> &Path {
        if self.stack.len() >= 2 {
            self.stack.pop();
        }
        self.current()
    }

    /// Clears history back to `["/", home]`.
    pub fn reset(&mut self, home: &Path) -> &Path {
        self.stack.truncate(1);
        self.descend_path(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(nav: &NavigationState) {
        assert!(nav.depth() >= 1);
        assert_eq!(nav.iter().next(), Some(Path::new("/")));
    }

    #[test]
    fn starts_at_home_over_root() {
        let nav = NavigationState::new(Path::new("/sdcard"));
        assert_eq!(nav.iter().collect::<Vec<_>>(), vec![Path::new("/"), Path::new("/sdcard")]);
        assert_eq!(nav.current(), Path::new("/sdcard"));
    }

    #[test]
    fn root_home_is_not_duplicated() {
        let nav = NavigationState::new(Path::new("/"));
        assert_eq!(nav.depth(), 1);
        assert!(nav.is_at_root());
    }

    #[test]
    fn descend_joins_with_single_separator() {
        let mut nav = NavigationState::new(Path::new("/"));
        assert_eq!(nav.descend("etc"), Path::new("/etc"));
        assert_eq!(nav.descend("ssh"), Path::new("/etc/ssh"));
        assert_eq!(nav.current().to_str(), Some("/etc/ssh"));
    }

    #[test]
    fn ascend_at_root_is_a_no_op() {
        let mut nav = NavigationState::new(Path::new("/"));
        assert_eq!(nav.ascend(), Path::new("/"));
        assert_eq!(nav.ascend(), Path::new("/"));
        assert_eq!(nav.depth(), 1);
    }

    #[test]
    fn descend_path_refreshes_when_equal() {
        let mut nav = NavigationState::new(Path::new("/sdcard"));
        nav.descend_path(Path::new("/sdcard"));
        assert_eq!(nav.depth(), 2);

        nav.descend_path(Path::new("/sdcard/Music/Albums"));
        assert_eq!(nav.depth(), 3);
        assert_eq!(nav.ascend(), Path::new("/sdcard"));
    }

    #[test]
    fn reset_discards_history() {
        let mut nav = NavigationState::new(Path::new("/sdcard"));
        nav.descend("DCIM");
        nav.descend("Camera");

        assert_eq!(nav.reset(Path::new("/sdcard")), Path::new("/sdcard"));
        assert_eq!(nav.depth(), 2);
    }

    #[test]
    fn invariants_hold_for_any_sequence() {
        // Deterministic pseudo-random walk over descend/ascend/reset.
        let mut nav = NavigationState::new(Path::new("/home/user"));
        let mut seed: u32 = 0x2545_F491;

        for step in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;

            match seed % 7 {
                0..=2 => {
                    nav.descend(&format!("d{step}"));
                }
                3..=5 => {
                    nav.ascend();
                }
                _ => {
                    nav.reset(Path::new("/home/user"));
                }
            }

            assert_invariants(&nav);
        }

        while !nav.is_at_root() {
            nav.ascend();
        }
        assert_eq!(nav.current(), Path::new("/"));
    }
}
