use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::recognition::domain::frame_tag::FrameTag;

/// Which tag wins when several tags share the highest count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The tied tag pushed most recently wins; prevents stale lock-in.
    #[default]
    MostRecent,
    /// The tied tag whose oldest vote is earliest in the window wins.
    Oldest,
}

/// Majority tag of the window and how many votes back it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vote {
    pub majority: FrameTag,
    pub support: u32,
}

/// Fixed-width sliding buffer of recent frame tags.
///
/// Smooths single-frame misclassifications: a tag only becomes a confirmed
/// decision once it holds a strict majority of the full window width.
pub struct VotingWindow {
    buffer: VecDeque<FrameTag>,
    width: usize,
    tie_break: TieBreak,
}

impl VotingWindow {
    pub fn new(width: usize, tie_break: TieBreak) -> Self {
        debug_assert!(width >= 1, "window width must be positive");
        Self {
            buffer: VecDeque::with_capacity(width),
            width,
            tie_break,
        }
    }

    /// Appends `tag`, evicting the oldest tag once the window is full, and
    /// returns the new majority.
    pub fn push(&mut self, tag: FrameTag) -> Vote {
        if self.buffer.len() == self.width {
            self.buffer.pop_front();
        }
        self.buffer.push_back(tag);

        // Never empty after a push.
        self.majority().unwrap_or(Vote {
            majority: tag,
            support: 1,
        })
    }

    /// Majority of the current contents, or `None` if the window is empty.
    pub fn majority(&self) -> Option<Vote> {
        let mut best: Option<Vote> = None;
        let mut consider = |tag: FrameTag| {
            let support = self.count(tag);
            if best.map_or(true, |b| support > b.support) {
                best = Some(Vote {
                    majority: tag,
                    support,
                });
            }
        };

        match self.tie_break {
            TieBreak::MostRecent => self.buffer.iter().rev().copied().for_each(&mut consider),
            TieBreak::Oldest => self.buffer.iter().copied().for_each(&mut consider),
        }
        best
    }

    /// A vote is confirmed once its support reaches `width / 2 + 1`,
    /// regardless of how full the window currently is.
    pub fn is_confirmed(&self, vote: &Vote) -> bool {
        vote.support as usize >= self.confirmation_threshold()
    }

    pub fn confirmation_threshold(&self) -> usize {
        self.width / 2 + 1
    }

    /// Discards all history.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn count(&self, tag: FrameTag) -> u32 {
        self.buffer.iter().filter(|t| **t == tag).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::detection::IdentityId;
    use rstest::rstest;

    const A: FrameTag = FrameTag::Known(IdentityId(1));
    const B: FrameTag = FrameTag::Known(IdentityId(2));
    const U: FrameTag = FrameTag::Unknown;
    const N: FrameTag = FrameTag::NoFace;

    fn push_all(window: &mut VotingWindow, tags: &[FrameTag]) -> Vote {
        let mut last = None;
        for t in tags {
            last = Some(window.push(*t));
        }
        last.unwrap()
    }

    #[test]
    fn test_never_exceeds_width() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        for i in 0..20 {
            window.push(if i % 2 == 0 { A } else { U });
            assert!(window.buffer.len() <= 5);
        }
        assert_eq!(window.buffer.len(), 5);
    }

    #[test]
    fn test_full_window_of_same_tag() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        let vote = push_all(&mut window, &[A; 5]);
        assert_eq!(vote, Vote { majority: A, support: 5 });
        assert!(window.is_confirmed(&vote));
    }

    #[test]
    fn test_alternating_window_confirms_majority() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        let vote = push_all(&mut window, &[A, U, A, U, A]);
        assert_eq!(vote, Vote { majority: A, support: 3 });
        assert!(window.is_confirmed(&vote));
    }

    #[test]
    fn test_oldest_evicted_first() {
        let mut window = VotingWindow::new(3, TieBreak::MostRecent);
        push_all(&mut window, &[A, A, A]);
        let vote = push_all(&mut window, &[U, U]);
        // Window is now [A, U, U].
        assert_eq!(vote, Vote { majority: U, support: 2 });
    }

    #[test]
    fn test_tie_prefers_most_recent() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        let vote = push_all(&mut window, &[A, U, A, U]);
        assert_eq!(vote, Vote { majority: U, support: 2 });
        assert!(!window.is_confirmed(&vote));
    }

    #[test]
    fn test_tie_prefers_oldest_when_configured() {
        let mut window = VotingWindow::new(5, TieBreak::Oldest);
        let vote = push_all(&mut window, &[A, U, A, U]);
        assert_eq!(vote, Vote { majority: A, support: 2 });
    }

    #[test]
    fn test_single_flip_does_not_change_decision() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        push_all(&mut window, &[A; 5]);
        let vote = window.push(B);
        assert_eq!(vote, Vote { majority: A, support: 4 });
    }

    #[rstest]
    #[case(3, 2)]
    #[case(5, 3)]
    #[case(7, 4)]
    fn test_confirmation_threshold(#[case] width: usize, #[case] expected: usize) {
        let window = VotingWindow::new(width, TieBreak::MostRecent);
        assert_eq!(window.confirmation_threshold(), expected);
    }

    #[test]
    fn test_partial_window_needs_absolute_support() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        let vote = push_all(&mut window, &[A, A]);
        assert_eq!(vote.support, 2);
        assert!(!window.is_confirmed(&vote));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut window = VotingWindow::new(5, TieBreak::MostRecent);
        push_all(&mut window, &[A, A, A]);
        window.reset();
        assert!(window.buffer.is_empty());
        assert!(window.majority().is_none());
        assert_eq!(window.push(N), Vote { majority: N, support: 1 });
    }
}
