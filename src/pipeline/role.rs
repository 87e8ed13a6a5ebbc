//! One-time controller election between the two pipeline workers.
use crate::image::Half;
use std::sync::atomic::{AtomicBool, Ordering};

/// Role a worker plays for the whole run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Acquires frames, assembles and presents output, records statistics and
    /// decides termination. Processes the top half.
    Controller,
    /// Processes the bottom half.
    Worker,
}

impl Role {
    #[inline]
    pub fn half(self) -> Half {
        match self {
            Role::Controller => Half::Top,
            Role::Worker => Half::Bottom,
        }
    }

    #[inline]
    pub fn is_controller(self) -> bool {
        matches!(self, Role::Controller)
    }
}

/// First caller of [`RoleElection::claim`] becomes the controller; every later
/// caller is a worker. The claim is a single compare-and-set.
#[derive(Debug, Default)]
pub struct RoleElection {
    claimed: AtomicBool,
}

impl RoleElection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self) -> Role {
        match self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Role::Controller,
            Err(_) => Role::Worker,
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn sequential_claims_elect_one_controller() {
        let election = RoleElection::new();
        assert!(!election.is_claimed());
        assert_eq!(election.claim(), Role::Controller);
        assert_eq!(election.claim(), Role::Worker);
        assert_eq!(election.claim(), Role::Worker);
    }

    #[test]
    fn racing_threads_elect_exactly_one_controller() {
        for _ in 0..64 {
            let election = &RoleElection::new();
            let start = &Barrier::new(4);
            let roles: Vec<Role> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        s.spawn(move || {
                            start.wait();
                            election.claim()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            let controllers = roles.iter().filter(|r| r.is_controller()).count();
            assert_eq!(controllers, 1);
        }
    }

    #[test]
    fn controller_takes_top_half() {
        assert_eq!(Role::Controller.half(), Half::Top);
        assert_eq!(Role::Worker.half(), Half::Bottom);
    }
}
