//! Lifecycle state of a layout instance.

bitflags::bitflags! {
    /// Lifecycle state as a bitfield.
    ///
    /// `MOUNTED_ONCE` survives unmounting so the before-mount phase fires
    /// once per lifetime. `DESTROYED` is terminal.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LifecycleFlags: u8 {
        const NONE = 0;
        /// Construction finished and `features_ready` was broadcast.
        const READY = 1 << 0;
        /// Render is running.
        const RENDERING = 1 << 1;
        /// Root element exists.
        const ROOTED = 1 << 2;
        /// Root is inserted in a container.
        const MOUNTED = 1 << 3;
        /// Has been mounted at least once.
        const MOUNTED_ONCE = 1 << 4;
        /// A mount or destroy is in flight.
        const BUSY = 1 << 5;
        const DESTROYED = 1 << 6;
    }
}

/// Coarse lifecycle phase derived from [`LifecycleFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Features installed, ready broadcast not yet sent.
    Constructed,
    Ready,
    /// Root exists but has not been inserted.
    Rooted,
    Mounted,
    Destroyed,
}

impl From<LifecycleFlags> for Phase {
    fn from(flags: LifecycleFlags) -> Self {
        if flags.contains(LifecycleFlags::DESTROYED) {
            Phase::Destroyed
        } else if flags.contains(LifecycleFlags::MOUNTED) {
            Phase::Mounted
        } else if flags.contains(LifecycleFlags::ROOTED) {
            Phase::Rooted
        } else if flags.contains(LifecycleFlags::READY) {
            Phase::Ready
        } else {
            Phase::Constructed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_flags() {
        assert_eq!(Phase::from(LifecycleFlags::NONE), Phase::Constructed);
        assert_eq!(Phase::from(LifecycleFlags::READY), Phase::Ready);
        assert_eq!(
            Phase::from(LifecycleFlags::READY | LifecycleFlags::ROOTED),
            Phase::Rooted
        );
        assert_eq!(
            Phase::from(LifecycleFlags::ROOTED | LifecycleFlags::MOUNTED | LifecycleFlags::MOUNTED_ONCE),
            Phase::Mounted
        );
        assert_eq!(
            Phase::from(LifecycleFlags::MOUNTED_ONCE | LifecycleFlags::DESTROYED),
            Phase::Destroyed
        );
    }
}
