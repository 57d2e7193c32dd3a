/// Day/night gating of the animation rotation.
use chrono::{Local, NaiveTime, Timelike};

/// Source of wall-clock time of day.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Reads the local system time.
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveTime {
        Local::now().time()
    }
}

/// Daily half-open window `[start, end)`, compared at minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    start: (u32, u32),
    end: (u32, u32),
}

impl Schedule {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Schedule {
            start: (start.hour(), start.minute()),
            end: (end.hour(), end.minute()),
        }
    }

    /// Tests if the rotation should play at `now`.
    /// A window whose start is after its end runs across midnight.
    pub fn is_on<T: Timelike>(&self, now: &T) -> bool {
        let now = (now.hour(), now.minute());

        if self.start <= self.end {
            self.start <= now && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).expect("bad time")
    }

    fn evening() -> Schedule {
        Schedule::new(hm(18, 0), hm(23, 0))
    }

    /// Tests the window boundaries are half open.
    #[test]
    fn window_is_half_open() {
        let s = evening();

        assert!(!s.is_on(&hm(17, 59)));
        assert!(s.is_on(&hm(18, 0)));
        assert!(s.is_on(&hm(22, 59)));
        assert!(!s.is_on(&hm(23, 0)));
    }

    /// Tests seconds are ignored.
    #[test]
    fn seconds_are_ignored() {
        let s = evening();

        assert!(s.is_on(&NaiveTime::from_hms_opt(22, 59, 59).expect("bad time")));
        assert!(!s.is_on(&NaiveTime::from_hms_opt(17, 59, 59).expect("bad time")));
    }

    /// Tests a window can span midnight.
    #[test]
    fn window_can_wrap_midnight() {
        let s = Schedule::new(hm(22, 0), hm(2, 30));

        assert!(s.is_on(&hm(22, 0)));
        assert!(s.is_on(&hm(0, 0)));
        assert!(s.is_on(&hm(2, 29)));
        assert!(!s.is_on(&hm(2, 30)));
        assert!(!s.is_on(&hm(12, 0)));
    }

    /// Tests an empty window is never on.
    #[test]
    fn empty_window_is_off() {
        let s = Schedule::new(hm(6, 0), hm(6, 0));

        assert!(!s.is_on(&hm(6, 0)));
        assert!(!s.is_on(&hm(18, 0)));
    }
}
