//! Small time helpers shared by the transport and the dispatch loop.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch. The dispatch core takes timestamps
/// as plain parameters, so this is the only place wall-clock time enters.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_do_not_go_backward() {
        let a = get_timestamp();
        let b = get_timestamp();
        assert!(b >= a);
    }
}
