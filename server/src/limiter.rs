//! Rate limiting: named cooldown windows and the fast-fire detector.
//!
//! Cooldowns guard chat, building, and the anti-grief warnings themselves.
//! Fast-fire works per (identity, weapon): a shot inside the weapon's
//! window counts as a violation, a shot after it resets the count, and
//! exceeding the reload-scaled budget escalates to a kick.

use shared::Uuid;
use std::collections::HashMap;

/// Reference span used to derive fast-fire budgets from weapon reloads.
pub const FAST_FIRE_BASE_MS: u64 = 1_333;

/// Flat violation allowance added on top of the reload-scaled budget.
pub const FAST_FIRE_GRACE: u32 = 30;

/// Named cooldown windows keyed by caller-chosen strings, typically
/// `"chat-{conn}"` or `"edit-{uuid}"`. Timestamps are plain milliseconds
/// supplied by the tick, so tests can drive time directly.
#[derive(Debug, Default)]
pub struct Cooldowns {
    last_fired: HashMap<String, u64>,
}

impl Cooldowns {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the window has elapsed (or the key never fired); records
    /// `now_ms` as the new last-fired time in that case. A denied call
    /// leaves the window anchored at the previous firing.
    pub fn ready(&mut self, key: impl Into<String>, window_ms: u64, now_ms: u64) -> bool {
        let key = key.into();
        match self.last_fired.get(&key) {
            Some(&last) if now_ms.saturating_sub(last) < window_ms => false,
            _ => {
                self.last_fired.insert(key, now_ms);
                true
            }
        }
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }
}

/// The reload characteristic is all the core needs to know about a weapon.
#[derive(Debug, Clone, Copy)]
pub struct Weapon {
    pub id: u8,
    pub reload_ms: u64,
}

impl Weapon {
    /// Firing again inside this window counts as a fast-fire violation.
    pub fn fast_fire_window(&self) -> u64 {
        (self.reload_ms / 2).max(1)
    }

    /// Violations tolerated before the kick. Faster weapons get a larger
    /// budget since legitimate shots land closer together.
    pub fn violation_budget(&self) -> u32 {
        (FAST_FIRE_BASE_MS / self.fast_fire_window()) as u32 + FAST_FIRE_GRACE
    }
}

/// Weapon catalogue handed to the server at startup. Content definitions
/// are an external concern; this holds just the reload data.
#[derive(Debug, Default)]
pub struct WeaponCatalog {
    weapons: HashMap<u8, Weapon>,
}

impl WeaponCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, weapon: Weapon) {
        self.weapons.insert(weapon.id, weapon);
    }

    pub fn get(&self, id: u8) -> Option<&Weapon> {
        self.weapons.get(&id)
    }
}

/// Outcome of recording one shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotVerdict {
    Ok,
    /// Inside the window, but still under budget.
    Rapid { violations: u32 },
    /// Budget exceeded; the caller kicks.
    Exceeded,
}

/// Tracks the last shot per (identity, weapon). Violation counters live in
/// the identity's trace record; this only supplies the timing verdict.
#[derive(Debug, Default)]
pub struct FastFire {
    last_shot: HashMap<(Uuid, u8), u64>,
}

impl FastFire {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a shot and classifies it. `violations` is the identity's
    /// running per-weapon counter and is updated in place.
    pub fn record_shot(
        &mut self,
        uuid: Uuid,
        weapon: &Weapon,
        violations: &mut u32,
        now_ms: u64,
    ) -> ShotVerdict {
        let key = (uuid, weapon.id);
        let previous = self.last_shot.insert(key, now_ms);
        match previous {
            Some(last) if now_ms.saturating_sub(last) < weapon.fast_fire_window() => {
                *violations += 1;
                if *violations > weapon.violation_budget() {
                    ShotVerdict::Exceeded
                } else {
                    ShotVerdict::Rapid {
                        violations: *violations,
                    }
                }
            }
            _ => {
                *violations = 0;
                ShotVerdict::Ok
            }
        }
    }

    pub fn forget(&mut self, uuid: Uuid) {
        self.last_shot.retain(|(id, _), _| *id != uuid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid() -> Uuid {
        Uuid([9; 8])
    }

    #[test]
    fn cooldown_opens_after_window() {
        let mut cd = Cooldowns::new();
        assert!(cd.ready("chat-1", 500, 1_000));
        assert!(!cd.ready("chat-1", 500, 1_200));
        assert!(!cd.ready("chat-1", 500, 1_499));
        assert!(cd.ready("chat-1", 500, 1_500));
    }

    #[test]
    fn cooldown_keys_are_independent() {
        let mut cd = Cooldowns::new();
        assert!(cd.ready("chat-1", 500, 1_000));
        assert!(cd.ready("chat-2", 500, 1_000));
        assert!(cd.ready("edit-1", 100, 1_000));
    }

    #[test]
    fn denied_call_does_not_extend_window() {
        let mut cd = Cooldowns::new();
        assert!(cd.ready("k", 500, 1_000));
        assert!(!cd.ready("k", 500, 1_400));
        // Window is anchored at 1000, not 1400.
        assert!(cd.ready("k", 500, 1_500));
    }

    #[test]
    fn budget_scales_with_reload() {
        let fast = Weapon {
            id: 0,
            reload_ms: 100,
        };
        let slow = Weapon {
            id: 1,
            reload_ms: 1_000,
        };
        assert!(fast.violation_budget() > slow.violation_budget());
        assert_eq!(fast.fast_fire_window(), 50);
        assert_eq!(slow.fast_fire_window(), 500);
    }

    #[test]
    fn exactly_budget_plus_one_rapid_shots_exceed() {
        let weapon = Weapon {
            id: 0,
            reload_ms: 400,
        };
        let budget = weapon.violation_budget();
        let mut ff = FastFire::new();
        let mut violations = 0;

        // First shot anchors the window.
        assert_eq!(
            ff.record_shot(uuid(), &weapon, &mut violations, 1_000),
            ShotVerdict::Ok
        );

        // The next `budget` rapid shots are tolerated.
        let mut now = 1_000;
        for i in 1..=budget {
            now += 1;
            assert_eq!(
                ff.record_shot(uuid(), &weapon, &mut violations, now),
                ShotVerdict::Rapid { violations: i }
            );
        }

        // One more inside the window and the budget is blown.
        now += 1;
        assert_eq!(
            ff.record_shot(uuid(), &weapon, &mut violations, now),
            ShotVerdict::Exceeded
        );
    }

    #[test]
    fn slow_firing_resets_the_counter() {
        let weapon = Weapon {
            id: 0,
            reload_ms: 400,
        };
        let mut ff = FastFire::new();
        let mut violations = 0;

        ff.record_shot(uuid(), &weapon, &mut violations, 1_000);
        ff.record_shot(uuid(), &weapon, &mut violations, 1_010);
        ff.record_shot(uuid(), &weapon, &mut violations, 1_020);
        assert_eq!(violations, 2);

        // Waiting out the window resets to zero.
        let verdict = ff.record_shot(uuid(), &weapon, &mut violations, 1_020 + 200);
        assert_eq!(verdict, ShotVerdict::Ok);
        assert_eq!(violations, 0);
    }

    #[test]
    fn weapons_are_tracked_independently() {
        let pistol = Weapon {
            id: 0,
            reload_ms: 400,
        };
        let cannon = Weapon {
            id: 1,
            reload_ms: 1_000,
        };
        let mut ff = FastFire::new();
        let mut pistol_violations = 0;
        let mut cannon_violations = 0;

        ff.record_shot(uuid(), &pistol, &mut pistol_violations, 1_000);
        ff.record_shot(uuid(), &pistol, &mut pistol_violations, 1_001);
        // A cannon shot at the same instant is its own window.
        assert_eq!(
            ff.record_shot(uuid(), &cannon, &mut cannon_violations, 1_001),
            ShotVerdict::Ok
        );
        assert_eq!(pistol_violations, 1);
        assert_eq!(cannon_violations, 0);
    }
}
