//! # Outpost Game Server
//!
//! Authoritative session server for the tile-based strategy game. It owns
//! the canonical world and player state, validates every client-declared
//! action, and broadcasts the results so all connected clients converge on
//! the same session.
//!
//! ## Core Responsibilities
//!
//! ### Handshake and Identity
//! Connections are admitted through an ordered gauntlet of checks: ip ban,
//! identity ban, post-kick cooldown, name collision, and protocol version.
//! Identities are client-declared uuids, persistent across reconnects and
//! keyed into the moderation store.
//!
//! ### Action Validation
//! Shots, block edits, chat, and upgrades are all validated server-side
//! before they take effect or are relayed. Violations are throttled,
//! warned, or escalated to kicks depending on severity.
//!
//! ### State Synchronization
//! The authoritative tick drives two broadcast schedules: batched entity
//! state every few ticks and a small global-scalar sync less often. Both
//! are timestamped so clients can discard stale updates on a lossy,
//! unordered path.
//!
//! ### Moderation
//! Privileged players can kick, ban, and trace other players; every world
//! edit is logged and the log can be replayed backward to undo griefing.
//! Ban state and per-identity records persist across restarts.
//!
//! ## Architecture
//!
//! All inbound events funnel through one channel into a single dispatch
//! loop ([`network::Server`]); handlers run to completion against tables
//! the loop exclusively owns, so there are no cross-handler races. Effects
//! leave as [`network::Outbound`] values that the transport layer realizes
//! against the actual sockets. Time enters handlers as plain millisecond
//! values, which keeps the whole core synchronously testable.

pub mod admin;
pub mod connection;
pub mod edit_log;
pub mod game;
pub mod limiter;
pub mod network;
pub mod sync;
pub mod transport;
pub mod utils;
