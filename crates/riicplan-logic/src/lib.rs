//! Pure planning logic for RiicPlan.
//!
//! Functions take plain data and return results. Nothing here touches
//! the filesystem or the network; hosts feed in roster exports and read
//! plans back out, which keeps the crate portable and easy to test.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | Slot counts, facility kinds and commodities |
//! | [`engine`] | The shift assignment solver |
//! | [`layout`] | Base layout, presets and validation |
//! | [`reference`] | Versioned efficiency and synergy data |
//! | [`roster`] | Loading and validating operator exports |
//! | [`snapshot`] | Versioned binary plan records |
//! | [`upgrade`] | Promotion suggestions from plan deltas |

pub mod constants;
pub mod engine;
pub mod layout;
pub mod reference;
pub mod roster;
pub mod snapshot;
pub mod upgrade;
