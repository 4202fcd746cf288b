//! Static balance data.
//!
//! This module contains pure data structures that can be deserialized from
//! RON documents. It performs no IO; callers read the text and hand it to
//! [`BalanceTable::from_ron_str`].

mod balance;

pub use balance::{
    BalanceData, BalanceTable, UnitBalance, UnitStats, WeaponStats, MAX_HEALTH, MAX_SPEED,
};
