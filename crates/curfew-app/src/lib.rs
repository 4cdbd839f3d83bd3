//! Curfew - hour-of-day sale restrictions for storefront categories.
//!
//! This crate holds the command implementations behind the `curfew` binary.
//!
//! # Usage
//!
//! ```no_run
//! use curfew_app::commands;
//! use curfew_storage::Database;
//!
//! let db = Database::new().expect("Failed to open database");
//! commands::set_setting(&db, "enabled", "yes").unwrap();
//! println!("{}", commands::status(&db, None).unwrap());
//! ```

pub mod commands;
