//! Shared test harness modules for the mapsync CLI.

use super::*;

mod unit;
