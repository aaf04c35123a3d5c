//! Platform API levels.

use std::fmt;

use ptx_ipc::api;
use serde::{Deserialize, Serialize};

/// Platform API level of the build under test
///
/// Tables are keyed by exact level; there is no ordering-based fallback
/// between levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiLevel(pub u32);

impl ApiLevel {
    pub const P: ApiLevel = ApiLevel(api::P);
    pub const Q: ApiLevel = ApiLevel(api::Q);
    pub const R: ApiLevel = ApiLevel(api::R);
    pub const S: ApiLevel = ApiLevel(api::S);
    pub const S_V2: ApiLevel = ApiLevel(api::S_V2);
    pub const TIRAMISU: ApiLevel = ApiLevel(api::TIRAMISU);
    pub const UPSIDE_DOWN_CAKE: ApiLevel = ApiLevel(api::UPSIDE_DOWN_CAKE);
    pub const VANILLA_ICE_CREAM: ApiLevel = ApiLevel(api::VANILLA_ICE_CREAM);
    pub const BAKLAVA: ApiLevel = ApiLevel(api::BAKLAVA);

    pub fn new(level: u32) -> Self {
        Self(level)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Level to select a table for, given the build's reported SDK level and
    /// release codename.
    ///
    /// Preview builds of Baklava still report the previous SDK level, so any
    /// build at least Baklava is pinned to level 36.
    pub fn from_build(sdk_int: u32, codename: &str) -> Self {
        if sdk_int >= api::BAKLAVA || codename.eq_ignore_ascii_case("baklava") {
            Self::BAKLAVA
        } else {
            Self(sdk_int)
        }
    }

    /// Release codename, if known
    pub fn codename(&self) -> Option<&'static str> {
        match self.0 {
            api::P => Some("Pie"),
            api::Q => Some("Q"),
            api::R => Some("R"),
            api::S => Some("S"),
            api::S_V2 => Some("Sv2"),
            api::TIRAMISU => Some("Tiramisu"),
            api::UPSIDE_DOWN_CAKE => Some("UpsideDownCake"),
            api::VANILLA_ICE_CREAM => Some("VanillaIceCream"),
            api::BAKLAVA => Some("Baklava"),
            _ => None,
        }
    }

    /// Whether interface tokens carry the work-source word (Q and later)
    pub fn has_work_source_header(&self) -> bool {
        self.0 >= api::Q
    }

    /// Whether interface tokens carry the `'SYST'` header (R and later)
    pub fn has_system_header(&self) -> bool {
        self.0 >= api::R
    }

    /// Whether flat binder objects are followed by a stability word (R and later)
    pub fn has_binder_stability(&self) -> bool {
        self.0 >= api::R
    }
}

impl From<u32> for ApiLevel {
    fn from(level: u32) -> Self {
        Self(level)
    }
}

impl fmt::Display for ApiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.codename() {
            Some(name) => write!(f, "{} ({})", self.0, name),
            None => write!(f, "{}", self.0),
        }
    }
}
