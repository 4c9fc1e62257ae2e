//! Static region table and adjacency.

use std::fmt;

use serde::Serialize;

/// One of the fixed geographic partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum RegionId {
    Northeast,
    Southeast,
    Midwest,
    Southwest,
    West,
}

impl RegionId {
    pub const ALL: [RegionId; 5] = [
        RegionId::Northeast,
        RegionId::Southeast,
        RegionId::Midwest,
        RegionId::Southwest,
        RegionId::West,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegionId::Northeast => "northeast",
            RegionId::Southeast => "southeast",
            RegionId::Midwest => "midwest",
            RegionId::Southwest => "southwest",
            RegionId::West => "west",
        }
    }

    pub fn parse(s: &str) -> Option<RegionId> {
        match s {
            "northeast" => Some(RegionId::Northeast),
            "southeast" => Some(RegionId::Southeast),
            "midwest" => Some(RegionId::Midwest),
            "southwest" => Some(RegionId::Southwest),
            "west" => Some(RegionId::West),
            _ => None,
        }
    }

    pub fn region(self) -> &'static Region {
        match self {
            RegionId::Northeast => &REGIONS[0],
            RegionId::Southeast => &REGIONS[1],
            RegionId::Midwest => &REGIONS[2],
            RegionId::Southwest => &REGIONS[3],
            RegionId::West => &REGIONS[4],
        }
    }

    /// Regions consulted after this one by cross-region search, nearest first.
    pub fn adjacent(self) -> &'static [RegionId] {
        match self {
            RegionId::Northeast => &[RegionId::Southeast, RegionId::Midwest],
            RegionId::Southeast => &[RegionId::Northeast, RegionId::Midwest, RegionId::Southwest],
            RegionId::Midwest => &[
                RegionId::Northeast,
                RegionId::Southeast,
                RegionId::Southwest,
                RegionId::West,
            ],
            RegionId::Southwest => &[RegionId::Southeast, RegionId::Midwest, RegionId::West],
            RegionId::West => &[RegionId::Midwest, RegionId::Southwest],
        }
    }
}

impl From<RegionId> for &'static str {
    fn from(id: RegionId) -> Self {
        id.as_str()
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of state/district codes.
#[derive(Debug, PartialEq, Eq)]
pub struct Region {
    pub id: RegionId,
    pub name: &'static str,
    pub member_codes: &'static [&'static str],
}

impl Region {
    pub fn contains(&self, code: &str) -> bool {
        self.member_codes.contains(&code)
    }
}

pub static REGIONS: [Region; 5] = [
    Region {
        id: RegionId::Northeast,
        name: "Northeast",
        member_codes: &["CT", "DC", "DE", "MA", "MD", "ME", "NH", "NJ", "NY", "PA", "RI", "VT"],
    },
    Region {
        id: RegionId::Southeast,
        name: "Southeast",
        member_codes: &["AL", "AR", "FL", "GA", "KY", "LA", "MS", "NC", "SC", "TN", "VA", "WV"],
    },
    Region {
        id: RegionId::Midwest,
        name: "Midwest",
        member_codes: &["IA", "IL", "IN", "KS", "MI", "MN", "MO", "ND", "NE", "OH", "SD", "WI"],
    },
    Region {
        id: RegionId::Southwest,
        name: "Southwest",
        member_codes: &["AZ", "NM", "OK", "TX"],
    },
    Region {
        id: RegionId::West,
        name: "West",
        member_codes: &["AK", "CA", "CO", "HI", "ID", "MT", "NV", "OR", "UT", "WA", "WY"],
    },
];

/// Trim and uppercase a state/district code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Region owning `code`, matched case-insensitively.
pub fn region_for_code(code: &str) -> Option<RegionId> {
    let code = normalize_code(code);
    REGIONS.iter().find(|r| r.contains(&code)).map(|r| r.id)
}
