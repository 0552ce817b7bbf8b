/// UK electricity distribution region as identified by the Octopus API.
///
/// Tariff maps in product details are keyed by [`Region::code`], e.g. `_C` for London.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    EasternEngland,
    EastMidlands,
    London,
    MerseysideAndNorthernWales,
    WestMidlands,
    NorthEasternEngland,
    NorthWesternEngland,
    SouthernEngland,
    SouthEasternEngland,
    SouthernWales,
    SouthWesternEngland,
    Yorkshire,
    SouthernScotland,
    NorthernScotland,
}

impl Region {
    pub const ALL: [Region; 14] = [
        Region::EasternEngland,
        Region::EastMidlands,
        Region::London,
        Region::MerseysideAndNorthernWales,
        Region::WestMidlands,
        Region::NorthEasternEngland,
        Region::NorthWesternEngland,
        Region::SouthernEngland,
        Region::SouthEasternEngland,
        Region::SouthernWales,
        Region::SouthWesternEngland,
        Region::Yorkshire,
        Region::SouthernScotland,
        Region::NorthernScotland,
    ];

    /// Returns the provider-internal region code.
    pub const fn code(&self) -> &'static str {
        match self {
            Region::EasternEngland => "_A",
            Region::EastMidlands => "_B",
            Region::London => "_C",
            Region::MerseysideAndNorthernWales => "_D",
            Region::WestMidlands => "_E",
            Region::NorthEasternEngland => "_F",
            Region::NorthWesternEngland => "_G",
            Region::SouthernEngland => "_H",
            Region::SouthEasternEngland => "_J",
            Region::SouthernWales => "_K",
            Region::SouthWesternEngland => "_L",
            Region::Yorkshire => "_M",
            Region::SouthernScotland => "_N",
            Region::NorthernScotland => "_P",
        }
    }

    /// Returns the human-readable region name.
    pub const fn name(&self) -> &'static str {
        match self {
            Region::EasternEngland => "Eastern England",
            Region::EastMidlands => "East Midlands",
            Region::London => "London",
            Region::MerseysideAndNorthernWales => "Merseyside and Northern Wales",
            Region::WestMidlands => "West Midlands",
            Region::NorthEasternEngland => "North Eastern England",
            Region::NorthWesternEngland => "North Western England",
            Region::SouthernEngland => "Southern England",
            Region::SouthEasternEngland => "South Eastern England",
            Region::SouthernWales => "Southern Wales",
            Region::SouthWesternEngland => "South Western England",
            Region::Yorkshire => "Yorkshire",
            Region::SouthernScotland => "Southern Scotland",
            Region::NorthernScotland => "Northern Scotland",
        }
    }

    pub fn from_code(code: &str) -> Option<Region> {
        Self::ALL.into_iter().find(|region| region.code() == code)
    }

    pub fn from_name(name: &str) -> Option<Region> {
        Self::ALL.into_iter().find(|region| region.name() == name)
    }
}

/// Maps a region code to its name, echoing the code back when it is not one of the
/// known regions.
pub fn name_for(code: &str) -> &str {
    Region::from_code(code).map_or(code, |region| region.name())
}
