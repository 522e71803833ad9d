//! Routing Targets
//!
//! The remote API is sharded by host. Regional hosts serve account and match
//! data, platform hosts serve league data. Every routing target carries its own
//! application-wide quotas, so the target's name is the first element of every
//! scope key derived for a call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regional routing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Americas,
    Asia,
    Europe,
    Sea,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Americas, Region::Asia, Region::Europe, Region::Sea];

    /// Name used in scope keys (e.g. `ASIA`)
    pub fn name(&self) -> &'static str {
        match self {
            Region::Americas => "AMERICAS",
            Region::Asia => "ASIA",
            Region::Europe => "EUROPE",
            Region::Sea => "SEA",
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Region::Americas => "americas.api.riotgames.com",
            Region::Asia => "asia.api.riotgames.com",
            Region::Europe => "europe.api.riotgames.com",
            Region::Sea => "sea.api.riotgames.com",
        }
    }
}

/// Platform routing values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Na1,
    Br1,
    La1,
    La2,
    Eun1,
    Euw1,
    Tr1,
    Ru,
    Jp1,
    Kr,
    Oc1,
    Sg2,
    Tw2,
    Vn2,
}

impl Platform {
    pub const ALL: [Platform; 14] = [
        Platform::Na1,
        Platform::Br1,
        Platform::La1,
        Platform::La2,
        Platform::Eun1,
        Platform::Euw1,
        Platform::Tr1,
        Platform::Ru,
        Platform::Jp1,
        Platform::Kr,
        Platform::Oc1,
        Platform::Sg2,
        Platform::Tw2,
        Platform::Vn2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Na1 => "NA1",
            Platform::Br1 => "BR1",
            Platform::La1 => "LA1",
            Platform::La2 => "LA2",
            Platform::Eun1 => "EUN1",
            Platform::Euw1 => "EUW1",
            Platform::Tr1 => "TR1",
            Platform::Ru => "RU",
            Platform::Jp1 => "JP1",
            Platform::Kr => "KR",
            Platform::Oc1 => "OC1",
            Platform::Sg2 => "SG2",
            Platform::Tw2 => "TW2",
            Platform::Vn2 => "VN2",
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            Platform::Na1 => "na1.api.riotgames.com",
            Platform::Br1 => "br1.api.riotgames.com",
            Platform::La1 => "la1.api.riotgames.com",
            Platform::La2 => "la2.api.riotgames.com",
            Platform::Eun1 => "eun1.api.riotgames.com",
            Platform::Euw1 => "euw1.api.riotgames.com",
            Platform::Tr1 => "tr1.api.riotgames.com",
            Platform::Ru => "ru.api.riotgames.com",
            Platform::Jp1 => "jp1.api.riotgames.com",
            Platform::Kr => "kr.api.riotgames.com",
            Platform::Oc1 => "oc1.api.riotgames.com",
            Platform::Sg2 => "sg2.api.riotgames.com",
            Platform::Tw2 => "tw2.api.riotgames.com",
            Platform::Vn2 => "vn2.api.riotgames.com",
        }
    }

    /// Regional cluster serving this platform
    pub fn region(&self) -> Region {
        match self {
            Platform::Na1 | Platform::Br1 | Platform::La1 | Platform::La2 => Region::Americas,
            Platform::Eun1 | Platform::Euw1 | Platform::Tr1 | Platform::Ru => Region::Europe,
            Platform::Jp1 | Platform::Kr => Region::Asia,
            Platform::Oc1 | Platform::Sg2 | Platform::Tw2 | Platform::Vn2 => Region::Sea,
        }
    }
}

/// Kind of routing target an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Region,
    Platform,
    Any,
}

impl RouteKind {
    pub fn accepts(&self, route: &RoutingTarget) -> bool {
        match self {
            RouteKind::Any => true,
            RouteKind::Region => matches!(route, RoutingTarget::Region(_)),
            RouteKind::Platform => matches!(route, RoutingTarget::Platform(_)),
        }
    }
}

/// A host the remote API is reached through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoutingTarget {
    Region(Region),
    Platform(Platform),
}

impl RoutingTarget {
    pub fn name(&self) -> &'static str {
        match self {
            RoutingTarget::Region(region) => region.name(),
            RoutingTarget::Platform(platform) => platform.name(),
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            RoutingTarget::Region(region) => region.host(),
            RoutingTarget::Platform(platform) => platform.host(),
        }
    }

    pub fn kind(&self) -> RouteKind {
        match self {
            RoutingTarget::Region(_) => RouteKind::Region,
            RoutingTarget::Platform(_) => RouteKind::Platform,
        }
    }
}

impl From<Region> for RoutingTarget {
    fn from(region: Region) -> Self {
        RoutingTarget::Region(region)
    }
}

impl From<Platform> for RoutingTarget {
    fn from(platform: Platform) -> Self {
        RoutingTarget::Platform(platform)
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a routing target name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown routing target: {0}")]
pub struct UnknownRoute(pub String);

impl FromStr for RoutingTarget {
    type Err = UnknownRoute;

    /// Accepts either the scope name (`ASIA`, `euw1`) or the full host name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let by_region = Region::ALL
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(wanted) || r.host() == wanted)
            .map(|r| RoutingTarget::Region(*r));
        let by_platform = || {
            Platform::ALL
                .iter()
                .find(|p| p.name().eq_ignore_ascii_case(wanted) || p.host() == wanted)
                .map(|p| RoutingTarget::Platform(*p))
        };

        by_region
            .or_else(by_platform)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_to_region() {
        assert_eq!(Platform::Na1.region(), Region::Americas);
        assert_eq!(Platform::Euw1.region(), Region::Europe);
        assert_eq!(Platform::Kr.region(), Region::Asia);
        assert_eq!(Platform::Vn2.region(), Region::Sea);
    }

    #[test]
    fn test_every_platform_has_a_region() {
        for platform in Platform::ALL {
            let host = platform.host();
            assert!(host.ends_with(".api.riotgames.com"));
            // region() is total, this just exercises each arm
            let _ = platform.region();
        }
    }

    #[test]
    fn test_parse_routing_target() {
        assert_eq!(
            "asia".parse::<RoutingTarget>().unwrap(),
            RoutingTarget::Region(Region::Asia)
        );
        assert_eq!(
            "EUW1".parse::<RoutingTarget>().unwrap(),
            RoutingTarget::Platform(Platform::Euw1)
        );
        assert_eq!(
            "kr.api.riotgames.com".parse::<RoutingTarget>().unwrap(),
            RoutingTarget::Platform(Platform::Kr)
        );
        assert!("atlantis".parse::<RoutingTarget>().is_err());
    }

    #[test]
    fn test_route_kind_accepts() {
        let region = RoutingTarget::from(Region::Europe);
        let platform = RoutingTarget::from(Platform::Tr1);

        assert!(RouteKind::Region.accepts(&region));
        assert!(!RouteKind::Region.accepts(&platform));
        assert!(RouteKind::Platform.accepts(&platform));
        assert!(RouteKind::Any.accepts(&region));
        assert!(RouteKind::Any.accepts(&platform));
    }

    #[test]
    fn test_display_uses_scope_name() {
        assert_eq!(RoutingTarget::from(Region::Sea).to_string(), "SEA");
        assert_eq!(RoutingTarget::from(Platform::Oc1).to_string(), "OC1");
    }
}
