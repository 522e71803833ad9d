//! Endpoint Catalogue
//!
//! Governed operations of the account-v1, match-v5 and league-v4 APIs. Each
//! constructor builds an [`ApiCall`]: the routing target, the operation name
//! the governor scopes the call by, and the request path and query.
//!
//! ```text
//! ApiCall::match_by_id(Region::Europe, "EUW1_123")
//!     -> GET europe.api.riotgames.com/lol/match/v5/matches/EUW1_123
//!        scopes: EUROPE:route_long, EUROPE:route_short, EUROPE:get_match_by_match_id
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::governor::OperationSpec;
use crate::routes::{Platform, Region, RouteKind, RoutingTarget};
use crate::transport::{ApiRequest, HttpMethod};

pub const GET_ACCOUNT_BY_RIOT_ID: &str = "get_account_by_riot_id";
pub const GET_ACCOUNT_BY_PUUID: &str = "get_account_by_puuid";
pub const GET_ACCOUNT_REGION: &str = "get_account_region";
pub const GET_MATCH_IDS_BY_PUUID: &str = "get_match_ids_by_puuid";
pub const GET_MATCH_BY_MATCH_ID: &str = "get_match_by_match_id";
pub const GET_MATCH_TIMELINE: &str = "get_match_timeline";
pub const GET_LEAGUE_ENTRIES_BY_TIER: &str = "get_league_entries_by_tier";
pub const GET_LEAGUE_BY_LEAGUE_ID: &str = "get_league_by_league_id";
pub const GET_CHALLENGER_LEAGUE: &str = "get_challenger_league";
pub const GET_GRANDMASTER_LEAGUE: &str = "get_grandmaster_league";
pub const GET_MASTER_LEAGUE: &str = "get_master_league";

/// Operation table of the built-in catalogue
pub fn default_operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::new(GET_ACCOUNT_BY_RIOT_ID, RouteKind::Region),
        OperationSpec::new(GET_ACCOUNT_BY_PUUID, RouteKind::Region),
        OperationSpec::new(GET_ACCOUNT_REGION, RouteKind::Any),
        OperationSpec::new(GET_MATCH_IDS_BY_PUUID, RouteKind::Region),
        OperationSpec::new(GET_MATCH_BY_MATCH_ID, RouteKind::Region),
        OperationSpec::new(GET_MATCH_TIMELINE, RouteKind::Region),
        OperationSpec::new(GET_LEAGUE_ENTRIES_BY_TIER, RouteKind::Platform),
        OperationSpec::new(GET_LEAGUE_BY_LEAGUE_ID, RouteKind::Platform),
        OperationSpec::new(GET_CHALLENGER_LEAGUE, RouteKind::Platform),
        OperationSpec::new(GET_GRANDMASTER_LEAGUE, RouteKind::Platform),
        OperationSpec::new(GET_MASTER_LEAGUE, RouteKind::Platform),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RankedTier {
    Iron,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Emerald,
    Diamond,
    Master,
    Grandmaster,
    Challenger,
}

impl RankedTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankedTier::Iron => "IRON",
            RankedTier::Bronze => "BRONZE",
            RankedTier::Silver => "SILVER",
            RankedTier::Gold => "GOLD",
            RankedTier::Platinum => "PLATINUM",
            RankedTier::Emerald => "EMERALD",
            RankedTier::Diamond => "DIAMOND",
            RankedTier::Master => "MASTER",
            RankedTier::Grandmaster => "GRANDMASTER",
            RankedTier::Challenger => "CHALLENGER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankedDivision {
    I,
    II,
    III,
    IV,
}

impl RankedDivision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankedDivision::I => "I",
            RankedDivision::II => "II",
            RankedDivision::III => "III",
            RankedDivision::IV => "IV",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankedQueue {
    #[serde(rename = "RANKED_SOLO_5x5")]
    Solo5x5,
    #[serde(rename = "RANKED_FLEX_SR")]
    FlexSr,
    #[serde(rename = "RANKED_FLEX_TT")]
    FlexTt,
}

impl RankedQueue {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankedQueue::Solo5x5 => "RANKED_SOLO_5x5",
            RankedQueue::FlexSr => "RANKED_FLEX_SR",
            RankedQueue::FlexTt => "RANKED_FLEX_TT",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(RankedTier, RankedDivision, RankedQueue);

/// Optional filters of the match id listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchIdsFilter {
    /// Epoch seconds; matches before June 16th 2021 carry no timestamp
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Queue id, combined with `match_type` when both are set
    pub queue: Option<u32>,
    pub match_type: Option<String>,
    /// Pagination offset, remote default 0
    pub start: Option<u32>,
    /// Page size 0..=100, remote default 20
    pub count: Option<u32>,
}

impl MatchIdsFilter {
    fn to_query(&self) -> Vec<(String, String)> {
        let pairs: [(&str, Option<String>); 6] = [
            ("startTime", self.start_time.map(|v| v.to_string())),
            ("endTime", self.end_time.map(|v| v.to_string())),
            ("queue", self.queue.map(|v| v.to_string())),
            ("type", self.match_type.clone()),
            ("start", self.start.map(|v| v.to_string())),
            ("count", self.count.map(|v| v.to_string())),
        ];

        pairs
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
            .collect()
    }
}

/// A governed call: what the governor scopes by and what the transport sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub route: RoutingTarget,
    pub operation: String,
    pub method: HttpMethod,
    /// Percent-encoded path
    pub path: String,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ApiCall {
    /// A GET call; `path` must already be encoded
    pub fn new(
        route: impl Into<RoutingTarget>,
        operation: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            operation: operation.into(),
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Request for the transport
    pub fn to_request(&self) -> ApiRequest {
        ApiRequest {
            method: self.method,
            host: self.route.host().to_string(),
            path: self.path.clone(),
            query: self.query.clone(),
            timeout: self.timeout,
        }
    }

    pub fn account_by_riot_id(route: Region, game_name: &str, tag_line: &str) -> Self {
        Self::new(
            route,
            GET_ACCOUNT_BY_RIOT_ID,
            format!(
                "/riot/account/v1/accounts/by-riot-id/{}/{}",
                segment(game_name),
                segment(tag_line)
            ),
        )
    }

    pub fn account_by_puuid(route: Region, puuid: &str) -> Self {
        Self::new(
            route,
            GET_ACCOUNT_BY_PUUID,
            format!("/riot/account/v1/accounts/by-puuid/{}", segment(puuid)),
        )
    }

    /// Active shard of a player for `game` (`lol`, `val`, ...)
    pub fn account_region(route: impl Into<RoutingTarget>, game: &str, puuid: &str) -> Self {
        Self::new(
            route,
            GET_ACCOUNT_REGION,
            format!(
                "/riot/account/v1/region/by-game/{}/by-puuid/{}",
                segment(game),
                segment(puuid)
            ),
        )
    }

    pub fn match_ids_by_puuid(route: Region, puuid: &str, filter: &MatchIdsFilter) -> Self {
        let mut call = Self::new(
            route,
            GET_MATCH_IDS_BY_PUUID,
            format!("/lol/match/v5/matches/by-puuid/{}/ids", segment(puuid)),
        );
        call.query = filter.to_query();
        call
    }

    pub fn match_by_id(route: Region, match_id: &str) -> Self {
        Self::new(
            route,
            GET_MATCH_BY_MATCH_ID,
            format!("/lol/match/v5/matches/{}", segment(match_id)),
        )
    }

    pub fn match_timeline(route: Region, match_id: &str) -> Self {
        Self::new(
            route,
            GET_MATCH_TIMELINE,
            format!("/lol/match/v5/matches/{}/timeline", segment(match_id)),
        )
    }

    /// One page (1-based) of ranked entries
    pub fn league_entries_by_tier(
        route: Platform,
        queue: RankedQueue,
        tier: RankedTier,
        division: RankedDivision,
        page: u32,
    ) -> Self {
        Self::new(
            route,
            GET_LEAGUE_ENTRIES_BY_TIER,
            format!("/lol/league/v4/entries/{}/{}/{}", queue, tier, division),
        )
        .with_query("page", page.max(1).to_string())
    }

    pub fn league_by_id(route: Platform, league_id: &str) -> Self {
        Self::new(
            route,
            GET_LEAGUE_BY_LEAGUE_ID,
            format!("/lol/league/v4/leagues/{}", segment(league_id)),
        )
    }

    pub fn challenger_league(route: Platform, queue: RankedQueue) -> Self {
        Self::new(
            route,
            GET_CHALLENGER_LEAGUE,
            format!("/lol/league/v4/challengerleagues/by-queue/{}", queue),
        )
    }

    pub fn grandmaster_league(route: Platform, queue: RankedQueue) -> Self {
        Self::new(
            route,
            GET_GRANDMASTER_LEAGUE,
            format!("/lol/league/v4/grandmasterleagues/by-queue/{}", queue),
        )
    }

    pub fn master_league(route: Platform, queue: RankedQueue) -> Self {
        Self::new(
            route,
            GET_MASTER_LEAGUE,
            format!("/lol/league/v4/masterleagues/by-queue/{}", queue),
        )
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::governor::ScopeResolver;

    #[test]
    fn test_riot_id_segments_are_encoded() {
        let call = ApiCall::account_by_riot_id(Region::Europe, "Faker Fan", "EUW#1");
        assert_eq!(
            call.path,
            "/riot/account/v1/accounts/by-riot-id/Faker%20Fan/EUW%231"
        );
        assert_eq!(call.operation, GET_ACCOUNT_BY_RIOT_ID);
        assert_eq!(call.route, RoutingTarget::Region(Region::Europe));
    }

    #[test]
    fn test_match_filter_query_order() {
        let filter = MatchIdsFilter {
            start_time: Some(1_700_000_000),
            queue: Some(420),
            match_type: Some("ranked".to_string()),
            count: Some(100),
            ..Default::default()
        };
        let call = ApiCall::match_ids_by_puuid(Region::Americas, "abc", &filter);

        assert_eq!(call.path, "/lol/match/v5/matches/by-puuid/abc/ids");
        let names: Vec<&str> = call.query.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["startTime", "queue", "type", "count"]);
    }

    #[test]
    fn test_empty_filter_has_no_query() {
        let call = ApiCall::match_ids_by_puuid(Region::Sea, "abc", &MatchIdsFilter::default());
        assert!(call.query.is_empty());
    }

    #[test]
    fn test_league_entries_path_and_page() {
        let call = ApiCall::league_entries_by_tier(
            Platform::Kr,
            RankedQueue::Solo5x5,
            RankedTier::Diamond,
            RankedDivision::II,
            0,
        );
        assert_eq!(call.path, "/lol/league/v4/entries/RANKED_SOLO_5x5/DIAMOND/II");
        assert_eq!(call.query, vec![("page".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_to_request_uses_route_host() {
        let call = ApiCall::master_league(Platform::Euw1, RankedQueue::FlexSr)
            .with_timeout(Duration::from_secs(10));
        let request = call.to_request();

        assert_eq!(request.host, "euw1.api.riotgames.com");
        assert_eq!(request.path, "/lol/league/v4/masterleagues/by-queue/RANKED_FLEX_SR");
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_every_constructor_resolves_with_default_table() {
        let resolver = ScopeResolver::with_default_operations(vec![
            "route_long".to_string(),
            "route_short".to_string(),
        ]);
        let calls = [
            ApiCall::account_by_riot_id(Region::Asia, "a", "b"),
            ApiCall::account_by_puuid(Region::Asia, "p"),
            ApiCall::account_region(Platform::Na1, "lol", "p"),
            ApiCall::account_region(Region::Americas, "val", "p"),
            ApiCall::match_ids_by_puuid(Region::Asia, "p", &MatchIdsFilter::default()),
            ApiCall::match_by_id(Region::Asia, "KR_1"),
            ApiCall::match_timeline(Region::Asia, "KR_1"),
            ApiCall::league_entries_by_tier(
                Platform::Kr,
                RankedQueue::FlexSr,
                RankedTier::Gold,
                RankedDivision::IV,
                2,
            ),
            ApiCall::league_by_id(Platform::Kr, "id"),
            ApiCall::challenger_league(Platform::Kr, RankedQueue::Solo5x5),
            ApiCall::grandmaster_league(Platform::Kr, RankedQueue::Solo5x5),
            ApiCall::master_league(Platform::Kr, RankedQueue::Solo5x5),
        ];

        for call in &calls {
            let resolved = resolver.resolve(&call.route, &call.operation).unwrap();
            assert_eq!(resolved.scopes.len(), 3, "{}", call.operation);
        }
    }

    #[test]
    fn test_ranked_enums_serialize_as_remote_names() {
        assert_eq!(
            serde_json::to_string(&RankedQueue::Solo5x5).unwrap(),
            "\"RANKED_SOLO_5x5\""
        );
        assert_eq!(
            serde_json::to_string(&RankedTier::Grandmaster).unwrap(),
            "\"GRANDMASTER\""
        );
        assert_eq!(RankedDivision::III.to_string(), "III");
    }
}
