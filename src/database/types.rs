// src/database/types.rs
use serde::Deserialize;

use crate::tiles::Scale;

/// Which messages count as coming from an actively reporting vessel.
///
/// Applies to the tile and destination queries. A vessel whose messages
/// were matched to a permanent IMO is treated as already known, so the
/// default considers only messages without a resolved IMO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPolicy {
    /// Only messages whose `vessel_imo` is still NULL
    #[default]
    UnresolvedImo,
    /// Every message
    AllMessages,
}

impl ActivityPolicy {
    /// SQL condition on `ais_message` aliased as `m`
    pub(crate) fn message_condition(self) -> &'static str {
        match self {
            ActivityPolicy::UnresolvedImo => "m.vessel_imo IS NULL",
            ActivityPolicy::AllMessages => "1 = 1",
        }
    }
}

/// Column of `position_report` holding the tile id at `scale`
pub(crate) fn map_view_column(scale: Scale) -> &'static str {
    match scale {
        Scale::Root => "map_view1_id",
        Scale::Region => "map_view2_id",
        Scale::Local => "map_view3_id",
    }
}
