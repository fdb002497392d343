//! Connectivity table rows.
//!
//! One row per reach: `id, downstream_id, upstream_count, up_1 … up_max`,
//! where `downstream_id = 0` marks an outlet and the upstream columns are
//! zero-padded to a fixed width shared by the whole table.

use serde::{Deserialize, Serialize};

use crate::types::{OUTLET_SENTINEL, ReachId};

/// One row of a connectivity table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityRow {
    /// Reach id
    pub id: ReachId,
    /// Downstream reach id, `0` for an outlet
    pub downstream_id: ReachId,
    /// Upstream reach ids (unpadded)
    pub upstream_ids: Vec<ReachId>,
    /// Whether `upstream_ids` was stated by the source; an empty stated list
    /// asserts a headwater and is checked like any other.
    #[serde(default)]
    pub upstream_listed: bool,
}

impl ConnectivityRow {
    /// Create a row without upstream ids; the builder derives them.
    pub fn new(id: ReachId, downstream_id: ReachId) -> Self {
        Self {
            id,
            downstream_id,
            upstream_ids: Vec::new(),
            upstream_listed: false,
        }
    }

    /// Set upstream ids, which the builder then checks.
    pub fn with_upstream(mut self, upstream_ids: Vec<ReachId>) -> Self {
        self.upstream_ids = upstream_ids;
        self.upstream_listed = true;
        self
    }

    /// Whether this row is an outlet.
    pub fn is_outlet(&self) -> bool {
        self.downstream_id == OUTLET_SENTINEL
    }

    /// Downstream id, `None` for an outlet.
    pub fn downstream(&self) -> Option<ReachId> {
        (!self.is_outlet()).then_some(self.downstream_id)
    }

    /// Flatten to table fields, padding upstream ids with zeros to `width`.
    ///
    /// `width` is raised to the row's own upstream count if smaller.
    pub fn to_fields(&self, width: usize) -> Vec<ReachId> {
        let width = width.max(self.upstream_ids.len());
        let mut fields = Vec::with_capacity(3 + width);
        fields.push(self.id);
        fields.push(self.downstream_id);
        fields.push(self.upstream_ids.len() as ReachId);
        fields.extend_from_slice(&self.upstream_ids);
        fields.resize(3 + width, OUTLET_SENTINEL);
        fields
    }

    /// Parse table fields; trailing zero padding is dropped.
    ///
    /// The upstream count is explicit in a table, so the parsed list is
    /// always treated as stated, even when empty.
    ///
    /// Returns `None` if fewer than three fields are present or the declared
    /// upstream count exceeds the available columns.
    pub fn from_fields(fields: &[ReachId]) -> Option<Self> {
        let [id, downstream_id, count, rest @ ..] = fields else {
            return None;
        };
        let count = usize::try_from(*count).ok()?;
        let upstream_ids = rest.get(..count)?.to_vec();
        Some(Self {
            id: *id,
            downstream_id: *downstream_id,
            upstream_ids,
            upstream_listed: true,
        })
    }
}
