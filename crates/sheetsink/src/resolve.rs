use crate::error::SinkError;
use crate::registry::{OwnershipRecord, OwnershipStore};
use rustc_hash::FxHashSet;
use sheetsink_host::{SpreadsheetHost, TableInfo};

/// Where a query's output table should land.
///
/// `existing` is populated only when the query already owns a live table, in
/// which case the writer takes the update branch instead of creating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub sheet_name: String,
    pub table_name: String,
    pub existing: Option<TableInfo>,
}

/// Caller-requested location. `explicit` marks a deliberate user override,
/// as opposed to the default names carried on the query definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetHint {
    pub sheet_name: String,
    pub table_name: String,
    pub explicit: bool,
}

impl TargetHint {
    pub fn new(sheet_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            table_name: table_name.into(),
            explicit: false,
        }
    }

    pub fn explicit(sheet_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            table_name: table_name.into(),
            explicit: true,
        }
    }
}

/// Which side wins when an explicit hint and an owned table disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintPrecedence {
    /// An explicit hint redirects output even away from an owned table.
    #[default]
    ExplicitWins,
    /// Ownership always pins the target; hints only seed first-run placement.
    OwnedWins,
}

/// Computes a collision-free output location from the live-table snapshot and
/// the ownership ledger.
///
/// Pure with respect to its inputs: with no intervening writes, repeated
/// resolution returns identical targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct TargetResolver {
    precedence: HintPrecedence,
}

impl TargetResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precedence(precedence: HintPrecedence) -> Self {
        Self { precedence }
    }

    pub fn resolve<H, S>(
        &self,
        host: &mut H,
        store: &mut S,
        query_id: &str,
        requested: &TargetHint,
    ) -> Result<ResolvedTarget, SinkError>
    where
        H: SpreadsheetHost,
        S: OwnershipStore<H>,
    {
        let live = host
            .list_tables()
            .map_err(|e| SinkError::from_host("list_tables", e))?;
        let records = store.list(host)?;

        let follow_ownership =
            !(requested.explicit && self.precedence == HintPrecedence::ExplicitWins);
        if follow_ownership {
            if let Some(found) = owned_live_table(&live, &records, query_id) {
                tracing::debug!(
                    query = query_id,
                    sheet = %found.worksheet,
                    table = %found.name,
                    "resolved to owned table"
                );
                return Ok(ResolvedTarget {
                    sheet_name: found.worksheet.clone(),
                    table_name: found.name.clone(),
                    existing: Some(found.clone()),
                });
            }
        }

        // Table names are document-global, so any live table with the
        // requested name that this query does not own is a foreign collision.
        let live_names: FxHashSet<&str> = live.iter().map(|t| t.name.as_str()).collect();
        if live_names.contains(requested.table_name.as_str()) {
            let owned_by_us = live
                .iter()
                .filter(|t| t.name == requested.table_name)
                .any(|t| is_owned_by(&records, t, query_id));
            if !owned_by_us {
                let renamed = format!("{}_{}", requested.table_name, query_id);
                tracing::debug!(
                    query = query_id,
                    requested = %requested.table_name,
                    renamed = %renamed,
                    "requested table name collides with foreign content"
                );
                return Ok(ResolvedTarget {
                    sheet_name: requested.sheet_name.clone(),
                    table_name: renamed,
                    existing: None,
                });
            }
        }

        Ok(ResolvedTarget {
            sheet_name: requested.sheet_name.clone(),
            table_name: requested.table_name.clone(),
            existing: None,
        })
    }
}

fn is_owned_by(records: &[OwnershipRecord], table: &TableInfo, query_id: &str) -> bool {
    records.iter().any(|r| {
        r.is_managed
            && r.query_id.as_deref() == Some(query_id)
            && r.table_name == table.name
            && r.sheet_name == table.worksheet
    })
}

fn owned_live_table<'a>(
    live: &'a [TableInfo],
    records: &[OwnershipRecord],
    query_id: &str,
) -> Option<&'a TableInfo> {
    records
        .iter()
        .filter(|r| r.is_managed && r.query_id.as_deref() == Some(query_id))
        .find_map(|r| {
            live.iter()
                .find(|t| t.name == r.table_name && t.worksheet == r.sheet_name)
        })
}
